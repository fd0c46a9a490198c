use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    assets::render_overlays,
    config::{RenderConfig, UiChoice},
    encode_ffmpeg::{encode, move_output, sequence_config},
    error::{RenderError, RenderResult},
    framedump::capture,
    progress::Ui,
};

/// Everything a render needs once setup has succeeded.
#[derive(Debug)]
pub struct RenderJob<'a> {
    pub cfg: &'a RenderConfig,
    pub example_path: PathBuf,
    pub label: String,
    pub work_dir: &'a Path,
    pub out_dir: &'a Path,
}

/// Checks that the build directory exists and that the example is an executable file.
pub fn check_example(cfg: &RenderConfig) -> RenderResult<PathBuf> {
    if !cfg.build_dir.is_dir() {
        return Err(RenderError::setup(format!(
            "Could not find directory '{}'.",
            cfg.build_dir.display()
        )));
    }

    let example_path = cfg.example_path();
    if !example_path.is_file() || !is_executable(&example_path) {
        return Err(RenderError::setup(format!(
            "Could not find example '{}'.",
            cfg.example.display()
        )));
    }
    Ok(example_path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Renders overlays, captures frames, encodes them and moves the result into `job.out_dir`.
pub fn render_example(job: &RenderJob<'_>, ui: &Ui) -> RenderResult<PathBuf> {
    let cfg = job.cfg;

    let overlays = render_overlays(cfg, job.work_dir, &job.label, ui)?;

    let frames = capture(cfg, &job.example_path, job.work_dir, &overlays, ui)?;
    tracing::info!(frames, "capture finished");
    if frames == 0 {
        return Err(RenderError::tool(format!(
            "example '{}' produced no frames",
            cfg.example.display()
        )));
    }

    let produced = encode(&cfg.ffmpeg_program, &sequence_config(cfg, job.work_dir), ui)?;

    let out_path = job.out_dir.join(cfg.output_file_name());
    move_output(&produced, &out_path)?;
    Ok(out_path)
}

/// Full run: validation, work directory, progress UI, render. Returns the output path.
///
/// Nothing is launched and no work directory is created when setup checks fail.
pub fn run(cfg: &RenderConfig, out_dir: &Path) -> RenderResult<PathBuf> {
    cfg.validate()?;
    let example_path = check_example(cfg)?;
    let label = cfg.resolve_label()?;

    let work_dir = tempfile::Builder::new()
        .prefix("render-videos-")
        .tempdir()
        .context("create work directory")?;
    tracing::debug!(work_dir = %work_dir.path().display(), "created work directory");

    let job = RenderJob {
        cfg,
        example_path,
        label,
        work_dir: work_dir.path(),
        out_dir,
    };

    let result = run_with_ui(&job);

    if let Err(e) = work_dir.close() {
        tracing::warn!("failed to remove work directory: {e}");
    }
    result
}

fn run_with_ui(job: &RenderJob<'_>) -> RenderResult<PathBuf> {
    if wants_window(job.cfg.ui) {
        return run_in_window(job);
    }
    let ui = Ui::console();
    render_example(job, &ui)
}

#[cfg(feature = "gui")]
fn run_in_window(job: &RenderJob<'_>) -> RenderResult<PathBuf> {
    let info = crate::progress::window::WindowInfo {
        example_name: job.cfg.example_name(),
        work_dir: job.work_dir.to_path_buf(),
        build_dir: job.cfg.build_dir.clone(),
        example: job.cfg.example.clone(),
        frame_size: job.cfg.frame_size,
    };
    crate::progress::window::run_with_window(info, |ui| render_example(job, ui))
}

#[cfg(not(feature = "gui"))]
fn run_in_window(job: &RenderJob<'_>) -> RenderResult<PathBuf> {
    let ui = Ui::console();
    render_example(job, &ui)
}

fn wants_window(choice: UiChoice) -> bool {
    match choice {
        UiChoice::Console => false,
        UiChoice::Window if !cfg!(feature = "gui") => {
            tracing::warn!("built without the 'gui' feature; using console progress");
            false
        }
        UiChoice::Window => true,
        UiChoice::Auto => gui_available(),
    }
}

#[cfg(feature = "gui")]
fn gui_available() -> bool {
    crate::progress::window::display_available()
}

#[cfg(not(feature = "gui"))]
fn gui_available() -> bool {
    false
}
