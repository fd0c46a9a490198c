//! Frame capture.
//!
//! The example is started with `--framedump <prefix>` and talks to us over its
//! standard streams: we send the prefix line, then for every frame it prints
//! the raw file path and waits until we echo that same line back. We always
//! acknowledge a frame before reading the next one.

use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    assets::Overlays,
    config::{FrameSize, RenderConfig},
    error::{RenderError, RenderResult, Stage},
    progress::{FramedumpProgress, Ui},
    tool::{Convert, command_line},
};

/// Turns one raw frame into the final PNG.
pub trait FrameConverter {
    fn convert(&mut self, raw: &Path, png: &Path) -> RenderResult<()>;
}

/// Frame conversion through ImageMagick: flip, downscale, composite the overlays.
pub struct ConvertFrames<'a> {
    pub convert: Convert<'a>,
    pub capture: FrameSize,
    pub output: FrameSize,
    pub overlays: &'a Overlays,
}

impl ConvertFrames<'_> {
    pub fn args(&self, raw: &Path, png: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-size".into(),
            self.capture.to_string().into(),
            "-depth".into(),
            "8".into(),
            raw.into(),
            "-flip".into(),
            "-scale".into(),
            self.output.to_string().into(),
            "-alpha".into(),
            "Off".into(),
        ];
        for overlay in [
            &self.overlays.main_label,
            &self.overlays.sample_label,
            &self.overlays.logo,
        ] {
            args.push("-gravity".into());
            args.push("SouthEast".into());
            args.push(overlay.into());
            args.push("-composite".into());
        }
        args.push("-quality".into());
        args.push("100".into());
        args.push(png.into());
        args
    }
}

impl FrameConverter for ConvertFrames<'_> {
    fn convert(&mut self, raw: &Path, png: &Path) -> RenderResult<()> {
        self.convert.run(self.args(raw, png))?;

        let (width, height) = image::image_dimensions(png).map_err(|e| {
            RenderError::tool(format!("convert produced no readable '{}': {e}", png.display()))
        })?;
        if width != self.output.width || height != self.output.height {
            return Err(RenderError::tool(format!(
                "convert produced {width}x{height} for '{}', expected {}",
                png.display(),
                self.output
            )));
        }
        Ok(())
    }
}

/// PNG path for a raw frame path reported by the example.
pub fn png_path_for(raw: &Path) -> PathBuf {
    raw.with_extension("png")
}

/// Runs the acknowledge-then-convert loop until the example closes its output.
///
/// Returns the number of frames produced. A frame that fails to convert is
/// replaced by a copy of the previous frame; the first frame has no
/// predecessor, so its failure aborts the capture.
pub fn run_handshake<R, W, C>(
    mut reader: R,
    mut writer: W,
    prefix: &str,
    converter: &mut C,
    progress: &FramedumpProgress<'_>,
) -> RenderResult<u64>
where
    R: BufRead,
    W: Write,
    C: FrameConverter + ?Sized,
{
    writeln!(writer, "{prefix}")
        .and_then(|()| writer.flush())
        .context("send frame prefix to example")?;

    let mut frame_no = 0u64;
    let mut prev_png: Option<PathBuf> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .context("read frame path from example")?;
        if n == 0 {
            break;
        }

        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .context("acknowledge frame to example")?;

        let text = String::from_utf8_lossy(&line);
        let raw_text = text.trim_end();
        if raw_text.is_empty() {
            tracing::debug!("ignoring blank line from example");
            continue;
        }
        let raw = PathBuf::from(raw_text);
        let png = png_path_for(&raw);

        if let Err(err) = converter.convert(&raw, &png) {
            let Some(prev) = prev_png.as_deref() else {
                return Err(RenderError::FirstFrame {
                    path: raw.display().to_string(),
                    reason: err.to_string(),
                });
            };
            tracing::warn!(
                frame_no,
                "frame conversion failed ({err}), repeating '{}'",
                prev.display()
            );
            std::fs::copy(prev, &png).with_context(|| {
                format!("copy '{}' to '{}'", prev.display(), png.display())
            })?;
        }

        if raw.is_file() {
            std::fs::remove_file(&raw)
                .with_context(|| format!("remove raw frame '{}'", raw.display()))?;
        }

        progress.update(frame_no, &png);
        prev_png = Some(png);
        frame_no += 1;
    }

    Ok(frame_no)
}

/// Frame path prefix passed to the example for a work directory.
pub fn frame_prefix(work_dir: &Path) -> String {
    format!("{}-", work_dir.join("frame").display())
}

pub fn example_command(
    cfg: &RenderConfig,
    example_path: &Path,
    prefix: &str,
) -> RenderResult<Command> {
    let capture = cfg.capture_size()?;
    let mut cmd = Command::new(example_path);
    cmd.args(&cfg.example_args)
        .arg("--framedump")
        .arg(prefix)
        .arg("--width")
        .arg(capture.width.to_string())
        .arg("--height")
        .arg(capture.height.to_string())
        .arg("--fixed-fps")
        .arg(cfg.fps.to_string());
    if cfg.samples > 0 {
        cmd.arg("--samples").arg(cfg.samples.to_string());
    }
    Ok(cmd)
}

/// Launches the example in frame-dump mode and converts every frame it emits.
pub fn capture(
    cfg: &RenderConfig,
    example_path: &Path,
    work_dir: &Path,
    overlays: &Overlays,
    ui: &Ui,
) -> RenderResult<u64> {
    let prefix = frame_prefix(work_dir);
    let mut cmd = example_command(cfg, example_path, &prefix)?;
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    tracing::info!(command = %command_line(&cmd), "starting example");
    let mut child = cmd
        .spawn()
        .map_err(|e| RenderError::launch(Stage::Capture, command_line(&cmd), e))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| RenderError::setup("failed to open example stdin (unexpected)"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RenderError::setup("failed to open example stdout (unexpected)"))?;

    let mut converter = ConvertFrames {
        convert: Convert {
            program: &cfg.convert_program,
            work_dir,
        },
        capture: cfg.capture_size()?,
        output: cfg.frame_size,
        overlays,
    };

    let result = {
        let progress = ui.framedump("Rendering frames");
        run_handshake(
            BufReader::new(stdout),
            stdin,
            &prefix,
            &mut converter,
            &progress,
        )
    };

    if result.is_err() {
        // The example may be blocked waiting for an acknowledgment.
        let _ = child.kill();
    }
    let status = child.wait().context("wait for example to exit")?;
    if result.is_ok() && !status.success() {
        tracing::warn!("example exited with {status}");
    }

    result
}
