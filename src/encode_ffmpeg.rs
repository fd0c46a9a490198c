use std::{
    ffi::{OsStr, OsString},
    io::{BufRead as _, BufReader},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    config::{ByteLimit, OutputFormat, RenderConfig},
    error::{RenderError, RenderResult, Stage},
    progress::Ui,
    tool::{check_status, command_line},
};

/// Encoding of a numbered PNG sequence into a single output file.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub fps: u32,
    pub max_bytes: Option<ByteLimit>,
    pub format: OutputFormat,
    pub input_pattern: PathBuf,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn args(&self) -> Vec<OsString> {
        let fps = self.fps.to_string();
        let mut args: Vec<OsString> = [
            "-loglevel",
            "error",
            "-y",
            "-f",
            "image2",
            "-framerate",
            fps.as_str(),
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(self.input_pattern.clone().into_os_string());
        args.push("-r".into());
        args.push(fps.into());

        if let Some(max_bytes) = &self.max_bytes {
            args.push("-fs".into());
            args.push(max_bytes.to_string().into());
        }

        if self.format == OutputFormat::Avi {
            for arg in ["-vcodec", "mpeg4", "-b", "8000k"] {
                args.push(arg.into());
            }
        }

        args.push(self.out_path.clone().into_os_string());
        args
    }
}

/// Encoder settings for the frames captured into `work_dir`.
pub fn sequence_config(cfg: &RenderConfig, work_dir: &Path) -> EncodeConfig {
    EncodeConfig {
        fps: cfg.fps,
        max_bytes: cfg.max_bytes.clone(),
        format: cfg.format,
        input_pattern: work_dir.join("frame-%06d.png"),
        out_path: work_dir.join(format!("frame.{}", cfg.format.extension())),
    }
}

pub fn ensure_parent_dir(path: &Path) -> RenderResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Runs ffmpeg over the PNG sequence, streaming its diagnostics into `ui`.
pub fn encode(program: &OsStr, enc: &EncodeConfig, ui: &Ui) -> RenderResult<PathBuf> {
    let mut cmd = Command::new(program);
    cmd.args(enc.args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    tracing::info!(command = %command_line(&cmd), "starting encoder");
    let mut child = cmd
        .spawn()
        .map_err(|e| RenderError::launch(Stage::Encode, command_line(&cmd), e))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RenderError::tool("failed to open ffmpeg stderr (unexpected)"))?;

    {
        let progress = ui.videoenc("Encoding video");
        for line in BufReader::new(stderr).lines() {
            let line = line.context("read ffmpeg output")?;
            let message = line.trim_end();
            if !message.is_empty() {
                progress.update(message);
            }
        }
    }

    let status = child
        .wait()
        .context("wait for ffmpeg to finish")?;
    check_status("ffmpeg", status)?;

    if !enc.out_path.is_file() {
        return Err(RenderError::tool(format!(
            "ffmpeg finished but '{}' was not written",
            enc.out_path.display()
        )));
    }
    Ok(enc.out_path.clone())
}

/// Moves `src` to `dst`, copying when a rename crosses filesystems.
pub fn move_output(src: &Path, dst: &Path) -> RenderResult<()> {
    ensure_parent_dir(dst)?;
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dst)
        .with_context(|| format!("copy '{}' to '{}'", src.display(), dst.display()))?;
    std::fs::remove_file(src).with_context(|| format!("remove '{}'", src.display()))?;
    Ok(())
}
