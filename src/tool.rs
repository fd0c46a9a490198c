use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, ExitStatus, Stdio},
};

use crate::error::{RenderError, RenderResult};

/// Space-joined program and arguments, for diagnostics.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns a finished tool's status into an error naming the exit code or the terminating signal.
pub fn check_status(tool: &str, status: ExitStatus) -> RenderResult<()> {
    if status.success() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return Err(RenderError::tool(format!(
                "{tool} killed by signal {signal}"
            )));
        }
    }

    match status.code() {
        Some(code) => Err(RenderError::tool(format!("{tool} failed with code {code}"))),
        None => Err(RenderError::tool(format!("{tool} failed: {status}"))),
    }
}

/// ImageMagick `convert`, run inside the work directory.
#[derive(Clone, Debug)]
pub struct Convert<'a> {
    pub program: &'a OsStr,
    pub work_dir: &'a Path,
}

impl Convert<'_> {
    pub fn run<I, S>(&self, args: I) -> RenderResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(self.program);
        cmd.args(args)
            .current_dir(self.work_dir)
            .stdin(Stdio::null());

        tracing::debug!(command = %command_line(&cmd), "running convert");
        let status = cmd
            .status()
            .map_err(|e| RenderError::tool(format!("failed to run '{}': {e}", command_line(&cmd))))?;
        check_status("convert", status)
    }
}
