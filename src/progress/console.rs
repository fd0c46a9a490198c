use std::{io::Write, sync::Mutex};

use super::{ActionKind, ProgressEvent, ProgressSink};

/// Plain-text progress, one line per update.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn write(out: &mut dyn Write, event: &ProgressEvent) -> std::io::Result<()> {
        match event {
            ProgressEvent::Begin {
                kind: ActionKind::Simple,
                title,
            } => write!(out, "{title} ... ")?,
            ProgressEvent::Begin { title, .. } => writeln!(out, "{title}")?,
            ProgressEvent::Frame { frame_no, .. } => writeln!(out, "Rendered frame: {frame_no}")?,
            ProgressEvent::Message(message) => writeln!(out, "{message}")?,
            ProgressEvent::Finish { .. } => writeln!(out, "Done")?,
        }
        out.flush()
    }
}

impl ProgressSink for ConsoleSink {
    fn dispatch(&self, event: ProgressEvent) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = Self::write(out.as_mut(), &event) {
            tracing::debug!("console progress write failed: {e}");
        }
    }
}
