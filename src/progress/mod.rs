//! Progress reporting.
//!
//! The pipeline talks to a [`Ui`], which forwards [`ProgressEvent`]s to a
//! [`ProgressSink`]. Actions are scoped: each guard returned by [`Ui`] emits
//! `Begin` when created and `Finish` when dropped, so an action is closed on
//! every exit path, including `?` returns.

use std::path::{Path, PathBuf};

pub mod console;
#[cfg(feature = "gui")]
pub mod window;

pub use console::ConsoleSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Simple,
    Framedump,
    VideoEnc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin { kind: ActionKind, title: String },
    Frame { frame_no: u64, path: PathBuf },
    Message(String),
    Finish { kind: ActionKind },
}

/// A presentation of progress events.
pub trait ProgressSink: Send {
    fn dispatch(&self, event: ProgressEvent);

    /// Called once when the owning [`Ui`] goes away.
    fn close(&self) {}
}

pub struct Ui {
    sink: Box<dyn ProgressSink>,
}

impl Ui {
    pub fn new(sink: impl ProgressSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    pub fn console() -> Self {
        Self::new(ConsoleSink::stdout())
    }

    pub fn simple_action(&self, title: &str) -> SimpleAction<'_> {
        SimpleAction {
            _scope: Scope::enter(self, ActionKind::Simple, title),
        }
    }

    pub fn framedump(&self, title: &str) -> FramedumpProgress<'_> {
        FramedumpProgress {
            scope: Scope::enter(self, ActionKind::Framedump, title),
        }
    }

    pub fn videoenc(&self, title: &str) -> VideoEncProgress<'_> {
        VideoEncProgress {
            scope: Scope::enter(self, ActionKind::VideoEnc, title),
        }
    }

    fn dispatch(&self, event: ProgressEvent) {
        self.sink.dispatch(event);
    }
}

impl Drop for Ui {
    fn drop(&mut self) {
        self.sink.close();
    }
}

struct Scope<'a> {
    ui: &'a Ui,
    kind: ActionKind,
}

impl<'a> Scope<'a> {
    fn enter(ui: &'a Ui, kind: ActionKind, title: &str) -> Self {
        ui.dispatch(ProgressEvent::Begin {
            kind,
            title: title.to_string(),
        });
        Self { ui, kind }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.ui.dispatch(ProgressEvent::Finish { kind: self.kind });
    }
}

pub struct SimpleAction<'a> {
    _scope: Scope<'a>,
}

pub struct FramedumpProgress<'a> {
    scope: Scope<'a>,
}

impl FramedumpProgress<'_> {
    pub fn update(&self, frame_no: u64, path: &Path) {
        self.scope.ui.dispatch(ProgressEvent::Frame {
            frame_no,
            path: path.to_path_buf(),
        });
    }
}

pub struct VideoEncProgress<'a> {
    scope: Scope<'a>,
}

impl VideoEncProgress<'_> {
    pub fn update(&self, message: &str) {
        self.scope
            .ui
            .dispatch(ProgressEvent::Message(message.to_string()));
    }
}

/// Records every event; handy for asserting on what the pipeline reported.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<ProgressEvent>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn dispatch(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
