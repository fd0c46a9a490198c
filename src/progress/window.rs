//! Progress window built on eframe.
//!
//! The event loop owns the calling (main) thread; the render job runs on a
//! scoped worker thread and reports through a channel that the window drains
//! on every repaint. The window never touches pipeline state and the pipeline
//! never touches window state.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    time::Duration,
};

use eframe::egui;

use super::{ActionKind, ConsoleSink, ProgressEvent, ProgressSink, Ui};
use crate::config::FrameSize;

const PULSE_STEPS: u32 = 24;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Static facts shown at the top of the window.
#[derive(Clone, Debug)]
pub struct WindowInfo {
    pub example_name: String,
    pub work_dir: PathBuf,
    pub build_dir: PathBuf,
    pub example: PathBuf,
    pub frame_size: FrameSize,
}

pub enum SinkMessage {
    Event(ProgressEvent),
    Close,
}

/// Forwards events to the window's context.
pub struct ChannelSink {
    tx: Sender<SinkMessage>,
}

impl ChannelSink {
    pub fn new(tx: Sender<SinkMessage>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn dispatch(&self, event: ProgressEvent) {
        // The window may already be gone; progress is best effort.
        let _ = self.tx.send(SinkMessage::Event(event));
    }

    fn close(&self) {
        let _ = self.tx.send(SinkMessage::Close);
    }
}

/// Returns whether a window can plausibly be opened in this environment.
pub fn display_available() -> bool {
    if cfg!(all(unix, not(target_os = "macos"))) {
        ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    } else {
        true
    }
}

/// Runs `job` on a worker thread while the progress window runs here.
///
/// If the window cannot be created, the job's events are replayed on the console instead.
pub fn run_with_window<R, F>(info: WindowInfo, job: F) -> R
where
    R: Send,
    F: FnOnce(&Ui) -> R + Send,
{
    let (tx, rx) = mpsc::channel();
    let rx = Arc::new(Mutex::new(rx));

    std::thread::scope(|s| {
        let worker = s.spawn(move || {
            let ui = Ui::new(ChannelSink::new(tx));
            job(&ui)
        });

        let title = format!("Rendering video of '{}'", info.example_name);
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([400.0, 170.0])
                .with_resizable(false)
                .with_title(title.clone()),
            ..Default::default()
        };

        let app_rx = Arc::clone(&rx);
        let shown = eframe::run_native(
            &title,
            options,
            Box::new(move |_cc| Ok(Box::new(ProgressWindow::new(info, app_rx)))),
        );

        if let Err(e) = shown {
            tracing::warn!("progress window unavailable, using console: {e}");
            replay_to_console(&rx);
        }

        tracing::debug!("waiting for render worker");
        match worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

fn replay_to_console(rx: &Mutex<Receiver<SinkMessage>>) {
    let Ok(rx) = rx.lock() else {
        return;
    };
    let console = ConsoleSink::stdout();
    for message in rx.iter() {
        match message {
            SinkMessage::Event(event) => console.dispatch(event),
            SinkMessage::Close => break,
        }
    }
}

struct ProgressWindow {
    info: WindowInfo,
    rx: Arc<Mutex<Receiver<SinkMessage>>>,
    status: String,
    description: String,
    pulses: u32,
    closing: bool,
}

impl ProgressWindow {
    fn new(info: WindowInfo, rx: Arc<Mutex<Receiver<SinkMessage>>>) -> Self {
        Self {
            info,
            rx,
            status: "Starting".to_string(),
            description: String::new(),
            pulses: 0,
            closing: false,
        }
    }

    fn drain(&mut self) {
        let Ok(rx) = self.rx.lock() else {
            self.closing = true;
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(SinkMessage::Event(event)) => {
                    self.pulses = self.pulses.wrapping_add(1);
                    match event {
                        ProgressEvent::Begin { title, .. } => self.status = title,
                        ProgressEvent::Frame { frame_no, .. } => {
                            self.description = format!("Frame number: {frame_no}");
                        }
                        ProgressEvent::Message(message) => self.description = message,
                        ProgressEvent::Finish {
                            kind: ActionKind::Simple,
                        } => {}
                        ProgressEvent::Finish { .. } => self.description.clear(),
                    }
                }
                Ok(SinkMessage::Close) | Err(TryRecvError::Disconnected) => {
                    self.closing = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
    }

    fn pulse_phase(&self) -> f32 {
        (self.pulses % PULSE_STEPS) as f32 / PULSE_STEPS as f32
    }
}

impl eframe::App for ProgressWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain();
        if self.closing {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.status.as_str());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(format!("Work directory: '{}'", self.info.work_dir.display()));
            ui.label(format!("Bin directory: '{}'", self.info.build_dir.display()));
            ui.label(format!("Example: '{}'", self.info.example.display()));
            ui.label(format!("Frame size: {}", self.info.frame_size));
            ui.add_space(4.0);
            ui.add(egui::ProgressBar::new(self.pulse_phase()).animate(true));
            ui.add_space(4.0);
            ui.label(self.description.as_str());
        });

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}
