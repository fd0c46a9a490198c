#![forbid(unsafe_code)]

pub mod assets;
pub mod cli;
pub mod config;
pub mod encode_ffmpeg;
pub mod error;
pub mod framedump;
pub mod pipeline;
pub mod progress;
pub mod tool;

pub use cli::Cli;
pub use config::{ByteLimit, FrameSize, LabelChoice, OutputFormat, RenderConfig, UiChoice};
pub use error::{RenderError, RenderResult, Stage};
pub use pipeline::{check_example, render_example, run};
pub use progress::{ProgressEvent, ProgressSink, Ui};
