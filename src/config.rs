use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context as _;

use crate::error::{RenderError, RenderResult};

pub const DEFAULT_FRAME_SIZE: FrameSize = FrameSize {
    width: 852,
    height: 480,
};
pub const HALF_HD: FrameSize = FrameSize {
    width: 640,
    height: 360,
};
pub const HD: FrameSize = FrameSize {
    width: 1280,
    height: 720,
};
pub const FULL_HD: FrameSize = FrameSize {
    width: 1920,
    height: 1080,
};

pub const TWITTER_FRAME_SIZE: FrameSize = FrameSize {
    width: 420,
    height: 240,
};
pub const TWITTER_FPS: u32 = 24;
pub const TWITTER_SCALE: u32 = 2;
pub const TWITTER_MAX_BYTES: &str = "14500k";

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// `None` when either dimension overflows.
    pub fn scaled(self, factor: u32) -> Option<Self> {
        Some(Self {
            width: self.width.checked_mul(factor)?,
            height: self.height.checked_mul(factor)?,
        })
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            RenderError::validation(format!(
                "'{s}' is not a valid frame dimension specification"
            ))
        };
        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// A byte count with an optional `k`/`M`/`G` suffix, passed to ffmpeg's `-fs` verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteLimit {
    pub value: u64,
    pub suffix: Option<char>,
}

impl fmt::Display for ByteLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(suffix) = self.suffix {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}

impl FromStr for ByteLimit {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || RenderError::validation(format!("'{s}' is not a valid file size specification"));
        let (digits, suffix) = match s.chars().last() {
            Some(c @ ('k' | 'M' | 'G')) => (&s[..s.len() - 1], Some(c)),
            _ => (s, None),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = digits.parse().map_err(|_| invalid())?;
        Ok(Self { value, suffix })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Avi,
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Avi => "avi",
            OutputFormat::Gif => "gif",
        }
    }
}

/// Where the per-example overlay text comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LabelChoice {
    Explicit(String),
    Version,
    #[default]
    ExampleName,
}

/// Which progress presentation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UiChoice {
    /// Use the progress window when one can be opened, else the console.
    #[default]
    Auto,
    Console,
    Window,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub build_dir: PathBuf,
    pub root_dir: PathBuf,
    pub logo: PathBuf,
    pub frame_size: FrameSize,
    pub render_scale: u32,
    pub fps: u32,
    pub samples: u32,
    pub max_bytes: Option<ByteLimit>,
    pub format: OutputFormat,
    pub label: LabelChoice,
    pub example: PathBuf,
    pub example_args: Vec<String>,
    pub convert_program: OsString,
    pub ffmpeg_program: OsString,
    pub ui: UiChoice,
}

impl RenderConfig {
    pub fn new(build_dir: impl Into<PathBuf>, example: impl Into<PathBuf>) -> Self {
        let root_dir = default_root_dir();
        Self {
            build_dir: build_dir.into(),
            logo: default_logo(&root_dir),
            root_dir,
            frame_size: DEFAULT_FRAME_SIZE,
            render_scale: 1,
            fps: 30,
            samples: 0,
            max_bytes: None,
            format: OutputFormat::Avi,
            label: LabelChoice::ExampleName,
            example: example.into(),
            example_args: Vec::new(),
            convert_program: OsString::from("convert"),
            ffmpeg_program: OsString::from("ffmpeg"),
            ui: UiChoice::Auto,
        }
    }

    /// Forces the small, size-capped GIF preset, overriding size, fps, scale and byte cap.
    pub fn apply_twitter_gif(&mut self) {
        self.format = OutputFormat::Gif;
        self.frame_size = TWITTER_FRAME_SIZE;
        self.fps = TWITTER_FPS;
        self.render_scale = TWITTER_SCALE;
        self.max_bytes = TWITTER_MAX_BYTES.parse().ok();
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.frame_size.width == 0 || self.frame_size.height == 0 {
            return Err(RenderError::validation("frame width/height must be non-zero"));
        }
        if self.render_scale == 0 {
            return Err(RenderError::validation("render scale must be non-zero"));
        }
        if self.fps == 0 {
            return Err(RenderError::validation("fps must be non-zero"));
        }
        if self.example.as_os_str().is_empty() {
            return Err(RenderError::validation("example path must not be empty"));
        }
        self.capture_size()?;
        Ok(())
    }

    /// Resolution the example renders at before downscaling.
    pub fn capture_size(&self) -> RenderResult<FrameSize> {
        self.frame_size.scaled(self.render_scale).ok_or_else(|| {
            RenderError::validation(format!(
                "frame size {} scaled by {} is too large",
                self.frame_size, self.render_scale
            ))
        })
    }

    /// Logical example name: the example's file name without its extension.
    pub fn example_name(&self) -> String {
        self.example
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn example_path(&self) -> PathBuf {
        self.build_dir.join(&self.example)
    }

    pub fn output_file_name(&self) -> String {
        format!("oglplus-{}.{}", self.example_name(), self.format.extension())
    }

    /// Text for the per-example overlay.
    pub fn resolve_label(&self) -> RenderResult<String> {
        match &self.label {
            LabelChoice::Explicit(label) => Ok(label.clone()),
            LabelChoice::Version => read_version(&self.root_dir),
            LabelChoice::ExampleName => Ok(self.example_name()),
        }
    }
}

fn read_version(root_dir: &Path) -> RenderResult<String> {
    let path = root_dir.join("VERSION");
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read version file '{}'", path.display()))?;
    Ok(text.lines().next().unwrap_or_default().trim().to_string())
}

/// Installation root: the parent of the directory holding the running executable.
pub fn default_root_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_logo(root_dir: &Path) -> PathBuf {
    root_dir.join("doc").join("logo").join("oglplus_circular.png")
}

/// Default build directory from the process environment and `root_dir`.
pub fn default_build_dir(root_dir: &Path) -> PathBuf {
    default_build_dir_from(
        root_dir,
        std::env::var_os("BUILD_DIR"),
        std::env::var_os("BINARY_DIR"),
    )
}

pub fn default_build_dir_from(
    root_dir: &Path,
    build_dir_env: Option<OsString>,
    binary_dir_env: Option<OsString>,
) -> PathBuf {
    let non_empty = |v: Option<OsString>| v.filter(|v| !v.is_empty());
    if let Some(dir) = non_empty(build_dir_env).or_else(|| non_empty(binary_dir_env)) {
        return Path::new(&dir).join("oglplu2");
    }
    match std::fs::read_to_string(root_dir.join("BINARY_DIR")) {
        Ok(text) if !text.trim().is_empty() => PathBuf::from(text.trim()),
        _ => root_dir.join("_build"),
    }
}
