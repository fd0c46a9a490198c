use std::fmt;

pub type RenderResult<T> = Result<T, RenderError>;

/// Which external process a launch failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Encode,
}

impl Stage {
    pub fn exit_code(self) -> u8 {
        match self {
            Stage::Capture => 1,
            Stage::Encode => 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Capture => f.write_str("capture"),
            Stage::Encode => f.write_str("encode"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("Failed to execute '{command}': {source}")]
    Launch {
        stage: Stage,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Tool(String),

    #[error("conversion of the first frame '{path}' failed: {reason}")]
    FirstFrame { path: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    pub fn launch(stage: Stage, command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            stage,
            command: command.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RenderError::Launch { stage, .. } => stage.exit_code(),
            _ => 1,
        }
    }
}
