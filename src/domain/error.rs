//! Domain error types.
//!
//! Per-tick numeric failures never surface here: an index that cannot
//! compute a value emits null for that tick. These errors cover wiring and
//! configuration mistakes made by the collaborators that build the graph.

/// Top-level error type for tickdesk.
#[derive(Debug, thiserror::Error)]
pub enum TickdeskError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown index type: {name}")]
    UnknownIndex { name: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("invalid parameter {param} for {index}: {reason}")]
    InvalidParam {
        index: String,
        param: String,
        reason: String,
    },

    #[error("unknown stream: {reference}")]
    UnknownStream { reference: String },

    #[error("tick parse error at line {line}: {reason}")]
    TickParse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TickdeskError {
    /// Process exit status reported by the binary for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            TickdeskError::Io(_) => 1,
            TickdeskError::ConfigParse { .. }
            | TickdeskError::ConfigMissing { .. }
            | TickdeskError::ConfigInvalid { .. } => 2,
            TickdeskError::UnknownIndex { .. }
            | TickdeskError::UnknownStrategy { .. }
            | TickdeskError::InvalidParam { .. }
            | TickdeskError::UnknownStream { .. } => 3,
            TickdeskError::TickParse { .. } => 4,
        }
    }
}

impl From<&TickdeskError> for std::process::ExitCode {
    fn from(err: &TickdeskError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
