use thiserror::Error;

use histvault_core::{ConfigError, MaintainerError, SourceError, StoreError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("upstream fetch for series '{series}' failed: {source}")]
    Source { series: String, source: SourceError },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Source { .. } => 3,
            Self::Store(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

impl From<MaintainerError> for CliError {
    fn from(value: MaintainerError) -> Self {
        match value {
            MaintainerError::Validation(error) => Self::Validation(error),
            MaintainerError::Source { series, source } => Self::Source { series, source },
            MaintainerError::Store(error) => Self::Store(error),
        }
    }
}
