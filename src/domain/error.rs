//! Domain error types.

/// Top-level error type for tdxtrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no data file for asset {name}")]
    NotFound { name: String },

    #[error("unsupported file extension {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("empty asset {name}")]
    EmptyAsset { name: String },

    #[error("read failed at record #{index}: {source}")]
    ReadFailed {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record #{index}: {reason}")]
    CorruptRecord { index: u64, reason: String },

    #[error("sequence length mismatch after {paired} pairs: {shorter} input ended first")]
    LengthMismatch { paired: usize, shorter: String },

    #[error("{stage} producer panicked")]
    ProducerPanicked { stage: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },
}

impl TraderError {
    /// Errors that end a sequence early but leave the consumer with valid
    /// partial results.
    pub fn is_mid_stream(&self) -> bool {
        matches!(
            self,
            TraderError::ReadFailed { .. }
                | TraderError::CorruptRecord { .. }
                | TraderError::LengthMismatch { .. }
                | TraderError::ProducerPanicked { .. }
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::ReadFailed { .. } => 1,
            TraderError::ConfigParse { .. } | TraderError::ConfigInvalid { .. } => 2,
            TraderError::NotFound { .. } | TraderError::EmptyAsset { .. } => 3,
            TraderError::UnsupportedFormat { .. } | TraderError::UnsupportedOperation { .. } => 4,
            TraderError::CorruptRecord { .. }
            | TraderError::LengthMismatch { .. }
            | TraderError::ProducerPanicked { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
