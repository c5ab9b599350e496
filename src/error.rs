//! Error types for the conversion service.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the conversion service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A format name (or alias) is not in the registry.
    #[error("unknown format: {name}")]
    UnknownFormat { name: String },

    /// Both formats are known but no conversion rule connects them.
    #[error("unsupported conversion: {input} -> {output}")]
    UnsupportedConversion { input: String, output: String },

    /// The registry data itself is invalid.
    #[error("invalid format registry: {0}")]
    InvalidRegistry(String),

    /// A job token is unknown or its record has expired.
    #[error("invalid token or no job found")]
    InvalidToken,

    /// A result is absent, its file is gone, or it has expired.
    #[error("result not found")]
    NotFound,

    /// A converter failed; see [`recast_engines::Error`] for the cause.
    #[error(transparent)]
    Engine(#[from] recast_engines::Error),

    /// The job queue is no longer accepting work.
    #[error("job queue is closed")]
    QueueClosed,

    /// Artifact storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A job record could not be serialized or deserialized.
    #[error("record serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unknown format error.
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }

    /// Create an unsupported conversion error.
    pub fn unsupported_conversion(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self::UnsupportedConversion {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Whether a retry of the failed job attempt may succeed.
    ///
    /// Engine errors carry their own classification. Storage errors are
    /// retried with the attempt that produced them; everything else is a
    /// property of the request and will not change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_transient(),
            Self::Storage(_) => true,
            _ => false,
        }
    }
}
