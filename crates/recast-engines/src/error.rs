//! Error types for recast-engines.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversion engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required engine binary is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An engine subprocess exited with a failure status.
    #[error("engine failed: {tool}: {message}")]
    EngineFailed { tool: String, message: String },

    /// An engine subprocess exceeded its execution timeout.
    #[error("engine timed out: {tool} after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    /// Input bytes could not be decoded as the declared format.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// Output could not be encoded in the requested format.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// An engine produced no usable output file, or an ambiguous set.
    #[error("unusable engine output: {tool}: {message}")]
    BadOutput { tool: String, message: String },

    /// The request cannot be handled by this converter.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Scratch directory setup failed.
    #[error("scratch error: {0}")]
    Scratch(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create an engine failed error.
    pub fn engine_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an engine timeout error.
    pub fn timeout(tool: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            tool: tool.into(),
            timeout_secs,
        }
    }

    /// Create a decode failed error.
    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    /// Create an encode failed error.
    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed(message.into())
    }

    /// Create a bad output error.
    pub fn bad_output(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadOutput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported request error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Whether the failure may succeed on a retry.
    ///
    /// Subprocess failures, timeouts, and I/O errors are worth retrying;
    /// undecodable input, a missing binary, or an ambiguous output set will
    /// fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::EngineFailed { .. } | Self::Timeout { .. } | Self::Io(_) | Self::Scratch(_)
        )
    }
}
