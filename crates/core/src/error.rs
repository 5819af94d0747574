use std::collections::TryReserveError;

/// Result alias that carries the custom [`SpectrumError`] type.
pub type Result<T> = std::result::Result<T, SpectrumError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    /// Free-form message, mostly surfaced by sinks and the application crate.
    #[error("{0}")]
    Message(String),
    /// An audio or video format outside of the supported range.
    #[error("unsupported format: {0}")]
    InvalidFormat(String),
    /// A precondition on the data handed to the pipeline was violated.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Samples were fed before an audio format was configured.
    #[error("no audio format configured")]
    NotConfigured,
    /// Slice storage or spectrum workspace could not be reserved.
    #[error("failed to allocate analysis workspace: {0}")]
    Allocation(#[from] TryReserveError),
    /// The transform rejected the workspace buffers.
    #[error("spectral transform failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// The output sink refused a rendered frame.
    #[error("output sink rejected frame: {0}")]
    Sink(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SpectrumError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SpectrumError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpectrumError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
