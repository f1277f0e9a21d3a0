//! Error types for the frame adaptation core and its collaborators

use thiserror::Error;

/// Per-frame failures. None of these stop the stream; the frame is dropped.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid geometry: {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("invalid buffer: {width}x{height}+{padding} {size} bytes")]
    InsufficientBufferSize {
        width: u32,
        height: u32,
        padding: u32,
        size: usize,
    },

    #[error("failed to allocate {bytes} bytes for packed frame")]
    AllocationFailure { bytes: usize },

    #[error("sink rejected frame: {0}")]
    PushRejected(#[source] SinkError),
}

impl FrameError {
    /// Short label used for the dropped-frames counter
    pub fn reason(&self) -> &'static str {
        match self {
            FrameError::InvalidGeometry { .. } => "invalid_geometry",
            FrameError::InsufficientBufferSize { .. } => "short_buffer",
            FrameError::AllocationFailure { .. } => "allocation",
            FrameError::PushRejected(_) => "push_rejected",
        }
    }
}

/// Failures reported by a [`crate::sink::FrameSink`]
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("failed to announce output format: {0}")]
    Negotiation(String),

    #[error("failed to activate pipeline: {0}")]
    Activation(String),

    #[error("push rejected: {0}")]
    Rejected(String),

    #[error("failed to stop pipeline: {0}")]
    Deactivation(String),
}

/// Failures talking to the producer SDK
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("failed to initialize chain runtime: {0}")]
    Initialize(String),

    #[error("failed to create chain #{index}: {reason}")]
    Create { index: usize, reason: String },

    #[error("failed to bind export stage `{stage}`: {reason}")]
    Bind { stage: String, reason: String },

    #[error("failed to execute command on chain: {0}")]
    Execute(String),

    #[error("string passed to chain runtime contains a NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),
}

/// Invalid adapter configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing `{0}` section")]
    MissingSection(&'static str),

    #[error("section `{0}` must be an array")]
    NotAnArray(&'static str),

    #[error("section `chains` must contain exactly one element, found {0}")]
    ChainCount(usize),

    #[error("invalid settings: {0}")]
    Settings(#[from] config::ConfigError),
}
