//! Frame adaptation between IFF processing chains and a GStreamer appsrc.
//!
//! Chains deliver padded RGBA frames through an export callback; every frame is
//! repacked without row padding and pushed into one shared sink, which is
//! negotiated and activated on the first frame.

pub mod chain;
pub mod config;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod session;
pub mod sink;

pub use config::{AdapterDocument, Settings};
pub use error::{ChainError, ConfigError, FrameError, SinkError};
pub use frame::{FrameMetadata, PackedFrame, PixelFormat, RawFrame, BYTES_PER_PIXEL};
pub use pipeline::{FrameForwarder, SinkHandle};
pub use sink::FrameSink;
