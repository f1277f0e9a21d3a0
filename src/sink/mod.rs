//! Downstream consumer of packed frames

#[cfg(feature = "gstreamer-pipeline")]
pub mod appsrc;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::SinkError;
use crate::frame::{PackedFrame, PixelFormat};

#[cfg(feature = "gstreamer-pipeline")]
pub use appsrc::AppSrcSink;

/// A push-style consumer shared by every producer chain.
///
/// All methods take `&self`: callbacks from several chains may call into the
/// same sink concurrently.
pub trait FrameSink: Send + Sync {
    /// Announce the output format and geometry
    fn negotiate(&self, format: PixelFormat, width: u32, height: u32) -> Result<(), SinkError>;

    /// Move the downstream pipeline into its running state
    fn activate(&self) -> Result<(), SinkError>;

    /// Hand a packed frame over to the sink
    fn push(&self, frame: PackedFrame) -> Result<(), SinkError>;

    fn end_of_stream(&self) -> Result<(), SinkError>;

    fn deactivate(&self) -> Result<(), SinkError>;
}
