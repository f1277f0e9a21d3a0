//! Per-frame body: negotiate once, pack, push

use std::sync::Arc;

use tracing::{error, warn};

use crate::error::FrameError;
use crate::frame::{PixelFormat, RawFrame};
use crate::pipeline::gate::{GateStatus, NegotiationGate};
use crate::pipeline::packer::{pack_rows_into, reserve_exact, Reserve};
use crate::pipeline::stats::ForwardStats;
use crate::sink::FrameSink;

/// The single sink together with the state every chain shares about it
pub struct SinkHandle<S> {
    sink: S,
    gate: NegotiationGate,
    stats: ForwardStats,
}

impl<S: FrameSink> SinkHandle<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            gate: NegotiationGate::new(PixelFormat::Rgba),
            stats: ForwardStats::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn gate(&self) -> &NegotiationGate {
        &self.gate
    }

    pub fn stats(&self) -> &ForwardStats {
        &self.stats
    }

    /// Signal end-of-stream and stop the sink. Call only once no chain can deliver frames.
    pub fn finish(&self) {
        if let Err(e) = self.sink.end_of_stream() {
            warn!("Failed to send end-of-stream: {}", e);
        }
        if let Err(e) = self.sink.deactivate() {
            error!("{}", e);
        }
    }
}

/// Forwards frames of one chain into the shared sink
pub struct FrameForwarder<S> {
    target: Arc<SinkHandle<S>>,
    reserve: Reserve,
}

impl<S> Clone for FrameForwarder<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            reserve: self.reserve,
        }
    }
}

impl<S: FrameSink> FrameForwarder<S> {
    pub fn new(target: Arc<SinkHandle<S>>) -> Self {
        Self {
            target,
            reserve: reserve_exact,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_reserve(target: Arc<SinkHandle<S>>, reserve: Reserve) -> Self {
        Self { target, reserve }
    }

    pub fn target(&self) -> &Arc<SinkHandle<S>> {
        &self.target
    }

    /// Process one delivered frame. Errors are already logged and counted when returned.
    pub fn forward(&self, frame: RawFrame<'_>) -> Result<(), FrameError> {
        let result = self.try_forward(frame);
        match &result {
            Ok(()) => self.target.stats.record_forwarded(),
            Err(err) => {
                match err {
                    FrameError::InvalidGeometry { .. } | FrameError::InsufficientBufferSize { .. } => {
                        warn!("Ignoring {}", err)
                    }
                    FrameError::AllocationFailure { .. } | FrameError::PushRejected(_) => {
                        error!("Dropping frame: {}", err)
                    }
                }
                self.target.stats.record_dropped(err);
            }
        }
        result
    }

    fn try_forward(&self, frame: RawFrame<'_>) -> Result<(), FrameError> {
        let meta = frame.meta;
        meta.validate()?;

        // A failed negotiation does not drop the frame
        match self.target.gate.pass(&self.target.sink, &meta) {
            GateStatus::Failed => self.target.stats.record_negotiation_failure(),
            GateStatus::GeometryMismatch { .. } => self.target.stats.record_geometry_mismatch(),
            GateStatus::JustNegotiated | GateStatus::Open | GateStatus::Busy => {}
        }

        let packed = pack_rows_into(frame, self.reserve)?;
        self.target
            .sink
            .push(packed)
            .map_err(FrameError::PushRejected)
    }
}
