//! One-time format announcement and activation shared by every chain feeding a sink

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::frame::{FrameMetadata, PixelFormat};
use crate::sink::FrameSink;

const UNNEGOTIATED: u8 = 0;
const NEGOTIATING: u8 = 1;
const NEGOTIATED: u8 = 2;

/// Observable negotiation state of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Unnegotiated,
    /// Another caller holds the claim and is talking to the sink
    Negotiating,
    Negotiated,
}

/// What the gate did for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// This call performed the transition
    JustNegotiated,
    /// Already negotiated with matching geometry
    Open,
    /// Already negotiated, but the frame's dimensions differ from the announced ones
    GeometryMismatch { negotiated: (u32, u32) },
    /// Another caller is negotiating right now
    Busy,
    /// Announcement or activation failed; will be retried on the next frame
    Failed,
}

/// `Unnegotiated -> Negotiated` state cell, transitioned by compare-and-swap
pub struct NegotiationGate {
    format: PixelFormat,
    state: AtomicU8,
    geometry: OnceCell<(u32, u32)>,
    /// Last mismatching geometry we warned about, packed as `width << 32 | height`
    last_mismatch: AtomicU64,
}

impl NegotiationGate {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            state: AtomicU8::new(UNNEGOTIATED),
            geometry: OnceCell::new(),
            last_mismatch: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> NegotiationState {
        match self.state.load(Ordering::Acquire) {
            UNNEGOTIATED => NegotiationState::Unnegotiated,
            NEGOTIATING => NegotiationState::Negotiating,
            _ => NegotiationState::Negotiated,
        }
    }

    /// Geometry announced downstream, once negotiated
    pub fn negotiated_geometry(&self) -> Option<(u32, u32)> {
        self.geometry.get().copied()
    }

    /// Run the negotiation step for one frame
    pub fn pass<S: FrameSink + ?Sized>(&self, sink: &S, meta: &FrameMetadata) -> GateStatus {
        match self.state.compare_exchange(
            UNNEGOTIATED,
            NEGOTIATING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => self.negotiate(sink, meta),
            Err(NEGOTIATING) => GateStatus::Busy,
            Err(_) => self.check_geometry(meta),
        }
    }

    /// Called only by the claim holder
    fn negotiate<S: FrameSink + ?Sized>(&self, sink: &S, meta: &FrameMetadata) -> GateStatus {
        let attempt = sink
            .negotiate(self.format, meta.width, meta.height)
            .and_then(|_| sink.activate());

        match attempt {
            Ok(()) => {
                let _ = self.geometry.set(meta.dimensions());
                self.state.store(NEGOTIATED, Ordering::Release);
                info!(
                    width = meta.width,
                    height = meta.height,
                    format = self.format.as_str(),
                    "Output negotiated, pipeline is PLAYING"
                );
                GateStatus::JustNegotiated
            }
            Err(e) => {
                self.state.store(UNNEGOTIATED, Ordering::Release);
                error!("Output negotiation failed: {}", e);
                GateStatus::Failed
            }
        }
    }

    fn check_geometry(&self, meta: &FrameMetadata) -> GateStatus {
        let Some(&negotiated) = self.geometry.get() else {
            return GateStatus::Open;
        };
        if negotiated == meta.dimensions() {
            return GateStatus::Open;
        }

        let key = (u64::from(meta.width) << 32) | u64::from(meta.height);
        if self.last_mismatch.swap(key, Ordering::Relaxed) != key {
            warn!(
                width = meta.width,
                height = meta.height,
                negotiated_width = negotiated.0,
                negotiated_height = negotiated.1,
                "Frame geometry differs from negotiated caps, forwarding anyway"
            );
        }
        GateStatus::GeometryMismatch { negotiated }
    }
}
