//! Lock-free forwarding statistics

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;
use metrics::counter;

use crate::error::FrameError;

#[derive(Default)]
struct Counters {
    forwarded: AtomicU64,
    dropped: AtomicU64,
    negotiation_failures: AtomicU64,
    geometry_mismatches: AtomicU64,
}

/// Per-sink counters, shared by every chain feeding the sink
#[derive(Default)]
pub struct ForwardStats {
    counters: CachePadded<Counters>,
}

/// Point-in-time copy of [`ForwardStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_forwarded: u64,
    pub frames_dropped: u64,
    pub negotiation_failures: u64,
    pub geometry_mismatches: u64,
}

impl ForwardStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_forwarded(&self) {
        self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
        counter!("streamadapter_frames_forwarded_total").increment(1);
    }

    pub(crate) fn record_dropped(&self, err: &FrameError) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        counter!("streamadapter_frames_dropped_total", "reason" => err.reason()).increment(1);
    }

    pub(crate) fn record_negotiation_failure(&self) {
        self.counters
            .negotiation_failures
            .fetch_add(1, Ordering::Relaxed);
        counter!("streamadapter_negotiation_failures_total").increment(1);
    }

    pub(crate) fn record_geometry_mismatch(&self) {
        self.counters
            .geometry_mismatches
            .fetch_add(1, Ordering::Relaxed);
        counter!("streamadapter_geometry_mismatches_total").increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_forwarded: self.counters.forwarded.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
            negotiation_failures: self.counters.negotiation_failures.load(Ordering::Relaxed),
            geometry_mismatches: self.counters.geometry_mismatches.load(Ordering::Relaxed),
        }
    }
}
