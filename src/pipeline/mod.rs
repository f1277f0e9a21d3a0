pub mod forwarder;
pub mod gate;
pub mod packer;
pub mod stats;

pub use forwarder::{FrameForwarder, SinkHandle};
pub use gate::{GateStatus, NegotiationGate, NegotiationState};
pub use packer::pack_rows;
pub use stats::{ForwardStats, StatsSnapshot};
