pub mod api;
pub mod manager;
pub mod router;
pub mod runtime;

#[cfg(feature = "iff-sdk")]
pub mod iff;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ChainApi, ChainHandle, ChainId, ErrorCallback, ExportCallback, ImageMetadata};
pub use manager::{enable_export_command, ChainLifecycleManager, DEFAULT_EXPORT_STAGE};
pub use router::ChainContext;
pub use runtime::RuntimeHandle;

#[cfg(feature = "iff-sdk")]
pub use iff::IffSdk;
