//! Boundary to the frame-producing chain runtime

use std::fmt;

use libc::{c_char, c_int, c_void};

use crate::error::ChainError;
use crate::frame::FrameMetadata;

/// Geometry block handed to the export callback
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
}

impl From<ImageMetadata> for FrameMetadata {
    fn from(meta: ImageMetadata) -> Self {
        FrameMetadata::new(meta.width, meta.height, meta.padding)
    }
}

/// `(data, size, metadata, context)`, invoked once per produced frame
pub type ExportCallback =
    unsafe extern "C" fn(*const c_void, usize, *mut ImageMetadata, *mut c_void);

/// `(element_name, error_code, context)`, invoked when a chain element faults
pub type ErrorCallback = unsafe extern "C" fn(*const c_char, c_int, *mut c_void);

/// Opaque handle of a created chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainHandle(pub usize);

/// Position of a chain in the configuration, used to tag its logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub usize);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operations the adapter needs from the chain runtime.
///
/// Configuration and command documents are JSON strings passed through verbatim.
pub trait ChainApi: Send + Sync {
    /// Process-wide setup; must precede every other call
    fn initialize(&self, runtime_config: &str) -> Result<(), ChainError>;

    /// Process-wide teardown; called after every chain has been released
    fn finalize(&self);

    /// Create a chain reporting element faults through `on_error`.
    ///
    /// # Safety
    /// `context` must stay valid until the chain has been released.
    unsafe fn create_chain(
        &self,
        config: &str,
        on_error: ErrorCallback,
        context: *mut c_void,
    ) -> Result<ChainHandle, ChainError>;

    /// Route frames of the export stage `stage` to `callback`.
    ///
    /// # Safety
    /// `context` must stay valid until the chain has been released.
    unsafe fn set_export_callback(
        &self,
        chain: ChainHandle,
        stage: &str,
        callback: ExportCallback,
        context: *mut c_void,
    ) -> Result<(), ChainError>;

    fn execute(&self, chain: ChainHandle, command: &str) -> Result<(), ChainError>;

    /// Release a chain. No callback for it may fire once this returns.
    fn release_chain(&self, chain: ChainHandle);
}

impl<T: ChainApi + ?Sized> ChainApi for std::sync::Arc<T> {
    fn initialize(&self, runtime_config: &str) -> Result<(), ChainError> {
        (**self).initialize(runtime_config)
    }

    fn finalize(&self) {
        (**self).finalize()
    }

    unsafe fn create_chain(
        &self,
        config: &str,
        on_error: ErrorCallback,
        context: *mut c_void,
    ) -> Result<ChainHandle, ChainError> {
        unsafe { (**self).create_chain(config, on_error, context) }
    }

    unsafe fn set_export_callback(
        &self,
        chain: ChainHandle,
        stage: &str,
        callback: ExportCallback,
        context: *mut c_void,
    ) -> Result<(), ChainError> {
        unsafe { (**self).set_export_callback(chain, stage, callback, context) }
    }

    fn execute(&self, chain: ChainHandle, command: &str) -> Result<(), ChainError> {
        (**self).execute(chain, command)
    }

    fn release_chain(&self, chain: ChainHandle) {
        (**self).release_chain(chain)
    }
}
