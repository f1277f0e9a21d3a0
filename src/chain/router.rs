//! `extern "C"` entry points that route chain callbacks to their forwarder

use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};

use libc::{c_char, c_int, c_void};
use tracing::{debug_span, error, warn};

use crate::chain::api::{ChainId, ErrorCallback, ExportCallback, ImageMetadata};
use crate::frame::{FrameMetadata, RawFrame};
use crate::pipeline::FrameForwarder;
use crate::sink::FrameSink;

/// Everything a chain's callbacks need, passed to the runtime by address
pub struct ChainContext<S> {
    id: ChainId,
    forwarder: FrameForwarder<S>,
}

impl<S: FrameSink> ChainContext<S> {
    pub fn new(id: ChainId, forwarder: FrameForwarder<S>) -> Self {
        Self { id, forwarder }
    }

    pub fn on_frame(&self, data: &[u8], meta: FrameMetadata) {
        let _span = debug_span!("chain", id = self.id.0).entered();
        // Already logged and counted by the forwarder
        let _ = self.forwarder.forward(RawFrame::new(data, meta));
    }

    pub fn on_element_error(&self, element: &str, code: i32) {
        error!(
            chain = %self.id,
            element,
            code,
            "Chain element `{}` reported an error: {}",
            element,
            code
        );
    }
}

/// Export callback to register for chains bound to a `ChainContext<S>`
pub fn export_callback<S: FrameSink>() -> ExportCallback {
    export_trampoline::<S>
}

/// Error callback to register for chains bound to a `ChainContext<S>`
pub fn error_callback<S: FrameSink>() -> ErrorCallback {
    error_trampoline::<S>
}

unsafe extern "C" fn export_trampoline<S: FrameSink>(
    data: *const c_void,
    size: usize,
    metadata: *mut ImageMetadata,
    context: *mut c_void,
) {
    if context.is_null() {
        return;
    }
    // SAFETY: the context was registered by ChainLifecycleManager and outlives the chain
    let context = unsafe { &*(context as *const ChainContext<S>) };

    if data.is_null() || metadata.is_null() {
        warn!(chain = %context.id, "Ignoring export callback without data or metadata");
        return;
    }

    // SAFETY: the runtime guarantees both are valid for the duration of this call
    let (bytes, meta) = unsafe {
        (
            std::slice::from_raw_parts(data as *const u8, size),
            FrameMetadata::from(*metadata),
        )
    };

    if catch_unwind(AssertUnwindSafe(|| context.on_frame(bytes, meta))).is_err() {
        error!(chain = %context.id, "Panic while forwarding frame");
    }
}

unsafe extern "C" fn error_trampoline<S: FrameSink>(
    element_name: *const c_char,
    error_code: c_int,
    context: *mut c_void,
) {
    let element = if element_name.is_null() {
        "<unknown>".into()
    } else {
        // SAFETY: the runtime passes a NUL-terminated name valid for this call
        unsafe { CStr::from_ptr(element_name) }.to_string_lossy()
    };

    let _ = catch_unwind(AssertUnwindSafe(|| {
        if context.is_null() {
            error!(
                "Chain element `{}` reported an error: {}",
                element, error_code
            );
        } else {
            // SAFETY: see export_trampoline
            let context = unsafe { &*(context as *const ChainContext<S>) };
            context.on_element_error(&element, error_code);
        }
    }));
}
