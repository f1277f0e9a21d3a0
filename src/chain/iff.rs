//! Binding to the IFF SDK C API

use std::ffi::{CStr, CString};

use libc::{c_char, c_void};
use tracing::debug;

use crate::chain::api::{ChainApi, ChainHandle, ErrorCallback, ExportCallback};
use crate::error::ChainError;

#[allow(non_camel_case_types)]
type iff_chain_handle_t = *mut c_void;

#[allow(non_camel_case_types)]
type iff_result_callback_t = unsafe extern "C" fn(*const c_char, *mut c_void);

#[link(name = "iff")]
extern "C" {
    fn iff_initialize(config: *const c_char);
    fn iff_finalize();
    fn iff_create_chain(
        config: *const c_char,
        error_callback: ErrorCallback,
        private_data: *mut c_void,
    ) -> iff_chain_handle_t;
    fn iff_release_chain(chain: iff_chain_handle_t);
    fn iff_set_export_callback(
        chain: iff_chain_handle_t,
        exporter_name: *const c_char,
        callback: ExportCallback,
        private_data: *mut c_void,
    );
    fn iff_execute(
        chain: iff_chain_handle_t,
        command: *const c_char,
        callback: iff_result_callback_t,
        private_data: *mut c_void,
    );
}

unsafe extern "C" fn log_command_result(result: *const c_char, _private_data: *mut c_void) {
    if !result.is_null() {
        // SAFETY: the SDK passes a NUL-terminated string valid for this call
        let result = unsafe { CStr::from_ptr(result) }.to_string_lossy();
        debug!("Chain command result: {}", result);
    }
}

fn raw(chain: ChainHandle) -> iff_chain_handle_t {
    chain.0 as iff_chain_handle_t
}

/// The process-wide IFF SDK
pub struct IffSdk;

impl ChainApi for IffSdk {
    fn initialize(&self, runtime_config: &str) -> Result<(), ChainError> {
        let config = CString::new(runtime_config)?;
        unsafe { iff_initialize(config.as_ptr()) };
        Ok(())
    }

    fn finalize(&self) {
        unsafe { iff_finalize() };
    }

    unsafe fn create_chain(
        &self,
        config: &str,
        on_error: ErrorCallback,
        context: *mut c_void,
    ) -> Result<ChainHandle, ChainError> {
        let config = CString::new(config)?;
        let handle = unsafe { iff_create_chain(config.as_ptr(), on_error, context) };
        if handle.is_null() {
            return Err(ChainError::Create {
                index: 0,
                reason: "iff_create_chain returned a null handle".into(),
            });
        }
        Ok(ChainHandle(handle as usize))
    }

    unsafe fn set_export_callback(
        &self,
        chain: ChainHandle,
        stage: &str,
        callback: ExportCallback,
        context: *mut c_void,
    ) -> Result<(), ChainError> {
        let stage = CString::new(stage)?;
        unsafe { iff_set_export_callback(raw(chain), stage.as_ptr(), callback, context) };
        Ok(())
    }

    fn execute(&self, chain: ChainHandle, command: &str) -> Result<(), ChainError> {
        let command = CString::new(command)?;
        unsafe {
            iff_execute(
                raw(chain),
                command.as_ptr(),
                log_command_result,
                std::ptr::null_mut(),
            )
        };
        Ok(())
    }

    fn release_chain(&self, chain: ChainHandle) {
        unsafe { iff_release_chain(raw(chain)) };
    }
}
