//! In-process stand-in for the chain runtime that drives the real trampolines

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::Mutex;

use libc::c_void;

use crate::chain::api::{ChainApi, ChainHandle, ErrorCallback, ExportCallback, ImageMetadata};
use crate::error::ChainError;
use crate::sink::testing::{EventLog, SinkEvent};

struct FakeChain {
    config: String,
    on_error: ErrorCallback,
    // Pointers kept as addresses so the fake stays Send + Sync
    error_context: usize,
    export: Option<(String, ExportCallback, usize)>,
    commands: Vec<String>,
    released: bool,
}

#[derive(Default)]
struct FakeState {
    initialized: bool,
    next_handle: usize,
    chains: HashMap<ChainHandle, FakeChain>,
    released: Vec<ChainHandle>,
    fail_creation: bool,
    fail_stage: Option<String>,
}

#[derive(Default)]
pub struct FakeChainApi {
    state: Mutex<FakeState>,
    log: EventLog,
}

impl FakeChainApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an event log with a `RecordingSink` to observe cross-component ordering
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_creation(&self) {
        self.state.lock().unwrap().fail_creation = true;
    }

    pub fn fail_export_binding(&self, stage: &str) {
        self.state.lock().unwrap().fail_stage = Some(stage.to_owned());
    }

    pub fn chain_config(&self, handle: ChainHandle) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.chains.get(&handle).map(|chain| chain.config.clone())
    }

    pub fn export_stage(&self, handle: ChainHandle) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .chains
            .get(&handle)
            .and_then(|chain| chain.export.as_ref().map(|(stage, _, _)| stage.clone()))
    }

    pub fn commands(&self, handle: ChainHandle) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .chains
            .get(&handle)
            .map(|chain| chain.commands.clone())
            .unwrap_or_default()
    }

    pub fn released(&self) -> Vec<ChainHandle> {
        self.state.lock().unwrap().released.clone()
    }

    /// Invoke the chain's export callback like the runtime would.
    /// Returns false when the chain is released or has no export binding.
    pub fn deliver(&self, handle: ChainHandle, data: &[u8], meta: ImageMetadata) -> bool {
        let binding = {
            let state = self.state.lock().unwrap();
            match state.chains.get(&handle) {
                Some(chain) if !chain.released => chain.export.as_ref().map(|(_, cb, ctx)| (*cb, *ctx)),
                _ => None,
            }
        };
        let Some((callback, context)) = binding else {
            return false;
        };

        let mut meta = meta;
        unsafe {
            callback(
                data.as_ptr() as *const c_void,
                data.len(),
                &mut meta,
                context as *mut c_void,
            );
        }
        true
    }

    pub fn report_error(&self, handle: ChainHandle, element: &str, code: i32) {
        let target = {
            let state = self.state.lock().unwrap();
            state
                .chains
                .get(&handle)
                .filter(|chain| !chain.released)
                .map(|chain| (chain.on_error, chain.error_context))
        };
        if let Some((on_error, context)) = target {
            let element = CString::new(element).unwrap();
            unsafe { on_error(element.as_ptr(), code, context as *mut c_void) };
        }
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(SinkEvent::External(event));
    }
}

impl ChainApi for FakeChainApi {
    fn initialize(&self, _runtime_config: &str) -> Result<(), ChainError> {
        self.state.lock().unwrap().initialized = true;
        self.record("initialize".into());
        Ok(())
    }

    fn finalize(&self) {
        self.state.lock().unwrap().initialized = false;
        self.record("finalize".into());
    }

    unsafe fn create_chain(
        &self,
        config: &str,
        on_error: ErrorCallback,
        context: *mut c_void,
    ) -> Result<ChainHandle, ChainError> {
        let mut state = self.state.lock().unwrap();
        assert!(state.initialized, "chain created before runtime initialization");
        let index = state.next_handle;
        if state.fail_creation {
            return Err(ChainError::Create {
                index,
                reason: "scripted failure".into(),
            });
        }

        state.next_handle += 1;
        let handle = ChainHandle(100 + index);
        state.chains.insert(
            handle,
            FakeChain {
                config: config.to_owned(),
                on_error,
                error_context: context as usize,
                export: None,
                commands: Vec::new(),
                released: false,
            },
        );
        drop(state);
        self.record(format!("create {}", handle.0));
        Ok(handle)
    }

    unsafe fn set_export_callback(
        &self,
        chain: ChainHandle,
        stage: &str,
        callback: ExportCallback,
        context: *mut c_void,
    ) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stage.as_deref() == Some(stage) {
            return Err(ChainError::Bind {
                stage: stage.to_owned(),
                reason: "scripted failure".into(),
            });
        }
        let chain = state.chains.get_mut(&chain).ok_or_else(|| ChainError::Bind {
            stage: stage.to_owned(),
            reason: "unknown chain".into(),
        })?;
        chain.export = Some((stage.to_owned(), callback, context as usize));
        Ok(())
    }

    fn execute(&self, chain: ChainHandle, command: &str) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        let chain = state
            .chains
            .get_mut(&chain)
            .ok_or_else(|| ChainError::Execute("unknown chain".into()))?;
        chain.commands.push(command.to_owned());
        Ok(())
    }

    fn release_chain(&self, chain: ChainHandle) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.chains.get_mut(&chain) {
            assert!(!entry.released, "chain {:?} released twice", chain);
            entry.released = true;
        }
        state.released.push(chain);
        drop(state);
        self.record(format!("release {}", chain.0));
    }
}
