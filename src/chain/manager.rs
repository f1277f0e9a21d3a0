//! Creation, export enabling and release of producer chains

use std::ptr::NonNull;
use std::sync::Arc;

use libc::c_void;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::chain::api::{ChainApi, ChainHandle, ChainId};
use crate::chain::router::{error_callback, export_callback, ChainContext};
use crate::chain::runtime::RuntimeHandle;
use crate::error::ChainError;
use crate::pipeline::{FrameForwarder, SinkHandle};
use crate::sink::FrameSink;

/// Export stage name when nothing else is configured
pub const DEFAULT_EXPORT_STAGE: &str = "exporter";

/// `{"<stage>": {"command": "on"}}`
pub fn enable_export_command(stage: &str) -> String {
    let mut command = Map::new();
    command.insert(stage.to_owned(), json!({ "command": "on" }));
    Value::Object(command).to_string()
}

struct ManagedChain<S> {
    handle: ChainHandle,
    /// Leaked box registered with the runtime; freed after `release_chain`
    context: NonNull<ChainContext<S>>,
}

/// Sole owner of every chain handle and of the contexts their callbacks use
pub struct ChainLifecycleManager<'rt, A: ChainApi, S: FrameSink> {
    runtime: &'rt RuntimeHandle<A>,
    chains: Vec<ManagedChain<S>>,
}

impl<'rt, A: ChainApi, S: FrameSink> ChainLifecycleManager<'rt, A, S> {
    pub fn new(runtime: &'rt RuntimeHandle<A>) -> Self {
        Self {
            runtime,
            chains: Vec::new(),
        }
    }

    /// Create one chain per config entry and bind all of them to `target`.
    ///
    /// Chains created before a failure stay owned by the manager and are
    /// released with the others.
    pub fn start(
        &mut self,
        configs: &[Value],
        export_stage: &str,
        target: &Arc<SinkHandle<S>>,
    ) -> Result<(), ChainError> {
        for config in configs {
            self.start_chain(config, export_stage, target)?;
        }
        Ok(())
    }

    #[instrument(skip(self, config, target))]
    fn start_chain(
        &mut self,
        config: &Value,
        export_stage: &str,
        target: &Arc<SinkHandle<S>>,
    ) -> Result<ChainId, ChainError> {
        let api = self.runtime.api();
        let id = ChainId(self.chains.len());

        let context = Box::new(ChainContext::new(id, FrameForwarder::new(target.clone())));
        let context = NonNull::from(Box::leak(context));
        let context_ptr = context.as_ptr() as *mut c_void;

        // SAFETY: the context is freed only after release_chain, or right here if
        // the chain was never created
        let created =
            unsafe { api.create_chain(&config.to_string(), error_callback::<S>(), context_ptr) };
        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                drop(unsafe { Box::from_raw(context.as_ptr()) });
                return Err(match e {
                    ChainError::Create { reason, .. } => ChainError::Create { index: id.0, reason },
                    other => other,
                });
            }
        };
        self.chains.push(ManagedChain { handle, context });

        // SAFETY: as above, the chain is now tracked and released before the context is freed
        unsafe {
            api.set_export_callback(handle, export_stage, export_callback::<S>(), context_ptr)?;
        }
        api.execute(handle, &enable_export_command(export_stage))?;

        info!(chain = %id, "Chain created, export stage `{}` enabled", export_stage);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn handles(&self) -> Vec<ChainHandle> {
        self.chains.iter().map(|chain| chain.handle).collect()
    }

    /// Release every chain in creation order, each exactly once
    pub fn release_all(&mut self) {
        let api = self.runtime.api();
        for chain in self.chains.drain(..) {
            api.release_chain(chain.handle);
            // SAFETY: the runtime fires no callbacks for a released chain
            drop(unsafe { Box::from_raw(chain.context.as_ptr()) });
            info!("Chain {:?} released", chain.handle);
        }
    }
}

impl<A: ChainApi, S: FrameSink> Drop for ChainLifecycleManager<'_, A, S> {
    fn drop(&mut self) {
        self.release_all();
    }
}
