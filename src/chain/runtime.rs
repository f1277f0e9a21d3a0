use serde_json::Value;
use tracing::info;

use crate::chain::api::ChainApi;
use crate::error::ChainError;

/// Proof that the chain runtime is initialized.
///
/// Chains can only be created through a borrow of this handle, so they are all
/// gone before it is dropped and the runtime finalized.
pub struct RuntimeHandle<A: ChainApi> {
    api: A,
}

impl<A: ChainApi> RuntimeHandle<A> {
    pub fn initialize(api: A, config: &Value) -> Result<Self, ChainError> {
        api.initialize(&config.to_string())?;
        info!("Chain runtime initialized");
        Ok(Self { api })
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: ChainApi> Drop for RuntimeHandle<A> {
    fn drop(&mut self) {
        self.api.finalize();
        info!("Chain runtime finalized");
    }
}
