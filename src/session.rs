//! Startup and shutdown ordering of one adapter run

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::chain::{ChainApi, ChainLifecycleManager, RuntimeHandle};
use crate::config::AdapterDocument;
use crate::error::ChainError;
use crate::pipeline::SinkHandle;
use crate::sink::FrameSink;

/// Run the adapter until `stop` resolves.
///
/// Initializes the chain runtime, starts every configured chain against `target`,
/// waits, then releases the chains, finalizes the runtime and only then sends
/// end-of-stream to the sink and deactivates it. The sink is finished on the
/// error path as well.
pub async fn run<A, S, F>(
    api: A,
    document: &AdapterDocument,
    export_stage: &str,
    target: Arc<SinkHandle<S>>,
    stop: F,
) -> Result<(), ChainError>
where
    A: ChainApi,
    S: FrameSink,
    F: Future<Output = ()>,
{
    let result = run_chains(api, document, export_stage, &target, stop).await;
    target.finish();
    info!("Sink finished");
    result
}

async fn run_chains<A, S, F>(
    api: A,
    document: &AdapterDocument,
    export_stage: &str,
    target: &Arc<SinkHandle<S>>,
    stop: F,
) -> Result<(), ChainError>
where
    A: ChainApi,
    S: FrameSink,
    F: Future<Output = ()>,
{
    let runtime = RuntimeHandle::initialize(api, &document.runtime)?;
    let mut chains = ChainLifecycleManager::new(&runtime);
    chains.start(&document.chains, export_stage, target)?;

    info!("Press Enter to terminate the program");
    stop.await;

    chains.release_all();
    Ok(())
}
