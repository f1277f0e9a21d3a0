//! streamadapter: forwards IFF chain output into a GStreamer pipeline

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::WrapErr, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use streamadapter::chain::IffSdk;
use streamadapter::sink::appsrc::{pipeline_description, AppSrcSink};
use streamadapter::{session, AdapterDocument, Settings, SinkHandle};

#[derive(Debug, Parser)]
#[command(version, about = "Forward IFF chain output into a GStreamer pipeline")]
struct Args {
    /// Adapter document with `IFF` and `chains` sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Elements appended after the appsrc, e.g. `! videoconvert ! autovideosink`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pipeline: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    let args = Args::parse();

    let mut settings = Settings::load().wrap_err("Invalid settings provided")?;
    if let Some(path) = args.config {
        settings.document_path = path;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("streamadapter launching...");

    let description = pipeline_description(&settings.appsrc_name, args.pipeline.as_slice());
    let sink = AppSrcSink::launch(&description, &settings.appsrc_name)
        .wrap_err("Invalid pipeline description provided")?;

    let document = AdapterDocument::load(&settings.document_path)
        .wrap_err("Invalid configuration provided")?;

    let target = Arc::new(SinkHandle::new(sink));
    session::run(
        IffSdk,
        &document,
        &settings.export_stage,
        target.clone(),
        wait_for_stop(),
    )
    .await?;

    let stats = target.stats().snapshot();
    info!(
        forwarded = stats.frames_forwarded,
        dropped = stats.frames_dropped,
        negotiation_failures = stats.negotiation_failures,
        "streamadapter shutting down"
    );
    Ok(())
}

/// Resolves on the first line read from stdin or on Ctrl-C
async fn wait_for_stop() {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        _ = lines.next_line() => info!("Termination requested"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
}
