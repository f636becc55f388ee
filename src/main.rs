use anyhow::{Context, Result};
use docsum::{
    api, config,
    jobs::{ChannelJobQueue, SummaryJobExecutor, SummaryWorkerPool},
    logging,
    metrics::PipelineMetrics,
    pipeline::SummaryPipeline,
    storage::InMemoryStore,
    summarization::SummarizationEngine,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing();

    let store = Arc::new(InMemoryStore::new());
    let engine = Arc::new(SummarizationEngine::from_config(config));
    let metrics = Arc::new(PipelineMetrics::new());
    let (queue, receiver) = ChannelJobQueue::new();

    let executor = SummaryJobExecutor::new(
        store.clone(),
        engine.clone(),
        metrics.clone(),
        config.summary_job_timeout(),
    );
    let workers = SummaryWorkerPool::new(Arc::new(executor), config.summary_workers);
    let worker_handle = workers.spawn(receiver);
    tracing::info!(
        provider = ?config.summarization_provider,
        workers = config.summary_workers,
        threshold = config.auto_summary_max_chars,
        "Summary pipeline initialized"
    );

    let pipeline = SummaryPipeline::from_config(config, store, engine, Arc::new(queue), metrics);
    let app = api::create_router(Arc::new(pipeline));

    let (listener, port) = bind_listener()
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // The router (and with it the last queue sender) is gone; let queued jobs finish.
    worker_handle.await.context("Worker pool panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
