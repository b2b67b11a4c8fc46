//! Service entry point: wires configuration, the worker pool, the
//! lifecycle supervisor and the broker client together.

use std::process::ExitCode;
use std::sync::Arc;

use plume_broker::{BrokerConfig, Supervisor};
use plume_worker::WorkerPool;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match BrokerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        queue = %config.rabbitmq_request_queue,
        pool_size = config.worker_pool_size,
        "starting plume worker"
    );

    let pool = Arc::new(WorkerPool::new(config.worker_pool_size));
    let supervisor = Supervisor::new();

    let client_task = tokio::spawn(plume_broker::run(
        config,
        Arc::clone(&pool),
        supervisor.shutdown_notify(),
        supervisor.shutting_down_flag(),
    ));

    supervisor.wait_for_signal().await;

    if let Err(err) = client_task.await {
        tracing::error!(error = %err, "broker client task panicked");
    }

    match Arc::try_unwrap(pool) {
        Ok(pool) => Supervisor::shutdown_pool(pool).await,
        Err(_) => {
            tracing::error!("worker pool still shared after broker client exited; leaking threads");
        }
    }

    tracing::info!("plume worker exited cleanly");
    ExitCode::SUCCESS
}
