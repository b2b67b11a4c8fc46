//! AMQP broker client state machine.
//!
//! One cooperative `tokio` task runs the full
//! `Disconnected -> Connecting -> Connected -> Subscribed -> Draining`
//! cycle; each inbound message is handed to a spawned task that submits
//! the job to the [`WorkerPool`] and publishes the reply, so the
//! consume loop itself never blocks on a simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_lite::stream::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use plume_worker::{JobOutcome, WorkerPool};

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::message::{SimulationRequest, SimulationResponse};

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Observable state of the broker session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    Draining,
}

/// Drives the broker session until `shutdown` is notified, reconnecting
/// with a fixed back-off on every transient failure.
///
/// Returns only on a clean, supervised shutdown; connection failures are
/// retried internally and never bubble up; each one is retried with a
/// 5-second back-off, indefinitely until shutdown.
pub async fn run(config: BrokerConfig, pool: Arc<WorkerPool>, shutdown: Arc<Notify>, shutting_down: Arc<AtomicBool>) {
    loop {
        if shutting_down.load(Ordering::Relaxed) {
            info!("shutdown requested before (re)connect; broker client exiting");
            return;
        }

        match connect_and_serve(&config, &pool, &shutdown, &shutting_down).await {
            Ok(()) => {
                info!("broker session drained cleanly");
                return;
            }
            Err(err) => {
                error!(error = %err, "broker session failed; reconnecting after back-off");
                tokio::select! {
                    _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                    _ = shutdown.notified() => {
                        shutting_down.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            }
        }
    }
}

async fn connect_and_serve(
    config: &BrokerConfig,
    pool: &Arc<WorkerPool>,
    shutdown: &Arc<Notify>,
    shutting_down: &Arc<AtomicBool>,
) -> Result<(), BrokerError> {
    debug!(state = ?BrokerState::Connecting, url = %config.rabbitmq_url, "connecting to broker");

    let connection = Connection::connect(
        &config.rabbitmq_url,
        ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio),
    )
    .await?;
    debug!(state = ?BrokerState::Connected, "connected");

    let channel = connection.create_channel().await?;
    channel
        .basic_qos(pool.size() as u16, BasicQosOptions::default())
        .await?;

    channel
        .queue_declare(
            &config.rabbitmq_request_queue,
            QueueDeclareOptions {
                durable: false,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    let mut consumer = channel
        .basic_consume(
            &config.rabbitmq_request_queue,
            "plume-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!(state = ?BrokerState::Subscribed, queue = %config.rabbitmq_request_queue, "subscribed");

    // Per-delivery work is tracked here so a shutdown can wait for
    // in-flight messages to finish before releasing its WorkerPool
    // handle once a shutdown begins.
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            delivery = consumer.next() => {
                let Some(delivery) = delivery else {
                    return Err(BrokerError::MalformedPayload("consumer stream closed".to_string()));
                };
                let delivery = delivery?;

                let channel = channel.clone();
                let pool = Arc::clone(pool);
                let timeout = config.simulation_timeout;
                let correlation_id = delivery.properties.correlation_id().clone();
                let span = tracing::info_span!(
                    "delivery",
                    correlation_id = correlation_id.as_ref().map(|id| id.as_str()).unwrap_or("none")
                );
                in_flight.spawn(async move {
                    let reply_to = delivery.properties.reply_to().clone();
                    let data = delivery.data.clone();

                    let ack_result = match SimulationRequest::from_json(&data) {
                        Ok(request) => {
                            let job = request.into_job();
                            let outcome = run_job(&pool, job, timeout).await;
                            publish_reply(&channel, reply_to.as_ref(), correlation_id.as_ref(), outcome).await;
                            delivery.ack(BasicAckOptions::default()).await
                        }
                        Err(err) => {
                            warn!(error = %err, "malformed request payload");
                            publish_reply(
                                &channel,
                                reply_to.as_ref(),
                                correlation_id.as_ref(),
                                JobOutcome::Failed(plume_core::SimulationError::InvalidJob(err.to_string())),
                            )
                            .await;
                            delivery.ack(BasicAckOptions::default()).await
                        }
                    };
                    if let Err(err) = ack_result {
                        error!(error = %err, "failed to ack delivery");
                    }
                }.instrument(span));
            }
            _ = shutdown.notified() => {
                shutting_down.store(true, Ordering::Relaxed);
                info!(state = ?BrokerState::Draining, pending = in_flight.len(), "draining broker session");
                while in_flight.join_next().await.is_some() {}
                return Ok(());
            }
        }
    }
}

/// Submit `job` to the pool and wait for its outcome off the cooperative
/// I/O loop's thread, since the consume loop must not block on a
/// simulation.
async fn run_job(pool: &Arc<WorkerPool>, job: plume_core::SimulationJob, timeout: Duration) -> JobOutcome {
    let pool = Arc::clone(pool);
    let handle = pool.submit(job);
    tokio::task::spawn_blocking(move || handle.wait(timeout))
        .await
        .unwrap_or(JobOutcome::TimeExceeded)
}

/// Publish the reply to `reply_to` with the matching `correlation_id`,
/// using the broker's default exchange, routing by `reply_to`. A publish
/// failure is logged and the reply discarded rather than retried: the
/// job already ran, and there is no channel left to resubmit it on.
async fn publish_reply(
    channel: &Channel,
    reply_to: Option<&lapin::types::ShortString>,
    correlation_id: Option<&lapin::types::ShortString>,
    outcome: JobOutcome,
) {
    let Some(reply_to) = reply_to else {
        warn!("request carried no reply_to; dropping reply");
        return;
    };

    let response = SimulationResponse {
        status: outcome.status(),
        result: match outcome {
            JobOutcome::Completed(output) => Some(output),
            _ => None,
        },
    };

    let body = match response.to_json() {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "failed to serialize response");
            return;
        }
    };

    let mut properties = BasicProperties::default();
    if let Some(correlation_id) = correlation_id {
        properties = properties.with_correlation_id(correlation_id.clone());
    }

    if let Err(err) = channel
        .basic_publish(
            "",
            reply_to.as_str(),
            BasicPublishOptions::default(),
            &body,
            properties,
        )
        .await
    {
        warn!(error = %err, "failed to publish reply; discarding (no channel available)");
    }
}
