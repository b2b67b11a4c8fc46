//! Broker-layer error types.

/// Errors raised by the broker client and message layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The request payload could not be parsed into a
    /// [`crate::message::SimulationRequest`]. Reported back as
    /// `{status: "failed", result: null}`, acked, never retried.
    #[error("malformed request payload: {0}")]
    MalformedPayload(String),

    /// The response could not be serialized back to JSON.
    #[error("failed to serialize response: {0}")]
    Serialization(String),

    /// A transient connection/channel failure; the caller retries with
    /// a back-off, indefinitely until shutdown.
    #[error("broker connection error: {0}")]
    Connection(#[from] lapin::Error),
}
