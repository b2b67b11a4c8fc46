//! Environment-driven configuration.

use std::time::Duration;

/// Runtime configuration loaded from the process environment.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// AMQP connection URL. Default: `amqp://localhost`.
    pub rabbitmq_url: String,
    /// Name of the non-durable request queue to declare and consume.
    pub rabbitmq_request_queue: String,
    /// Wall-clock budget per job before it is reported `timeExceeded`.
    /// Default: 600s.
    pub simulation_timeout: Duration,
    /// Number of worker threads in the simulation pool. Default: the
    /// number of available CPUs.
    pub worker_pool_size: usize,
}

impl BrokerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for everything except the request queue name, which has
    /// no sensible default and must be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rabbitmq_url =
            std::env::var("RABBITMQ_URL").unwrap_or_else(|_| "amqp://localhost".to_string());

        let rabbitmq_request_queue = std::env::var("RABBITMQ_REQUEST_QUEUE")
            .map_err(|_| ConfigError::MissingVar("RABBITMQ_REQUEST_QUEUE"))?;

        let simulation_timeout = match std::env::var("SIMULATION_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SIMULATION_TIMEOUT_SECS", raw))?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(600),
        };

        let worker_pool_size = match std::env::var("WORKER_POOL_SIZE") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WORKER_POOL_SIZE", raw))?,
            Err(_) => std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        };

        Ok(Self {
            rabbitmq_url,
            rabbitmq_request_queue,
            simulation_timeout,
            worker_pool_size,
        })
    }
}

/// Configuration loading failure; surfaced as a non-zero exit code at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    /// An environment variable had a value that could not be parsed.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_when_optional_vars_are_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("RABBITMQ_URL");
        std::env::remove_var("SIMULATION_TIMEOUT_SECS");
        std::env::remove_var("WORKER_POOL_SIZE");
        std::env::set_var("RABBITMQ_REQUEST_QUEUE", "sim-requests");

        let config = BrokerConfig::from_env().expect("loads");
        assert_eq!(config.rabbitmq_url, "amqp://localhost");
        assert_eq!(config.simulation_timeout, Duration::from_secs(600));
        assert!(config.worker_pool_size >= 1);

        std::env::remove_var("RABBITMQ_REQUEST_QUEUE");
    }

    #[test]
    fn missing_queue_name_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("RABBITMQ_REQUEST_QUEUE");
        let err = BrokerConfig::from_env().expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }
}
