//! Adapter configuration.

use common::ExchangeEnvironment;
use execution_core::OrderDuration;
use tracing::warn;

/// Default prefix of the operator message for rejected orders.
pub const DEFAULT_REJECTION_PREFIX: &str = "The order was rejected: \n";

/// Configuration for the adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Exchange environment (production or testnet).
    pub environment: ExchangeEnvironment,
    /// Duration used when an intent does not specify one.
    pub default_duration: OrderDuration,
    /// Capacity of the transport event channel.
    pub event_channel_capacity: usize,
    /// Route moves of trailing stops as trailing-distance changes.
    /// When off, trailing stops are moved like plain stop orders.
    pub trailing_stops: bool,
    /// Prefix of the operator message sent for every rejected order.
    pub rejection_prefix: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            environment: ExchangeEnvironment::default(),
            default_duration: OrderDuration::Gtc,
            event_channel_capacity: 1024,
            trailing_stops: true,
            rejection_prefix: DEFAULT_REJECTION_PREFIX.to_string(),
        }
    }
}

impl AdapterConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    ///
    /// - `BITMEX_ENVIRONMENT`: `production` (default) or `testnet`
    /// - `BITMEX_EVENT_CHANNEL_CAPACITY`: transport channel capacity
    /// - `BITMEX_TRAILING_STOPS`: `true`/`false`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default().with_environment(ExchangeEnvironment::from_env());

        if let Ok(raw) = std::env::var("BITMEX_EVENT_CHANNEL_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.event_channel_capacity = capacity,
                _ => warn!(value = %raw, "ignoring invalid BITMEX_EVENT_CHANNEL_CAPACITY"),
            }
        }
        if let Ok(raw) = std::env::var("BITMEX_TRAILING_STOPS") {
            match raw.parse::<bool>() {
                Ok(enabled) => config.trailing_stops = enabled,
                Err(_) => warn!(value = %raw, "ignoring invalid BITMEX_TRAILING_STOPS"),
            }
        }
        config
    }

    pub fn with_environment(mut self, environment: ExchangeEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_default_duration(mut self, duration: OrderDuration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    pub fn with_trailing_stops(mut self, enabled: bool) -> Self {
        self.trailing_stops = enabled;
        self
    }

    pub fn with_rejection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rejection_prefix = prefix.into();
        self
    }

    /// Operator message for a rejected order.
    pub fn rejection_message(&self, reason: &str) -> String {
        format!("{}{}", self.rejection_prefix, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.environment, ExchangeEnvironment::Production);
        assert_eq!(config.default_duration, OrderDuration::Gtc);
        assert!(config.trailing_stops);
        assert_eq!(
            config.rejection_message("Invalid price"),
            "The order was rejected: \nInvalid price"
        );
    }

    #[test]
    fn test_builders() {
        let config = AdapterConfig::default()
            .with_environment(ExchangeEnvironment::Testnet)
            .with_event_channel_capacity(0)
            .with_trailing_stops(false)
            .with_rejection_prefix("Rejected: ");

        assert!(config.environment.is_testnet());
        assert_eq!(config.event_channel_capacity, 1);
        assert!(!config.trailing_stops);
        assert_eq!(config.rejection_message("x"), "Rejected: x");
    }
}
