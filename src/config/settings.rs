use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for both the broker engine and the durable log.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Configuration settings for the broker engine.
///
/// Controls the visibility-timeout contract and the bounded-retry policy.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub visibility_timeout_secs: u64,
    pub max_retries: u8,
    pub sweep_interval_secs: u64,
}

/// Configuration settings for the durable log.
///
/// Defines where the log lives on disk and how chatty the process is.
#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub path: String,
    pub level: String,
}

impl BrokerSettings {
    /// How long a dequeued message may stay unacknowledged before the
    /// supervisor hands it back to the queue.
    pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 30;

    /// Number of timeout-driven requeues after which a message is
    /// dead-lettered instead of redelivered.
    pub const DEFAULT_MAX_RETRIES: u8 = 3;

    /// How often the supervisor sweeps the in-flight map. Independent of the
    /// visibility timeout.
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

    pub fn visibility_timeout_ms(&self) -> i64 {
        (self.visibility_timeout_secs * 1000) as i64
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

/// Partial broker settings.
///
/// Used for broker configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub visibility_timeout_secs: Option<u64>,
    pub max_retries: Option<u8>,
    pub sweep_interval_secs: Option<u64>,
}

/// Partial durable log settings.
///
/// Used when loading log configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub path: Option<String>,
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                visibility_timeout_secs: BrokerSettings::DEFAULT_VISIBILITY_TIMEOUT_SECS,
                max_retries: BrokerSettings::DEFAULT_MAX_RETRIES,
                sweep_interval_secs: BrokerSettings::DEFAULT_SWEEP_INTERVAL_SECS,
            },
            log: LogSettings {
                path: "relaymq_db".to_string(),
                level: "info".to_string(),
            },
        }
    }
}
