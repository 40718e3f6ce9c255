mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LogSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the broker and durable log configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            visibility_timeout_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.visibility_timeout_secs)
                .unwrap_or(default.broker.visibility_timeout_secs),
            max_retries: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_retries)
                .unwrap_or(default.broker.max_retries),
            sweep_interval_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.sweep_interval_secs)
                .unwrap_or(default.broker.sweep_interval_secs),
        },
        log: LogSettings {
            path: partial
                .log
                .as_ref()
                .and_then(|l| l.path.clone())
                .unwrap_or(default.log.path),
            level: partial
                .log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    })
}
