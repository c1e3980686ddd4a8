//! Configuration validation.
//!
//! Checks every recognised key before the store is opened or a cycle runs.

use crate::domain::calculators::health::HealthMetric;
use crate::domain::error::AnalyticsError;
use crate::domain::settings::{
    MinTrades, DEFAULT_LONG_INTERVAL_SECS, DEFAULT_SHORT_INTERVAL_SECS,
};
use crate::ports::config_port::ConfigPort;

pub fn validate_settings_config(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    validate_ledger(config)?;
    validate_intervals(config)?;
    validate_min_trades(config)?;
    validate_logging(config)?;
    validate_health_bands(config)?;
    Ok(())
}

fn validate_ledger(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    config.require_string("ledger", "path")?;
    if config.get_int("ledger", "pool_size", 4) < 1 {
        return Err(AnalyticsError::ConfigInvalid {
            section: "ledger".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_intervals(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    let short = config.get_int("scheduler", "short_interval_secs", DEFAULT_SHORT_INTERVAL_SECS);
    let long = config.get_int("scheduler", "long_interval_secs", DEFAULT_LONG_INTERVAL_SECS);
    for (key, value) in [("short_interval_secs", short), ("long_interval_secs", long)] {
        if value <= 0 {
            return Err(AnalyticsError::ConfigInvalid {
                section: "scheduler".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be positive"),
            });
        }
    }
    if long < short {
        return Err(AnalyticsError::ConfigInvalid {
            section: "scheduler".to_string(),
            key: "long_interval_secs".to_string(),
            reason: "long_interval_secs must not be shorter than short_interval_secs".to_string(),
        });
    }
    Ok(())
}

fn validate_min_trades(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    for key in MinTrades::KEYS {
        if config.get_int("min_trades", key, 1) < 1 {
            return Err(AnalyticsError::ConfigInvalid {
                section: "min_trades".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be at least 1"),
            });
        }
    }
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    match config.get_string("logging", "format").as_deref() {
        None | Some("pretty") | Some("json") => Ok(()),
        Some(other) => Err(AnalyticsError::ConfigInvalid {
            section: "logging".to_string(),
            key: "format".to_string(),
            reason: format!("unknown format {other:?}, expected pretty or json"),
        }),
    }
}

fn validate_health_bands(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    for metric in HealthMetric::ALL {
        let mut band = metric.default_band();
        band.warning = config.get_double("health", &metric.warning_key(), band.warning);
        band.critical = config.get_double("health", &metric.critical_key(), band.critical);
        if !band.is_ordered() {
            return Err(AnalyticsError::ConfigInvalid {
                section: "health".to_string(),
                key: metric.warning_key(),
                reason: format!(
                    "warning threshold {} is on the wrong side of critical threshold {}",
                    band.warning, band.critical
                ),
            });
        }
    }
    Ok(())
}
