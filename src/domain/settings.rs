//! Typed analysis settings built from the configuration port.

use super::calculators::health::HealthMetric;
use super::error::AnalyticsError;
use super::tables::Scope;
use super::thresholds::ThresholdBand;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_SHORT_INTERVAL_SECS: i64 = 300;
pub const DEFAULT_LONG_INTERVAL_SECS: i64 = 3600;

/// Minimum group sizes below which a group gets no row.
#[derive(Debug, Clone, PartialEq)]
pub struct MinTrades {
    pub ranking: usize,
    pub risk_by_pair: usize,
    pub risk_by_strategy: usize,
    pub strategy: usize,
    pub instrument: usize,
    pub stop_loss_by_pair: usize,
    pub stop_loss_by_strategy: usize,
    pub stop_loss_level_samples: usize,
    pub duration_overall: usize,
    pub duration_by_pair: usize,
    pub duration_by_strategy: usize,
}

impl Default for MinTrades {
    fn default() -> Self {
        Self {
            ranking: 1,
            risk_by_pair: 3,
            risk_by_strategy: 5,
            strategy: 5,
            instrument: 1,
            stop_loss_by_pair: 3,
            stop_loss_by_strategy: 5,
            stop_loss_level_samples: 2,
            duration_overall: 1,
            duration_by_pair: 2,
            duration_by_strategy: 3,
        }
    }
}

impl MinTrades {
    /// Config keys under `[min_trades]`, paired with mutable access to each field.
    fn fields_mut(&mut self) -> [(&'static str, &mut usize); 11] {
        [
            ("ranking", &mut self.ranking),
            ("risk_by_pair", &mut self.risk_by_pair),
            ("risk_by_strategy", &mut self.risk_by_strategy),
            ("strategy", &mut self.strategy),
            ("instrument", &mut self.instrument),
            ("stop_loss_by_pair", &mut self.stop_loss_by_pair),
            ("stop_loss_by_strategy", &mut self.stop_loss_by_strategy),
            ("stop_loss_level_samples", &mut self.stop_loss_level_samples),
            ("duration_overall", &mut self.duration_overall),
            ("duration_by_pair", &mut self.duration_by_pair),
            ("duration_by_strategy", &mut self.duration_by_strategy),
        ]
    }

    pub const KEYS: [&'static str; 11] = [
        "ranking",
        "risk_by_pair",
        "risk_by_strategy",
        "strategy",
        "instrument",
        "stop_loss_by_pair",
        "stop_loss_by_strategy",
        "stop_loss_level_samples",
        "duration_overall",
        "duration_by_pair",
        "duration_by_strategy",
    ];
}

/// Catastrophic-loss thresholds (profit %) for stop-loss effectiveness.
///
/// The overall and per-pair scopes tolerate losses down to -10%, the
/// per-strategy scope only down to -5%. Kept separate per scope.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivenessThresholds {
    pub overall: f64,
    pub by_pair: f64,
    pub by_strategy: f64,
}

impl Default for EffectivenessThresholds {
    fn default() -> Self {
        Self {
            overall: -10.0,
            by_pair: -10.0,
            by_strategy: -5.0,
        }
    }
}

impl EffectivenessThresholds {
    pub fn for_scope(&self, scope: Scope) -> f64 {
        match scope {
            Scope::Overall => self.overall,
            Scope::ByPair => self.by_pair,
            Scope::ByStrategy => self.by_strategy,
        }
    }
}

/// Per-metric warning/critical bands.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthThresholds {
    bands: BTreeMap<HealthMetric, ThresholdBand>,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            bands: HealthMetric::ALL
                .iter()
                .map(|m| (*m, m.default_band()))
                .collect(),
        }
    }
}

impl HealthThresholds {
    pub fn band(&self, metric: HealthMetric) -> ThresholdBand {
        self.bands
            .get(&metric)
            .copied()
            .unwrap_or_else(|| metric.default_band())
    }

    pub fn set(&mut self, metric: HealthMetric, warning: f64, critical: f64) {
        let direction = metric.default_band().direction;
        self.bands
            .insert(metric, ThresholdBand::new(warning, critical, direction));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub short_interval: Duration,
    pub long_interval: Duration,
    pub min_trades: MinTrades,
    pub effectiveness: EffectivenessThresholds,
    pub health: HealthThresholds,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            short_interval: Duration::from_secs(DEFAULT_SHORT_INTERVAL_SECS as u64),
            long_interval: Duration::from_secs(DEFAULT_LONG_INTERVAL_SECS as u64),
            min_trades: MinTrades::default(),
            effectiveness: EffectivenessThresholds::default(),
            health: HealthThresholds::default(),
        }
    }
}

impl AnalyticsSettings {
    /// Build settings from config, falling back to defaults for absent keys.
    /// Run `validate_settings_config` first for descriptive errors.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        let mut settings = AnalyticsSettings::default();

        settings.short_interval = interval(
            config,
            "short_interval_secs",
            DEFAULT_SHORT_INTERVAL_SECS,
        )?;
        settings.long_interval =
            interval(config, "long_interval_secs", DEFAULT_LONG_INTERVAL_SECS)?;

        for (key, field) in settings.min_trades.fields_mut() {
            let value = config.get_int("min_trades", key, *field as i64);
            *field = usize::try_from(value)
                .ok()
                .filter(|v| *v >= 1)
                .ok_or_else(|| AnalyticsError::ConfigInvalid {
                    section: "min_trades".into(),
                    key: key.into(),
                    reason: "must be at least 1".into(),
                })?;
        }

        let defaults = EffectivenessThresholds::default();
        settings.effectiveness = EffectivenessThresholds {
            overall: config.get_double("effectiveness", "overall", defaults.overall),
            by_pair: config.get_double("effectiveness", "by_pair", defaults.by_pair),
            by_strategy: config.get_double("effectiveness", "by_strategy", defaults.by_strategy),
        };

        for metric in HealthMetric::ALL {
            let band = metric.default_band();
            let warning = config.get_double("health", &metric.warning_key(), band.warning);
            let critical = config.get_double("health", &metric.critical_key(), band.critical);
            settings.health.set(metric, warning, critical);
        }

        Ok(settings)
    }
}

fn interval(config: &dyn ConfigPort, key: &str, default: i64) -> Result<Duration, AnalyticsError> {
    let secs = config.get_int("scheduler", key, default);
    if secs <= 0 {
        return Err(AnalyticsError::ConfigInvalid {
            section: "scheduler".into(),
            key: key.into(),
            reason: "interval must be positive".into(),
        });
    }
    Ok(Duration::from_secs(secs as u64))
}
