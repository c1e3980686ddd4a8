//! Threshold ladders: health classification bands and duration buckets.

use std::fmt;

/// Ordered health states, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
        }
    }

    /// The worse of two states.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
    /// Compares `|value|` against `|threshold|`; used for loss magnitudes.
    LowerMagnitudeIsBetter,
}

/// A warning/critical threshold pair with its comparison direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub warning: f64,
    pub critical: f64,
    pub direction: Direction,
}

impl ThresholdBand {
    pub const fn new(warning: f64, critical: f64, direction: Direction) -> Self {
        Self {
            warning,
            critical,
            direction,
        }
    }

    /// Reaching the warning threshold (inclusive) is still healthy.
    pub fn classify(&self, value: f64) -> HealthStatus {
        let ladder = [
            (self.warning, HealthStatus::Healthy),
            (self.critical, HealthStatus::Warning),
        ];
        for (threshold, status) in ladder {
            let within = match self.direction {
                Direction::HigherIsBetter => value >= threshold,
                Direction::LowerIsBetter => value <= threshold,
                Direction::LowerMagnitudeIsBetter => value.abs() <= threshold.abs(),
            };
            if within {
                return status;
            }
        }
        HealthStatus::Critical
    }

    /// True when the warning threshold is on the healthy side of the critical one.
    pub fn is_ordered(&self) -> bool {
        match self.direction {
            Direction::HigherIsBetter => self.warning >= self.critical,
            Direction::LowerIsBetter => self.warning <= self.critical,
            Direction::LowerMagnitudeIsBetter => self.warning.abs() <= self.critical.abs(),
        }
    }
}

/// Holding-time categories, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DurationBucket {
    Scalp,
    ShortTerm,
    DayTrade,
    SwingTrade,
}

/// Inclusive upper bound in minutes for each bounded bucket.
const DURATION_LADDER: [(i64, DurationBucket); 3] = [
    (60, DurationBucket::Scalp),
    (480, DurationBucket::ShortTerm),
    (1440, DurationBucket::DayTrade),
];

impl DurationBucket {
    pub fn classify(minutes: i64) -> Self {
        DURATION_LADDER
            .iter()
            .find(|(upper, _)| minutes <= *upper)
            .map(|(_, bucket)| *bucket)
            .unwrap_or(DurationBucket::SwingTrade)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Scalp => "scalp",
            DurationBucket::ShortTerm => "short_term",
            DurationBucket::DayTrade => "day_trade",
            DurationBucket::SwingTrade => "swing_trade",
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
