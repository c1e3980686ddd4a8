//! The eight metric calculators.
//!
//! Each calculator turns the full closed-order set into the complete
//! replacement contents of its own analytic table. Calculators never see
//! each other's output and never touch storage; the coordinator hands
//! their tables to the store one at a time.

pub mod duration;
pub mod health;
pub mod instrument;
pub mod ranking;
pub mod risk;
pub mod stop_loss;
pub mod strategy;
pub mod timing;

use super::error::AnalyticsError;
use super::order::ClosedOrder;
use super::settings::AnalyticsSettings;
use super::tables::MaterializedTable;
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalculatorKind {
    Ranking,
    Risk,
    Strategy,
    Timing,
    Instrument,
    StopLoss,
    Duration,
    Health,
}

impl CalculatorKind {
    /// Execution order within a cycle.
    pub const ALL: [CalculatorKind; 8] = [
        CalculatorKind::Ranking,
        CalculatorKind::Risk,
        CalculatorKind::Strategy,
        CalculatorKind::Timing,
        CalculatorKind::Instrument,
        CalculatorKind::StopLoss,
        CalculatorKind::Duration,
        CalculatorKind::Health,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CalculatorKind::Ranking => "ranking",
            CalculatorKind::Risk => "risk",
            CalculatorKind::Strategy => "strategy",
            CalculatorKind::Timing => "timing",
            CalculatorKind::Instrument => "instrument",
            CalculatorKind::StopLoss => "stop_loss",
            CalculatorKind::Duration => "duration",
            CalculatorKind::Health => "health",
        }
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs shared by every calculator in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext {
    pub as_of: NaiveDateTime,
}

pub trait Calculator: Send + Sync {
    fn kind(&self) -> CalculatorKind;

    /// Compute the full contents of this calculator's table from every closed order.
    fn compute(
        &self,
        orders: &[ClosedOrder],
        ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError>;
}

/// The eight calculators in execution order.
pub fn standard_calculators(settings: &AnalyticsSettings) -> Vec<Box<dyn Calculator>> {
    vec![
        Box::new(ranking::RankingCalculator::new(settings.min_trades.ranking)),
        Box::new(risk::RiskCalculator::new(
            settings.effectiveness.clone(),
            settings.min_trades.risk_by_pair,
            settings.min_trades.risk_by_strategy,
        )),
        Box::new(strategy::StrategyCalculator::new(
            settings.min_trades.strategy,
        )),
        Box::new(timing::TimingCalculator),
        Box::new(instrument::InstrumentCalculator::new(
            settings.min_trades.instrument,
        )),
        Box::new(stop_loss::StopLossCalculator::new(
            settings.effectiveness.clone(),
            settings.min_trades.stop_loss_by_pair,
            settings.min_trades.stop_loss_by_strategy,
            settings.min_trades.stop_loss_level_samples,
        )),
        Box::new(duration::DurationCalculator::new(
            settings.min_trades.duration_overall,
            settings.min_trades.duration_by_pair,
            settings.min_trades.duration_by_strategy,
        )),
        Box::new(health::HealthCalculator::new(settings.health.clone())),
    ]
}
