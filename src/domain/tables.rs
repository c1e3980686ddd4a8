//! Row types for the eight materialized analytic tables.

use super::calculators::health::HealthMetric;
use super::thresholds::{DurationBucket, HealthStatus};
use std::fmt;

/// Grouping granularity shared by the scoped calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Overall,
    ByPair,
    ByStrategy,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Overall => "overall",
            Scope::ByPair => "by_pair",
            Scope::ByStrategy => "by_strategy",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity name written for overall-scope rows.
pub const ALL_ENTITIES: &str = "all";

#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub entity_name: String,
    pub profit_ratio: f64,
    pub profit_pct: f64,
    pub profit_abs: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_duration_minutes: f64,
    pub max_profit_pct: f64,
    pub min_profit_pct: f64,
    pub total_volume: f64,
    pub rank_position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskRow {
    pub scope: Scope,
    pub entity_name: String,
    pub trade_count: usize,
    pub sl_triggered_count: usize,
    pub sl_effectiveness_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_abs: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub reward_risk_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRow {
    pub strategy_name: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
    pub avg_profit_pct: f64,
    pub total_profit_abs: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub consistency_score: Option<f64>,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub avg_duration_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeCategory {
    Overall,
    HourOfDay,
    DayOfWeek,
    Month,
}

impl TimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeCategory::Overall => "overall",
            TimeCategory::HourOfDay => "hour_of_day",
            TimeCategory::DayOfWeek => "day_of_week",
            TimeCategory::Month => "month",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingRow {
    pub time_category: TimeCategory,
    pub time_value: String,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_profit_pct: f64,
    pub total_profit_abs: f64,
    pub avg_duration_minutes: f64,
    /// Overall scope only.
    pub best_hour: Option<u32>,
    pub worst_hour: Option<u32>,
    pub weekend_profit_pct: Option<f64>,
    pub weekday_profit_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub pair: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
    pub avg_profit_pct: f64,
    pub total_profit_abs: f64,
    pub avg_duration_minutes: f64,
    pub volatility_pct: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossRow {
    pub scope: Scope,
    pub entity_name: String,
    pub total_trades: usize,
    pub trades_with_sl: usize,
    pub avg_sl_level_pct: Option<f64>,
    pub sl_triggered_count: usize,
    pub sl_trigger_rate_pct: f64,
    pub sl_effectiveness_pct: f64,
    pub avg_loss_when_triggered_pct: Option<f64>,
    pub avg_profit_when_not_triggered_pct: Option<f64>,
    pub optimal_sl_level_pct: Option<f64>,
    pub max_loss_when_triggered_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationRow {
    pub scope: Scope,
    pub entity_name: String,
    pub bucket: DurationBucket,
    pub min_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_profit_pct: f64,
    pub total_profit_abs: f64,
    pub avg_duration_minutes: f64,
    pub profit_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthRow {
    pub metric: HealthMetric,
    pub value: f64,
    pub status: HealthStatus,
    pub threshold_warning: f64,
    pub threshold_critical: f64,
}

/// The full replacement contents of one analytic table.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializedTable {
    Rankings(Vec<RankingRow>),
    Risk(Vec<RiskRow>),
    Strategy(Vec<StrategyRow>),
    Timing(Vec<TimingRow>),
    Pairs(Vec<PairRow>),
    StopLoss(Vec<StopLossRow>),
    Duration(Vec<DurationRow>),
    Health(Vec<HealthRow>),
}

impl MaterializedTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            MaterializedTable::Rankings(_) => "performance_rankings",
            MaterializedTable::Risk(_) => "risk_metrics",
            MaterializedTable::Strategy(_) => "strategy_performance",
            MaterializedTable::Timing(_) => "timing_analysis",
            MaterializedTable::Pairs(_) => "pair_analytics",
            MaterializedTable::StopLoss(_) => "stop_loss_analytics",
            MaterializedTable::Duration(_) => "duration_patterns",
            MaterializedTable::Health(_) => "bot_health_metrics",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MaterializedTable::Rankings(rows) => rows.len(),
            MaterializedTable::Risk(rows) => rows.len(),
            MaterializedTable::Strategy(rows) => rows.len(),
            MaterializedTable::Timing(rows) => rows.len(),
            MaterializedTable::Pairs(rows) => rows.len(),
            MaterializedTable::StopLoss(rows) => rows.len(),
            MaterializedTable::Duration(rows) => rows.len(),
            MaterializedTable::Health(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
