//! Bot health: scalar metrics over the whole ledger, each classified
//! against its own warning/critical band.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::settings::HealthThresholds;
use crate::domain::stats::{ratio_or_zero, TradeSummary};
use crate::domain::tables::{HealthRow, MaterializedTable};
use crate::domain::thresholds::{Direction, HealthStatus, ThresholdBand};
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthMetric {
    OverallWinRate,
    AvgProfitPct,
    TotalTrades,
    TotalProfit,
    WorstLoss,
    BestWin,
    DistinctPairs,
    DistinctStrategies,
    AvgTradeDuration,
    StopLossRate,
    ActiveDayRatio,
}

impl HealthMetric {
    pub const ALL: [HealthMetric; 11] = [
        HealthMetric::OverallWinRate,
        HealthMetric::AvgProfitPct,
        HealthMetric::TotalTrades,
        HealthMetric::TotalProfit,
        HealthMetric::WorstLoss,
        HealthMetric::BestWin,
        HealthMetric::DistinctPairs,
        HealthMetric::DistinctStrategies,
        HealthMetric::AvgTradeDuration,
        HealthMetric::StopLossRate,
        HealthMetric::ActiveDayRatio,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            HealthMetric::OverallWinRate => "overall_win_rate",
            HealthMetric::AvgProfitPct => "avg_profit_pct",
            HealthMetric::TotalTrades => "total_trades",
            HealthMetric::TotalProfit => "total_profit",
            HealthMetric::WorstLoss => "worst_loss",
            HealthMetric::BestWin => "best_win",
            HealthMetric::DistinctPairs => "distinct_pairs",
            HealthMetric::DistinctStrategies => "distinct_strategies",
            HealthMetric::AvgTradeDuration => "avg_trade_duration",
            HealthMetric::StopLossRate => "stop_loss_rate",
            HealthMetric::ActiveDayRatio => "active_day_ratio",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            HealthMetric::OverallWinRate
            | HealthMetric::AvgProfitPct
            | HealthMetric::WorstLoss
            | HealthMetric::BestWin
            | HealthMetric::StopLossRate
            | HealthMetric::ActiveDayRatio => "%",
            HealthMetric::TotalTrades
            | HealthMetric::DistinctPairs
            | HealthMetric::DistinctStrategies => "count",
            HealthMetric::TotalProfit => "abs",
            HealthMetric::AvgTradeDuration => "minutes",
        }
    }

    /// Built-in band. Trade duration and stop-loss rate improve downwards,
    /// worst loss by shrinking magnitude, everything else upwards.
    pub const fn default_band(&self) -> ThresholdBand {
        use Direction::*;
        match self {
            HealthMetric::OverallWinRate => ThresholdBand::new(60.0, 40.0, HigherIsBetter),
            HealthMetric::AvgProfitPct => ThresholdBand::new(0.5, 0.0, HigherIsBetter),
            HealthMetric::TotalTrades => ThresholdBand::new(10.0, 1.0, HigherIsBetter),
            HealthMetric::TotalProfit => ThresholdBand::new(0.0, -1000.0, HigherIsBetter),
            HealthMetric::WorstLoss => ThresholdBand::new(-10.0, -20.0, LowerMagnitudeIsBetter),
            HealthMetric::BestWin => ThresholdBand::new(1.0, 0.0, HigherIsBetter),
            HealthMetric::DistinctPairs => ThresholdBand::new(3.0, 1.0, HigherIsBetter),
            HealthMetric::DistinctStrategies => ThresholdBand::new(2.0, 1.0, HigherIsBetter),
            HealthMetric::AvgTradeDuration => ThresholdBand::new(1440.0, 4320.0, LowerIsBetter),
            HealthMetric::StopLossRate => ThresholdBand::new(30.0, 50.0, LowerIsBetter),
            HealthMetric::ActiveDayRatio => ThresholdBand::new(50.0, 20.0, HigherIsBetter),
        }
    }

    pub fn warning_key(&self) -> String {
        format!("{}_warning", self.key())
    }

    pub fn critical_key(&self) -> String {
        format!("{}_critical", self.key())
    }
}

impl fmt::Display for HealthMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Share (0-100) of calendar days with at least one close, from the first
/// close day through `as_of`, inclusive.
pub fn active_day_ratio(orders: &[ClosedOrder], ctx: &AnalysisContext) -> f64 {
    let days: BTreeSet<_> = orders.iter().map(|o| o.effective_close().date()).collect();
    let Some(first) = days.first() else {
        return 0.0;
    };
    let span = (ctx.as_of.date() - *first).num_days() + 1;
    let span = span.max(days.len() as i64);
    days.len() as f64 / span as f64 * 100.0
}

/// Worst status across a health table; `None` for an empty table.
pub fn overall_status(rows: &[HealthRow]) -> Option<HealthStatus> {
    rows.iter().map(|r| r.status).reduce(HealthStatus::worst)
}

pub struct HealthCalculator {
    thresholds: HealthThresholds,
}

impl HealthCalculator {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self { thresholds }
    }

    fn value(
        metric: HealthMetric,
        summary: &TradeSummary,
        orders: &[ClosedOrder],
        ctx: &AnalysisContext,
    ) -> f64 {
        match metric {
            HealthMetric::OverallWinRate => summary.win_rate_pct,
            HealthMetric::AvgProfitPct => summary.avg_profit_pct,
            HealthMetric::TotalTrades => summary.trade_count as f64,
            HealthMetric::TotalProfit => summary.total_profit_abs,
            HealthMetric::WorstLoss => summary.worst_trade_pct.min(0.0),
            HealthMetric::BestWin => summary.best_trade_pct,
            HealthMetric::DistinctPairs => {
                orders.iter().map(|o| &o.pair).collect::<BTreeSet<_>>().len() as f64
            }
            HealthMetric::DistinctStrategies => {
                orders.iter().map(|o| &o.strategy).collect::<BTreeSet<_>>().len() as f64
            }
            HealthMetric::AvgTradeDuration => summary.avg_duration_minutes,
            HealthMetric::StopLossRate => {
                let triggered = orders.iter().filter(|o| o.is_stop_loss_exit()).count();
                ratio_or_zero(triggered as f64, orders.len() as f64) * 100.0
            }
            HealthMetric::ActiveDayRatio => active_day_ratio(orders, ctx),
        }
    }
}

impl Calculator for HealthCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Health
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        if orders.is_empty() {
            return Ok(MaterializedTable::Health(Vec::new()));
        }

        let all: Vec<&ClosedOrder> = orders.iter().collect();
        let summary = TradeSummary::compute(&all);
        let rows = HealthMetric::ALL
            .iter()
            .map(|metric| {
                let band = self.thresholds.band(*metric);
                let value = Self::value(*metric, &summary, orders, ctx);
                HealthRow {
                    metric: *metric,
                    value,
                    status: band.classify(value),
                    threshold_warning: band.warning,
                    threshold_critical: band.critical,
                }
            })
            .collect::<Vec<_>>();
        if let Some(status) = overall_status(&rows) {
            info!(status = %status, trades = summary.trade_count, "bot health");
        }
        Ok(MaterializedTable::Health(rows))
    }
}
