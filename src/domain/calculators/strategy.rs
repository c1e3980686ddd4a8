//! Strategy comparison.
//!
//! Expectancy is mean profit % times win rate. Consistency is one minus
//! the coefficient of variation of profit %.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::stats::{
    downside_deviation, group_by, longest_run_by, mean, population_stddev, profit_factor,
    ratio_or_zero, sharpe_like, TradeSummary,
};
use crate::domain::tables::{MaterializedTable, StrategyRow};

pub struct StrategyCalculator {
    min_trades: usize,
}

/// `1 - stddev/|mean|` clamped to [0, 1]; undefined when the mean is zero.
pub fn consistency_score(pcts: &[f64]) -> Option<f64> {
    let m = mean(pcts);
    if pcts.is_empty() || m == 0.0 {
        return None;
    }
    let cv = population_stddev(pcts) / m.abs();
    Some((1.0 - cv).clamp(0.0, 1.0))
}

/// Mean profit % over the magnitude of the worst single loss.
pub fn calmar_like(pcts: &[f64], worst_trade_pct: f64) -> f64 {
    if worst_trade_pct >= 0.0 {
        return 0.0;
    }
    mean(pcts) / worst_trade_pct.abs()
}

impl StrategyCalculator {
    pub fn new(min_trades: usize) -> Self {
        Self { min_trades }
    }
}

impl Calculator for StrategyCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Strategy
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        let all: Vec<&ClosedOrder> = orders.iter().collect();
        let win_streaks = longest_run_by(&all, |o| o.strategy.clone(), |o| o.is_win());
        let loss_streaks = longest_run_by(&all, |o| o.strategy.clone(), |o| !o.is_win());

        let rows = group_by(orders, |o| o.strategy.clone())
            .into_iter()
            .filter(|(_, group)| group.len() >= self.min_trades)
            .map(|(name, group)| {
                let summary = TradeSummary::compute(&group);
                let pcts: Vec<f64> = group.iter().map(|o| o.profit_pct).collect();
                StrategyRow {
                    total_trades: summary.trade_count,
                    winning_trades: summary.winning_trades,
                    losing_trades: summary.losing_trades,
                    win_rate_pct: summary.win_rate_pct,
                    avg_profit_pct: summary.avg_profit_pct,
                    total_profit_abs: summary.total_profit_abs,
                    profit_factor: profit_factor(&group),
                    expectancy: summary.avg_profit_pct * summary.win_rate(),
                    best_trade_pct: summary.best_trade_pct,
                    worst_trade_pct: summary.worst_trade_pct,
                    max_win_streak: win_streaks.get(&name).copied().unwrap_or(0),
                    max_loss_streak: loss_streaks.get(&name).copied().unwrap_or(0),
                    consistency_score: consistency_score(&pcts),
                    sharpe_ratio: sharpe_like(&pcts),
                    sortino_ratio: ratio_or_zero(summary.avg_profit_pct, downside_deviation(&pcts)),
                    calmar_ratio: calmar_like(&pcts, summary.worst_trade_pct),
                    avg_duration_minutes: summary.avg_duration_minutes,
                    strategy_name: name,
                }
            })
            .collect();

        Ok(MaterializedTable::Strategy(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::test_support::{order, ts};
    use approx::assert_relative_eq;

    fn compute(orders: &[ClosedOrder], min: usize) -> Vec<StrategyRow> {
        let ctx = AnalysisContext {
            as_of: ts(2024, 2, 1, 0),
        };
        match StrategyCalculator::new(min).compute(orders, &ctx).unwrap() {
            MaterializedTable::Strategy(rows) => rows,
            other => panic!("unexpected table {}", other.table_name()),
        }
    }

    #[test]
    fn consistency_undefined_for_zero_mean() {
        assert_eq!(consistency_score(&[1.0, -1.0]), None);
        assert_eq!(consistency_score(&[]), None);
    }

    #[test]
    fn consistency_of_identical_results_is_one() {
        assert_eq!(consistency_score(&[2.0, 2.0, 2.0]), Some(1.0));
    }

    #[test]
    fn consistency_is_clamped_at_zero() {
        // mean 0.5, stddev 3.5 -> cv 7
        assert_eq!(consistency_score(&[4.0, -3.0]), Some(0.0));
    }

    #[test]
    fn calmar_without_losses_is_zero() {
        assert_eq!(calmar_like(&[1.0, 2.0], 1.0), 0.0);
        assert_relative_eq!(calmar_like(&[3.0, -1.0], -1.0), 1.0);
    }

    #[test]
    fn strategy_row_statistics() {
        // chronological: + + - + + + -   (ids are close-hour offsets)
        let pcts = [2.0, 1.0, -1.0, 3.0, 1.0, 2.0, -2.0];
        let orders: Vec<ClosedOrder> = pcts
            .iter()
            .enumerate()
            .map(|(i, p)| order(i as i64 + 1, "BTC/USDT", "trend", *p))
            .collect();

        let rows = compute(&orders, 5);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.strategy_name, "trend");
        assert_eq!(row.total_trades, 7);
        assert_eq!(row.winning_trades, 5);
        assert_eq!(row.losing_trades, 2);
        assert_eq!(row.max_win_streak, 3);
        assert_eq!(row.max_loss_streak, 1);
        assert_relative_eq!(row.avg_profit_pct, 6.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(row.expectancy, (6.0 / 7.0) * (5.0 / 7.0), epsilon = 1e-12);
        // abs profit is pct * 10: gains 90, losses 30
        assert_relative_eq!(row.profit_factor, 3.0, epsilon = 1e-12);
        assert_relative_eq!(row.best_trade_pct, 3.0);
        assert_relative_eq!(row.worst_trade_pct, -2.0);
        assert_relative_eq!(row.calmar_ratio, (6.0 / 7.0) / 2.0, epsilon = 1e-12);
        assert!(row.sharpe_ratio > 0.0);
        assert!(row.sortino_ratio > row.sharpe_ratio);
    }

    #[test]
    fn strategies_below_minimum_get_no_row() {
        let mut orders: Vec<ClosedOrder> = (1..=5)
            .map(|i| order(i, "BTC/USDT", "trend", 1.0))
            .collect();
        orders.extend((6..=9).map(|i| order(i, "BTC/USDT", "revert", 1.0)));
        let rows = compute(&orders, 5);
        let names: Vec<&str> = rows.iter().map(|r| r.strategy_name.as_str()).collect();
        assert_eq!(names, vec!["trend"]);
    }
}
