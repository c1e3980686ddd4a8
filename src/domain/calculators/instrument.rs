//! Per-instrument (pair) analytics.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::stats::{group_by, longest_run_by, profit_factor, sharpe_like, TradeSummary};
use crate::domain::tables::{MaterializedTable, PairRow};

pub struct InstrumentCalculator {
    min_trades: usize,
}

impl InstrumentCalculator {
    pub fn new(min_trades: usize) -> Self {
        Self { min_trades }
    }
}

impl Calculator for InstrumentCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Instrument
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        let all: Vec<&ClosedOrder> = orders.iter().collect();
        let win_streaks = longest_run_by(&all, |o| o.pair.clone(), |o| o.is_win());
        let loss_streaks = longest_run_by(&all, |o| o.pair.clone(), |o| !o.is_win());

        let rows = group_by(orders, |o| o.pair.clone())
            .into_iter()
            .filter(|(_, group)| group.len() >= self.min_trades)
            .map(|(pair, group)| {
                let summary = TradeSummary::compute(&group);
                let pcts: Vec<f64> = group.iter().map(|o| o.profit_pct).collect();
                // a pair's symbols come from its earliest ledger row
                let first = group[0];
                PairRow {
                    base_currency: first.base_currency.clone(),
                    quote_currency: first.quote_currency.clone(),
                    total_trades: summary.trade_count,
                    winning_trades: summary.winning_trades,
                    losing_trades: summary.losing_trades,
                    win_rate_pct: summary.win_rate_pct,
                    avg_profit_pct: summary.avg_profit_pct,
                    total_profit_abs: summary.total_profit_abs,
                    avg_duration_minutes: summary.avg_duration_minutes,
                    volatility_pct: summary.volatility_pct,
                    max_win_streak: win_streaks.get(&pair).copied().unwrap_or(0),
                    max_loss_streak: loss_streaks.get(&pair).copied().unwrap_or(0),
                    profit_factor: profit_factor(&group),
                    sharpe_ratio: sharpe_like(&pcts),
                    best_trade_pct: summary.best_trade_pct,
                    worst_trade_pct: summary.worst_trade_pct,
                    pair,
                }
            })
            .collect();

        Ok(MaterializedTable::Pairs(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::test_support::{order, ts};
    use approx::assert_relative_eq;

    fn compute(orders: &[ClosedOrder], min: usize) -> Vec<PairRow> {
        let ctx = AnalysisContext {
            as_of: ts(2024, 2, 1, 0),
        };
        match InstrumentCalculator::new(min).compute(orders, &ctx).unwrap() {
            MaterializedTable::Pairs(rows) => rows,
            other => panic!("unexpected table {}", other.table_name()),
        }
    }

    #[test]
    fn single_trade_pair_still_gets_a_row() {
        let rows = compute(&[order(1, "ETH/USDT", "trend", 2.0)], 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].base_currency, "ETH");
        assert_eq!(rows[0].quote_currency, "USDT");
        assert_eq!(rows[0].volatility_pct, 0.0);
        assert_eq!(rows[0].max_win_streak, 1);
        assert_eq!(rows[0].max_loss_streak, 0);
    }

    #[test]
    fn pair_statistics() {
        let orders = vec![
            order(1, "BTC/USDT", "trend", 1.0),
            order(2, "BTC/USDT", "revert", -1.0),
            order(3, "BTC/USDT", "trend", -2.0),
            order(4, "ETH/USDT", "trend", 5.0),
            order(5, "BTC/USDT", "trend", 3.0),
        ];
        let rows = compute(&orders, 1);
        let btc = rows.iter().find(|r| r.pair == "BTC/USDT").unwrap();
        assert_eq!(btc.total_trades, 4);
        assert_eq!(btc.winning_trades, 2);
        assert_eq!(btc.max_win_streak, 1);
        assert_eq!(btc.max_loss_streak, 2);
        assert_relative_eq!(btc.avg_profit_pct, 0.25);
        assert_relative_eq!(btc.win_rate_pct, 50.0);
        // gains 40, losses 30
        assert_relative_eq!(btc.profit_factor, 40.0 / 30.0, epsilon = 1e-12);
        assert!(btc.volatility_pct > 0.0);
    }
}
