//! Per-instrument performance ranking.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::stats::{group_by, TradeSummary};
use crate::domain::tables::{MaterializedTable, RankingRow};

pub struct RankingCalculator {
    min_trades: usize,
}

impl RankingCalculator {
    pub fn new(min_trades: usize) -> Self {
        Self { min_trades }
    }

    /// Rows ranked 1..N by descending mean profit %. Ties keep
    /// alphabetical instrument order.
    pub fn rank(&self, orders: &[ClosedOrder]) -> Vec<RankingRow> {
        let mut rows: Vec<RankingRow> = group_by(orders, |o| o.pair.clone())
            .into_iter()
            .filter(|(_, group)| group.len() >= self.min_trades)
            .map(|(pair, group)| {
                let summary = TradeSummary::compute(&group);
                RankingRow {
                    entity_name: pair,
                    profit_ratio: summary.avg_profit_ratio,
                    profit_pct: summary.avg_profit_pct,
                    profit_abs: summary.total_profit_abs,
                    trade_count: summary.trade_count,
                    win_rate_pct: summary.win_rate_pct,
                    avg_duration_minutes: summary.avg_duration_minutes,
                    max_profit_pct: summary.best_trade_pct,
                    min_profit_pct: summary.worst_trade_pct,
                    total_volume: summary.total_stake,
                    rank_position: 0,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.profit_pct.total_cmp(&a.profit_pct));
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank_position = i + 1;
        }
        rows
    }
}

impl Calculator for RankingCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Ranking
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        Ok(MaterializedTable::Rankings(self.rank(orders)))
    }
}
