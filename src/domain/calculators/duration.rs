//! Holding-time patterns by duration bucket.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::stats::{group_by, ratio_or_zero, TradeSummary};
use crate::domain::tables::{DurationRow, MaterializedTable, Scope, ALL_ENTITIES};
use crate::domain::thresholds::DurationBucket;

pub struct DurationCalculator {
    min_overall: usize,
    min_by_pair: usize,
    min_by_strategy: usize,
}

/// Mean profit % per hour held; zero when the mean duration is zero.
pub fn profit_per_hour(avg_profit_pct: f64, avg_duration_minutes: f64) -> f64 {
    ratio_or_zero(avg_profit_pct, avg_duration_minutes / 60.0)
}

fn row(
    scope: Scope,
    entity_name: String,
    bucket: DurationBucket,
    group: &[&ClosedOrder],
) -> DurationRow {
    let summary = TradeSummary::compute(group);
    let minutes = group.iter().map(|o| o.duration_minutes);
    DurationRow {
        scope,
        entity_name,
        bucket,
        min_duration_minutes: minutes.clone().min().unwrap_or(0),
        max_duration_minutes: minutes.max().unwrap_or(0),
        trade_count: summary.trade_count,
        win_rate_pct: summary.win_rate_pct,
        avg_profit_pct: summary.avg_profit_pct,
        total_profit_abs: summary.total_profit_abs,
        avg_duration_minutes: summary.avg_duration_minutes,
        profit_per_hour: profit_per_hour(summary.avg_profit_pct, summary.avg_duration_minutes),
    }
}

impl DurationCalculator {
    pub fn new(min_overall: usize, min_by_pair: usize, min_by_strategy: usize) -> Self {
        Self {
            min_overall,
            min_by_pair,
            min_by_strategy,
        }
    }

    fn scoped<F>(
        &self,
        orders: &[ClosedOrder],
        scope: Scope,
        min: usize,
        entity: F,
    ) -> Vec<DurationRow>
    where
        F: Fn(&ClosedOrder) -> String,
    {
        group_by(orders, |o| (entity(o), DurationBucket::classify(o.duration_minutes)))
            .into_iter()
            .filter(|(_, group)| group.len() >= min)
            .map(|((name, bucket), group)| row(scope, name, bucket, &group))
            .collect()
    }
}

impl Calculator for DurationCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Duration
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        let mut rows = self.scoped(orders, Scope::Overall, self.min_overall, |_| {
            ALL_ENTITIES.to_string()
        });
        rows.extend(self.scoped(orders, Scope::ByPair, self.min_by_pair, |o| o.pair.clone()));
        rows.extend(self.scoped(orders, Scope::ByStrategy, self.min_by_strategy, |o| {
            o.strategy.clone()
        }));
        Ok(MaterializedTable::Duration(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::test_support::{order, ts};
    use approx::assert_relative_eq;

    fn held(id: i64, pair: &str, strategy: &str, minutes: i64, pct: f64) -> ClosedOrder {
        let mut o = order(id, pair, strategy, pct);
        o.duration_minutes = minutes;
        o
    }

    fn compute(orders: &[ClosedOrder]) -> Vec<DurationRow> {
        let ctx = AnalysisContext {
            as_of: ts(2024, 2, 1, 0),
        };
        match DurationCalculator::new(1, 2, 3).compute(orders, &ctx).unwrap() {
            MaterializedTable::Duration(rows) => rows,
            other => panic!("unexpected table {}", other.table_name()),
        }
    }

    #[test]
    fn boundary_durations_land_in_the_lower_bucket() {
        let orders = vec![
            held(1, "BTC/USDT", "a", 60, 1.0),
            held(2, "BTC/USDT", "a", 480, 1.0),
            held(3, "BTC/USDT", "a", 1440, 1.0),
            held(4, "BTC/USDT", "a", 1441, 1.0),
        ];
        let overall: Vec<(DurationBucket, i64)> = compute(&orders)
            .into_iter()
            .filter(|r| r.scope == Scope::Overall)
            .map(|r| (r.bucket, r.max_duration_minutes))
            .collect();
        assert_eq!(
            overall,
            vec![
                (DurationBucket::Scalp, 60),
                (DurationBucket::ShortTerm, 480),
                (DurationBucket::DayTrade, 1440),
                (DurationBucket::SwingTrade, 1441),
            ]
        );
    }

    #[test]
    fn profit_per_hour_guards_zero_duration() {
        assert_eq!(profit_per_hour(2.0, 0.0), 0.0);
        assert_relative_eq!(profit_per_hour(2.0, 30.0), 4.0);
    }

    #[test]
    fn scoped_minimums_apply_per_bucket() {
        let orders = vec![
            held(1, "BTC/USDT", "a", 30, 2.0),
            held(2, "BTC/USDT", "a", 90, 1.0),
            held(3, "BTC/USDT", "a", 45, -1.0),
            held(4, "ETH/USDT", "a", 20, 1.0),
        ];
        let rows = compute(&orders);

        let pair_rows: Vec<(&str, DurationBucket)> = rows
            .iter()
            .filter(|r| r.scope == Scope::ByPair)
            .map(|r| (r.entity_name.as_str(), r.bucket))
            .collect();
        assert_eq!(pair_rows, vec![("BTC/USDT", DurationBucket::Scalp)]);

        let strategy_rows: Vec<&DurationRow> =
            rows.iter().filter(|r| r.scope == Scope::ByStrategy).collect();
        assert_eq!(strategy_rows.len(), 1);
        assert_eq!(strategy_rows[0].bucket, DurationBucket::Scalp);
        assert_eq!(strategy_rows[0].trade_count, 3);
        assert_eq!(strategy_rows[0].min_duration_minutes, 20);
        assert_eq!(strategy_rows[0].max_duration_minutes, 45);

        let btc = rows.iter().find(|r| r.scope == Scope::ByPair).unwrap();
        assert_relative_eq!(btc.avg_duration_minutes, 37.5);
        assert_relative_eq!(btc.avg_profit_pct, 0.5);
        assert_relative_eq!(btc.profit_per_hour, 0.8);
    }
}
