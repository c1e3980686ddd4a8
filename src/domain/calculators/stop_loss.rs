//! Stop-loss analytics: configured levels, trigger rates, containment and
//! the best-performing observed level.

use super::risk::stop_loss_effectiveness;
use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::settings::EffectivenessThresholds;
use crate::domain::stats::{group_by, mean, ratio_or_zero};
use crate::domain::tables::{MaterializedTable, Scope, StopLossRow, ALL_ENTITIES};
use std::collections::BTreeMap;

pub struct StopLossCalculator {
    effectiveness: EffectivenessThresholds,
    min_by_pair: usize,
    min_by_strategy: usize,
    min_level_samples: usize,
}

fn mean_or_none(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| mean(values))
}

/// Observed stop-loss level (rounded to 0.1) with the best mean profit %,
/// among levels seen at least `min_samples` times. Ties go to the lower level.
pub fn optimal_stop_loss_level(orders: &[&ClosedOrder], min_samples: usize) -> Option<f64> {
    // keyed in tenths of a percent so the map orders exactly
    let mut levels: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for order in orders {
        if let Some(sl) = order.stop_loss_pct {
            let tenths = (sl * 10.0).round() as i64;
            levels.entry(tenths).or_default().push(order.profit_pct);
        }
    }

    let mut best: Option<(i64, f64)> = None;
    for (tenths, outcomes) in levels {
        if outcomes.len() < min_samples {
            continue;
        }
        let outcome = mean(&outcomes);
        if best.is_none_or(|(_, b)| outcome > b) {
            best = Some((tenths, outcome));
        }
    }
    best.map(|(tenths, _)| tenths as f64 / 10.0)
}

impl StopLossCalculator {
    pub fn new(
        effectiveness: EffectivenessThresholds,
        min_by_pair: usize,
        min_by_strategy: usize,
        min_level_samples: usize,
    ) -> Self {
        Self {
            effectiveness,
            min_by_pair,
            min_by_strategy,
            min_level_samples,
        }
    }

    /// Row over the trades of `group` that carry a stop-loss. `total_trades`
    /// still counts the whole group.
    fn row(&self, scope: Scope, entity_name: String, group: &[&ClosedOrder]) -> StopLossRow {
        let covered = with_stop_loss(group);
        let levels: Vec<f64> = covered.iter().filter_map(|o| o.stop_loss_pct).collect();
        let (triggered, not_triggered): (Vec<&ClosedOrder>, Vec<&ClosedOrder>) =
            covered.iter().copied().partition(|o| o.is_stop_loss_exit());
        let triggered_pcts: Vec<f64> = triggered.iter().map(|o| o.profit_pct).collect();
        let other_pcts: Vec<f64> = not_triggered.iter().map(|o| o.profit_pct).collect();

        StopLossRow {
            scope,
            entity_name,
            total_trades: group.len(),
            trades_with_sl: covered.len(),
            avg_sl_level_pct: mean_or_none(&levels),
            sl_triggered_count: triggered.len(),
            sl_trigger_rate_pct: ratio_or_zero(triggered.len() as f64, covered.len() as f64)
                * 100.0,
            sl_effectiveness_pct: stop_loss_effectiveness(
                &covered,
                self.effectiveness.for_scope(scope),
            ),
            avg_loss_when_triggered_pct: mean_or_none(&triggered_pcts),
            avg_profit_when_not_triggered_pct: mean_or_none(&other_pcts),
            optimal_sl_level_pct: optimal_stop_loss_level(&covered, self.min_level_samples),
            max_loss_when_triggered_pct: triggered_pcts
                .iter()
                .map(|p| (-p).max(0.0))
                .reduce(f64::max),
        }
    }

    fn scoped<F>(
        &self,
        orders: &[ClosedOrder],
        scope: Scope,
        min: usize,
        key: F,
    ) -> Vec<StopLossRow>
    where
        F: Fn(&ClosedOrder) -> String,
    {
        group_by(orders, key)
            .into_iter()
            .filter(|(_, group)| {
                let covered = with_stop_loss(group).len();
                covered > 0 && covered >= min
            })
            .map(|(name, group)| self.row(scope, name, &group))
            .collect()
    }
}

fn with_stop_loss<'a>(orders: &[&'a ClosedOrder]) -> Vec<&'a ClosedOrder> {
    orders
        .iter()
        .copied()
        .filter(|o| o.stop_loss_pct.is_some())
        .collect()
}

impl Calculator for StopLossCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::StopLoss
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        let mut rows = Vec::new();
        let all: Vec<&ClosedOrder> = orders.iter().collect();
        if all.iter().any(|o| o.stop_loss_pct.is_some()) {
            rows.push(self.row(Scope::Overall, ALL_ENTITIES.to_string(), &all));
        }
        rows.extend(self.scoped(orders, Scope::ByPair, self.min_by_pair, |o| o.pair.clone()));
        rows.extend(self.scoped(orders, Scope::ByStrategy, self.min_by_strategy, |o| {
            o.strategy.clone()
        }));
        Ok(MaterializedTable::StopLoss(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::STOP_LOSS_EXIT;
    use crate::domain::stats::test_support::{order, ts};
    use approx::assert_relative_eq;

    fn with_sl(id: i64, pair: &str, level: f64, pct: f64, triggered: bool) -> ClosedOrder {
        let mut o = order(id, pair, "trend", pct);
        o.stop_loss_pct = Some(level);
        if triggered {
            o.exit_reason = STOP_LOSS_EXIT.into();
        }
        o
    }

    fn compute(orders: &[ClosedOrder]) -> Vec<StopLossRow> {
        let calc = StopLossCalculator::new(EffectivenessThresholds::default(), 3, 5, 2);
        let ctx = AnalysisContext {
            as_of: ts(2024, 2, 1, 0),
        };
        match calc.compute(orders, &ctx).unwrap() {
            MaterializedTable::StopLoss(rows) => rows,
            other => panic!("unexpected table {}", other.table_name()),
        }
    }

    #[test]
    fn overall_row_from_five_triggered_exits() {
        let orders: Vec<ClosedOrder> = [-3.0, -4.0, -12.0, -2.0, -20.0]
            .iter()
            .enumerate()
            .map(|(i, pct)| with_sl(i as i64 + 1, "BTC/USDT", -5.0, *pct, true))
            .collect();
        let rows = compute(&orders);
        let overall = &rows[0];
        assert_eq!(overall.scope, Scope::Overall);
        assert_eq!(overall.sl_triggered_count, 5);
        assert_relative_eq!(overall.sl_trigger_rate_pct, 100.0);
        assert_relative_eq!(overall.sl_effectiveness_pct, 60.0);
        assert_relative_eq!(overall.avg_loss_when_triggered_pct.unwrap(), -8.2);
        assert_eq!(overall.avg_profit_when_not_triggered_pct, None);
        assert_relative_eq!(overall.max_loss_when_triggered_pct.unwrap(), 20.0);
        assert_relative_eq!(overall.avg_sl_level_pct.unwrap(), -5.0);
    }

    #[test]
    fn only_trades_with_a_stop_loss_feed_the_statistics() {
        let orders = vec![
            with_sl(1, "BTC/USDT", -5.0, -3.0, true),
            with_sl(2, "BTC/USDT", -5.0, 2.0, false),
            order(3, "BTC/USDT", "trend", 10.0),
            order(4, "BTC/USDT", "trend", 8.0),
        ];
        let rows = compute(&orders);
        let overall = &rows[0];
        assert_eq!(overall.scope, Scope::Overall);
        assert_eq!(overall.total_trades, 4);
        assert_eq!(overall.trades_with_sl, 2);
        assert_eq!(overall.sl_triggered_count, 1);
        assert_relative_eq!(overall.sl_trigger_rate_pct, 50.0);
        assert_relative_eq!(overall.avg_sl_level_pct.unwrap(), -5.0);
        assert_relative_eq!(overall.avg_loss_when_triggered_pct.unwrap(), -3.0);
        assert_relative_eq!(overall.avg_profit_when_not_triggered_pct.unwrap(), 2.0);
        // two covered trades are below the pair minimum of three
        assert!(rows.iter().all(|r| r.scope != Scope::ByPair));
    }

    #[test]
    fn ledger_without_stop_losses_has_no_rows() {
        let orders: Vec<ClosedOrder> = (1..=6)
            .map(|id| order(id, "BTC/USDT", "trend", 1.0))
            .collect();
        assert!(compute(&orders).is_empty());
    }

    #[test]
    fn optimal_level_needs_enough_samples() {
        let orders = vec![
            with_sl(1, "BTC/USDT", -2.04, -2.0, true),
            with_sl(2, "BTC/USDT", -1.96, 1.0, false),
            with_sl(3, "BTC/USDT", -5.0, 4.0, false),
            with_sl(4, "BTC/USDT", -5.0, 2.0, false),
            with_sl(5, "BTC/USDT", -8.0, 9.0, false),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        // -2.0 averages -0.5, -5.0 averages 3.0, -8.0 has a single sample
        assert_eq!(optimal_stop_loss_level(&refs, 2), Some(-5.0));
        assert_eq!(optimal_stop_loss_level(&refs, 1), Some(-8.0));
        assert_eq!(optimal_stop_loss_level(&refs, 3), None);
    }

    #[test]
    fn optimal_level_ties_go_to_the_lower_level() {
        let orders = vec![
            with_sl(1, "BTC/USDT", -3.0, 1.0, false),
            with_sl(2, "BTC/USDT", -3.0, 1.0, false),
            with_sl(3, "BTC/USDT", -6.0, 1.0, false),
            with_sl(4, "BTC/USDT", -6.0, 1.0, false),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        assert_eq!(optimal_stop_loss_level(&refs, 2), Some(-6.0));
    }

    #[test]
    fn pair_scope_requires_three_trades() {
        let orders = vec![
            with_sl(1, "BTC/USDT", -5.0, 1.0, false),
            with_sl(2, "BTC/USDT", -5.0, 1.0, false),
            with_sl(3, "BTC/USDT", -5.0, -6.0, true),
            with_sl(4, "ETH/USDT", -5.0, 1.0, false),
        ];
        let rows = compute(&orders);
        let pairs: Vec<&str> = rows
            .iter()
            .filter(|r| r.scope == Scope::ByPair)
            .map(|r| r.entity_name.as_str())
            .collect();
        assert_eq!(pairs, vec!["BTC/USDT"]);
        assert!(rows.iter().all(|r| r.scope != Scope::ByStrategy));
    }
}
