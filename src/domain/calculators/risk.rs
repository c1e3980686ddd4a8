//! Risk metrics over three scopes: overall, per pair, per strategy.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::settings::EffectivenessThresholds;
use crate::domain::stats::{
    group_by, max_drawdown_abs, mean, ratio_or_zero, sharpe_like, TradeSummary,
};
use crate::domain::tables::{MaterializedTable, RiskRow, Scope, ALL_ENTITIES};

pub struct RiskCalculator {
    effectiveness: EffectivenessThresholds,
    min_by_pair: usize,
    min_by_strategy: usize,
}

/// Share (0-100) of stop-loss exits whose profit stayed at or above `threshold`.
pub fn stop_loss_effectiveness(orders: &[&ClosedOrder], threshold: f64) -> f64 {
    let triggered: Vec<&&ClosedOrder> = orders.iter().filter(|o| o.is_stop_loss_exit()).collect();
    if triggered.is_empty() {
        return 0.0;
    }
    let contained = triggered.iter().filter(|o| o.profit_pct >= threshold).count();
    contained as f64 / triggered.len() as f64 * 100.0
}

/// Mean winning profit % over mean absolute losing profit %.
pub fn reward_risk_ratio(orders: &[&ClosedOrder]) -> f64 {
    let gains: Vec<f64> = orders
        .iter()
        .filter(|o| o.profit_pct > 0.0)
        .map(|o| o.profit_pct)
        .collect();
    let losses: Vec<f64> = orders
        .iter()
        .filter(|o| o.profit_pct < 0.0)
        .map(|o| o.profit_pct.abs())
        .collect();
    ratio_or_zero(mean(&gains), mean(&losses))
}

impl RiskCalculator {
    pub fn new(
        effectiveness: EffectivenessThresholds,
        min_by_pair: usize,
        min_by_strategy: usize,
    ) -> Self {
        Self {
            effectiveness,
            min_by_pair,
            min_by_strategy,
        }
    }

    fn row(&self, scope: Scope, entity_name: String, orders: &[&ClosedOrder]) -> RiskRow {
        let summary = TradeSummary::compute(orders);
        let pcts: Vec<f64> = orders.iter().map(|o| o.profit_pct).collect();
        RiskRow {
            scope,
            entity_name,
            trade_count: summary.trade_count,
            sl_triggered_count: orders.iter().filter(|o| o.is_stop_loss_exit()).count(),
            sl_effectiveness_pct: stop_loss_effectiveness(
                orders,
                self.effectiveness.for_scope(scope),
            ),
            max_drawdown_pct: summary.worst_trade_pct,
            max_drawdown_abs: max_drawdown_abs(orders),
            volatility_pct: summary.volatility_pct,
            sharpe_ratio: sharpe_like(&pcts),
            reward_risk_ratio: reward_risk_ratio(orders),
        }
    }

    fn scoped<F>(&self, orders: &[ClosedOrder], scope: Scope, min: usize, key: F) -> Vec<RiskRow>
    where
        F: Fn(&ClosedOrder) -> String,
    {
        group_by(orders, key)
            .into_iter()
            .filter(|(_, group)| group.len() >= min)
            .map(|(name, group)| self.row(scope, name, &group))
            .collect()
    }
}

impl Calculator for RiskCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Risk
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        let mut rows = Vec::new();
        if !orders.is_empty() {
            let all: Vec<&ClosedOrder> = orders.iter().collect();
            rows.push(self.row(Scope::Overall, ALL_ENTITIES.to_string(), &all));
        }
        rows.extend(self.scoped(orders, Scope::ByPair, self.min_by_pair, |o| o.pair.clone()));
        rows.extend(self.scoped(orders, Scope::ByStrategy, self.min_by_strategy, |o| {
            o.strategy.clone()
        }));
        Ok(MaterializedTable::Risk(rows))
    }
}
