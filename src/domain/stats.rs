//! Aggregate statistics shared by the calculators.
//!
//! Deviations are population deviations (divide by n).

use super::order::{sort_chronologically, ClosedOrder};
use std::collections::BTreeMap;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Root mean square of the negative values, divided over the full sample.
pub fn downside_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().filter(|&&v| v < 0.0).map(|v| v * v).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Length of the longest run of consecutive items satisfying `pred`.
pub fn longest_run<T, P>(items: &[T], pred: P) -> usize
where
    P: Fn(&T) -> bool,
{
    let mut best = 0;
    let mut current = 0;
    for item in items {
        if pred(item) {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

/// Longest run satisfying `pred` for each partition key, over orders taken
/// in chronological order.
pub fn longest_run_by<K, F, P>(orders: &[&ClosedOrder], key: F, pred: P) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(&ClosedOrder) -> K,
    P: Fn(&ClosedOrder) -> bool,
{
    let mut partitions: BTreeMap<K, Vec<&ClosedOrder>> = BTreeMap::new();
    for order in orders {
        partitions.entry(key(order)).or_default().push(*order);
    }
    partitions
        .into_iter()
        .map(|(k, mut group)| {
            sort_chronologically(&mut group);
            (k, longest_run(&group, |o| pred(o)))
        })
        .collect()
}

/// Group orders by key; groups come back in ascending key order.
pub fn group_by<'a, K, F>(orders: &'a [ClosedOrder], key: F) -> BTreeMap<K, Vec<&'a ClosedOrder>>
where
    K: Ord,
    F: Fn(&ClosedOrder) -> K,
{
    let mut groups: BTreeMap<K, Vec<&ClosedOrder>> = BTreeMap::new();
    for order in orders {
        groups.entry(key(order)).or_default().push(order);
    }
    groups
}

/// Core trade statistics reused by several analytic tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSummary {
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
    pub avg_profit_ratio: f64,
    pub avg_profit_pct: f64,
    pub total_profit_abs: f64,
    pub avg_duration_minutes: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub volatility_pct: f64,
    pub total_stake: f64,
}

impl TradeSummary {
    pub fn compute(orders: &[&ClosedOrder]) -> Self {
        let pcts: Vec<f64> = orders.iter().map(|o| o.profit_pct).collect();
        let ratios: Vec<f64> = orders.iter().map(|o| o.profit_ratio).collect();
        let durations: Vec<f64> = orders.iter().map(|o| o.duration_minutes as f64).collect();

        let winning_trades = orders.iter().filter(|o| o.is_win()).count();
        let trade_count = orders.len();

        let (best_trade_pct, worst_trade_pct) = if pcts.is_empty() {
            (0.0, 0.0)
        } else {
            (
                pcts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                pcts.iter().copied().fold(f64::INFINITY, f64::min),
            )
        };

        Self {
            trade_count,
            winning_trades,
            losing_trades: trade_count - winning_trades,
            win_rate_pct: ratio_or_zero(winning_trades as f64, trade_count as f64) * 100.0,
            avg_profit_ratio: mean(&ratios),
            avg_profit_pct: mean(&pcts),
            total_profit_abs: orders.iter().map(|o| o.profit_abs).sum(),
            avg_duration_minutes: mean(&durations),
            best_trade_pct,
            worst_trade_pct,
            volatility_pct: population_stddev(&pcts),
            total_stake: orders.iter().map(|o| o.stake_amount).sum(),
        }
    }

    pub fn win_rate(&self) -> f64 {
        self.win_rate_pct / 100.0
    }
}

/// Sum of winning `profit_abs` over the sum of losing `|profit_abs|`; zero without losses.
pub fn profit_factor(orders: &[&ClosedOrder]) -> f64 {
    let gains: f64 = orders
        .iter()
        .filter(|o| o.profit_abs > 0.0)
        .map(|o| o.profit_abs)
        .sum();
    let losses: f64 = orders
        .iter()
        .filter(|o| o.profit_abs < 0.0)
        .map(|o| o.profit_abs.abs())
        .sum();
    ratio_or_zero(gains, losses)
}

/// Mean profit % over its population deviation, zero risk-free rate.
pub fn sharpe_like(pcts: &[f64]) -> f64 {
    ratio_or_zero(mean(pcts), population_stddev(pcts))
}

/// Largest peak-to-trough fall of the cumulative absolute profit curve.
pub fn max_drawdown_abs(orders: &[&ClosedOrder]) -> f64 {
    let mut ordered: Vec<&ClosedOrder> = orders.to_vec();
    sort_chronologically(&mut ordered);

    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for order in ordered {
        equity += order.profit_abs;
        if equity > peak {
            peak = equity;
        }
        max_dd = max_dd.max(peak - equity);
    }
    max_dd
}


#[cfg(test)]
mod tests {
    use super::test_support::order;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn population_stddev_known_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_stddev(&values), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn single_value_has_no_volatility() {
        assert_eq!(population_stddev(&[3.5]), 0.0);
    }

    #[test]
    fn downside_deviation_uses_full_sample() {
        let values = [1.0, -2.0, 3.0, -2.0];
        assert_relative_eq!(downside_deviation(&values), 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn longest_run_counts_consecutive_matches() {
        let values = [1, -1, 2, 3, 4, -5, 6, 7];
        assert_eq!(longest_run(&values, |v| *v > 0), 3);
        assert_eq!(longest_run(&values, |v| *v < 0), 1);
        assert_eq!(longest_run::<i32, _>(&[], |v| *v > 0), 0);
    }

    #[test]
    fn longest_run_by_partitions_and_orders_by_time() {
        // ids double as close-hour offsets; insert out of order to prove sorting.
        let orders = vec![
            order(4, "ETH/USDT", "a", 1.0),
            order(1, "BTC/USDT", "a", 1.0),
            order(3, "BTC/USDT", "a", 2.0),
            order(2, "BTC/USDT", "a", -1.0),
            order(5, "BTC/USDT", "a", 1.0),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        let wins = longest_run_by(&refs, |o| o.pair.clone(), |o| o.is_win());
        assert_eq!(wins["BTC/USDT"], 2);
        assert_eq!(wins["ETH/USDT"], 1);
    }

    #[test]
    fn summary_counts_and_extremes() {
        let orders = [
            order(1, "BTC/USDT", "a", 2.0),
            order(2, "BTC/USDT", "a", -1.0),
            order(3, "BTC/USDT", "a", 0.0),
            order(4, "BTC/USDT", "a", 3.0),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        let summary = TradeSummary::compute(&refs);
        assert_eq!(summary.trade_count, 4);
        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 2);
        assert_relative_eq!(summary.win_rate_pct, 50.0);
        assert_relative_eq!(summary.avg_profit_pct, 1.0);
        assert_relative_eq!(summary.best_trade_pct, 3.0);
        assert_relative_eq!(summary.worst_trade_pct, -1.0);
        assert_relative_eq!(summary.total_profit_abs, 40.0);
        assert_relative_eq!(summary.total_stake, 4000.0);
    }

    #[test]
    fn summary_of_nothing_is_zeroed() {
        let summary = TradeSummary::compute(&[]);
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.best_trade_pct, 0.0);
        assert_eq!(summary.worst_trade_pct, 0.0);
        assert_eq!(summary.win_rate_pct, 0.0);
    }

    #[test]
    fn profit_factor_without_losses_is_zero() {
        let orders = [order(1, "BTC/USDT", "a", 2.0)];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        assert_eq!(profit_factor(&refs), 0.0);
    }

    #[test]
    fn profit_factor_gains_over_losses() {
        let orders = [
            order(1, "BTC/USDT", "a", 3.0),
            order(2, "BTC/USDT", "a", -1.0),
            order(3, "BTC/USDT", "a", 3.0),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        assert_relative_eq!(profit_factor(&refs), 6.0);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        // cumulative abs: 20, 10, 40, 0, 10 -> worst fall 40 -> 0
        let orders = [
            order(1, "BTC/USDT", "a", 2.0),
            order(2, "BTC/USDT", "a", -1.0),
            order(3, "BTC/USDT", "a", 3.0),
            order(4, "BTC/USDT", "a", -4.0),
            order(5, "BTC/USDT", "a", 1.0),
        ];
        let refs: Vec<&ClosedOrder> = orders.iter().collect();
        assert_relative_eq!(max_drawdown_abs(&refs), 40.0);
    }
}
