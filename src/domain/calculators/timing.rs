//! Timing analysis: overall, hour of day, day of week, calendar month.
//!
//! Trades are placed in time by their open timestamp.

use super::{AnalysisContext, Calculator, CalculatorKind};
use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;
use crate::domain::stats::{group_by, mean, TradeSummary};
use crate::domain::tables::{MaterializedTable, TimeCategory, TimingRow, ALL_ENTITIES};
use chrono::{Datelike, Timelike, Weekday};

pub struct TimingCalculator;

fn is_weekend(order: &ClosedOrder) -> bool {
    matches!(order.open_date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn row(category: TimeCategory, value: String, group: &[&ClosedOrder]) -> TimingRow {
    let summary = TradeSummary::compute(group);
    TimingRow {
        time_category: category,
        time_value: value,
        trade_count: summary.trade_count,
        win_rate_pct: summary.win_rate_pct,
        avg_profit_pct: summary.avg_profit_pct,
        total_profit_abs: summary.total_profit_abs,
        avg_duration_minutes: summary.avg_duration_minutes,
        best_hour: None,
        worst_hour: None,
        weekend_profit_pct: None,
        weekday_profit_pct: None,
    }
}

/// Best and worst hour by mean profit %. Ties go to the earlier hour.
fn best_and_worst_hour(hourly: &[TimingRow]) -> (Option<u32>, Option<u32>) {
    let mut best: Option<&TimingRow> = None;
    let mut worst: Option<&TimingRow> = None;
    for row in hourly {
        if best.is_none_or(|b| row.avg_profit_pct > b.avg_profit_pct) {
            best = Some(row);
        }
        if worst.is_none_or(|w| row.avg_profit_pct < w.avg_profit_pct) {
            worst = Some(row);
        }
    }
    let hour = |r: Option<&TimingRow>| r.and_then(|r| r.time_value.parse::<u32>().ok());
    (hour(best), hour(worst))
}

impl Calculator for TimingCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Timing
    }

    fn compute(
        &self,
        orders: &[ClosedOrder],
        _ctx: &AnalysisContext,
    ) -> Result<MaterializedTable, AnalyticsError> {
        if orders.is_empty() {
            return Ok(MaterializedTable::Timing(Vec::new()));
        }

        let hourly: Vec<TimingRow> = group_by(orders, |o| o.open_date.hour())
            .into_iter()
            .map(|(hour, group)| row(TimeCategory::HourOfDay, format!("{hour:02}"), &group))
            .collect();

        let daily: Vec<TimingRow> =
            group_by(orders, |o| o.open_date.weekday().num_days_from_monday())
                .into_iter()
                .map(|(_, group)| {
                    let day = group[0].open_date.weekday();
                    row(TimeCategory::DayOfWeek, day.to_string(), &group)
                })
                .collect();

        let monthly: Vec<TimingRow> = group_by(orders, |o| (o.open_date.year(), o.open_date.month()))
            .into_iter()
            .map(|((year, month), group)| {
                row(TimeCategory::Month, format!("{year:04}-{month:02}"), &group)
            })
            .collect();

        let weekend: Vec<f64> = orders
            .iter()
            .filter(|o| is_weekend(o))
            .map(|o| o.profit_pct)
            .collect();
        let weekday: Vec<f64> = orders
            .iter()
            .filter(|o| !is_weekend(o))
            .map(|o| o.profit_pct)
            .collect();

        let all: Vec<&ClosedOrder> = orders.iter().collect();
        let (best_hour, worst_hour) = best_and_worst_hour(&hourly);
        let overall = TimingRow {
            best_hour,
            worst_hour,
            weekend_profit_pct: Some(mean(&weekend)),
            weekday_profit_pct: Some(mean(&weekday)),
            ..row(TimeCategory::Overall, ALL_ENTITIES.to_string(), &all)
        };

        let mut rows = Vec::with_capacity(1 + hourly.len() + daily.len() + monthly.len());
        rows.push(overall);
        rows.extend(hourly);
        rows.extend(daily);
        rows.extend(monthly);
        Ok(MaterializedTable::Timing(rows))
    }
}
