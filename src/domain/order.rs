//! Closed-order records read from the trading ledger.

use chrono::NaiveDateTime;

/// Exit reason recorded when a stop-loss closed the position.
pub const STOP_LOSS_EXIT: &str = "stop_loss";

/// Timestamp format shared with the ledger and the analytic tables.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed trade. Read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedOrder {
    pub id: i64,
    pub pair: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub strategy: String,
    pub profit_ratio: f64,
    pub profit_pct: f64,
    pub profit_abs: f64,
    pub duration_minutes: i64,
    pub exit_reason: String,
    pub stop_loss_pct: Option<f64>,
    pub stake_amount: f64,
    pub open_date: NaiveDateTime,
    pub close_date: Option<NaiveDateTime>,
}

impl ClosedOrder {
    pub fn is_win(&self) -> bool {
        self.profit_pct > 0.0
    }

    pub fn is_stop_loss_exit(&self) -> bool {
        self.exit_reason == STOP_LOSS_EXIT
    }

    /// Close time, falling back to open time plus duration when the ledger left it empty.
    pub fn effective_close(&self) -> NaiveDateTime {
        self.close_date
            .unwrap_or_else(|| self.open_date + chrono::Duration::minutes(self.duration_minutes))
    }
}

/// Sort orders into the time order used for streaks and drawdowns:
/// effective close time, then identifier.
pub fn sort_chronologically(orders: &mut [&ClosedOrder]) {
    orders.sort_by(|a, b| {
        a.effective_close()
            .cmp(&b.effective_close())
            .then(a.id.cmp(&b.id))
    });
}
