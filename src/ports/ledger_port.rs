//! Ledger reader port: read-only access to completed trades.

use crate::domain::error::AnalyticsError;
use crate::domain::order::ClosedOrder;

pub trait LedgerPort {
    /// Closed orders with an id above `after` (all of them when `None`),
    /// and the highest closed-order id in the ledger.
    fn count_new_closed_orders(
        &self,
        after: Option<i64>,
    ) -> Result<(usize, Option<i64>), AnalyticsError>;

    /// Every closed order with id at or below `up_to`, in id order.
    fn fetch_closed_orders(&self, up_to: i64) -> Result<Vec<ClosedOrder>, AnalyticsError>;
}
