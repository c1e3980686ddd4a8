//! Analytics store port: materialized tables, cursor and checkpoint log.

use crate::domain::checkpoint::Checkpoint;
use crate::domain::error::AnalyticsError;
use crate::domain::tables::MaterializedTable;
use chrono::NaiveDateTime;

pub trait AnalyticsStorePort {
    /// Atomically replace the whole contents of the table's scope.
    /// Returns the number of rows written.
    fn replace_table(
        &self,
        table: &MaterializedTable,
        as_of: NaiveDateTime,
    ) -> Result<usize, AnalyticsError>;

    fn load_cursor(&self) -> Result<Option<i64>, AnalyticsError>;

    /// Persist the cursor and append the checkpoint in one transaction.
    fn record_cycle(
        &self,
        cursor: Option<i64>,
        checkpoint: &Checkpoint,
    ) -> Result<(), AnalyticsError>;

    fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, AnalyticsError>;
}
