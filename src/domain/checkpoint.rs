//! Append-only audit records, one per analysis cycle.

use chrono::NaiveDateTime;
use std::fmt;

/// Which trigger produced a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotType {
    AutomatedAnalysis,
    HealthRefresh,
}

impl SnapshotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::AutomatedAnalysis => "automated_analysis",
            SnapshotType::HealthRefresh => "health_refresh",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "automated_analysis" => Some(SnapshotType::AutomatedAnalysis),
            "health_refresh" => Some(SnapshotType::HealthRefresh),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one cycle. `Error` means at least one calculator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleStatus {
    NoOp,
    Success,
    Error,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::NoOp => "no_op",
            CycleStatus::Success => "success",
            CycleStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_op" => Some(CycleStatus::NoOp),
            "success" => Some(CycleStatus::Success),
            "error" => Some(CycleStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub snapshot_type: SnapshotType,
    /// New closed orders found since the previous cursor.
    pub records_processed: usize,
    pub status: CycleStatus,
    /// Cursor value after the cycle.
    pub last_trade_id: Option<i64>,
    /// Total analytic rows written across all tables.
    pub rows_written: usize,
    pub created_at: NaiveDateTime,
    /// One `name: reason` line per failed calculator.
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for ty in [SnapshotType::AutomatedAnalysis, SnapshotType::HealthRefresh] {
            assert_eq!(SnapshotType::parse(ty.as_str()), Some(ty));
        }
        for status in [CycleStatus::NoOp, CycleStatus::Success, CycleStatus::Error] {
            assert_eq!(CycleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CycleStatus::parse("partial"), None);
    }

    #[test]
    fn error_outranks_success() {
        assert_eq!(
            CycleStatus::Success.max(CycleStatus::Error),
            CycleStatus::Error
        );
    }
}
