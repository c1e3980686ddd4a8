//! Run coordinator: one analysis cycle from cursor check to checkpoint.
//!
//! A cycle moves `Idle -> Checking -> (NothingNew | Recomputing -> Recording) -> Idle`.
//! The state mutex doubles as the reentrancy guard: a cycle that cannot
//! take it is rejected with [`AnalyticsError::CycleInProgress`] instead of
//! queueing behind the running one.

use super::calculators::{AnalysisContext, Calculator, CalculatorKind};
use super::checkpoint::{Checkpoint, CycleStatus, SnapshotType};
use super::error::AnalyticsError;
use super::order::ClosedOrder;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::store_port::AnalyticsStorePort;
use chrono::{NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, TryLockError};
use tracing::{debug, error, info, warn};

/// What fired the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    /// Short-interval tick: recompute only when new orders exist.
    Regular,
    /// Long-interval tick: also recompute health when nothing is new.
    HealthRefresh,
}

impl CycleTrigger {
    fn snapshot_type(self) -> SnapshotType {
        match self {
            CycleTrigger::Regular => SnapshotType::AutomatedAnalysis,
            CycleTrigger::HealthRefresh => SnapshotType::HealthRefresh,
        }
    }
}

impl fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.snapshot_type().as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Checking,
    NothingNew,
    Recomputing,
    Recording,
}

#[derive(Debug)]
struct CoordinatorState {
    cursor: Option<i64>,
    phase: CyclePhase,
}

impl CoordinatorState {
    fn enter(&mut self, phase: CyclePhase) {
        debug!(from = ?self.phase, to = ?phase, "cycle phase");
        self.phase = phase;
    }
}

/// Result of one calculator within a cycle.
#[derive(Debug)]
pub struct CalculatorOutcome {
    pub kind: CalculatorKind,
    /// Rows written, or the isolated failure.
    pub result: Result<usize, AnalyticsError>,
}

#[derive(Debug)]
pub struct CycleReport {
    pub trigger: CycleTrigger,
    pub status: CycleStatus,
    pub new_orders: usize,
    pub cursor: Option<i64>,
    pub outcomes: Vec<CalculatorOutcome>,
}

impl CycleReport {
    pub fn rows_written(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AnalyticsError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

pub struct RunCoordinator {
    ledger: Arc<dyn LedgerPort + Send + Sync>,
    store: Arc<dyn AnalyticsStorePort + Send + Sync>,
    calculators: Vec<Box<dyn Calculator>>,
    state: Mutex<CoordinatorState>,
}

fn health_only(kind: CalculatorKind) -> bool {
    kind == CalculatorKind::Health
}

fn every_calculator(_: CalculatorKind) -> bool {
    true
}

fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

impl RunCoordinator {
    /// Build a coordinator, resuming from the cursor persisted in the store.
    pub fn new(
        ledger: Arc<dyn LedgerPort + Send + Sync>,
        store: Arc<dyn AnalyticsStorePort + Send + Sync>,
        calculators: Vec<Box<dyn Calculator>>,
    ) -> Result<Self, AnalyticsError> {
        let cursor = store.load_cursor()?;
        info!(cursor = ?cursor, calculators = calculators.len(), "coordinator ready");
        Ok(Self {
            ledger,
            store,
            calculators,
            state: Mutex::new(CoordinatorState {
                cursor,
                phase: CyclePhase::Idle,
            }),
        })
    }

    /// Last processed closed-order id. Blocks while a cycle is running.
    pub fn cursor(&self) -> Option<i64> {
        match self.state.lock() {
            Ok(state) => state.cursor,
            Err(poisoned) => poisoned.into_inner().cursor,
        }
    }

    /// Scheduler entry point. Outcomes are logged, never returned.
    pub fn run_cycle(&self, trigger: CycleTrigger) {
        match self.try_run_cycle(trigger) {
            Ok(report) => match report.status {
                CycleStatus::NoOp => {
                    info!(trigger = %trigger, cursor = ?report.cursor, "no new closed orders")
                }
                CycleStatus::Success => info!(
                    trigger = %trigger,
                    new_orders = report.new_orders,
                    rows = report.rows_written(),
                    cursor = ?report.cursor,
                    "analysis cycle complete"
                ),
                CycleStatus::Error => warn!(
                    trigger = %trigger,
                    new_orders = report.new_orders,
                    failed = report.failures().count(),
                    cursor = ?report.cursor,
                    "analysis cycle finished with calculator failures"
                ),
            },
            Err(AnalyticsError::CycleInProgress) => {
                warn!(trigger = %trigger, "previous cycle still running, tick skipped")
            }
            Err(e) => error!(trigger = %trigger, error = %e, "analysis cycle aborted"),
        }
    }

    /// Run one cycle and report what happened.
    ///
    /// Errors only when the ledger cannot be read (nothing is written) or
    /// when the cursor and checkpoint cannot be recorded. Calculator
    /// failures are isolated into the report instead.
    pub fn try_run_cycle(&self, trigger: CycleTrigger) -> Result<CycleReport, AnalyticsError> {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AnalyticsError::CycleInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        info!(trigger = %trigger, cursor = ?state.cursor, "analysis cycle starting");
        let result = self.cycle(&mut state, trigger);
        state.enter(CyclePhase::Idle);
        result
    }

    fn cycle(
        &self,
        state: &mut CoordinatorState,
        trigger: CycleTrigger,
    ) -> Result<CycleReport, AnalyticsError> {
        state.enter(CyclePhase::Checking);
        let as_of = now();
        let (new_orders, max_id) = self.ledger.count_new_closed_orders(state.cursor)?;

        let selected: Option<fn(CalculatorKind) -> bool> = if new_orders == 0 {
            state.enter(CyclePhase::NothingNew);
            match trigger {
                CycleTrigger::Regular => None,
                CycleTrigger::HealthRefresh => Some(health_only),
            }
        } else {
            info!(new_orders, max_id = ?max_id, "new closed orders found");
            Some(every_calculator)
        };

        let outcomes = match selected {
            None => Vec::new(),
            Some(selected) => match self.fetch(max_id) {
                Ok(orders) => {
                    state.enter(CyclePhase::Recomputing);
                    self.recompute(&orders, as_of, selected)
                }
                Err(e @ AnalyticsError::Connectivity { .. }) => return Err(e),
                Err(e) => {
                    warn!(error = %e, "closed orders unreadable, recording failure");
                    self.unreadable(&e, selected)
                }
            },
        };

        state.enter(CyclePhase::Recording);
        let cursor = state.cursor.max(max_id);
        let errors: Vec<String> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| e.to_string()))
            .collect();
        let status = if !errors.is_empty() {
            CycleStatus::Error
        } else if outcomes.is_empty() {
            CycleStatus::NoOp
        } else {
            CycleStatus::Success
        };

        let report = CycleReport {
            trigger,
            status,
            new_orders,
            cursor,
            outcomes,
        };
        let checkpoint = Checkpoint {
            snapshot_type: trigger.snapshot_type(),
            records_processed: new_orders,
            status,
            last_trade_id: cursor,
            rows_written: report.rows_written(),
            created_at: as_of,
            error_message: (!errors.is_empty()).then(|| errors.join("; ")),
        };
        self.store.record_cycle(cursor, &checkpoint)?;
        state.cursor = cursor;

        Ok(report)
    }

    fn fetch(&self, max_id: Option<i64>) -> Result<Vec<ClosedOrder>, AnalyticsError> {
        match max_id {
            Some(up_to) => self.ledger.fetch_closed_orders(up_to),
            None => Ok(Vec::new()),
        }
    }

    /// Every selected calculator fails with the ledger read error.
    fn unreadable(
        &self,
        err: &AnalyticsError,
        selected: fn(CalculatorKind) -> bool,
    ) -> Vec<CalculatorOutcome> {
        self.calculators
            .iter()
            .map(|c| c.kind())
            .filter(|kind| selected(*kind))
            .map(|kind| CalculatorOutcome {
                kind,
                result: Err(AnalyticsError::calculator(kind.name(), err)),
            })
            .collect()
    }

    /// Run the selected calculators in order, isolating each one's failure.
    fn recompute<F>(
        &self,
        orders: &[ClosedOrder],
        as_of: NaiveDateTime,
        selected: F,
    ) -> Vec<CalculatorOutcome>
    where
        F: Fn(CalculatorKind) -> bool,
    {
        let ctx = AnalysisContext { as_of };
        self.calculators
            .iter()
            .filter(|c| selected(c.kind()))
            .map(|calculator| {
                let kind = calculator.kind();
                let result = calculator
                    .compute(orders, &ctx)
                    .and_then(|table| self.store.replace_table(&table, as_of))
                    .map_err(|e| AnalyticsError::calculator(kind.name(), &e));
                match &result {
                    Ok(rows) => debug!(calculator = %kind, rows, "table replaced"),
                    Err(e) => warn!(calculator = %kind, error = %e, "calculator failed"),
                }
                CalculatorOutcome { kind, result }
            })
            .collect()
    }
}
