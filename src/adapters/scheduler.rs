//! Two-timer cycle scheduler on tokio.
//!
//! The short timer fires immediately and then every `short_interval`; the
//! long timer first fires one `long_interval` after start. Cycles run on the
//! blocking pool and are awaited before the next tick is taken, so they
//! never overlap. Missed ticks are delayed rather than bursted.

use crate::domain::coordinator::{CycleTrigger, RunCoordinator};
use crate::domain::settings::AnalyticsSettings;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Cycles started per trigger during one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub regular: usize,
    pub health_refresh: usize,
}

pub struct CycleScheduler {
    coordinator: Arc<RunCoordinator>,
    short_interval: Duration,
    long_interval: Duration,
}

impl CycleScheduler {
    pub fn new(
        coordinator: Arc<RunCoordinator>,
        short_interval: Duration,
        long_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            short_interval,
            long_interval,
        }
    }

    pub fn from_settings(coordinator: Arc<RunCoordinator>, settings: &AnalyticsSettings) -> Self {
        Self::new(coordinator, settings.short_interval, settings.long_interval)
    }

    /// Drive cycles until `shutdown` resolves. A cycle already running when
    /// shutdown arrives is allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        info!(
            short_secs = self.short_interval.as_secs_f64(),
            long_secs = self.long_interval.as_secs_f64(),
            "scheduler started"
        );

        let mut short = interval(self.short_interval);
        short.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut long = interval_at(Instant::now() + self.long_interval, self.long_interval);
        long.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut stats = SchedulerStats::default();
        loop {
            let trigger = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = long.tick() => CycleTrigger::HealthRefresh,
                _ = short.tick() => CycleTrigger::Regular,
            };
            match trigger {
                CycleTrigger::Regular => stats.regular += 1,
                CycleTrigger::HealthRefresh => stats.health_refresh += 1,
            }

            let coordinator = Arc::clone(&self.coordinator);
            let cycle = tokio::task::spawn_blocking(move || coordinator.run_cycle(trigger));
            if let Err(e) = cycle.await {
                error!(trigger = %trigger, error = %e, "analysis cycle task failed");
            }
        }

        info!(
            regular = stats.regular,
            health_refresh = stats.health_refresh,
            "scheduler stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::calculators::standard_calculators;
    use crate::domain::checkpoint::SnapshotType;
    use crate::domain::stats::test_support::order;
    use crate::ports::store_port::AnalyticsStorePort;

    fn seeded() -> (Arc<SqliteAdapter>, Arc<RunCoordinator>) {
        let adapter = Arc::new(SqliteAdapter::in_memory().unwrap());
        adapter.initialize_schema().unwrap();
        adapter
            .insert_orders(&[
                order(1, "BTC/USDT", "trend", 1.0),
                order(2, "ETH/USDT", "trend", -0.5),
            ])
            .unwrap();
        let coordinator = RunCoordinator::new(
            adapter.clone(),
            adapter.clone(),
            standard_calculators(&AnalyticsSettings::default()),
        )
        .unwrap();
        (adapter, Arc::new(coordinator))
    }

    #[tokio::test]
    async fn short_timer_fires_immediately() {
        let (adapter, coordinator) = seeded();
        let scheduler = CycleScheduler::new(
            coordinator.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(7200),
        );
        let stats = scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(stats.regular, 1);
        assert_eq!(stats.health_refresh, 0);
        assert_eq!(coordinator.cursor(), Some(2));
        let checkpoint = adapter.latest_checkpoint().unwrap().unwrap();
        assert_eq!(checkpoint.snapshot_type, SnapshotType::AutomatedAnalysis);
    }

    #[tokio::test]
    async fn both_timers_drive_cycles_until_shutdown() {
        let (_adapter, coordinator) = seeded();
        let scheduler = CycleScheduler::new(
            coordinator,
            Duration::from_millis(20),
            Duration::from_millis(60),
        );
        let stats = scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(250)))
            .await;

        assert!(stats.regular >= 2, "{stats:?}");
        assert!(stats.health_refresh >= 1, "{stats:?}");
    }

    #[tokio::test]
    async fn immediate_shutdown_runs_nothing() {
        let (_adapter, coordinator) = seeded();
        let scheduler = CycleScheduler::new(
            coordinator.clone(),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        let stats = scheduler.run_until(async {}).await;
        assert_eq!(stats, SchedulerStats::default());
        assert_eq!(coordinator.cursor(), None);
    }
}
