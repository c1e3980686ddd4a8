//! SQLite adapter: reads the trade ledger and owns the analytic tables,
//! cursor and checkpoint log, all in one database file.

use crate::domain::checkpoint::{Checkpoint, CycleStatus, SnapshotType};
use crate::domain::error::AnalyticsError;
use crate::domain::order::{ClosedOrder, TIMESTAMP_FORMAT};
use crate::domain::tables::MaterializedTable;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::store_port::AnalyticsStorePort;
use chrono::{DateTime, NaiveDateTime, Timelike};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Transaction};

/// Every analytic table the store owns, in calculator order.
pub const ANALYTIC_TABLES: [&str; 8] = [
    "performance_rankings",
    "risk_metrics",
    "strategy_performance",
    "timing_analysis",
    "pair_analytics",
    "stop_loss_analytics",
    "duration_patterns",
    "bot_health_metrics",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trades (
    trade_id INTEGER PRIMARY KEY,
    pair TEXT NOT NULL,
    base_currency TEXT NOT NULL,
    quote_currency TEXT NOT NULL,
    strategy TEXT NOT NULL,
    profit_ratio REAL NOT NULL,
    profit_pct REAL NOT NULL,
    profit_abs REAL NOT NULL,
    trade_duration INTEGER NOT NULL,
    exit_reason TEXT NOT NULL,
    stop_loss_pct REAL,
    stake_amount REAL NOT NULL,
    open_date TEXT NOT NULL,
    close_date TEXT,
    is_open INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_trades_closed ON trades(is_open, trade_id);

CREATE TABLE IF NOT EXISTS analysis_cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_trade_id INTEGER,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analysis_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_type TEXT NOT NULL,
    records_processed INTEGER NOT NULL,
    status TEXT NOT NULL,
    last_trade_id INTEGER,
    rows_written INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS performance_rankings (
    entity_name TEXT NOT NULL,
    profit_ratio REAL NOT NULL,
    profit_pct REAL NOT NULL,
    profit_abs REAL NOT NULL,
    trade_count INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    avg_duration_minutes REAL NOT NULL,
    max_profit_pct REAL NOT NULL,
    min_profit_pct REAL NOT NULL,
    total_volume REAL NOT NULL,
    rank_position INTEGER NOT NULL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS risk_metrics (
    analysis_type TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    trade_count INTEGER NOT NULL,
    sl_triggered_count INTEGER NOT NULL,
    sl_effectiveness_pct REAL NOT NULL,
    max_drawdown_pct REAL NOT NULL,
    max_drawdown_abs REAL NOT NULL,
    volatility_pct REAL NOT NULL,
    sharpe_ratio REAL NOT NULL,
    reward_risk_ratio REAL NOT NULL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS strategy_performance (
    strategy_name TEXT NOT NULL,
    total_trades INTEGER NOT NULL,
    winning_trades INTEGER NOT NULL,
    losing_trades INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    avg_profit_pct REAL NOT NULL,
    total_profit_abs REAL NOT NULL,
    profit_factor REAL NOT NULL,
    expectancy REAL NOT NULL,
    best_trade_pct REAL NOT NULL,
    worst_trade_pct REAL NOT NULL,
    max_consecutive_wins INTEGER NOT NULL,
    max_consecutive_losses INTEGER NOT NULL,
    consistency_score REAL,
    sharpe_ratio REAL NOT NULL,
    sortino_ratio REAL NOT NULL,
    calmar_ratio REAL NOT NULL,
    avg_duration_minutes REAL NOT NULL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS timing_analysis (
    time_category TEXT NOT NULL,
    time_value TEXT NOT NULL,
    trade_count INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    avg_profit_pct REAL NOT NULL,
    total_profit_abs REAL NOT NULL,
    avg_duration_minutes REAL NOT NULL,
    best_hour INTEGER,
    worst_hour INTEGER,
    weekend_profit_pct REAL,
    weekday_profit_pct REAL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pair_analytics (
    pair TEXT NOT NULL,
    base_currency TEXT NOT NULL,
    quote_currency TEXT NOT NULL,
    total_trades INTEGER NOT NULL,
    winning_trades INTEGER NOT NULL,
    losing_trades INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    avg_profit_pct REAL NOT NULL,
    total_profit_abs REAL NOT NULL,
    avg_duration_minutes REAL NOT NULL,
    volatility_pct REAL NOT NULL,
    max_consecutive_wins INTEGER NOT NULL,
    max_consecutive_losses INTEGER NOT NULL,
    profit_factor REAL NOT NULL,
    sharpe_ratio REAL NOT NULL,
    best_trade_pct REAL NOT NULL,
    worst_trade_pct REAL NOT NULL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stop_loss_analytics (
    analysis_type TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    total_trades INTEGER NOT NULL,
    total_trades_with_sl INTEGER NOT NULL,
    stop_loss_level_pct REAL,
    sl_triggered_count INTEGER NOT NULL,
    sl_trigger_rate_pct REAL NOT NULL,
    sl_effectiveness_pct REAL NOT NULL,
    avg_loss_when_triggered_pct REAL,
    avg_profit_when_not_triggered_pct REAL,
    optimal_sl_level_pct REAL,
    max_loss_when_triggered_pct REAL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS duration_patterns (
    pattern_type TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    duration_category TEXT NOT NULL,
    min_duration_minutes INTEGER NOT NULL,
    max_duration_minutes INTEGER NOT NULL,
    trade_count INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    avg_profit_pct REAL NOT NULL,
    total_profit_abs REAL NOT NULL,
    avg_duration_minutes REAL NOT NULL,
    profit_per_hour REAL NOT NULL,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bot_health_metrics (
    metric_name TEXT NOT NULL,
    metric_value REAL NOT NULL,
    metric_unit TEXT NOT NULL,
    health_status TEXT NOT NULL,
    threshold_warning REAL NOT NULL,
    threshold_critical REAL NOT NULL,
    analysis_date TEXT NOT NULL
);
";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Ledger timestamps as bots write them: space or `T` separated, optional
/// fractional seconds, optional UTC offset. Fractions are dropped.
const LEDGER_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_ts(idx: usize, text: &str) -> rusqlite::Result<NaiveDateTime> {
    let text = text.trim();
    let parsed = LEDGER_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        });
    match parsed {
        Some(ts) => Ok(ts.with_nanosecond(0).unwrap_or(ts)),
        None => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognised timestamp {text:?}").into(),
        )),
    }
}

fn unknown_label(idx: usize, label: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown label {label:?}").into(),
    )
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        let db_path = config.require_string("ledger", "path")?;

        let pool_size = config.get_int("ledger", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, AnalyticsError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), AnalyticsError> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Seed closed trades into the ledger table.
    pub fn insert_orders(&self, orders: &[ClosedOrder]) -> Result<(), AnalyticsError> {
        self.insert_trades(orders, false)
    }

    /// Seed trades that are still open; the ledger reader must ignore them.
    pub fn insert_open_orders(&self, orders: &[ClosedOrder]) -> Result<(), AnalyticsError> {
        self.insert_trades(orders, true)
    }

    fn insert_trades(&self, orders: &[ClosedOrder], is_open: bool) -> Result<(), AnalyticsError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO trades (
                    trade_id, pair, base_currency, quote_currency, strategy,
                    profit_ratio, profit_pct, profit_abs, trade_duration, exit_reason,
                    stop_loss_pct, stake_amount, open_date, close_date, is_open
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for o in orders {
                stmt.execute(params![
                    o.id,
                    o.pair,
                    o.base_currency,
                    o.quote_currency,
                    o.strategy,
                    o.profit_ratio,
                    o.profit_pct,
                    o.profit_abs,
                    o.duration_minutes,
                    o.exit_reason,
                    o.stop_loss_pct,
                    o.stake_amount,
                    format_ts(o.open_date),
                    o.close_date.map(format_ts),
                    is_open,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Current row count of each analytic table.
    pub fn table_row_counts(&self) -> Result<Vec<(&'static str, usize)>, AnalyticsError> {
        let conn = self.pool.get()?;
        ANALYTIC_TABLES
            .iter()
            .map(|table| -> Result<(&'static str, usize), AnalyticsError> {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
                Ok((*table, count as usize))
            })
            .collect()
    }
}

fn write_rows(tx: &Transaction<'_>, table: &MaterializedTable, date: &str) -> rusqlite::Result<()> {
    match table {
        MaterializedTable::Rankings(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO performance_rankings (
                    entity_name, profit_ratio, profit_pct, profit_abs, trade_count, win_rate,
                    avg_duration_minutes, max_profit_pct, min_profit_pct, total_volume,
                    rank_position, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.entity_name,
                    r.profit_ratio,
                    r.profit_pct,
                    r.profit_abs,
                    r.trade_count as i64,
                    r.win_rate_pct,
                    r.avg_duration_minutes,
                    r.max_profit_pct,
                    r.min_profit_pct,
                    r.total_volume,
                    r.rank_position as i64,
                    date,
                ])?;
            }
        }
        MaterializedTable::Risk(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO risk_metrics (
                    analysis_type, entity_name, trade_count, sl_triggered_count,
                    sl_effectiveness_pct, max_drawdown_pct, max_drawdown_abs, volatility_pct,
                    sharpe_ratio, reward_risk_ratio, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.scope.as_str(),
                    r.entity_name,
                    r.trade_count as i64,
                    r.sl_triggered_count as i64,
                    r.sl_effectiveness_pct,
                    r.max_drawdown_pct,
                    r.max_drawdown_abs,
                    r.volatility_pct,
                    r.sharpe_ratio,
                    r.reward_risk_ratio,
                    date,
                ])?;
            }
        }
        MaterializedTable::Strategy(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO strategy_performance (
                    strategy_name, total_trades, winning_trades, losing_trades, win_rate,
                    avg_profit_pct, total_profit_abs, profit_factor, expectancy,
                    best_trade_pct, worst_trade_pct, max_consecutive_wins,
                    max_consecutive_losses, consistency_score, sharpe_ratio, sortino_ratio,
                    calmar_ratio, avg_duration_minutes, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                           ?16, ?17, ?18, ?19)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.strategy_name,
                    r.total_trades as i64,
                    r.winning_trades as i64,
                    r.losing_trades as i64,
                    r.win_rate_pct,
                    r.avg_profit_pct,
                    r.total_profit_abs,
                    r.profit_factor,
                    r.expectancy,
                    r.best_trade_pct,
                    r.worst_trade_pct,
                    r.max_win_streak as i64,
                    r.max_loss_streak as i64,
                    r.consistency_score,
                    r.sharpe_ratio,
                    r.sortino_ratio,
                    r.calmar_ratio,
                    r.avg_duration_minutes,
                    date,
                ])?;
            }
        }
        MaterializedTable::Timing(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO timing_analysis (
                    time_category, time_value, trade_count, win_rate, avg_profit_pct,
                    total_profit_abs, avg_duration_minutes, best_hour, worst_hour,
                    weekend_profit_pct, weekday_profit_pct, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.time_category.as_str(),
                    r.time_value,
                    r.trade_count as i64,
                    r.win_rate_pct,
                    r.avg_profit_pct,
                    r.total_profit_abs,
                    r.avg_duration_minutes,
                    r.best_hour,
                    r.worst_hour,
                    r.weekend_profit_pct,
                    r.weekday_profit_pct,
                    date,
                ])?;
            }
        }
        MaterializedTable::Pairs(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO pair_analytics (
                    pair, base_currency, quote_currency, total_trades, winning_trades,
                    losing_trades, win_rate, avg_profit_pct, total_profit_abs,
                    avg_duration_minutes, volatility_pct, max_consecutive_wins,
                    max_consecutive_losses, profit_factor, sharpe_ratio, best_trade_pct,
                    worst_trade_pct, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                           ?16, ?17, ?18)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.pair,
                    r.base_currency,
                    r.quote_currency,
                    r.total_trades as i64,
                    r.winning_trades as i64,
                    r.losing_trades as i64,
                    r.win_rate_pct,
                    r.avg_profit_pct,
                    r.total_profit_abs,
                    r.avg_duration_minutes,
                    r.volatility_pct,
                    r.max_win_streak as i64,
                    r.max_loss_streak as i64,
                    r.profit_factor,
                    r.sharpe_ratio,
                    r.best_trade_pct,
                    r.worst_trade_pct,
                    date,
                ])?;
            }
        }
        MaterializedTable::StopLoss(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO stop_loss_analytics (
                    analysis_type, entity_name, total_trades, total_trades_with_sl,
                    stop_loss_level_pct, sl_triggered_count, sl_trigger_rate_pct,
                    sl_effectiveness_pct, avg_loss_when_triggered_pct,
                    avg_profit_when_not_triggered_pct, optimal_sl_level_pct,
                    max_loss_when_triggered_pct, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.scope.as_str(),
                    r.entity_name,
                    r.total_trades as i64,
                    r.trades_with_sl as i64,
                    r.avg_sl_level_pct,
                    r.sl_triggered_count as i64,
                    r.sl_trigger_rate_pct,
                    r.sl_effectiveness_pct,
                    r.avg_loss_when_triggered_pct,
                    r.avg_profit_when_not_triggered_pct,
                    r.optimal_sl_level_pct,
                    r.max_loss_when_triggered_pct,
                    date,
                ])?;
            }
        }
        MaterializedTable::Duration(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO duration_patterns (
                    pattern_type, entity_name, duration_category, min_duration_minutes,
                    max_duration_minutes, trade_count, win_rate, avg_profit_pct,
                    total_profit_abs, avg_duration_minutes, profit_per_hour, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.scope.as_str(),
                    r.entity_name,
                    r.bucket.as_str(),
                    r.min_duration_minutes,
                    r.max_duration_minutes,
                    r.trade_count as i64,
                    r.win_rate_pct,
                    r.avg_profit_pct,
                    r.total_profit_abs,
                    r.avg_duration_minutes,
                    r.profit_per_hour,
                    date,
                ])?;
            }
        }
        MaterializedTable::Health(rows) => {
            let mut stmt = tx.prepare(
                "INSERT INTO bot_health_metrics (
                    metric_name, metric_value, metric_unit, health_status,
                    threshold_warning, threshold_critical, analysis_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.metric.key(),
                    r.value,
                    r.metric.unit(),
                    r.status.as_str(),
                    r.threshold_warning,
                    r.threshold_critical,
                    date,
                ])?;
            }
        }
    }
    Ok(())
}

impl LedgerPort for SqliteAdapter {
    fn count_new_closed_orders(
        &self,
        after: Option<i64>,
    ) -> Result<(usize, Option<i64>), AnalyticsError> {
        let conn = self.pool.get()?;
        let (count, max_id): (i64, Option<i64>) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM trades WHERE is_open = 0 AND trade_id > ?1),
                (SELECT MAX(trade_id) FROM trades WHERE is_open = 0)",
            params![after.unwrap_or(i64::MIN)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((count as usize, max_id))
    }

    fn fetch_closed_orders(&self, up_to: i64) -> Result<Vec<ClosedOrder>, AnalyticsError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT trade_id, pair, base_currency, quote_currency, strategy,
                    profit_ratio, profit_pct, profit_abs, trade_duration, exit_reason,
                    stop_loss_pct, stake_amount, open_date, close_date
             FROM trades
             WHERE is_open = 0 AND trade_id <= ?1
             ORDER BY trade_id ASC",
        )?;

        let rows = stmt.query_map(params![up_to], |row| {
            let open_date: String = row.get(12)?;
            let close_date: Option<String> = row.get(13)?;
            Ok(ClosedOrder {
                id: row.get(0)?,
                pair: row.get(1)?,
                base_currency: row.get(2)?,
                quote_currency: row.get(3)?,
                strategy: row.get(4)?,
                profit_ratio: row.get(5)?,
                profit_pct: row.get(6)?,
                profit_abs: row.get(7)?,
                duration_minutes: row.get(8)?,
                exit_reason: row.get(9)?,
                stop_loss_pct: row.get(10)?,
                stake_amount: row.get(11)?,
                open_date: parse_ts(12, &open_date)?,
                close_date: close_date.map(|s| parse_ts(13, &s)).transpose()?,
            })
        })?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        Ok(orders)
    }
}

impl AnalyticsStorePort for SqliteAdapter {
    fn replace_table(
        &self,
        table: &MaterializedTable,
        as_of: NaiveDateTime,
    ) -> Result<usize, AnalyticsError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", table.table_name()), [])?;
        write_rows(&tx, table, &format_ts(as_of))?;
        tx.commit()?;
        Ok(table.len())
    }

    fn load_cursor(&self) -> Result<Option<i64>, AnalyticsError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT last_trade_id FROM analysis_cursor WHERE id = 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }

    fn record_cycle(
        &self,
        cursor: Option<i64>,
        checkpoint: &Checkpoint,
    ) -> Result<(), AnalyticsError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let created_at = format_ts(checkpoint.created_at);
        tx.execute(
            "INSERT INTO analysis_cursor (id, last_trade_id, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                last_trade_id = excluded.last_trade_id,
                updated_at = excluded.updated_at",
            params![cursor, created_at],
        )?;
        tx.execute(
            "INSERT INTO analysis_snapshots (
                snapshot_type, records_processed, status, last_trade_id,
                rows_written, created_at, error_message
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                checkpoint.snapshot_type.as_str(),
                checkpoint.records_processed as i64,
                checkpoint.status.as_str(),
                checkpoint.last_trade_id,
                checkpoint.rows_written as i64,
                created_at,
                checkpoint.error_message,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, AnalyticsError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT snapshot_type, records_processed, status, last_trade_id,
                    rows_written, created_at, error_message
             FROM analysis_snapshots
             ORDER BY id DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query([])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let snapshot_type: String = row.get(0)?;
        let status: String = row.get(2)?;
        let created_at: String = row.get(5)?;
        let records_processed: i64 = row.get(1)?;
        let rows_written: i64 = row.get(4)?;
        Ok(Some(Checkpoint {
            snapshot_type: SnapshotType::parse(&snapshot_type)
                .ok_or_else(|| unknown_label(0, &snapshot_type))?,
            records_processed: records_processed as usize,
            status: CycleStatus::parse(&status).ok_or_else(|| unknown_label(2, &status))?,
            last_trade_id: row.get(3)?,
            rows_written: rows_written as usize,
            created_at: parse_ts(5, &created_at)?,
            error_message: row.get(6)?,
        }))
    }
}
