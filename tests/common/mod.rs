#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::io::Write;
use std::path::PathBuf;
use tradelens::adapters::file_config_adapter::FileConfigAdapter;
use tradelens::cli::Engine;
pub use tradelens::domain::order::{ClosedOrder, STOP_LOSS_EXIT};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Closed order opened 2024-03-04 (a Monday) at 09:00, held one hour per id.
pub fn make_order(id: i64, pair: &str, strategy: &str, profit_pct: f64) -> ClosedOrder {
    let open = at(2024, 3, 4, 9, 0);
    ClosedOrder {
        id,
        pair: pair.to_string(),
        base_currency: pair.split('/').next().unwrap_or(pair).to_string(),
        quote_currency: pair.split('/').nth(1).unwrap_or("USDT").to_string(),
        strategy: strategy.to_string(),
        profit_ratio: profit_pct / 100.0,
        profit_pct,
        profit_abs: profit_pct * 5.0,
        duration_minutes: 60,
        exit_reason: "roi".to_string(),
        stop_loss_pct: Some(-5.0),
        stake_amount: 500.0,
        open_date: open,
        close_date: Some(open + chrono::Duration::hours(id)),
    }
}

pub fn with_duration(mut order: ClosedOrder, minutes: i64) -> ClosedOrder {
    order.duration_minutes = minutes;
    order.close_date = Some(order.open_date + chrono::Duration::minutes(minutes));
    order
}

pub fn stop_loss_exit(mut order: ClosedOrder) -> ClosedOrder {
    order.exit_reason = STOP_LOSS_EXIT.to_string();
    order
}

/// On-disk ledger plus an INI file pointing at it.
pub struct TestLedger {
    pub dir: tempfile::TempDir,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended after the `[ledger]` section.
    pub fn with_config(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("trades.db");
        let config_path = dir.path().join("tradelens.ini");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            "[ledger]\npath = {}\npool_size = 2\n\n{extra}",
            db_path.display()
        )
        .unwrap();
        Self {
            dir,
            db_path,
            config_path,
        }
    }

    pub fn config(&self) -> FileConfigAdapter {
        FileConfigAdapter::load(&self.config_path).unwrap()
    }

    pub fn engine(&self) -> Engine {
        Engine::from_config(&self.config()).unwrap()
    }

    pub fn connection(&self) -> Connection {
        Connection::open(&self.db_path).unwrap()
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Every row of `table` rendered as text, in storage order.
pub fn dump_table(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {table}")).unwrap();
    let columns = stmt.column_count();
    stmt.query_map([], |row| {
        let mut cells = Vec::with_capacity(columns);
        for i in 0..columns {
            let value: rusqlite::types::Value = row.get(i)?;
            cells.push(format!("{value:?}"));
        }
        Ok(cells.join("|"))
    })
    .unwrap()
    .collect::<Result<_, _>>()
    .unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> usize {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
        r.get::<_, i64>(0)
    })
    .unwrap() as usize
}
