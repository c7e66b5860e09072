use rusqlite::{Connection, Result, params, params_from_iter, types::Value};
use serde::Serialize;

use crate::constants;
use crate::model::{PersistedRow, TradingRecord, session_dates};

const INSERT_COLUMNS: &str =
    "ticker, session_date, open_price, min_price, max_price, avg_price, last_price, volume";

const INSERT_SQL: &str = "INSERT INTO trading_record \
    (ticker, session_date, open_price, min_price, max_price, avg_price, last_price, volume) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Initializes the trading record table. The CHECK constraints enforce the
/// record invariants (non-empty key, non-negative prices and volume) at the
/// store boundary.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS trading_record (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL CHECK (length(ticker) > 0),
            session_date TEXT NOT NULL CHECK (length(session_date) > 0),
            open_price REAL NOT NULL CHECK (open_price >= 0),
            min_price REAL NOT NULL CHECK (min_price >= 0),
            max_price REAL NOT NULL CHECK (max_price >= 0),
            avg_price REAL NOT NULL CHECK (avg_price >= 0),
            last_price REAL NOT NULL CHECK (last_price >= 0),
            volume INTEGER NOT NULL CHECK (volume >= 0),
            inserted_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_trading_record_ticker_date \
         ON trading_record (ticker, session_date);",
        [],
    )?;
    Ok(())
}

/// Deletes every existing row for the given session dates, so reloading a
/// session replaces its rows instead of double-counting them.
pub fn delete_sessions(conn: &Connection, dates: &[String]) -> Result<usize> {
    let mut deleted = 0;
    for date in dates {
        deleted += conn.execute(
            "DELETE FROM trading_record WHERE session_date = ?1",
            params![date],
        )?;
    }
    if deleted > 0 {
        log::info!("removed {} existing rows for reloaded sessions", deleted);
    }
    Ok(deleted)
}

/// Outcome of one load: how many records were attempted, landed, failed.
#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
}

fn record_values(record: &TradingRecord) -> [Value; 8] {
    [
        Value::Text(record.ticker.clone()),
        Value::Text(record.session_date.value().clone()),
        Value::Real(*record.open.value()),
        Value::Real(*record.min.value()),
        Value::Real(*record.max.value()),
        Value::Real(*record.average.value()),
        Value::Real(*record.last.value()),
        Value::Integer(*record.volume.value()),
    ]
}

// One multi-row insert per batch, committed as its own unit of work. A
// dropped transaction rolls back.
fn insert_batch(conn: &mut Connection, batch: &[TradingRecord]) -> Result<()> {
    let transaction = conn.transaction()?;
    {
        let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?)"; batch.len()].join(", ");
        let sql = format!("INSERT INTO trading_record ({INSERT_COLUMNS}) VALUES {placeholders}");
        let mut stmt = transaction.prepare(&sql)?;
        stmt.execute(params_from_iter(batch.iter().flat_map(record_values)))?;
    }
    transaction.commit()
}

/// Loads a deduplicated record set: ensures the table exists, deletes the
/// rows of every session date present in the set, then inserts in
/// fixed-size batches. A failed batch is rolled back and retried record by
/// record so one bad record never blocks the rest of its batch. Errors
/// before the first insert (connection, table verification, delete)
/// propagate and fail the run.
pub fn load_records(conn: &mut Connection, records: &[TradingRecord]) -> Result<LoadReport> {
    let attempted = records.len();
    let mut report = LoadReport {
        attempted,
        inserted: 0,
        failed: 0,
    };
    if records.is_empty() {
        log::info!("no records to insert");
        return Ok(report);
    }

    create_table(conn)?;
    delete_sessions(conn, &session_dates(records))?;

    for (index, batch) in records.chunks(constants::INSERT_BATCH_SIZE).enumerate() {
        match insert_batch(conn, batch) {
            Ok(()) => {
                report.inserted += batch.len();
                log::info!(
                    "batch {}: {} records inserted ({}/{})",
                    index + 1,
                    batch.len(),
                    report.inserted,
                    attempted
                );
            }
            Err(err) => {
                log::error!(
                    "batch {} failed, retrying record by record: {}",
                    index + 1,
                    err
                );
                for record in batch {
                    match conn.execute(INSERT_SQL, params_from_iter(record_values(record))) {
                        Ok(_) => report.inserted += 1,
                        Err(err) => {
                            report.failed += 1;
                            log::error!("could not insert {}: {}", record.ticker, err);
                        }
                    }
                }
            }
        }
    }

    log::info!(
        "inserted {} of {} records ({} failed)",
        report.inserted,
        attempted,
        report.failed
    );
    Ok(report)
}

/// Store-wide totals backing the status command.
#[derive(Debug, Serialize)]
pub struct StoreSummary {
    pub total_rows: i64,
    pub sessions: i64,
    pub tickers: i64,
    pub last_session: Option<String>,
    pub last_insertion: Option<String>,
}

pub fn summary(conn: &Connection) -> Result<StoreSummary> {
    create_table(conn)?;
    conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT session_date), COUNT(DISTINCT ticker),
                MAX(session_date), MAX(inserted_at)
         FROM trading_record",
        [],
        |row| {
            Ok(StoreSummary {
                total_rows: row.get(0)?,
                sessions: row.get(1)?,
                tickers: row.get(2)?,
                last_session: row.get(3)?,
                last_insertion: row.get(4)?,
            })
        },
    )
}

/// Retrieves the persisted rows of one session, in ticker order.
pub fn session_rows(conn: &Connection, session_date: &str) -> Result<Vec<PersistedRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, ticker, session_date, open_price, min_price, max_price,
                avg_price, last_price, volume, inserted_at
         FROM trading_record
         WHERE session_date = ?1 ORDER BY ticker",
    )?;
    let mut rows = stmt.query(params![session_date])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(PersistedRow {
            id: row.get(0)?,
            ticker: row.get(1)?,
            session_date: row.get(2)?,
            open: row.get(3)?,
            min: row.get(4)?,
            max: row.get(5)?,
            average: row.get(6)?,
            last: row.get(7)?,
            volume: row.get(8)?,
            inserted_at: row.get(9)?,
        });
    }
    Ok(out)
}
