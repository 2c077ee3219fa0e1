use std::path::Path;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{LogName, LogSink};
use crate::db;
use crate::error::AppError;

/// Local stand-in for the spreadsheet service: every row lands in `log_rows`.
pub struct SqliteLogSink {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredLogRow {
    pub id: i64,
    pub log: LogName,
    pub cells: Vec<String>,
    pub row_hash: String,
}

impl SqliteLogSink {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let mut conn = db::open(path)?;
        db::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let mut conn = db::open_in_memory()?;
        db::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn rows(&self, log: LogName) -> Result<Vec<StoredLogRow>, AppError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, ts, query, answer, value, row_hash FROM log_rows \
                 WHERE log_name = ?1 ORDER BY id",
            )
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to prepare log row query")
                    .with_details(e.to_string())
            })?;

        let rows = stmt
            .query_map([log.sheet_name()], |row| {
                Ok(StoredLogRow {
                    id: row.get(0)?,
                    log,
                    cells: vec![row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?],
                    row_hash: row.get(5)?,
                })
            })
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to query log rows")
                    .with_details(e.to_string())
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to read log row")
                    .with_details(e.to_string())
            })?);
        }
        Ok(out)
    }
}

fn row_hash(log: LogName, row: &[String]) -> Result<String, AppError> {
    let json = serde_json::to_string(&(log.sheet_name(), row)).map_err(|e| {
        AppError::new("LOGGING_FAILED", "Failed to serialize log row")
            .with_details(e.to_string())
    })?;
    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}

impl LogSink for SqliteLogSink {
    fn append_row(&self, log: LogName, row: &[String]) -> Result<(), AppError> {
        let [ts, query, answer, value] = row else {
            return Err(
                AppError::new("LOGGING_FAILED", "Log rows must have exactly four cells")
                    .with_details(format!("log={}; cells={}", log.sheet_name(), row.len())),
            );
        };
        let hash = row_hash(log, row)?;

        self.conn
            .execute(
                "INSERT INTO log_rows(log_name, ts, query, answer, value, row_hash) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![log.sheet_name(), ts, query, answer, value, hash],
            )
            .map_err(|e| {
                AppError::new("LOGGING_FAILED", "Failed to append log row")
                    .with_details(e.to_string())
            })?;
        Ok(())
    }
}
