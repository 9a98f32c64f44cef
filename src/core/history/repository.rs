//! Database operations for scan history.

use super::types::{ScanHistory, ScanRecord, ScanStatus};
use crate::error::HistoryError;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Repository for scan history records, most recent first
pub struct HistoryRepository {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl HistoryRepository {
    /// Open or create the history database
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| HistoryError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS scan_history (
                id TEXT PRIMARY KEY,
                scan_time INTEGER NOT NULL,
                total_items INTEGER NOT NULL,
                category_counts TEXT NOT NULL,
                reclaimable_bytes INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scan_history_time ON scan_history(scan_time DESC)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Save a scan record
    pub fn save(&self, record: &ScanRecord) -> Result<(), HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))?;

        let counts_json = serde_json::to_string(&record.category_counts)
            .map_err(|e| HistoryError::SerializationFailed(e.to_string()))?;
        let (status_str, error_msg) = match &record.status {
            ScanStatus::Completed => ("completed", None),
            ScanStatus::Cancelled => ("cancelled", None),
            ScanStatus::Error(msg) => ("error", Some(msg.as_str())),
        };

        conn.execute(
            "INSERT OR REPLACE INTO scan_history
             (id, scan_time, total_items, category_counts, reclaimable_bytes,
              duration_ms, status, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.scan_time,
                record.total_items as i64,
                counts_json,
                record.reclaimable_bytes as i64,
                record.duration_ms as i64,
                status_str,
                error_msg,
            ],
        )?;

        Ok(())
    }

    /// List scan records, most recent first, with pagination
    pub fn list_recent(&self, limit: usize, offset: usize) -> Result<ScanHistory, HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))?;

        let total_count: usize =
            conn.query_row("SELECT COUNT(*) FROM scan_history", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })?;

        let mut stmt = conn.prepare(
            "SELECT id, scan_time, total_items, category_counts, reclaimable_bytes,
                    duration_ms, status, error_message
             FROM scan_history
             ORDER BY scan_time DESC
             LIMIT ? OFFSET ?",
        )?;

        let records: Vec<ScanRecord> = stmt
            .query_map(params![limit as i64, offset as i64], row_to_record)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(ScanHistory {
            records,
            total_count,
        })
    }

    /// Get a specific record by ID
    pub fn get(&self, id: &str) -> Result<Option<ScanRecord>, HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))?;

        let result = conn.query_row(
            "SELECT id, scan_time, total_items, category_counts, reclaimable_bytes,
                    duration_ms, status, error_message
             FROM scan_history WHERE id = ?",
            [id],
            row_to_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a record
    pub fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))?;

        let rows_affected = conn.execute("DELETE FROM scan_history WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Clear all history, returning the number of removed records
    pub fn clear(&self) -> Result<usize, HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))?;

        let count: usize = conn.query_row("SELECT COUNT(*) FROM scan_history", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })?;

        conn.execute("DELETE FROM scan_history", [])?;
        Ok(count)
    }

    /// Generate a new unique record ID
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    let id: String = row.get(0)?;
    let scan_time: i64 = row.get(1)?;
    let total_items: i64 = row.get(2)?;
    let counts_json: String = row.get(3)?;
    let reclaimable_bytes: i64 = row.get(4)?;
    let duration_ms: i64 = row.get(5)?;
    let status_str: String = row.get(6)?;
    let error_message: Option<String> = row.get(7)?;

    Ok(ScanRecord {
        id,
        scan_time,
        total_items: total_items as usize,
        category_counts: serde_json::from_str(&counts_json).unwrap_or_else(|_| HashMap::new()),
        reclaimable_bytes: reclaimable_bytes as u64,
        duration_ms: duration_ms as u64,
        status: ScanStatus::from_str(&status_str, error_message.as_deref()),
    })
}
