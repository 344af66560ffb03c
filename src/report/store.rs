//! Report archive — keyed SQLite store for finished analysis reports.
//!
//! Unencrypted local database at `reports_dir/reports.db`. Only payloads
//! that already passed validation (or repair) are stored; the store itself
//! never inspects report content beyond serialization.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde_json::Value;
use uuid::Uuid;

use crate::analysis::kinds::ResponseKind;

use super::ReportStoreError;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One archived report row.
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub id: Uuid,
    pub kind: ResponseKind,
    /// The structured response exactly as the pipeline produced it.
    pub payload: Value,
    /// Validation completeness score at archive time, 0-100.
    pub completeness: u8,
    pub created_at: NaiveDateTime,
}

impl ReportRecord {
    pub fn new(kind: ResponseKind, payload: Value, completeness: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            completeness,
            created_at: chrono::Local::now().naive_local(),
        }
    }
}

/// Open (or create) the report archive and run migrations.
pub fn open_report_store(reports_dir: &Path) -> Result<Connection, ReportStoreError> {
    let db_path = reports_dir.join("reports.db");
    let conn = Connection::open(&db_path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory report archive (for testing).
pub fn open_memory_report_store() -> Result<Connection, ReportStoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), ReportStoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS schema_version (
         version INTEGER PRIMARY KEY,
         applied_at TEXT NOT NULL DEFAULT (datetime('now'))
     );
     CREATE TABLE IF NOT EXISTS reports (
         id TEXT PRIMARY KEY,
         kind TEXT NOT NULL,
         payload TEXT NOT NULL,
         completeness INTEGER NOT NULL,
         created_at TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at DESC);
     INSERT INTO schema_version (version) VALUES (1);",
)];

fn run_migrations(conn: &Connection) -> Result<(), ReportStoreError> {
    let current_version = get_current_version(conn);

    for &(version, sql) in MIGRATIONS {
        if version > current_version {
            tracing::info!("Running report store migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| ReportStoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Archive one finished report.
pub fn insert_report(conn: &Connection, record: &ReportRecord) -> Result<(), ReportStoreError> {
    let payload = serde_json::to_string(&record.payload)?;
    conn.execute(
        "INSERT INTO reports (id, kind, payload, completeness, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.id.to_string(),
            record.kind.as_str(),
            payload,
            record.completeness,
            record.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Fetch one archived report by id.
pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<ReportRecord>, ReportStoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, payload, completeness, created_at
         FROM reports WHERE id = ?1 LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![id.to_string()], row_to_record)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// List the most recent reports, newest first.
pub fn list_recent_reports(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<ReportRecord>, ReportStoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, payload, completeness, created_at
         FROM reports ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], row_to_record)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Delete one archived report. Returns whether a row was removed.
pub fn delete_report(conn: &Connection, id: &Uuid) -> Result<bool, ReportStoreError> {
    let affected = conn.execute("DELETE FROM reports WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

fn row_to_record(row: &rusqlite::Row) -> Result<ReportRecord, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let payload_str: String = row.get(2)?;
    let completeness: i64 = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(ReportRecord {
        id: Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        kind: ResponseKind::from_str(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown report kind '{kind_str}'").into(),
            )
        })?,
        payload: serde_json::from_str(&payload_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        completeness: completeness.clamp(0, 100) as u8,
        created_at: NaiveDateTime::parse_from_str(&created_str, DATETIME_FORMAT)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_store() -> Connection {
        open_memory_report_store().unwrap()
    }

    fn make_record(kind: ResponseKind) -> ReportRecord {
        ReportRecord::new(
            kind,
            json!({
                "score": 72,
                "status": "good",
                "analysis": "Alpha activity within expected range.",
                "recommendations": ["keep a regular sleep schedule"],
                "concerns": []
            }),
            100,
        )
    }

    #[test]
    fn store_initializes_schema() {
        let conn = test_store();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_is_idempotent() {
        let conn = test_store();
        assert!(run_migrations(&conn).is_ok());
    }

    #[test]
    fn insert_and_retrieve() {
        let conn = test_store();
        let record = make_record(ResponseKind::Eeg);
        insert_report(&conn, &record).unwrap();

        let fetched = get_report(&conn, &record.id).unwrap().unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.kind, ResponseKind::Eeg);
        assert_eq!(fetched.payload["score"], 72);
        assert_eq!(fetched.completeness, 100);
    }

    #[test]
    fn missing_returns_none() {
        let conn = test_store();
        assert!(get_report(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn recent_list_is_newest_first_and_bounded() {
        let conn = test_store();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut record = make_record(ResponseKind::Ppg);
            record.created_at =
                NaiveDateTime::parse_from_str(&format!("2026-08-0{} 12:00:00", i + 1), "%Y-%m-%d %H:%M:%S")
                    .unwrap();
            insert_report(&conn, &record).unwrap();
            ids.push(record.id);
        }

        let recent = list_recent_reports(&conn, 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);
        assert_eq!(recent[2].id, ids[2]);
    }

    #[test]
    fn delete_removes_the_row() {
        let conn = test_store();
        let record = make_record(ResponseKind::Comprehensive);
        insert_report(&conn, &record).unwrap();

        assert!(delete_report(&conn, &record.id).unwrap());
        assert!(get_report(&conn, &record.id).unwrap().is_none());
        assert!(!delete_report(&conn, &record.id).unwrap());
    }

    #[test]
    fn kind_round_trips_through_storage() {
        let conn = test_store();
        for kind in [
            ResponseKind::Eeg,
            ResponseKind::Ppg,
            ResponseKind::Comprehensive,
            ResponseKind::MentalHealthRisk,
        ] {
            let record = make_record(kind);
            insert_report(&conn, &record).unwrap();
            assert_eq!(get_report(&conn, &record.id).unwrap().unwrap().kind, kind);
        }
    }

    #[test]
    fn on_disk_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let record = make_record(ResponseKind::Eeg);
        {
            let conn = open_report_store(dir.path()).unwrap();
            insert_report(&conn, &record).unwrap();
        }
        let conn = open_report_store(dir.path()).unwrap();
        let fetched = get_report(&conn, &record.id).unwrap().unwrap();
        assert_eq!(fetched.payload["status"], "good");
    }
}
