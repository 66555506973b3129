use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};

use super::{AuditError, AuditFilter, AuditRecord, AuditStore};
use crate::db::{self, Database};

const COLUMNS: &str = "id, timestamp, event_type, ticket_id, desk_id, user_id, data";

/// SQLite-backed audit store, sharing the queue's database.
pub struct SqliteAuditStore {
    db: Database,
}

impl SqliteAuditStore {
    /// Wrap `db`, creating the audit table if needed.
    pub fn new(db: Database) -> Result<Self, AuditError> {
        db.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                ticket_id INTEGER,
                desk_id INTEGER,
                user_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_ticket ON audit_events(ticket_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_desk ON audit_events(desk_id, timestamp);
            "#,
        )?;
        Ok(Self { db })
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::new(Database::in_memory()?)
    }
}

/// `WHERE` clause and its bound values for `filter`.
fn selection(filter: &AuditFilter) -> (String, Vec<Value>) {
    let mut terms = Vec::new();
    let mut values = Vec::new();

    let mut term = |sql: &'static str, value: Value| {
        terms.push(sql);
        values.push(value);
    };
    if let Some(ticket_id) = filter.ticket_id {
        term("ticket_id = ?", Value::Integer(ticket_id));
    }
    if let Some(desk_id) = filter.desk_id {
        term("desk_id = ?", Value::Integer(desk_id));
    }
    if let Some(event_type) = &filter.event_type {
        term("event_type = ?", Value::Text(event_type.clone()));
    }
    if let Some(operator) = &filter.operator {
        term("user_id = ?", Value::Text(operator.clone()));
    }
    if let Some(since) = &filter.since {
        term("timestamp >= ?", Value::Text(db::format_timestamp(since)));
    }
    if let Some(until) = &filter.until {
        term("timestamp <= ?", Value::Text(db::format_timestamp(until)));
    }

    if terms.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", terms.join(" AND ")), values)
    }
}

/// Row as stored; the JSON payload is decoded outside the rusqlite closure
/// so a malformed payload surfaces as [`AuditError::Payload`].
struct StoredRow {
    id: i64,
    timestamp: DateTime<Utc>,
    event_type: String,
    ticket_id: Option<i64>,
    desk_id: Option<i64>,
    user_id: Option<String>,
    data: String,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        let timestamp: String = row.get(1)?;
        Ok(Self {
            id: row.get(0)?,
            timestamp: db::parse_timestamp(1, &timestamp)?,
            event_type: row.get(2)?,
            ticket_id: row.get(3)?,
            desk_id: row.get(4)?,
            user_id: row.get(5)?,
            data: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<AuditRecord, AuditError> {
        Ok(AuditRecord {
            id: self.id,
            timestamp: self.timestamp,
            event_type: self.event_type,
            ticket_id: self.ticket_id,
            desk_id: self.desk_id,
            user_id: self.user_id,
            data: serde_json::from_str(&self.data)?,
        })
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data = serde_json::to_string(&record.data)?;

        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, desk_id, user_id, data)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                db::format_timestamp(&record.timestamp),
                record.event_type,
                record.ticket_id,
                record.desk_id,
                record.user_id,
                data,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (where_clause, mut values) = selection(filter);
        values.push(Value::Integer(filter.limit));
        values.push(Value::Integer(filter.offset));

        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM audit_events {where_clause}
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values), StoredRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(StoredRow::into_record).collect()
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (where_clause, values) = selection(filter);
        let conn = self.db.lock();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_events {where_clause}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
