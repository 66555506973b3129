//! SQLite-backed desk registry.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql};
use tracing::debug;

use super::{Desk, DeskError, DeskRegistry, DeskRequest};
use crate::db::{self, Database};

const DESK_COLUMNS: &str = "id, code, name, description, icon, active, created_at, modified_at";

/// SQLite-backed desk registry.
pub struct SqliteDeskRegistry {
    db: Database,
}

impl SqliteDeskRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_desk(row: &rusqlite::Row) -> rusqlite::Result<Desk> {
        let created_at: String = row.get(6)?;
        let modified_at: String = row.get(7)?;

        Ok(Desk {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            icon: row.get(4)?,
            active: row.get(5)?,
            created_at: db::parse_timestamp(6, &created_at)?,
            modified_at: db::parse_timestamp(7, &modified_at)?,
        })
    }

    fn find(conn: &Connection, column: &str, value: &dyn ToSql) -> Result<Option<Desk>, DeskError> {
        let sql = format!("SELECT {} FROM desks WHERE {} = ?", DESK_COLUMNS, column);
        conn.query_row(&sql, [value], Self::row_to_desk)
            .optional()
            .map_err(|e| DeskError::Database(e.to_string()))
    }
}

fn map_write_error(e: rusqlite::Error, code: &str) -> DeskError {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            DeskError::AlreadyExists(code.to_string())
        }
        e => DeskError::Database(e.to_string()),
    }
}

impl DeskRegistry for SqliteDeskRegistry {
    fn register(&self, request: DeskRequest) -> Result<Desk, DeskError> {
        request.validate()?;

        let conn = self.db.lock();
        let now = db::now();
        let stamp = db::format_timestamp(&now);
        let active = request.active.unwrap_or(true);

        conn.execute(
            "INSERT INTO desks (code, name, description, icon, active, created_at, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                request.code,
                request.name,
                request.description,
                request.icon,
                active,
                stamp,
                stamp,
            ],
        )
        .map_err(|e| map_write_error(e, &request.code))?;

        let id = conn.last_insert_rowid();
        debug!(desk_id = id, code = %request.code, "Desk registered");

        Ok(Desk {
            id,
            code: request.code,
            name: request.name,
            description: request.description,
            icon: request.icon,
            active,
            created_at: now,
            modified_at: now,
        })
    }

    fn update(&self, id: i64, request: DeskRequest) -> Result<Desk, DeskError> {
        request.validate()?;

        let conn = self.db.lock();
        let current =
            Self::find(&conn, "id", &id)?.ok_or_else(|| DeskError::NotFound(id.to_string()))?;

        let now = db::now();

        conn.execute(
            "UPDATE desks SET code = ?, name = ?, description = ?, icon = ?, modified_at = ? WHERE id = ?",
            params![
                request.code,
                request.name,
                request.description,
                request.icon,
                db::format_timestamp(&now),
                id,
            ],
        )
        .map_err(|e| map_write_error(e, &request.code))?;

        Ok(Desk {
            code: request.code,
            name: request.name,
            description: request.description,
            icon: request.icon,
            modified_at: now,
            ..current
        })
    }

    fn set_active(&self, code: &str, active: bool) -> Result<Desk, DeskError> {
        let conn = self.db.lock();
        let current = Self::find(&conn, "code", &code)?
            .ok_or_else(|| DeskError::NotFound(code.to_string()))?;

        if current.active == active {
            return Ok(current);
        }

        let now = db::now();
        conn.execute(
            "UPDATE desks SET active = ?, modified_at = ? WHERE id = ?",
            params![active, db::format_timestamp(&now), current.id],
        )
        .map_err(|e| DeskError::Database(e.to_string()))?;

        Ok(Desk {
            active,
            modified_at: now,
            ..current
        })
    }

    fn get(&self, code: &str) -> Result<Desk, DeskError> {
        let conn = self.db.lock();
        Self::find(&conn, "code", &code)?.ok_or_else(|| DeskError::NotFound(code.to_string()))
    }

    fn get_by_id(&self, id: i64) -> Result<Desk, DeskError> {
        let conn = self.db.lock();
        Self::find(&conn, "id", &id)?.ok_or_else(|| DeskError::NotFound(id.to_string()))
    }

    fn list(&self, active_only: bool) -> Result<Vec<Desk>, DeskError> {
        let conn = self.db.lock();

        let sql = format!(
            "SELECT {} FROM desks WHERE (?1 = 0 OR active = 1) ORDER BY code ASC",
            DESK_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DeskError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![active_only], Self::row_to_desk)
            .map_err(|e| DeskError::Database(e.to_string()))?;

        let mut desks = Vec::new();
        for row_result in rows {
            desks.push(row_result.map_err(|e| DeskError::Database(e.to_string()))?);
        }

        Ok(desks)
    }
}
