//! SQLite-backed ticket store implementation.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{CloseReason, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};
use crate::db::{self, Database};
use crate::lifecycle::{self, Transition};
use crate::notify::{ChangeKind, ChangeNotifier};

const TICKET_COLUMNS: &str =
    "id, desk_id, number, status, operator, close_reason, created_at, modified_at";

/// SQLite-backed ticket store.
///
/// Every write runs in its own transaction while the shared connection lock
/// is held, which serializes all mutations of a ticket. Change notifications
/// are published before the lock is released, so observers see the changes of
/// a ticket in commit order.
pub struct SqliteTicketStore {
    db: Database,
    notifier: Option<ChangeNotifier>,
}

impl SqliteTicketStore {
    pub fn new(db: Database) -> Self {
        Self { db, notifier: None }
    }

    /// Publish every committed change on `notifier`.
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn publish(&self, kind: ChangeKind, ticket: &Ticket) {
        if let Some(ref notifier) = self.notifier {
            notifier.publish(kind, ticket);
        }
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let status_str: String = row.get(3)?;
        let close_reason_str: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;
        let modified_at: String = row.get(7)?;

        let status = TicketStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(3, status_str.clone(), rusqlite::types::Type::Text)
        })?;

        Ok(Ticket {
            id: row.get(0)?,
            desk_id: row.get(1)?,
            number: row.get(2)?,
            status,
            operator: row.get(4)?,
            close_reason: close_reason_str.as_deref().and_then(CloseReason::parse),
            created_at: db::parse_timestamp(6, &created_at)?,
            modified_at: db::parse_timestamp(7, &modified_at)?,
        })
    }

    fn find(conn: &Connection, id: i64) -> Result<Ticket, TicketError> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_ticket)
            .optional()?
            .ok_or(TicketError::NotFound(id))
    }

    /// Resolve a desk that is about to receive a ticket, returning its code.
    fn require_active_desk(conn: &Connection, desk_id: i64) -> Result<String, TicketError> {
        let desk: Option<(String, bool)> = conn
            .query_row(
                "SELECT code, active FROM desks WHERE id = ?",
                params![desk_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match desk {
            None => Err(TicketError::DeskNotFound(desk_id)),
            Some((code, false)) => Err(TicketError::DeskInactive(code)),
            Some((code, true)) => Ok(code),
        }
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(desk_id) = filter.desk_id {
            conditions.push("desk_id = ?");
            params.push(Box::new(desk_id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

fn change_kind(transition: &Transition) -> ChangeKind {
    match transition {
        Transition::Claim { .. } => ChangeKind::Claimed,
        Transition::Requeue => ChangeKind::Requeued,
        Transition::Complete | Transition::Cancel => ChangeKind::Closed,
    }
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, desk_id: i64) -> Result<Ticket, TicketError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let code = Self::require_active_desk(&tx, desk_id)?;

        tx.execute(
            "UPDATE desks SET issued = issued + 1 WHERE id = ?",
            params![desk_id],
        )?;
        let number: u32 =
            tx.query_row("SELECT issued FROM desks WHERE id = ?", params![desk_id], |row| {
                row.get(0)
            })?;

        let now = db::now();
        let stamp = db::format_timestamp(&now);
        let status = TicketStatus::Queued;

        tx.execute(
            "INSERT INTO tickets (desk_id, number, status, operator, close_reason, created_at, modified_at) VALUES (?, ?, ?, NULL, NULL, ?, ?)",
            params![desk_id, number, status.as_str(), stamp, stamp],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;

        let ticket = Ticket {
            id,
            desk_id,
            number,
            status,
            operator: None,
            close_reason: None,
            created_at: now,
            modified_at: now,
        };
        debug!(ticket_id = id, desk = %code, number, "Ticket created");
        self.publish(ChangeKind::Created, &ticket);

        Ok(ticket)
    }

    fn get(&self, id: i64) -> Result<Ticket, TicketError> {
        let conn = self.db.lock();
        Self::find(&conn, id)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.db.lock();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql)?;

        // Build parameter slice with limit and offset
        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_ticket)?;

        let mut tickets = Vec::new();
        for row_result in rows {
            tickets.push(row_result?);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.db.lock();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;

        Ok(count)
    }

    fn update(&self, id: i64, transition: &Transition) -> Result<Ticket, TicketError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let current = Self::find(&tx, id)?;
        let updated = lifecycle::apply(&current, transition, db::now())?;

        // Compare-and-swap on the status we validated against
        let changed = tx.execute(
            "UPDATE tickets SET status = ?, operator = ?, close_reason = ?, modified_at = ? WHERE id = ? AND status = ?",
            params![
                updated.status.as_str(),
                updated.operator,
                updated.close_reason.map(|r| r.as_str()),
                db::format_timestamp(&updated.modified_at),
                id,
                current.status.as_str(),
            ],
        )?;
        if changed != 1 {
            return Err(TicketError::Database(format!(
                "ticket {} changed concurrently",
                id
            )));
        }

        tx.commit()?;

        debug!(
            ticket_id = id,
            transition = transition.name(),
            from = %current.status,
            to = %updated.status,
            "Ticket transitioned"
        );
        self.publish(change_kind(transition), &updated);

        Ok(updated)
    }

    fn reassign(&self, id: i64, desk_id: i64) -> Result<Ticket, TicketError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let current = Self::find(&tx, id)?;
        if current.status != TicketStatus::Queued {
            return Err(TicketError::InvalidTransition {
                ticket_id: id,
                from: current.status,
                transition: "reassign",
            });
        }

        Self::require_active_desk(&tx, desk_id)?;

        if current.desk_id == desk_id {
            return Ok(current);
        }

        tx.execute(
            "UPDATE tickets SET desk_id = ? WHERE id = ?",
            params![desk_id, id],
        )?;
        tx.commit()?;

        let updated = Ticket {
            desk_id,
            ..current
        };
        debug!(ticket_id = id, from_desk = current.desk_id, to_desk = desk_id, "Ticket reassigned");
        self.publish(ChangeKind::Reassigned, &updated);

        Ok(updated)
    }
}
