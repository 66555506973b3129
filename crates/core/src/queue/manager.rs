use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::{Backlog, BacklogEntry, QueueError};
use crate::audit::{AuditEvent, AuditHandle};
use crate::desk::{Desk, DeskRegistry, DeskRequest};
use crate::lifecycle::Transition;
use crate::metrics;
use crate::ticket::{Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};

type SharedBacklog = Arc<Mutex<Backlog>>;

fn lock(backlog: &SharedBacklog) -> MutexGuard<'_, Backlog> {
    backlog.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of [`QueueManager::update_desk`].
#[derive(Debug, Clone)]
pub struct DeskEdit {
    pub desk: Desk,
    /// The desk as it was before the edit.
    pub previous: Desk,
    /// Waiting tickets, when the edit also flipped the active flag.
    pub toggled: Option<usize>,
}

/// Routes tickets through the per-desk backlogs.
///
/// Each desk has its own mutex, so desks never wait on each other. Every
/// operation that changes a ticket holds the backlog lock of the desk the
/// ticket currently belongs to, which serializes all changes to one ticket.
/// Locks are always taken backlog first, storage second.
pub struct QueueManager {
    desks: Arc<dyn DeskRegistry>,
    tickets: Arc<dyn TicketStore>,
    backlogs: RwLock<HashMap<i64, SharedBacklog>>,
    audit: Option<AuditHandle>,
}

impl QueueManager {
    pub fn new(desks: Arc<dyn DeskRegistry>, tickets: Arc<dyn TicketStore>) -> Self {
        Self {
            desks,
            tickets,
            backlogs: RwLock::new(HashMap::new()),
            audit: None,
        }
    }

    /// Record ticket events on the audit trail.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn desks(&self) -> &Arc<dyn DeskRegistry> {
        &self.desks
    }

    pub fn tickets(&self) -> &Arc<dyn TicketStore> {
        &self.tickets
    }

    fn backlog_for(&self, desk_id: i64) -> SharedBacklog {
        {
            let backlogs = self.backlogs.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(backlog) = backlogs.get(&desk_id) {
                return Arc::clone(backlog);
            }
        }
        let mut backlogs = self.backlogs.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(backlogs.entry(desk_id).or_default())
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    fn desk_code(&self, desk_id: i64) -> String {
        self.desks
            .get_by_id(desk_id)
            .map(|desk| desk.code)
            .unwrap_or_else(|_| desk_id.to_string())
    }

    fn record_depth(desk_id: i64, backlog: &Backlog) {
        metrics::BACKLOG_DEPTH
            .with_label_values(&[&desk_id.to_string()])
            .set(backlog.len() as i64);
    }

    /// Run `f` with the ticket as currently stored and the backlog of the
    /// desk it belongs to, locked. Retries if a reassignment moved the ticket
    /// between the lookup and the lock.
    fn with_ticket<T>(
        &self,
        ticket_id: i64,
        f: impl FnOnce(&Ticket, &mut Backlog) -> Result<T, QueueError>,
    ) -> Result<T, QueueError> {
        loop {
            let seen = self.tickets.get(ticket_id)?;
            let shared = self.backlog_for(seen.desk_id);
            let mut backlog = lock(&shared);

            let current = self.tickets.get(ticket_id)?;
            if current.desk_id != seen.desk_id {
                debug!(ticket_id, "Ticket moved while locking, retrying");
                continue;
            }
            return f(&current, &mut backlog);
        }
    }

    /// Index a queued ticket in its desk's backlog. Returns false when the
    /// ticket is not queued or was already indexed.
    pub fn enqueue(&self, ticket: &Ticket) -> bool {
        if !ticket.is_queued() {
            return false;
        }
        let shared = self.backlog_for(ticket.desk_id);
        let mut backlog = lock(&shared);
        let inserted = backlog.insert(BacklogEntry::of(ticket));
        Self::record_depth(ticket.desk_id, &backlog);
        inserted
    }

    /// Issue a new ticket for `desk_id` and queue it.
    pub fn admit(&self, desk_id: i64) -> Result<Ticket, QueueError> {
        let desk = self.desks.get_by_id(desk_id)?;

        let shared = self.backlog_for(desk_id);
        let mut backlog = lock(&shared);

        let ticket = self.tickets.create(desk_id)?;
        backlog.insert(BacklogEntry::of(&ticket));
        Self::record_depth(desk_id, &backlog);
        drop(backlog);

        metrics::TICKETS_CREATED.inc();
        info!(
            ticket_id = ticket.id,
            desk = %desk.code,
            number = ticket.number,
            "Ticket admitted"
        );
        self.emit(AuditEvent::TicketCreated {
            ticket_id: ticket.id,
            desk_id,
            desk_code: desk.code,
            number: ticket.number,
        });

        Ok(ticket)
    }

    /// Hand the oldest queued ticket of `desk_code` to `operator`.
    pub fn claim_next(&self, desk_code: &str, operator: &str) -> Result<Ticket, QueueError> {
        let result = self.try_claim_next(desk_code, operator);

        let label = match &result {
            Ok(_) => "claimed",
            Err(QueueError::QueueEmpty(_)) => "empty",
            Err(QueueError::DeskInactive(_)) => "inactive",
            Err(e) if e.kind() == crate::error::ErrorKind::NotFound => "not_found",
            Err(_) => "error",
        };
        metrics::CLAIMS_TOTAL.with_label_values(&[label]).inc();

        result
    }

    fn try_claim_next(&self, desk_code: &str, operator: &str) -> Result<Ticket, QueueError> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err(QueueError::Invalid("operator must not be empty".to_string()));
        }

        let desk = self.desks.get(desk_code)?;
        let shared = self.backlog_for(desk.id);
        let mut backlog = lock(&shared);

        // Activation toggles take this same lock, so the flag read here holds
        // for the rest of the claim.
        let desk = self.desks.get_by_id(desk.id)?;
        if !desk.active {
            return Err(QueueError::DeskInactive(desk.code));
        }

        let transition = Transition::claim(operator);
        let (queued_since, claimed) = loop {
            let Some(entry) = backlog.pop_front() else {
                Self::record_depth(desk.id, &backlog);
                return Err(QueueError::QueueEmpty(desk.code));
            };

            // A queued ticket was last stamped when it entered the backlog,
            // at admission or on its latest requeue.
            let attempt = self.tickets.get(entry.ticket_id).and_then(|queued| {
                let claimed = self.tickets.update(entry.ticket_id, &transition)?;
                Ok((queued.modified_at, claimed))
            });
            match attempt {
                Ok(pair) => break pair,
                Err(
                    e @ (TicketError::NotFound(_)
                    | TicketError::InvalidTransition { .. }
                    | TicketError::AlreadyClaimed { .. }),
                ) => {
                    warn!(
                        ticket_id = entry.ticket_id,
                        desk = %desk.code,
                        "Dropping stale backlog entry: {}",
                        e
                    );
                }
                Err(e) => {
                    backlog.insert(entry);
                    return Err(e.into());
                }
            }
        };
        Self::record_depth(desk.id, &backlog);
        drop(backlog);

        let waited = (claimed.modified_at - queued_since)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        metrics::TRANSITIONS_TOTAL
            .with_label_values(&[transition.name()])
            .inc();
        metrics::WAIT_DURATION
            .with_label_values(&[&desk.id.to_string()])
            .observe(waited);

        info!(
            ticket_id = claimed.id,
            desk = %desk.code,
            operator,
            waited_secs = waited,
            "Ticket claimed"
        );
        self.emit(AuditEvent::TicketClaimed {
            ticket_id: claimed.id,
            desk_id: desk.id,
            desk_code: desk.code,
            operator: operator.to_string(),
            waited_secs: waited,
        });

        Ok(claimed)
    }

    /// Give an in-progress ticket back to its desk at its original position.
    pub fn requeue(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        let (previous, ticket) = self.with_ticket(ticket_id, |current, backlog| {
            let updated = self.tickets.update(ticket_id, &Transition::Requeue)?;
            backlog.insert(BacklogEntry::of(&updated));
            Self::record_depth(updated.desk_id, backlog);
            Ok((current.operator.clone(), updated))
        })?;

        metrics::TRANSITIONS_TOTAL
            .with_label_values(&[Transition::Requeue.name()])
            .inc();
        let desk_code = self.desk_code(ticket.desk_id);
        info!(ticket_id, desk = %desk_code, "Ticket requeued");
        self.emit(AuditEvent::TicketRequeued {
            ticket_id,
            desk_id: ticket.desk_id,
            desk_code,
            operator: previous,
        });

        Ok(ticket)
    }

    /// Close a ticket: completes it when in progress, cancels it when queued.
    pub fn close(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.finish(ticket_id, Transition::close_from)
    }

    /// Withdraw a ticket that is still waiting.
    pub fn cancel(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.finish(ticket_id, |_| Some(Transition::Cancel))
    }

    fn finish(
        &self,
        ticket_id: i64,
        pick: impl FnOnce(TicketStatus) -> Option<Transition>,
    ) -> Result<Ticket, QueueError> {
        let (previous, transition, ticket) = self.with_ticket(ticket_id, |current, backlog| {
            let transition = pick(current.status).ok_or(TicketError::InvalidTransition {
                ticket_id,
                from: current.status,
                transition: "close",
            })?;
            let updated = self.tickets.update(ticket_id, &transition)?;
            if current.is_queued() {
                backlog.remove(&BacklogEntry::of(current));
                Self::record_depth(current.desk_id, backlog);
            }
            Ok((current.clone(), transition, updated))
        })?;

        metrics::TRANSITIONS_TOTAL
            .with_label_values(&[transition.name()])
            .inc();
        let desk_code = self.desk_code(ticket.desk_id);
        let reason = ticket
            .close_reason
            .map(|r| r.as_str().to_string())
            .unwrap_or_default();
        info!(ticket_id, desk = %desk_code, reason = %reason, "Ticket closed");
        self.emit(AuditEvent::TicketClosed {
            ticket_id,
            desk_id: ticket.desk_id,
            desk_code,
            reason,
            previous_status: previous.status.as_str().to_string(),
            operator: previous.operator,
        });

        Ok(ticket)
    }

    /// Move a queued ticket to the backlog of `desk_code`, keeping its
    /// creation time and therefore its relative position.
    pub fn reassign(&self, ticket_id: i64, desk_code: &str) -> Result<Ticket, QueueError> {
        let target = self.desks.get(desk_code)?;

        let (from_desk, ticket) = loop {
            let seen = self.tickets.get(ticket_id)?;

            if seen.desk_id == target.id {
                let shared = self.backlog_for(target.id);
                let _backlog = lock(&shared);
                if self.tickets.get(ticket_id)?.desk_id != target.id {
                    continue;
                }
                // Validates status and desk state without moving anything
                return Ok(self.tickets.reassign(ticket_id, target.id)?);
            }

            let (low, high) = if seen.desk_id < target.id {
                (seen.desk_id, target.id)
            } else {
                (target.id, seen.desk_id)
            };
            let low_shared = self.backlog_for(low);
            let high_shared = self.backlog_for(high);
            let mut low_backlog = lock(&low_shared);
            let mut high_backlog = lock(&high_shared);

            let current = self.tickets.get(ticket_id)?;
            if current.desk_id != seen.desk_id {
                continue;
            }

            let moved = self.tickets.reassign(ticket_id, target.id)?;
            let (source, destination) = if current.desk_id == low {
                (&mut *low_backlog, &mut *high_backlog)
            } else {
                (&mut *high_backlog, &mut *low_backlog)
            };
            let entry = BacklogEntry::of(&current);
            source.remove(&entry);
            destination.insert(entry);
            Self::record_depth(current.desk_id, source);
            Self::record_depth(target.id, destination);

            break (current.desk_id, moved);
        };

        metrics::TRANSITIONS_TOTAL
            .with_label_values(&["reassign"])
            .inc();
        let from_code = self.desk_code(from_desk);
        info!(ticket_id, from = %from_code, to = %target.code, "Ticket reassigned");
        self.emit(AuditEvent::TicketReassigned {
            ticket_id,
            desk_id: target.id,
            from_desk: from_code,
            to_desk: target.code,
        });

        Ok(ticket)
    }

    /// Toggle a desk, serialized with claims on it. Returns the desk and the
    /// number of tickets waiting there.
    pub fn set_desk_active(&self, desk_code: &str, active: bool) -> Result<(Desk, usize), QueueError> {
        let desk = self.desks.get(desk_code)?;
        let shared = self.backlog_for(desk.id);
        let backlog = lock(&shared);

        let desk = self.desks.set_active(&desk.code, active)?;
        let queued = backlog.len();
        info!(desk = %desk.code, active, queued, "Desk availability changed");

        Ok((desk, queued))
    }

    /// Edit a desk, serialized with claims on it. An `active` value that
    /// differs from the stored flag toggles the desk as part of the same step.
    pub fn update_desk(&self, desk_id: i64, request: DeskRequest) -> Result<DeskEdit, QueueError> {
        let shared = self.backlog_for(desk_id);
        let backlog = lock(&shared);

        let previous = self.desks.get_by_id(desk_id)?;
        let wanted = request.active;
        let mut desk = self.desks.update(desk_id, request)?;

        let toggled = match wanted {
            Some(active) if active != desk.active => {
                desk = self.desks.set_active(&desk.code, active)?;
                let queued = backlog.len();
                info!(desk = %desk.code, active, queued, "Desk availability changed");
                Some(queued)
            }
            _ => None,
        };

        Ok(DeskEdit {
            desk,
            previous,
            toggled,
        })
    }

    /// Snapshot of a desk's backlog in claim order.
    pub fn backlog(&self, desk_code: &str) -> Result<Vec<Ticket>, QueueError> {
        let desk = self.desks.get(desk_code)?;
        let shared = self.backlog_for(desk.id);
        let backlog = lock(&shared);

        let mut tickets = Vec::with_capacity(backlog.len());
        for entry in backlog.iter() {
            tickets.push(self.tickets.get(entry.ticket_id)?);
        }
        Ok(tickets)
    }

    /// Number of tickets waiting at a desk.
    pub fn depth(&self, desk_id: i64) -> usize {
        let backlogs = self.backlogs.read().unwrap_or_else(PoisonError::into_inner);
        backlogs.get(&desk_id).map(|b| lock(b).len()).unwrap_or(0)
    }

    /// Rebuild every backlog from the queued tickets in storage.
    pub fn restore(&self) -> Result<usize, QueueError> {
        let queued = self.tickets.list(
            &TicketFilter::new()
                .with_status(TicketStatus::Queued)
                .unbounded(),
        )?;

        let mut backlogs = self.backlogs.write().unwrap_or_else(PoisonError::into_inner);
        for backlog in backlogs.values() {
            lock(backlog).clear();
        }
        for ticket in &queued {
            let shared = backlogs.entry(ticket.desk_id).or_default();
            lock(shared).insert(BacklogEntry::of(ticket));
        }
        for (desk_id, backlog) in backlogs.iter() {
            Self::record_depth(*desk_id, &lock(backlog));
        }

        info!(
            tickets = queued.len(),
            desks = backlogs.len(),
            "Restored backlogs from storage"
        );
        Ok(queued.len())
    }
}
