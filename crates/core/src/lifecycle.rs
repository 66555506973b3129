//! Ticket lifecycle controller.
//!
//! Allowed transitions:
//!
//! ```text
//!   Queued ──claim──▶ InProgress ──complete──▶ Closed
//!     │  ◀──requeue──     │
//!     └──────────cancel───────────────────────▶ Closed
//! ```
//!
//! Everything here is pure; storage calls [`apply`] inside its own
//! transaction so a rejected transition never touches the stored row.

use chrono::{DateTime, Duration, Utc};

use crate::ticket::{CloseReason, Ticket, TicketError, TicketStatus};

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `Queued → InProgress`, recording the claiming operator.
    Claim { operator: String },
    /// `InProgress → Queued`, the operator gave the ticket back.
    Requeue,
    /// `InProgress → Closed`, served to completion.
    Complete,
    /// `Queued → Closed`, withdrawn before being served.
    Cancel,
}

impl Transition {
    pub fn claim(operator: impl Into<String>) -> Self {
        Transition::Claim {
            operator: operator.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Claim { .. } => "claim",
            Transition::Requeue => "requeue",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
        }
    }

    /// The closing transition for a ticket in `status`, if it can be closed.
    pub fn close_from(status: TicketStatus) -> Option<Self> {
        if status.is_terminal() {
            return None;
        }
        Some(match status {
            TicketStatus::Queued => Transition::Cancel,
            _ => Transition::Complete,
        })
    }
}

/// Status a ticket ends up in after `transition`, or why it cannot.
pub fn target(ticket: &Ticket, transition: &Transition) -> Result<TicketStatus, TicketError> {
    use TicketStatus::{Closed, InProgress, Queued};

    match (ticket.status, transition) {
        (Queued, Transition::Claim { .. }) => Ok(InProgress),
        (InProgress, Transition::Requeue) => Ok(Queued),
        (InProgress, Transition::Complete) => Ok(Closed),
        (Queued, Transition::Cancel) => Ok(Closed),
        (InProgress, Transition::Claim { .. }) => Err(TicketError::AlreadyClaimed {
            ticket_id: ticket.id,
            operator: ticket.operator.clone(),
        }),
        (from, transition) => Err(TicketError::InvalidTransition {
            ticket_id: ticket.id,
            from,
            transition: transition.name(),
        }),
    }
}

/// Produce the ticket as it is after `transition`, stamped at `now`.
pub fn apply(
    ticket: &Ticket,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Ticket, TicketError> {
    let status = target(ticket, transition)?;

    let mut next = ticket.clone();
    next.status = status;
    next.modified_at = next_stamp(ticket.modified_at, now);

    match transition {
        Transition::Claim { operator } => next.operator = Some(operator.clone()),
        Transition::Requeue => next.operator = None,
        Transition::Complete => next.close_reason = Some(CloseReason::Completed),
        Transition::Cancel => next.close_reason = Some(CloseReason::Cancelled),
    }

    Ok(next)
}

/// `modified_at` must strictly increase even when two transitions land in
/// the same clock tick (or the clock steps back).
pub fn next_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_in(status: TicketStatus) -> Ticket {
        let at = DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Ticket {
            id: 7,
            desk_id: 1,
            number: 1,
            status,
            operator: (status == TicketStatus::InProgress).then(|| "op-1".to_string()),
            close_reason: None,
            created_at: at,
            modified_at: at,
        }
    }

    fn all_transitions() -> Vec<Transition> {
        vec![
            Transition::claim("op-2"),
            Transition::Requeue,
            Transition::Complete,
            Transition::Cancel,
        ]
    }

    #[test]
    fn test_transition_table() {
        use TicketStatus::*;

        let allowed = [
            (Queued, "claim", InProgress),
            (InProgress, "requeue", Queued),
            (InProgress, "complete", Closed),
            (Queued, "cancel", Closed),
        ];

        for from in TicketStatus::ALL {
            for transition in all_transitions() {
                let result = target(&ticket_in(from), &transition);
                let expected = allowed
                    .iter()
                    .find(|(f, t, _)| *f == from && *t == transition.name())
                    .map(|(_, _, to)| *to);

                match expected {
                    Some(to) => assert_eq!(result.unwrap(), to),
                    None => assert!(
                        result.is_err(),
                        "{} from {} should be rejected",
                        transition.name(),
                        from
                    ),
                }
            }
        }
    }

    #[test]
    fn test_claim_in_progress_is_already_claimed() {
        let result = target(&ticket_in(TicketStatus::InProgress), &Transition::claim("op-2"));
        match result {
            Err(TicketError::AlreadyClaimed { ticket_id, operator }) => {
                assert_eq!(ticket_id, 7);
                assert_eq!(operator.as_deref(), Some("op-1"));
            }
            other => panic!("expected AlreadyClaimed, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_rejects_everything() {
        let closed = ticket_in(TicketStatus::Closed);
        for transition in all_transitions() {
            assert!(matches!(
                target(&closed, &transition),
                Err(TicketError::InvalidTransition {
                    from: TicketStatus::Closed,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_apply_claim_records_operator() {
        let ticket = ticket_in(TicketStatus::Queued);
        let now = ticket.created_at + Duration::seconds(30);

        let claimed = apply(&ticket, &Transition::claim("op-9"), now).unwrap();

        assert_eq!(claimed.status, TicketStatus::InProgress);
        assert_eq!(claimed.operator.as_deref(), Some("op-9"));
        assert_eq!(claimed.modified_at, now);
        assert_eq!(claimed.created_at, ticket.created_at);
    }

    #[test]
    fn test_apply_requeue_clears_operator() {
        let ticket = ticket_in(TicketStatus::InProgress);
        let requeued = apply(&ticket, &Transition::Requeue, Utc::now()).unwrap();
        assert_eq!(requeued.status, TicketStatus::Queued);
        assert!(requeued.operator.is_none());
    }

    #[test]
    fn test_apply_sets_close_reason() {
        let completed =
            apply(&ticket_in(TicketStatus::InProgress), &Transition::Complete, Utc::now()).unwrap();
        assert_eq!(completed.close_reason, Some(CloseReason::Completed));
        // The operator who served it is kept
        assert_eq!(completed.operator.as_deref(), Some("op-1"));

        let cancelled =
            apply(&ticket_in(TicketStatus::Queued), &Transition::Cancel, Utc::now()).unwrap();
        assert_eq!(cancelled.close_reason, Some(CloseReason::Cancelled));
    }

    #[test]
    fn test_apply_stamp_strictly_increases_on_same_tick() {
        let ticket = ticket_in(TicketStatus::Queued);
        let claimed = apply(&ticket, &Transition::claim("op"), ticket.modified_at).unwrap();
        assert!(claimed.modified_at > ticket.modified_at);
    }

    #[test]
    fn test_next_stamp_when_clock_steps_back() {
        let previous = Utc::now();
        let stamp = next_stamp(previous, previous - Duration::seconds(5));
        assert_eq!(stamp, previous + Duration::microseconds(1));
    }

    #[test]
    fn test_close_from() {
        assert_eq!(
            Transition::close_from(TicketStatus::Queued),
            Some(Transition::Cancel)
        );
        assert_eq!(
            Transition::close_from(TicketStatus::InProgress),
            Some(Transition::Complete)
        );
        assert_eq!(Transition::close_from(TicketStatus::Closed), None);
    }
}
