//! Error classification shared by every core component.

use std::fmt;

use serde::Serialize;

/// Coarse classification of a core failure.
///
/// The transport layer maps each kind onto a response status and prefixes
/// error messages with it, so clients can branch on the kind without parsing
/// the rest of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Unknown desk code, desk id or ticket id.
    NotFound,
    /// The targeted desk is deactivated.
    Inactive,
    /// No eligible ticket to claim.
    QueueEmpty,
    /// Status change not permitted from the current state.
    InvalidTransition,
    /// Lost a race for the same ticket.
    AlreadyClaimed,
    /// A desk with the same code already exists.
    AlreadyExists,
    /// Malformed input.
    Invalid,
    /// Storage failure.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Inactive => "DeskInactive",
            ErrorKind::QueueEmpty => "QueueEmpty",
            ErrorKind::InvalidTransition => "InvalidTransition",
            ErrorKind::AlreadyClaimed => "AlreadyClaimed",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::Invalid => "Invalid",
            ErrorKind::Storage => "Storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
