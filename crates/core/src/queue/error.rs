use thiserror::Error;

use crate::desk::DeskError;
use crate::error::ErrorKind;
use crate::ticket::TicketError;

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Desk(#[from] DeskError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    /// No queued ticket is waiting at the desk.
    #[error("No queued tickets at desk {0}")]
    QueueEmpty(String),

    /// Claims are refused while the desk is deactivated.
    #[error("Desk {0} is inactive")]
    DeskInactive(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Desk(e) => e.kind(),
            QueueError::Ticket(e) => e.kind(),
            QueueError::QueueEmpty(_) => ErrorKind::QueueEmpty,
            QueueError::DeskInactive(_) => ErrorKind::Inactive,
            QueueError::Invalid(_) => ErrorKind::Invalid,
        }
    }
}
