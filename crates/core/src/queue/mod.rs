//! Per-desk FIFO backlogs and the operations that move tickets through them.

mod backlog;
mod error;
mod manager;

pub use backlog::{Backlog, BacklogEntry};
pub use error::QueueError;
pub use manager::{DeskEdit, QueueManager};
