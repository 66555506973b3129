//! Ticket system: the records customers hold while waiting for a desk.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTicketStore;
pub use store::{TicketError, TicketFilter, TicketStore};
pub use types::{CloseReason, Ticket, TicketStatus};
