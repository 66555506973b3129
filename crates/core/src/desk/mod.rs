//! Desk registry: the service points tickets are routed to.

mod registry;
mod sqlite_registry;
mod types;

pub use registry::{DeskError, DeskRegistry};
pub use sqlite_registry::SqliteDeskRegistry;
pub use types::{Desk, DeskRequest, MAX_CODE_LEN};
