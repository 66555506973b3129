pub mod audit;
pub mod config;
pub mod db;
pub mod desk;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuditConfig, Config, ConfigError,
    DatabaseConfig, QueueConfig, ServerConfig,
};
pub use db::Database;
pub use desk::{Desk, DeskError, DeskRegistry, DeskRequest, SqliteDeskRegistry};
pub use error::ErrorKind;
pub use lifecycle::Transition;
pub use notify::{ChangeKind, ChangeNotifier, TicketChange};
pub use queue::{DeskEdit, QueueError, QueueManager};
pub use ticket::{
    CloseReason, SqliteTicketStore, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore,
};
