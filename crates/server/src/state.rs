use std::sync::Arc;

use ghiseu_core::{
    AuditHandle, AuditStore, ChangeNotifier, Config, DeskRegistry, QueueManager, TicketStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    queue: Arc<QueueManager>,
    notifier: ChangeNotifier,
}

impl AppState {
    pub fn new(
        config: Config,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        queue: Arc<QueueManager>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            config,
            audit,
            audit_store,
            queue,
            notifier,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn queue(&self) -> &QueueManager {
        self.queue.as_ref()
    }

    pub fn desks(&self) -> &dyn DeskRegistry {
        self.queue.desks().as_ref()
    }

    pub fn tickets(&self) -> &dyn TicketStore {
        self.queue.tickets().as_ref()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}
