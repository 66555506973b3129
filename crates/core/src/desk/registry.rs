//! Desk registry trait and errors.

use thiserror::Error;

use super::{Desk, DeskRequest};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("Desk not found: {0}")]
    NotFound(String),

    #[error("Desk code already in use: {0}")]
    AlreadyExists(String),

    #[error("Invalid desk: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DeskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskError::NotFound(_) => ErrorKind::NotFound,
            DeskError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            DeskError::Invalid(_) => ErrorKind::Invalid,
            DeskError::Database(_) => ErrorKind::Storage,
        }
    }
}

/// Trait for desk storage backends.
///
/// Desks are never deleted: tickets keep referencing them, so retiring a
/// desk means deactivating it.
pub trait DeskRegistry: Send + Sync {
    /// Register a new desk. Registration defaults to active.
    fn register(&self, request: DeskRequest) -> Result<Desk, DeskError>;

    /// Edit code, name, description and icon of the desk with the given id.
    /// The active flag only changes through [`DeskRegistry::set_active`].
    fn update(&self, id: i64, request: DeskRequest) -> Result<Desk, DeskError>;

    /// Set the active flag of the desk with the given code.
    fn set_active(&self, code: &str, active: bool) -> Result<Desk, DeskError>;

    /// Stop the desk from receiving new claims.
    fn deactivate(&self, code: &str) -> Result<Desk, DeskError> {
        self.set_active(code, false)
    }

    /// Let a deactivated desk receive claims again.
    fn activate(&self, code: &str) -> Result<Desk, DeskError> {
        self.set_active(code, true)
    }

    /// Get a desk by code.
    fn get(&self, code: &str) -> Result<Desk, DeskError>;

    /// Get a desk by id.
    fn get_by_id(&self, id: i64) -> Result<Desk, DeskError>;

    /// List desks ordered by code.
    fn list(&self, active_only: bool) -> Result<Vec<Desk>, DeskError>;
}
