//! Desk data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeskError;

/// Longest accepted desk code.
pub const MAX_CODE_LEN: usize = 16;

/// A service desk (counter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Desk {
    /// Store-assigned identifier, referenced by tickets.
    pub id: i64,
    /// Unique short code shown on tickets (e.g. "A", "CASH-1").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Longer description for the display board.
    pub description: String,
    /// Display hint for the UI.
    pub icon: String,
    /// Inactive desks accept no new claims.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Fields supplied when registering or editing a desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeskRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Registration defaults to active. On an edit a differing value toggles
    /// the desk the same way activate/deactivate do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl DeskRequest {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            active: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Check the request before it reaches storage.
    pub fn validate(&self) -> Result<(), DeskError> {
        if self.code.is_empty() || self.code.len() > MAX_CODE_LEN {
            return Err(DeskError::Invalid(format!(
                "code must be 1-{} characters, got {:?}",
                MAX_CODE_LEN, self.code
            )));
        }

        if !self
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DeskError::Invalid(format!(
                "code may only contain letters, digits, '-' and '_', got {:?}",
                self.code
            )));
        }

        if self.name.trim().is_empty() {
            return Err(DeskError::Invalid("name cannot be empty".to_string()));
        }

        Ok(())
    }
}
