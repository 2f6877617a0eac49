//! Change notification types.
//!
//! A [`Notification`] describes one committed write to the system of record.
//! It is transient: listeners react to it and drop it.

use serde::{Deserialize, Serialize};

/// Kind of write that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
    /// Anything the producer could not classify.
    #[default]
    #[serde(other)]
    Unknown,
}

impl NotificationEvent {
    /// Parses a database operation name (`INSERT`, `update`, ...).
    pub fn from_operation(operation: &str) -> Self {
        match operation.to_ascii_uppercase().as_str() {
            "INSERT" => NotificationEvent::Insert,
            "UPDATE" => NotificationEvent::Update,
            "DELETE" => NotificationEvent::Delete,
            _ => NotificationEvent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::Insert => "insert",
            NotificationEvent::Update => "update",
            NotificationEvent::Delete => "delete",
            NotificationEvent::Unknown => "unknown",
        }
    }

    /// Returns `true` for writes that can make a cached row stale.
    pub fn is_update_or_delete(&self) -> bool {
        matches!(self, NotificationEvent::Update | NotificationEvent::Delete)
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed write to the system of record.
///
/// Ids that do not apply to the affected table are left at `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Notification {
    /// Name of the table that was written.
    pub table: String,
    /// Kind of write.
    #[serde(default)]
    pub event: NotificationEvent,
    /// Account that owns the row.
    #[serde(default)]
    pub account_id: i64,
    /// API that owns the row.
    #[serde(default)]
    pub api_id: i64,
    /// Primary key of the written row.
    #[serde(default, rename = "id")]
    pub entity_id: i64,
    /// User that performed the write.
    #[serde(default)]
    pub user_id: i64,
}

impl Notification {
    /// Create a notification for a table and event kind.
    pub fn new(table: impl Into<String>, event: NotificationEvent) -> Self {
        Self {
            table: table.into(),
            event,
            ..Default::default()
        }
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(table, NotificationEvent::Insert)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(table, NotificationEvent::Update)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(table, NotificationEvent::Delete)
    }

    /// Parse a JSON payload as emitted by the database trigger.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: i64) -> Self {
        self.account_id = account_id;
        self
    }

    #[must_use]
    pub fn with_api_id(mut self, api_id: i64) -> Self {
        self.api_id = api_id;
        self
    }

    #[must_use]
    pub fn with_entity_id(mut self, entity_id: i64) -> Self {
        self.entity_id = entity_id;
        self
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }
}
