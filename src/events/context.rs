//! Event Context Module
//!
//! Defines the closed set of event kinds and the immutable record delivered to
//! subscribers for every mutation.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Event Kind ==
/// Kinds of mutation observable through the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A key was inserted or overwritten
    Set,
    /// A key was removed explicitly (DEL or clear)
    Delete,
    /// A store was emptied
    Clear,
    /// A named cache was created
    CreateCache,
    /// A named cache was deleted
    DeleteCache,
    /// A key was removed because its TTL elapsed
    Expire,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Set => "SET",
            EventKind::Delete => "DELETE",
            EventKind::Clear => "CLEAR",
            EventKind::CreateCache => "CREATE_CACHE",
            EventKind::DeleteCache => "DELETE_CACHE",
            EventKind::Expire => "EXPIRE",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Event Context ==
/// Snapshot of a single mutation, built at the moment it is committed.
///
/// `store_name` is only set for events raised by a nested store; `cache_name`
/// always names the owning cache so cache-scoped subscribers see both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContext {
    pub kind: EventKind,
    pub cache_name: String,
    pub store_name: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub old_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    // == Constructor ==
    /// Creates a context with no key or values attached.
    pub fn new(kind: EventKind, cache_name: impl Into<String>) -> Self {
        Self {
            kind,
            cache_name: cache_name.into(),
            store_name: None,
            key: None,
            value: None,
            old_value: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_store(mut self, store_name: Option<String>) -> Self {
        self.store_name = store_name;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn with_old_value(mut self, old_value: Option<String>) -> Self {
        self.old_value = old_value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = EventContext::new(EventKind::Set, "users")
            .with_store(Some("sessions".to_string()))
            .with_key("u1")
            .with_value(Some("alice".to_string()))
            .with_old_value(None);

        assert_eq!(ctx.kind, EventKind::Set);
        assert_eq!(ctx.cache_name, "users");
        assert_eq!(ctx.store_name.as_deref(), Some("sessions"));
        assert_eq!(ctx.key.as_deref(), Some("u1"));
        assert_eq!(ctx.value.as_deref(), Some("alice"));
        assert!(ctx.old_value.is_none());
    }

    #[test]
    fn test_kind_serializes_as_label() {
        let json = serde_json::to_string(&EventKind::CreateCache).unwrap();
        assert_eq!(json, "\"CREATE_CACHE\"");
        assert_eq!(EventKind::Expire.to_string(), "EXPIRE");
    }
}
