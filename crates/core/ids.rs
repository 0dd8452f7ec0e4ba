//! Record identifiers and the generator that produces them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a stored task record.
///
/// Opaque to this crate: ids read back from a queue are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Borrow the id as a store key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Produces collision-free record identifiers.
///
/// Every id produced must satisfy [`is_record_id`].
pub trait IdGenerator: Send + Sync {
    /// Generate a fresh identifier.
    fn generate(&self) -> String;
}

/// Random UUID v4 ids in canonical hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().hyphenated().to_string()
    }
}

/// Check that `s` is a canonical hyphenated UUID.
///
/// Braced, URN and simple (no hyphens) forms are rejected.
pub fn is_record_id(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NO_OPTIONS;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let ids = UuidGenerator;
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = ids.generate();
            assert!(is_record_id(&id), "not a record id: {}", id);
            assert_ne!(id, NO_OPTIONS);
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_is_record_id() {
        assert!(is_record_id("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(is_record_id("67E55044-10B1-426F-9247-BB680E5FE0C8"));
        assert!(!is_record_id("67e5504410b1426f9247bb680e5fe0c8"));
        assert!(!is_record_id("{67e55044-10b1-426f-9247-bb680e5fe0c8}"));
        assert!(!is_record_id("67e55044-10b1-426f-9247-bb680e5fe0cz"));
        assert!(!is_record_id(""));
        assert!(!is_record_id("passing_task.js"));
    }

    #[test]
    fn test_task_id_display_and_conversions() {
        let id = TaskId::from("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(TaskId::from("abc-123".to_string()), id);
        assert_eq!(id.into_inner(), "abc-123");
    }

    #[test]
    fn test_task_id_serializes_as_string() {
        let id = TaskId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
