//! Unique identifiers for namespace entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one mounted capability instance
///
/// Mount points in the namespace tree refer to capabilities by this id; the
/// capability itself is owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountId(Uuid);

impl MountId {
    /// Creates a new random mount ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a mount ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mount({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_id_creation() {
        let id1 = MountId::new();
        let id2 = MountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_mount_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = MountId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn test_mount_id_display() {
        let display = format!("{}", MountId::new());
        assert!(display.starts_with("Mount("));
    }
}
