//! Mount Audit Trail
//!
//! Chronological record of capability mount lifecycle events, kept so tests
//! can assert on the exact sequence a boot or teardown produced.

use core_types::{Errno, MountId};
use kernel_api::Instant;

/// A mount lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountEvent {
    Mounted {
        mount_id: MountId,
        path: String,
        capability_id: String,
    },
    MountFailed {
        path: String,
        errno: Errno,
    },
    Unmounted {
        mount_id: MountId,
        path: String,
    },
}

/// A single audit event with timestamp
#[derive(Debug, Clone)]
pub struct MountAuditEvent {
    pub timestamp: Instant,
    pub event: MountEvent,
}

/// Audit log for mount operations
#[derive(Debug, Default)]
pub struct MountAuditLog {
    events: Vec<MountAuditEvent>,
}

impl MountAuditLog {
    /// Creates a new empty audit log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event at the specified time
    pub fn record_event(&mut self, timestamp: Instant, event: MountEvent) {
        self.events.push(MountAuditEvent { timestamp, event });
    }

    /// Returns all recorded events
    pub fn get_events(&self) -> &[MountAuditEvent] {
        &self.events
    }

    /// Counts events matching the predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&MountEvent) -> bool,
    {
        self.events.iter().filter(|e| predicate(&e.event)).count()
    }

    /// Checks if any event matches the predicate
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&MountEvent) -> bool,
    {
        self.events.iter().any(|e| predicate(&e.event))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
