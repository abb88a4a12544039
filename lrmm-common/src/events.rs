//! Marker session events
//!
//! A presentation layer subscribes to the [`EventBus`] to refresh its marker
//! table after reconciliation and after every mutation instead of polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// How a session reached its ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// No source markers: document and artifacts deleted, feature disabled
    Empty,
    /// Persisted document matched the source markers and was reused
    Loaded,
    /// No document existed; all records were created
    Created,
    /// Document drifted from the source markers; all records were regenerated
    Stale,
    /// Document could not be decoded; all records were regenerated
    Corrupt,
}

impl SessionOutcome {
    /// True if the reconciliation pass rewrote records and artifacts
    pub fn regenerated(&self) -> bool {
        matches!(self, Self::Created | Self::Stale | Self::Corrupt)
    }
}

/// Events emitted by a marker session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarkerEvent {
    /// Reconciliation finished
    SessionReady {
        session_id: Uuid,
        outcome: SessionOutcome,
        marker_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A marker record was appended
    MarkerAdded {
        session_id: Uuid,
        index: u32,
        label: String,
        timestamp: DateTime<Utc>,
    },

    /// Annotation, classification or drawing of a marker changed
    MarkerUpdated {
        session_id: Uuid,
        index: u32,
        label: String,
        timestamp: DateTime<Utc>,
    },

    /// A marker record and its artifacts were deleted
    MarkerRemoved {
        session_id: Uuid,
        index: u32,
        label: String,
        timestamp: DateTime<Utc>,
    },

    /// The last marker was removed; document and artifacts are gone
    SessionEmptied {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The document could not be written; in-memory state is ahead of disk
    DocumentWriteFailed {
        session_id: Uuid,
        path: String,
        timestamp: DateTime<Utc>,
    },
}

impl MarkerEvent {
    /// Session that emitted the event
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionReady { session_id, .. }
            | Self::MarkerAdded { session_id, .. }
            | Self::MarkerUpdated { session_id, .. }
            | Self::MarkerRemoved { session_id, .. }
            | Self::SessionEmptied { session_id, .. }
            | Self::DocumentWriteFailed { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast channel for [`MarkerEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MarkerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MarkerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MarkerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
