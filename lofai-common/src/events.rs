//! Event types for the lofai event system
//!
//! Provides the shared `RadioEvent` definitions and the `EventBus` used to
//! fan them out to SSE clients and other in-process observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why a regeneration batch was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchTrigger {
    /// Initial batch requested when the scheduler starts
    Startup,
    /// Rotation wrapped back to the batch boundary
    Wraparound,
    /// Explicitly requested by an operator
    Manual,
}

impl std::fmt::Display for BatchTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchTrigger::Startup => write!(f, "Startup"),
            BatchTrigger::Wraparound => write!(f, "Wraparound"),
            BatchTrigger::Manual => write!(f, "Manual"),
        }
    }
}

/// lofai event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadioEvent {
    /// Rotation advanced to a new track
    TrackAdvanced {
        previous: usize,
        current: usize,
        timestamp: DateTime<Utc>,
    },

    /// A regeneration batch acquired the generation lock
    BatchStarted {
        trigger: BatchTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A slot finished generating and is ready to stream
    SlotReady {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A slot failed to generate and was left empty
    SlotFailed {
        index: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A regeneration batch finished
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Number of actively listening sessions changed
    ListenerCountChanged {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The synthesis provider rejected the credential; no further batches run
    GenerationDisabled {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Generation preference was replaced
    PromptUpdated {
        mood: String,
        instrument: String,
        timestamp: DateTime<Utc>,
    },
}

impl RadioEvent {
    /// SSE event name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            RadioEvent::TrackAdvanced { .. } => "TrackAdvanced",
            RadioEvent::BatchStarted { .. } => "BatchStarted",
            RadioEvent::SlotReady { .. } => "SlotReady",
            RadioEvent::SlotFailed { .. } => "SlotFailed",
            RadioEvent::BatchCompleted { .. } => "BatchCompleted",
            RadioEvent::ListenerCountChanged { .. } => "ListenerCountChanged",
            RadioEvent::GenerationDisabled { .. } => "GenerationDisabled",
            RadioEvent::PromptUpdated { .. } => "PromptUpdated",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use lofai_common::events::{EventBus, RadioEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(RadioEvent::TrackAdvanced {
///     previous: 0,
///     current: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RadioEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RadioEvent) {
        let _ = self.tx.send(event);
    }
}
