//! Listener presence broadcaster
//!
//! Tracks connected listener sessions and how many of them are actively
//! listening, and pushes the count to every session whenever it may have
//! changed.
//!
//! All state lives behind one `tokio::sync::Mutex`, so connect, intent and
//! disconnect events from different sockets are applied one at a time.
//! Each session receives counts through its own `watch` channel: delivery
//! never blocks the broadcaster, and a slow socket only ever sees the latest
//! value. A failed send means the receiving side is gone; the session is
//! removed exactly as if it had disconnected.

use chrono::Utc;
use lofai_common::events::{EventBus, RadioEvent};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

pub type SessionId = Uuid;

/// Intent message sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerIntent {
    Listening,
    Paused,
}

impl FromStr for ListenerIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "listening" => Ok(ListenerIntent::Listening),
            "paused" => Ok(ListenerIntent::Paused),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

/// Receiving half handed to the transport for one session
pub struct SessionHandle {
    pub id: SessionId,
    pub updates: watch::Receiver<usize>,
}

struct ListenerSession {
    sender: watch::Sender<usize>,
    is_listening: bool,
}

#[derive(Default)]
struct PresenceState {
    count: usize,
    sessions: HashMap<SessionId, ListenerSession>,
}

impl PresenceState {
    /// Remove a session, decrementing the count if it was listening
    fn remove(&mut self, id: &SessionId) -> bool {
        match self.sessions.remove(id) {
            Some(session) => {
                if session.is_listening {
                    self.count = self.count.saturating_sub(1);
                }
                true
            }
            None => false,
        }
    }

    /// Send the count to every session, dropping the ones that fail
    ///
    /// Repeats while drops change the count, so survivors end on the final value.
    fn broadcast(&mut self) -> usize {
        loop {
            let count = self.count;
            let failed: Vec<SessionId> = self
                .sessions
                .iter()
                .filter(|(_, session)| session.sender.send(count).is_err())
                .map(|(id, _)| *id)
                .collect();

            if failed.is_empty() {
                return count;
            }

            for id in &failed {
                debug!(session = %id, "Listener send failed, removing session");
                self.remove(id);
            }

            if self.count == count {
                return count;
            }
        }
    }
}

/// Fan-out of the aggregate listening count
pub struct PresenceBroadcaster {
    state: Mutex<PresenceState>,
    event_bus: EventBus,
}

impl PresenceBroadcaster {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: Mutex::new(PresenceState::default()),
            event_bus,
        }
    }

    /// Register a new session and broadcast the current count to everyone
    pub async fn connect(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().await;

        let (sender, updates) = watch::channel(state.count);
        state.sessions.insert(
            id,
            ListenerSession {
                sender,
                is_listening: false,
            },
        );
        info!(session = %id, sessions = state.sessions.len(), "Listener connected");

        self.broadcast_locked(&mut state);
        SessionHandle { id, updates }
    }

    /// Apply a client intent and broadcast the resulting count
    ///
    /// Returns the count after the update, or `None` for an unknown session.
    pub async fn on_message(&self, id: SessionId, intent: ListenerIntent) -> Option<usize> {
        let mut state = self.state.lock().await;

        let was_listening = state.sessions.get(&id)?.is_listening;
        match (intent, was_listening) {
            (ListenerIntent::Listening, false) => state.count += 1,
            (ListenerIntent::Paused, true) => state.count = state.count.saturating_sub(1),
            _ => {}
        }
        if let Some(session) = state.sessions.get_mut(&id) {
            session.is_listening = intent == ListenerIntent::Listening;
        }
        debug!(session = %id, ?intent, count = state.count, "Listener intent");

        Some(self.broadcast_locked(&mut state))
    }

    /// Remove a session and broadcast the count to the remaining ones
    pub async fn disconnect(&self, id: SessionId) {
        let mut state = self.state.lock().await;
        if state.remove(&id) {
            info!(session = %id, sessions = state.sessions.len(), "Listener disconnected");
            self.broadcast_locked(&mut state);
        }
    }

    /// Send an explicit value to every tracked session
    pub async fn broadcast(&self, value: usize) {
        let mut state = self.state.lock().await;
        let failed: Vec<SessionId> = state
            .sessions
            .iter()
            .filter(|(_, session)| session.sender.send(value).is_err())
            .map(|(id, _)| *id)
            .collect();

        let before = state.count;
        for id in &failed {
            state.remove(id);
        }
        if state.count != before {
            self.broadcast_locked(&mut state);
        }
    }

    /// Number of sessions currently marked listening
    pub async fn listener_count(&self) -> usize {
        self.state.lock().await.count
    }

    /// Number of connected sessions, listening or not
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    fn broadcast_locked(&self, state: &mut PresenceState) -> usize {
        let count = state.broadcast();
        self.event_bus.emit_lossy(RadioEvent::ListenerCountChanged {
            count,
            timestamp: Utc::now(),
        });
        count
    }
}
