//! Realtime broadcast hub
//!
//! Owns the set of connected sessions and their topic subscriptions. One hub
//! is built at startup and shared by `Arc` with the WebSocket and SSE layers.
//! It never stores events: a session that is gone misses everything sent
//! while it was away and must re-fetch state through the HTTP API.

use crate::error::CoreError;
use crate::event::{ServerEvent, Topic};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Outbound queue depth per session
const DEFAULT_SESSION_CAPACITY: usize = 256;

/// Identity of one realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a session
///
/// `Connected -> Authenticated -> Subscribed -> Disconnected`. Without a
/// configured token, sessions start out `Subscribed` to every topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connected,
    Authenticated,
    Subscribed,
    Disconnected,
}

struct SessionEntry {
    authenticated: bool,
    topics: HashSet<Topic>,
    tx: mpsc::Sender<ServerEvent>,
}

impl SessionEntry {
    fn state(&self) -> SessionState {
        if !self.topics.is_empty() {
            SessionState::Subscribed
        } else if self.authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Connected
        }
    }
}

enum Delivery {
    Sent,
    Dropped,
    Closed,
}

/// Registry of realtime sessions with topic fan-out
pub struct BroadcastHub {
    sessions: DashMap<SessionId, SessionEntry>,
    auth_token: Option<String>,
    capacity: usize,
}

impl BroadcastHub {
    /// Create a hub; `auth_token = None` selects the open deployment mode
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            capacity: DEFAULT_SESSION_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn auth_required(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Register a new session and return its outbound event stream
    pub fn connect(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.capacity);

        let open = !self.auth_required();
        let topics = if open {
            Topic::ALL.into_iter().collect()
        } else {
            HashSet::new()
        };

        self.sessions.insert(
            id,
            SessionEntry {
                authenticated: open,
                topics,
                tx,
            },
        );

        info!(session = %id, sessions = self.sessions.len(), "Client connected");
        (id, rx)
    }

    /// Remove a session from every topic immediately
    pub fn disconnect(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            info!(session = %id, sessions = self.sessions.len(), "Client disconnected");
        }
        removed
    }

    pub fn authenticate(&self, id: SessionId, token: &str) -> Result<(), CoreError> {
        let mut entry = self.entry_mut(id)?;

        match &self.auth_token {
            Some(expected) if expected != token => {
                warn!(session = %id, "Rejected authentication attempt");
                Err(CoreError::Unauthorized)
            }
            _ => {
                entry.authenticated = true;
                debug!(session = %id, "Session authenticated");
                Ok(())
            }
        }
    }

    pub fn subscribe(&self, id: SessionId, topic: Topic) -> Result<(), CoreError> {
        let mut entry = self.entry_mut(id)?;
        if !entry.authenticated {
            return Err(CoreError::Unauthorized);
        }
        entry.topics.insert(topic);
        debug!(session = %id, %topic, "Subscribed");
        Ok(())
    }

    pub fn unsubscribe(&self, id: SessionId, topic: Topic) -> Result<(), CoreError> {
        let mut entry = self.entry_mut(id)?;
        entry.topics.remove(&topic);
        debug!(session = %id, %topic, "Unsubscribed");
        Ok(())
    }

    /// Current state; unknown ids are `Disconnected`
    pub fn session_state(&self, id: SessionId) -> SessionState {
        self.sessions
            .get(&id)
            .map(|e| e.state())
            .unwrap_or(SessionState::Disconnected)
    }

    pub fn is_authenticated(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .map(|e| e.authenticated)
            .unwrap_or(false)
    }

    pub fn topics(&self, id: SessionId) -> Vec<Topic> {
        self.sessions
            .get(&id)
            .map(|e| e.topics.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fan out to every session subscribed to `topic`; returns deliveries
    pub fn publish(&self, topic: Topic, event: ServerEvent) -> usize {
        let count = self.fan_out(|entry| entry.topics.contains(&topic), &event);
        trace!(%topic, event = event.name(), delivered = count, "Published");
        count
    }

    /// Reply to a single session
    pub fn emit_to(&self, id: SessionId, event: ServerEvent) -> bool {
        let outcome = match self.sessions.get(&id) {
            Some(entry) => deliver(&entry, event),
            None => return false,
        };

        match outcome {
            Delivery::Sent => true,
            Delivery::Dropped => false,
            Delivery::Closed => {
                self.disconnect(id);
                false
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.topics.contains(&topic))
            .count()
    }

    fn fan_out(&self, filter: impl Fn(&SessionEntry) -> bool, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.sessions.iter() {
            if !filter(entry.value()) {
                continue;
            }
            match deliver(entry.value(), event.clone()) {
                Delivery::Sent => delivered += 1,
                Delivery::Dropped => {}
                Delivery::Closed => closed.push(*entry.key()),
            }
        }

        // Removal must happen after the iterator has released its shard locks
        for id in closed {
            self.disconnect(id);
        }

        delivered
    }

    fn entry_mut(
        &self,
        id: SessionId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, SessionId, SessionEntry>, CoreError> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| CoreError::UnknownSession {
                session_id: id.to_string(),
            })
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(None)
    }
}

fn deliver(entry: &SessionEntry, event: ServerEvent) -> Delivery {
    match entry.tx.try_send(event) {
        Ok(()) => Delivery::Sent,
        Err(mpsc::error::TrySendError::Full(event)) => {
            warn!(event = event.name(), "Session queue full, dropping event");
            Delivery::Dropped
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
    }
}
