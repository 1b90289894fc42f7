use crate::protocol::messages::ServerMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected as a player, waiting for a valid join message.
    HandshakePending,
    /// Owns a live player (or observes, for spectators).
    Active,
    /// Player was consumed. The connection stays open so the client can
    /// rejoin or keep watching.
    Eliminated,
}

/// One live connection. `tx` feeds the socket's forwarding task; it is
/// bounded, and every send here is non-blocking.
pub struct Session {
    pub id: u64,
    pub role: Role,
    pub state: SessionState,
    pub name: Option<String>,
    tx: mpsc::Sender<ServerMessage>,
}

/// Maps connection ids to live sessions. Shares the tick's serialization
/// point with the world: all writes happen under one lock, after the world
/// lock when both are held.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<u64, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Register a fresh connection. Spectators observe without a handshake
    /// and activate immediately; players stay pending until a valid join.
    pub fn register(&mut self, id: u64, role: Role, tx: mpsc::Sender<ServerMessage>) {
        let state = match role {
            Role::Player => SessionState::HandshakePending,
            Role::Spectator => SessionState::Active,
        };
        self.sessions.insert(
            id,
            Session {
                id,
                role,
                state,
                name: None,
                tx,
            },
        );
    }

    pub fn activate(&mut self, id: u64, name: String) {
        if let Some(s) = self.sessions.get_mut(&id) {
            s.state = SessionState::Active;
            s.name = Some(name);
        }
    }

    pub fn eliminate(&mut self, id: u64) {
        if let Some(s) = self.sessions.get_mut(&id) {
            s.state = SessionState::Eliminated;
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn state(&self, id: u64) -> Option<SessionState> {
        self.sessions.get(&id).map(|s| s.state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Queue a message for one session. Never blocks: a full queue drops
    /// this message, a closed queue reports the session dead. Returns
    /// false only when the receiving side is gone.
    pub fn send_to(&self, id: u64, msg: ServerMessage) -> bool {
        let Some(session) = self.sessions.get(&id) else {
            return false;
        };
        match session.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(session = id, "outbound queue full, dropping frame");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn kick(&self, id: u64, reason: &str) {
        self.send_to(
            id,
            ServerMessage::Kick {
                reason: reason.to_string(),
            },
        );
    }

    /// Fan a message out to every session. Returns the ids whose channel
    /// has closed so the caller can reap them.
    pub fn broadcast(&self, msg: &ServerMessage) -> Vec<u64> {
        let mut closed = Vec::new();
        for session in self.sessions.values() {
            if !self.send_to(session.id, msg.clone()) {
                closed.push(session.id);
            }
        }
        closed
    }
}
