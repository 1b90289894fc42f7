use thiserror::Error;

/// Session-level failures. Each variant maps to one way a connection is
/// refused or evicted; none of them abort the tick loop.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),

    #[error("connection {0} already owns a live player")]
    DuplicateConnection(u64),

    // Doubles as the wire-visible kick reason.
    #[error("Last heartbeat received too long ago.")]
    StaleSession,
}

/// Entity store contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("a live player already exists for connection {0}")]
    DuplicateId(u64),
}

/// Failures from the external reward ledger. Gameplay never depends on
/// these: an elimination already committed in-game stays committed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("ledger gave up after {0} attempts")]
    Exhausted(u32),

    #[error("ledger call exceeded its deadline")]
    Deadline,
}
