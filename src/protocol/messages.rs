use serde::{Deserialize, Serialize};

// ── Client → Server ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Handshake. Sent once after connecting as a player, or again after
    /// elimination to respawn.
    Join {
        name: String,
        #[serde(default)]
        wallet: Option<String>,
    },
    /// New movement target. Doubles as a liveness signal.
    Move { x: f64, y: f64 },
    /// Explicit liveness signal for idle clients.
    Heartbeat,
    Eject,
}

// ── Server → Client ──

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        id: u64,
        world_width: f64,
        world_height: f64,
    },
    /// The connection is being force-closed.
    Kick { reason: String },
    PlayerJoin { name: String },
    PlayerDisconnect { name: String },
    State {
        players: Vec<PlayerState>,
        food: Vec<FoodState>,
        viruses: Vec<VirusState>,
        fragments: Vec<FragmentState>,
    },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    /// Eliminated by another player. The client may rejoin or spectate.
    Dead { by: String, mass: u64 },
    Error { message: String },
}

#[derive(Debug, Serialize, Clone)]
pub struct PlayerState {
    pub id: u64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct FoodState {
    pub x: f64,
    pub y: f64,
    pub color: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct VirusState {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct FragmentState {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
}
