use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{GameError, WorldError};
use crate::game::engine::{SharedRegistry, SharedWorld};
use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::server::session::{Role, SessionState};

#[derive(Clone)]
pub struct WsState {
    pub world: SharedWorld,
    pub registry: SharedRegistry,
    pub cfg: Arc<Config>,
    pub next_session_id: Arc<AtomicU64>,
}

#[derive(Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "type")]
    pub kind: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<WsState>,
) -> impl IntoResponse {
    let role = match params.kind.as_str() {
        "player" => Role::Player,
        "spectator" => Role::Spectator,
        other => {
            warn!(kind = other, "unknown session type, refusing connection");
            return (StatusCode::BAD_REQUEST, "unknown session type").into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, role))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: WsState, role: Role) {
    let id = state.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.cfg.session_buffer);

    state.registry.write().await.register(id, role, tx);
    info!(session = id, ?role, "session connected");

    // Drain the session queue onto the socket. Ends when the registry
    // drops the sending half (kick, eviction) or the socket dies.
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else { continue };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    {
        let reg = state.registry.read().await;
        reg.send_to(
            id,
            ServerMessage::Welcome {
                id,
                world_width: state.cfg.world_width,
                world_height: state.cfg.world_height,
            },
        );
    }

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if !handle_message(&recv_state, id, role, client_msg).await {
                            break;
                        }
                    }
                    Err(_) => {
                        let reg = recv_state.registry.read().await;
                        reg.send_to(
                            id,
                            ServerMessage::Error {
                                message: "Malformed message.".into(),
                            },
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = forward_task => {},
        _ = recv_task => {},
    }

    cleanup(&state, id).await;
}

/// Apply one client message. Returns false when the connection must close.
pub(crate) async fn handle_message(
    state: &WsState,
    id: u64,
    role: Role,
    msg: ClientMessage,
) -> bool {
    match msg {
        ClientMessage::Join { name, wallet } => handle_join(state, id, role, name, wallet).await,
        ClientMessage::Move { x, y } => {
            if x.is_finite() && y.is_finite() {
                let mut world = state.world.write().await;
                if let Some(player) = world.player_mut(id) {
                    player.target_x = x.clamp(0.0, state.cfg.world_width);
                    player.target_y = y.clamp(0.0, state.cfg.world_height);
                    player.heartbeat();
                }
            }
            true
        }
        ClientMessage::Heartbeat => {
            let mut world = state.world.write().await;
            if let Some(player) = world.player_mut(id) {
                player.heartbeat();
            }
            true
        }
        ClientMessage::Eject => {
            state.world.write().await.eject(id);
            true
        }
    }
}

async fn handle_join(
    state: &WsState,
    id: u64,
    role: Role,
    name: String,
    wallet: Option<String>,
) -> bool {
    if role != Role::Player {
        let reg = state.registry.read().await;
        reg.send_to(
            id,
            ServerMessage::Error {
                message: "Spectators cannot join the arena.".into(),
            },
        );
        return true;
    }
    if state.registry.read().await.state(id) == Some(SessionState::Active) {
        // Already playing; a stray join changes nothing.
        return true;
    }

    match try_join(state, id, name, wallet).await {
        Ok(name) => {
            let mut reg = state.registry.write().await;
            reg.activate(id, name.clone());
            reg.broadcast(&ServerMessage::PlayerJoin { name: name.clone() });
            info!(session = id, player = %name, "player joined");
            true
        }
        Err(err @ GameError::InvalidHandshake(_)) => {
            warn!(session = id, %err, "rejecting handshake");
            state.registry.read().await.kick(id, "Invalid username.");
            false
        }
        Err(err) => {
            warn!(session = id, %err, "rejecting handshake");
            false
        }
    }
}

async fn try_join(
    state: &WsState,
    id: u64,
    name: String,
    wallet: Option<String>,
) -> Result<String, GameError> {
    let name = name.trim().to_string();
    if !valid_nick(&name) {
        return Err(GameError::InvalidHandshake(format!("bad name {:?}", name)));
    }
    let mut world = state.world.write().await;
    world
        .spawn_player(id, name.clone(), wallet)
        .map_err(|WorldError::DuplicateId(dup)| GameError::DuplicateConnection(dup))?;
    Ok(name)
}

/// Usernames: 1-25 chars of letters, digits, underscore, dash and space.
/// Anything else, control characters included, is rejected.
pub(crate) fn valid_nick(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= 25
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ')
        && name.chars().any(|c| c != ' ')
}

async fn cleanup(state: &WsState, id: u64) {
    let mut world = state.world.write().await;
    let mut reg = state.registry.write().await;
    let session = reg.remove(id);
    // An eliminated player's entity is already gone; the session still
    // remembers who to announce.
    let name = match world.remove_player(id) {
        Some(player) => Some(player.name),
        None => session.and_then(|s| s.name),
    };
    if let Some(name) = name {
        info!(session = id, player = %name, "session disconnected");
        reg.broadcast(&ServerMessage::PlayerDisconnect { name });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::{create_registry, create_world};

    fn quiet_cfg() -> Config {
        let mut cfg = Config::default();
        cfg.food_count = 0;
        cfg.virus_count = 0;
        cfg.mass_decay_rate = 0.0;
        cfg
    }

    fn ws_state() -> WsState {
        let cfg = quiet_cfg();
        WsState {
            world: create_world(cfg.clone()),
            registry: create_registry(),
            cfg: Arc::new(cfg),
            next_session_id: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn register(state: &WsState, id: u64, role: Role) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(32);
        state.registry.write().await.register(id, role, tx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn nick_validation() {
        assert!(valid_nick("ada"));
        assert!(valid_nick("Ada Lovelace-01"));
        assert!(valid_nick("a_b-c"));

        assert!(!valid_nick(""));
        assert!(!valid_nick("   "));
        assert!(!valid_nick("na\nme"));
        assert!(!valid_nick("name\u{7}"));
        assert!(!valid_nick("<script>"));
        assert!(!valid_nick(&"x".repeat(26)));
    }

    #[tokio::test]
    async fn invalid_name_is_kicked_before_joining() {
        let state = ws_state();
        let mut rx = register(&state, 1, Role::Player).await;
        let mut other_rx = register(&state, 2, Role::Spectator).await;

        let keep = handle_message(
            &state,
            1,
            Role::Player,
            ClientMessage::Join {
                name: "<script>".into(),
                wallet: None,
            },
        )
        .await;

        assert!(!keep);
        assert!(state.world.read().await.player(1).is_none());
        assert_ne!(
            state.registry.read().await.state(1),
            Some(SessionState::Active)
        );
        let msgs = drain(&mut rx);
        assert!(msgs.iter().any(
            |m| matches!(m, ServerMessage::Kick { reason } if reason == "Invalid username.")
        ));
        // No player_join ever went out.
        assert!(!drain(&mut other_rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::PlayerJoin { .. })));
    }

    #[tokio::test]
    async fn valid_join_activates_and_announces() {
        let state = ws_state();
        let _rx = register(&state, 1, Role::Player).await;
        let mut other_rx = register(&state, 2, Role::Spectator).await;

        let keep = handle_message(
            &state,
            1,
            Role::Player,
            ClientMessage::Join {
                name: "  ada  ".into(),
                wallet: Some("0xAA".into()),
            },
        )
        .await;

        assert!(keep);
        assert_eq!(
            state.registry.read().await.state(1),
            Some(SessionState::Active)
        );
        let w = state.world.read().await;
        let p = w.player(1).expect("player should exist");
        assert_eq!(p.name, "ada");
        assert_eq!(p.wallet.as_deref(), Some("0xAA"));
        assert!(drain(&mut other_rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::PlayerJoin { name } if name == "ada")));
    }

    #[tokio::test]
    async fn second_connection_with_a_live_id_is_dropped() {
        let state = ws_state();
        let _rx = register(&state, 1, Role::Player).await;
        state
            .world
            .write()
            .await
            .spawn_player(1, "first".into(), None)
            .unwrap();

        let keep = handle_message(
            &state,
            1,
            Role::Player,
            ClientMessage::Join {
                name: "second".into(),
                wallet: None,
            },
        )
        .await;

        assert!(!keep);
        // The first player is untouched.
        assert_eq!(state.world.read().await.player(1).unwrap().name, "first");
    }

    #[tokio::test]
    async fn eliminated_session_can_rejoin() {
        let state = ws_state();
        let _rx = register(&state, 1, Role::Player).await;
        assert!(
            handle_message(
                &state,
                1,
                Role::Player,
                ClientMessage::Join {
                    name: "ada".into(),
                    wallet: None,
                },
            )
            .await
        );

        // Consumed: player gone, session flagged eliminated.
        state.world.write().await.remove_player(1);
        state.registry.write().await.eliminate(1);

        assert!(
            handle_message(
                &state,
                1,
                Role::Player,
                ClientMessage::Join {
                    name: "ada".into(),
                    wallet: None,
                },
            )
            .await
        );
        assert_eq!(
            state.registry.read().await.state(1),
            Some(SessionState::Active)
        );
        assert!(state.world.read().await.player(1).is_some());
    }

    #[tokio::test]
    async fn movement_refreshes_the_heartbeat() {
        let state = ws_state();
        let _rx = register(&state, 1, Role::Player).await;
        state
            .world
            .write()
            .await
            .spawn_player(1, "ada".into(), None)
            .unwrap();
        {
            let mut w = state.world.write().await;
            w.player_mut(1).unwrap().last_heartbeat =
                std::time::Instant::now() - std::time::Duration::from_secs(60);
        }

        handle_message(&state, 1, Role::Player, ClientMessage::Move { x: 10.0, y: 20.0 }).await;

        let w = state.world.read().await;
        let p = w.player(1).unwrap();
        assert!(!p.is_stale(state.cfg.max_heartbeat_interval()));
        assert_eq!(p.target_x, 10.0);
        assert_eq!(p.target_y, 20.0);
    }

    #[tokio::test]
    async fn non_finite_movement_is_ignored() {
        let state = ws_state();
        let _rx = register(&state, 1, Role::Player).await;
        state
            .world
            .write()
            .await
            .spawn_player(1, "ada".into(), None)
            .unwrap();
        let before = {
            let w = state.world.read().await;
            let p = w.player(1).unwrap();
            (p.target_x, p.target_y)
        };

        handle_message(
            &state,
            1,
            Role::Player,
            ClientMessage::Move {
                x: f64::NAN,
                y: f64::INFINITY,
            },
        )
        .await;

        let w = state.world.read().await;
        let p = w.player(1).unwrap();
        assert_eq!((p.target_x, p.target_y), before);
    }
}
