use crate::config::Config;
use crate::error::GameError;
use crate::game::geometry;
use crate::game::player::Player;
use crate::game::world::{GameEvent, World};
use crate::protocol::messages::{
    FoodState, FragmentState, LeaderboardEntry, PlayerState, ServerMessage, VirusState,
};
use crate::reward::{self, RewardLedger};
use crate::server::session::{Role, SessionRegistry, SessionState};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub type SharedWorld = Arc<RwLock<World>>;
pub type SharedRegistry = Arc<RwLock<SessionRegistry>>;

pub fn create_world(cfg: Config) -> SharedWorld {
    Arc::new(RwLock::new(World::new(cfg)))
}

pub fn create_registry() -> SharedRegistry {
    Arc::new(RwLock::new(SessionRegistry::new()))
}

/// The fixed-cadence scheduler. Owns all world mutation for the lifetime
/// of the process; an overrunning tick is logged and skipped past, never
/// queued behind.
pub async fn game_loop(
    world: SharedWorld,
    registry: SharedRegistry,
    ledger: Arc<dyn RewardLedger>,
    cfg: Arc<Config>,
) {
    let mut ticker = interval(cfg.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = cfg.tick_dt();

    loop {
        ticker.tick().await;
        let started = Instant::now();
        run_tick(&world, &registry, &ledger, dt).await;
        let elapsed = started.elapsed();
        if elapsed > cfg.tick_duration() {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "tick overran its period");
        }
    }
}

/// One tick: liveness sweep, physics/collision pass, leaderboard recompute
/// when dirty, state broadcast. Every send along the way is non-blocking.
pub(crate) async fn run_tick(
    world: &SharedWorld,
    registry: &SharedRegistry,
    ledger: &Arc<dyn RewardLedger>,
    dt: f64,
) {
    let mut w = world.write().await;
    let mut reg = registry.write().await;

    liveness_sweep(&mut w, &mut reg);
    w.tick(dt);
    dispatch_events(&mut w, &mut reg, ledger);

    if let Some(board) = w.refresh_leaderboard() {
        let entries = board
            .into_iter()
            .map(|(name, score)| LeaderboardEntry { name, score })
            .collect();
        reg.broadcast(&ServerMessage::Leaderboard { entries });
    }

    let closed = broadcast_state(&w, &reg);
    for id in closed {
        if let Some(player) = w.remove_player(id) {
            reg.broadcast(&ServerMessage::PlayerDisconnect { name: player.name });
        }
        reg.remove(id);
    }
}

/// Evict every player whose heartbeat ran out. Kicks are fire-and-forget;
/// a session already tearing itself down just ignores them.
pub(crate) fn liveness_sweep(w: &mut World, reg: &mut SessionRegistry) {
    let max_interval = w.config().max_heartbeat_interval();
    for id in w.stale_player_ids(max_interval) {
        if let Some(player) = w.remove_player(id) {
            warn!(player = %player.name, id, "heartbeat timed out, kicking");
            reg.kick(id, &GameError::StaleSession.to_string());
            reg.remove(id);
            reg.broadcast(&ServerMessage::PlayerDisconnect { name: player.name });
        }
    }
}

/// Turn this tick's domain events into session notifications and reward
/// transfers. The ledger call is spawned, never awaited here.
pub(crate) fn dispatch_events(
    w: &mut World,
    reg: &mut SessionRegistry,
    ledger: &Arc<dyn RewardLedger>,
) {
    for event in w.take_events() {
        match &event {
            GameEvent::PlayerEaten {
                eater_name,
                victim_id,
                victim_name,
                victim_mass,
                ..
            } => {
                info!(victim = %victim_name, eater = %eater_name, "player eliminated");
                reg.send_to(
                    *victim_id,
                    ServerMessage::Dead {
                        by: eater_name.clone(),
                        mass: *victim_mass as u64,
                    },
                );
                reg.eliminate(*victim_id);
                if let Some((winner, loser)) = event.reward_pair() {
                    reward::spawn_record_outcome(
                        ledger.clone(),
                        winner.to_string(),
                        loser.to_string(),
                    );
                }
            }
            GameEvent::VirusPopped { player_id, shed_mass } => {
                debug!(player = player_id, shed = shed_mass, "virus popped");
            }
        }
    }
}

/// Push the authoritative snapshot to every session. Returns the ids whose
/// outbound channel has closed so the caller can reap them.
pub(crate) fn broadcast_state(w: &World, reg: &SessionRegistry) -> Vec<u64> {
    let mut closed = Vec::new();
    let mut overview: Option<ServerMessage> = None;

    for session in reg.sessions() {
        let frame = match (session.role, session.state) {
            (Role::Player, SessionState::Active) => build_state_for_player(w, session.id),
            (Role::Player, SessionState::HandshakePending) => None,
            // Spectators and eliminated players watch the whole map.
            _ => Some(overview.get_or_insert_with(|| build_overview_state(w)).clone()),
        };
        if let Some(frame) = frame {
            if !reg.send_to(session.id, frame) {
                closed.push(session.id);
            }
        }
    }
    closed
}

/// Viewport-filtered snapshot centered on one player. The view widens as
/// the player grows, matching the client's zoom-out.
pub fn build_state_for_player(w: &World, player_id: u64) -> Option<ServerMessage> {
    let cfg = w.config();
    let player = w.player(player_id)?;

    let scale = (player.mass / cfg.default_player_mass).sqrt().max(1.0);
    let view = cfg.base_viewport * scale;
    let view_left = player.x - view;
    let view_right = player.x + view;
    let view_top = player.y - view;
    let view_bottom = player.y + view;

    let players = w
        .players
        .iter()
        .filter(|p| {
            let r = p.radius(cfg.slow_base);
            p.x + r > view_left && p.x - r < view_right && p.y + r > view_top && p.y - r < view_bottom
        })
        .map(|p| player_state(p, cfg))
        .collect();

    let food = w
        .food
        .iter()
        .filter(|f| f.x > view_left && f.x < view_right && f.y > view_top && f.y < view_bottom)
        .map(|f| FoodState {
            x: f.x,
            y: f.y,
            color: f.color.clone(),
        })
        .collect();

    let viruses = w
        .viruses
        .iter()
        .filter(|v| {
            let r = geometry::mass_to_radius(v.mass, cfg.slow_base);
            v.x + r > view_left && v.x - r < view_right && v.y + r > view_top && v.y - r < view_bottom
        })
        .map(|v| VirusState {
            x: v.x,
            y: v.y,
            radius: geometry::mass_to_radius(v.mass, cfg.slow_base),
        })
        .collect();

    let fragments = w
        .fragments
        .iter()
        .filter(|f| f.x > view_left && f.x < view_right && f.y > view_top && f.y < view_bottom)
        .map(|f| fragment_state(f, cfg))
        .collect();

    Some(ServerMessage::State {
        players,
        food,
        viruses,
        fragments,
    })
}

/// Whole-map snapshot for spectators.
pub fn build_overview_state(w: &World) -> ServerMessage {
    let cfg = w.config();
    ServerMessage::State {
        players: w.players.iter().map(|p| player_state(p, cfg)).collect(),
        food: w
            .food
            .iter()
            .map(|f| FoodState {
                x: f.x,
                y: f.y,
                color: f.color.clone(),
            })
            .collect(),
        viruses: w
            .viruses
            .iter()
            .map(|v| VirusState {
                x: v.x,
                y: v.y,
                radius: geometry::mass_to_radius(v.mass, cfg.slow_base),
            })
            .collect(),
        fragments: w.fragments.iter().map(|f| fragment_state(f, cfg)).collect(),
    }
}

fn player_state(p: &Player, cfg: &Config) -> PlayerState {
    PlayerState {
        id: p.id,
        name: p.name.clone(),
        x: p.x,
        y: p.y,
        radius: p.radius(cfg.slow_base),
        color: p.color.clone(),
    }
}

fn fragment_state(f: &crate::game::entity::MassFragment, cfg: &Config) -> FragmentState {
    FragmentState {
        x: f.x,
        y: f.y,
        radius: geometry::mass_to_radius(f.mass, cfg.slow_base),
        color: f.color.clone(),
    }
}
