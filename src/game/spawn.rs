use crate::config::{Config, SpawnStrategy};
use crate::game::geometry;
use crate::game::player::Player;
use rand::Rng;

/// Pick a spawn point for a new circle of the given radius.
///
/// `Farthest` ranks a fixed candidate grid by distance to the nearest player
/// and keeps the strictly best score, so the winner is deterministic for a
/// given occupancy. `Uniform` samples inside the map and retries a bounded
/// number of times; when every draw overlaps someone it settles for the
/// least crowded draw instead of spinning.
pub fn generate_spawn_point<R: Rng>(
    strategy: SpawnStrategy,
    radius: f64,
    players: &[Player],
    cfg: &Config,
    rng: &mut R,
) -> (f64, f64) {
    match strategy {
        SpawnStrategy::Farthest if !players.is_empty() => farthest_point(radius, players, cfg),
        _ => uniform_point(radius, players, cfg, rng),
    }
}

fn uniform_point<R: Rng>(radius: f64, players: &[Player], cfg: &Config, rng: &mut R) -> (f64, f64) {
    let mut best = (cfg.world_width / 2.0, cfg.world_height / 2.0);
    let mut best_clearance = f64::NEG_INFINITY;

    for _ in 0..cfg.spawn_retries.max(1) {
        let x = rng.gen_range(radius..cfg.world_width - radius);
        let y = rng.gen_range(radius..cfg.world_height - radius);

        let clearance = min_distance_to_players(x, y, players);
        let overlaps = players.iter().any(|p| {
            geometry::circles_overlap(x, y, radius, p.x, p.y, p.radius(cfg.slow_base))
        });
        if !overlaps {
            return (x, y);
        }
        if clearance > best_clearance {
            best_clearance = clearance;
            best = (x, y);
        }
    }
    best
}

fn farthest_point(radius: f64, players: &[Player], cfg: &Config) -> (f64, f64) {
    let grid = cfg.spawn_grid.max(2);
    let step_x = (cfg.world_width - 2.0 * radius) / (grid - 1) as f64;
    let step_y = (cfg.world_height - 2.0 * radius) / (grid - 1) as f64;

    let mut best = (cfg.world_width / 2.0, cfg.world_height / 2.0);
    let mut best_clearance = f64::NEG_INFINITY;

    for gy in 0..grid {
        for gx in 0..grid {
            let x = radius + gx as f64 * step_x;
            let y = radius + gy as f64 * step_y;
            let clearance = min_distance_to_players(x, y, players);
            if clearance > best_clearance {
                best_clearance = clearance;
                best = (x, y);
            }
        }
    }
    best
}

fn min_distance_to_players(x: f64, y: f64, players: &[Player]) -> f64 {
    players
        .iter()
        .map(|p| geometry::distance(x, y, p.x, p.y))
        .fold(f64::INFINITY, f64::min)
}
