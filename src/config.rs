use serde::Deserialize;
use std::time::Duration;

/// Placement policy for new players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStrategy {
    /// Uniform sample inside the map, retried away from existing players.
    Uniform,
    /// Maximize the minimum distance to every existing player.
    Farthest,
}

/// Server tuning. Everything here is supplied from outside the core:
/// `load()` reads an optional JSON file, otherwise the stock values apply.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,

    // World
    pub world_width: f64,
    pub world_height: f64,
    pub tick_rate: u64,

    // Players
    pub default_player_mass: f64,
    pub min_mass: f64,
    pub base_speed: f64,
    pub slow_base: f64,
    pub eat_mass_ratio: f64,
    pub eat_overlap_ratio: f64,
    pub mass_decay_rate: f64,
    pub decay_min_mass: f64,
    pub max_heartbeat_interval_ms: u64,

    // Spawning
    pub spawn_strategy: SpawnStrategy,
    pub spawn_retries: u32,
    pub spawn_grid: usize,

    // Food
    pub food_count: usize,
    pub food_mass: f64,
    pub food_radius: f64,

    // Viruses
    pub virus_count: usize,
    pub virus_mass: f64,
    pub virus_pop_min_mass: f64,
    pub virus_pop_loss: f64,
    pub virus_pop_fragments: usize,

    // Ejected mass
    pub eject_mass: f64,
    pub eject_min_mass: f64,
    pub eject_speed: f64,
    pub eject_decel: f64,
    pub fragment_eat_speed: f64,

    // Sessions
    pub session_buffer: usize,
    pub leaderboard_size: usize,
    pub base_viewport: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 63012,

            world_width: 4000.0,
            world_height: 4000.0,
            tick_rate: 60,

            default_player_mass: 10.0,
            min_mass: 10.0,
            base_speed: 300.0,
            slow_base: 4.5,
            eat_mass_ratio: 1.25,
            eat_overlap_ratio: 0.5,
            mass_decay_rate: 0.002,
            decay_min_mass: 50.0,
            max_heartbeat_interval_ms: 5000,

            spawn_strategy: SpawnStrategy::Farthest,
            spawn_retries: 10,
            spawn_grid: 16,

            food_count: 500,
            food_mass: 1.0,
            food_radius: 5.0,

            virus_count: 15,
            virus_mass: 100.0,
            virus_pop_min_mass: 130.0,
            virus_pop_loss: 0.4,
            virus_pop_fragments: 8,

            eject_mass: 14.0,
            eject_min_mass: 32.0,
            eject_speed: 600.0,
            eject_decel: 0.88,
            fragment_eat_speed: 5.0,

            session_buffer: 64,
            leaderboard_size: 10,
            base_viewport: 800.0,
        }
    }
}

impl Config {
    /// Read config from the file named by `ARENA_CONFIG`, falling back to
    /// the defaults when the variable is unset or the file is unreadable.
    pub fn load() -> Config {
        let Some(path) = std::env::var_os("ARENA_CONFIG") else {
            return Config::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(?path, error = %e, "invalid config file, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!(?path, error = %e, "unreadable config file, using defaults");
                Config::default()
            }
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_rate.max(1))
    }

    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_rate.max(1) as f64
    }

    pub fn max_heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.max_heartbeat_interval_ms)
    }
}
