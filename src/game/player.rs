use crate::game::geometry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Player {
    /// Connection id, assigned by the server on accept. Unique while live.
    pub id: u64,
    pub name: String,
    /// External account identifier, supplied in the handshake. Reward
    /// transfers only fire when both sides of an elimination carry one.
    pub wallet: Option<String>,
    pub x: f64,
    pub y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub mass: f64,
    pub color: String,
    pub last_heartbeat: Instant,
}

impl Player {
    pub fn new(id: u64, name: String, wallet: Option<String>, x: f64, y: f64, mass: f64) -> Self {
        Player {
            id,
            name,
            wallet,
            x,
            y,
            target_x: x,
            target_y: y,
            mass,
            color: random_color(),
            last_heartbeat: Instant::now(),
        }
    }

    pub fn radius(&self, slow_base: f64) -> f64 {
        geometry::mass_to_radius(self.mass, slow_base)
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_stale(&self, max_interval: Duration) -> bool {
        self.last_heartbeat.elapsed() > max_interval
    }
}

fn random_color() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let colors = [
        "#FF4136", "#FF6B35", "#FFDC00", "#2ECC40", "#0074D9",
        "#7FDBFF", "#B10DC9", "#F012BE", "#FF69B4", "#01FF70",
        "#3D9970", "#39CCCC", "#E65100", "#00BCD4", "#8BC34A",
    ];
    colors[rng.gen_range(0..colors.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn spawn_radius_matches_runtime_radius() {
        let cfg = Config::default();
        let spawn_radius =
            geometry::mass_to_radius(cfg.default_player_mass, cfg.slow_base);
        let p = Player::new(1, "ada".into(), None, 0.0, 0.0, cfg.default_player_mass);
        assert_approx_eq!(p.radius(cfg.slow_base), spawn_radius);
    }

    #[test]
    fn fresh_player_is_not_stale() {
        let p = Player::new(1, "ada".into(), None, 0.0, 0.0, 10.0);
        assert!(!p.is_stale(Duration::from_secs(5)));
    }

    #[test]
    fn backdated_heartbeat_is_stale() {
        let mut p = Player::new(1, "ada".into(), None, 0.0, 0.0, 10.0);
        p.last_heartbeat = Instant::now() - Duration::from_secs(10);
        assert!(p.is_stale(Duration::from_secs(5)));
        p.heartbeat();
        assert!(!p.is_stale(Duration::from_secs(5)));
    }
}
