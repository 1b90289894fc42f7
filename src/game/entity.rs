use crate::config::Config;
use rand::Rng;

const FOOD_COLORS: [&str; 10] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF",
    "#FF9F40", "#E7E9ED", "#7CB342", "#F06292", "#4DD0E1",
];

#[derive(Debug, Clone)]
pub struct Food {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub color: String,
}

impl Food {
    pub fn random(cfg: &Config) -> Self {
        let mut rng = rand::thread_rng();
        Food {
            x: rng.gen_range(0.0..cfg.world_width),
            y: rng.gen_range(0.0..cfg.world_height),
            mass: cfg.food_mass,
            color: FOOD_COLORS[rng.gen_range(0..FOOD_COLORS.len())].to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Virus {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
}

impl Virus {
    pub fn random(cfg: &Config) -> Self {
        let mut rng = rand::thread_rng();
        let margin = crate::game::geometry::mass_to_radius(cfg.virus_mass, cfg.slow_base);
        Virus {
            x: rng.gen_range(margin..cfg.world_width - margin),
            y: rng.gen_range(margin..cfg.world_height - margin),
            mass: cfg.virus_mass,
        }
    }
}

/// Mass shed by a player, either ejected on purpose or scattered by a virus
/// pop. Skids under its launch velocity and only becomes edible once slow.
#[derive(Debug, Clone)]
pub struct MassFragment {
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub vx: f64,
    pub vy: f64,
    pub color: String,
}

impl MassFragment {
    pub fn is_edible(&self, cfg: &Config) -> bool {
        self.vx.abs() < cfg.fragment_eat_speed && self.vy.abs() < cfg.fragment_eat_speed
    }
}
