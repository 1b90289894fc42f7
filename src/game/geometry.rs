use crate::config::Config;

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

pub fn circles_overlap(x1: f64, y1: f64, r1: f64, x2: f64, y2: f64, r2: f64) -> bool {
    distance(x1, y1, x2, y2) < r1 + r2
}

/// The single mass-to-radius mapping, used for spawn sizing and runtime
/// sizing alike. Logarithmic in mass so radius growth flattens out as a
/// player gets big.
pub fn mass_to_radius(mass: f64, slow_base: f64) -> f64 {
    4.0 + mass.max(1.0).log(slow_base) * 6.0
}

pub fn speed_for_mass(mass: f64, base_speed: f64) -> f64 {
    base_speed / mass.max(1.0).sqrt()
}

/// Check if circle 1 can eat circle 2: at least `eat_mass_ratio` times the
/// mass, and the smaller circle's center pulled far enough inside the larger
/// one (containment threshold, not mere edge contact).
pub fn can_eat(
    x1: f64, y1: f64, mass1: f64,
    x2: f64, y2: f64, mass2: f64,
    cfg: &Config,
) -> bool {
    if mass1 < mass2 * cfg.eat_mass_ratio {
        return false;
    }
    let r1 = mass_to_radius(mass1, cfg.slow_base);
    let r2 = mass_to_radius(mass2, cfg.slow_base);
    distance(x1, y1, x2, y2) + r2 * cfg.eat_overlap_ratio < r1
}

/// Check if a player circle covers a food-sized morsel at (mx, my).
pub fn covers_morsel(x: f64, y: f64, mass: f64, mx: f64, my: f64, cfg: &Config) -> bool {
    let r = mass_to_radius(mass, cfg.slow_base);
    distance(x, y, mx, my) < r - cfg.food_radius * 0.5
}

/// Clamp a position so the circle stays inside the map.
pub fn clamp_to_bounds(x: f64, y: f64, radius: f64, cfg: &Config) -> (f64, f64) {
    let x = x.max(radius).min(cfg.world_width - radius);
    let y = y.max(radius).min(cfg.world_height - radius);
    (x, y)
}

/// Normalize a direction vector.
pub fn normalize(x: f64, y: f64) -> (f64, f64) {
    let len = (x * x + y * y).sqrt();
    if len < 0.0001 {
        (0.0, 0.0)
    } else {
        (x / len, y / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn distance_is_euclidean() {
        assert_approx_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0);
    }

    #[test]
    fn radius_is_monotonic_in_mass() {
        let cfg = cfg();
        let mut prev = 0.0;
        for mass in [1.0, 5.0, 10.0, 50.0, 100.0, 1000.0, 10000.0] {
            let r = mass_to_radius(mass, cfg.slow_base);
            assert!(r >= prev, "radius shrank at mass {}", mass);
            prev = r;
        }
    }

    #[test]
    fn radius_growth_decelerates() {
        let cfg = cfg();
        let step1 = mass_to_radius(100.0, cfg.slow_base) - mass_to_radius(10.0, cfg.slow_base);
        let step2 = mass_to_radius(1000.0, cfg.slow_base) - mass_to_radius(100.0, cfg.slow_base);
        // Equal mass multiples add equal radius on a log scale, so per-unit
        // growth falls off sharply.
        assert_approx_eq!(step1, step2, 1e-9);
        let per_unit_low = step1 / 90.0;
        let per_unit_high = step2 / 900.0;
        assert!(per_unit_high < per_unit_low);
    }

    #[test]
    fn bigger_players_move_slower() {
        let cfg = cfg();
        assert!(speed_for_mass(100.0, cfg.base_speed) < speed_for_mass(10.0, cfg.base_speed));
    }

    #[test]
    fn equal_masses_cannot_eat_each_other() {
        let cfg = cfg();
        assert!(!can_eat(0.0, 0.0, 50.0, 1.0, 0.0, 50.0, &cfg));
        assert!(!can_eat(1.0, 0.0, 50.0, 0.0, 0.0, 50.0, &cfg));
    }

    #[test]
    fn mass_ratio_gates_eating() {
        let cfg = cfg();
        // 60 vs 50 overlaps fully but misses the 1.25x ratio.
        assert!(!can_eat(0.0, 0.0, 60.0, 0.0, 0.0, 50.0, &cfg));
        // 100 vs 50 clears the ratio and sits dead center.
        assert!(can_eat(0.0, 0.0, 100.0, 0.0, 0.0, 50.0, &cfg));
    }

    #[test]
    fn edge_contact_is_not_enough_to_eat() {
        let cfg = cfg();
        let r1 = mass_to_radius(100.0, cfg.slow_base);
        let r2 = mass_to_radius(50.0, cfg.slow_base);
        // Just touching: centers separated by the sum of radii.
        assert!(!can_eat(0.0, 0.0, 100.0, r1 + r2, 0.0, 50.0, &cfg));
    }

    #[test]
    fn clamp_keeps_circle_inside_map() {
        let cfg = cfg();
        let (x, y) = clamp_to_bounds(-50.0, cfg.world_height + 10.0, 20.0, &cfg);
        assert_approx_eq!(x, 20.0);
        assert_approx_eq!(y, cfg.world_height - 20.0);
    }

    #[test]
    fn normalize_handles_zero_vector() {
        assert_eq!(normalize(0.0, 0.0), (0.0, 0.0));
        let (nx, ny) = normalize(3.0, 4.0);
        assert_approx_eq!(nx * nx + ny * ny, 1.0);
    }
}
