use crate::config::Config;
use crate::error::WorldError;
use crate::game::entity::{Food, MassFragment, Virus};
use crate::game::geometry;
use crate::game::player::Player;
use crate::game::spawn;
use std::time::Duration;

/// Domain events produced while resolving a tick. Drained by the scheduler,
/// which turns them into session notifications and reward-bridge calls.
#[derive(Debug, Clone)]
pub enum GameEvent {
    PlayerEaten {
        eater_id: u64,
        eater_name: String,
        eater_wallet: Option<String>,
        victim_id: u64,
        victim_name: String,
        victim_wallet: Option<String>,
        victim_mass: f64,
    },
    VirusPopped {
        player_id: u64,
        shed_mass: f64,
    },
}

impl GameEvent {
    /// The `(winner, loser)` accounts for the reward bridge. Present only
    /// for an elimination where both sides registered a wallet.
    pub fn reward_pair(&self) -> Option<(&str, &str)> {
        match self {
            GameEvent::PlayerEaten {
                eater_wallet: Some(winner),
                victim_wallet: Some(loser),
                ..
            } => Some((winner.as_str(), loser.as_str())),
            _ => None,
        }
    }
}

/// The authoritative world. Single owner of every entity collection; all
/// mutation happens under the scheduler's write lock.
pub struct World {
    cfg: Config,
    pub players: Vec<Player>,
    pub food: Vec<Food>,
    pub viruses: Vec<Virus>,
    pub fragments: Vec<MassFragment>,
    events: Vec<GameEvent>,
    leaderboard: Vec<(String, u64)>,
    leaderboard_dirty: bool,
}

impl World {
    pub fn new(cfg: Config) -> Self {
        let mut food = Vec::with_capacity(cfg.food_count);
        for _ in 0..cfg.food_count {
            food.push(Food::random(&cfg));
        }
        let mut viruses = Vec::with_capacity(cfg.virus_count);
        for _ in 0..cfg.virus_count {
            viruses.push(Virus::random(&cfg));
        }
        World {
            cfg,
            players: Vec::new(),
            food,
            viruses,
            fragments: Vec::new(),
            events: Vec::new(),
            leaderboard: Vec::new(),
            leaderboard_dirty: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Insert a fully built player. Fails when the connection id already
    /// owns a live player.
    pub fn add_player(&mut self, player: Player) -> Result<(), WorldError> {
        if self.find_player_index(player.id).is_some() {
            return Err(WorldError::DuplicateId(player.id));
        }
        self.players.push(player);
        self.leaderboard_dirty = true;
        Ok(())
    }

    /// Place and insert a new player via the spawn planner.
    pub fn spawn_player(
        &mut self,
        id: u64,
        name: String,
        wallet: Option<String>,
    ) -> Result<(), WorldError> {
        if self.find_player_index(id).is_some() {
            return Err(WorldError::DuplicateId(id));
        }
        let radius = geometry::mass_to_radius(self.cfg.default_player_mass, self.cfg.slow_base);
        let (x, y) = spawn::generate_spawn_point(
            self.cfg.spawn_strategy,
            radius,
            &self.players,
            &self.cfg,
            &mut rand::thread_rng(),
        );
        self.add_player(Player::new(id, name, wallet, x, y, self.cfg.default_player_mass))
    }

    /// Idempotent removal; `None` when the id is not live.
    pub fn remove_player(&mut self, id: u64) -> Option<Player> {
        let idx = self.find_player_index(id)?;
        self.leaderboard_dirty = true;
        // Vec::remove keeps the remaining players in insertion order.
        Some(self.players.remove(idx))
    }

    pub fn find_player_index(&self, id: u64) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player(&self, id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: u64) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Players whose last heartbeat is older than the allowed interval.
    pub fn stale_player_ids(&self, max_interval: Duration) -> Vec<u64> {
        self.players
            .iter()
            .filter(|p| p.is_stale(max_interval))
            .map(|p| p.id)
            .collect()
    }

    /// One physics/collision pass. Every mutation is visible to the steps
    /// that follow it within the same call.
    pub fn tick(&mut self, dt: f64) {
        self.move_players(dt);
        self.move_fragments(dt);
        self.eat_food();
        self.eat_fragments();
        self.eat_players();
        self.pop_viruses();
        self.decay_mass(dt);
        self.replenish();
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Rebuild the leaderboard when the player set or a mass transfer
    /// changed it since the last call. `None` means nothing to broadcast.
    pub fn refresh_leaderboard(&mut self) -> Option<Vec<(String, u64)>> {
        if !self.leaderboard_dirty {
            return None;
        }
        self.leaderboard_dirty = false;
        let mut entries: Vec<(String, u64)> = self
            .players
            .iter()
            .map(|p| (p.name.clone(), p.mass as u64))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(self.cfg.leaderboard_size);
        self.leaderboard = entries.clone();
        Some(entries)
    }

    pub fn leaderboard(&self) -> &[(String, u64)] {
        &self.leaderboard
    }

    fn move_players(&mut self, dt: f64) {
        for player in &mut self.players {
            let dx = player.target_x - player.x;
            let dy = player.target_y - player.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > 5.0 {
                let speed = geometry::speed_for_mass(player.mass, self.cfg.base_speed) * dt;
                let (nx, ny) = geometry::normalize(dx, dy);
                player.x += nx * speed.min(dist);
                player.y += ny * speed.min(dist);
            }
            let r = player.radius(self.cfg.slow_base);
            let (cx, cy) = geometry::clamp_to_bounds(player.x, player.y, r, &self.cfg);
            player.x = cx;
            player.y = cy;
        }
    }

    fn move_fragments(&mut self, dt: f64) {
        for frag in &mut self.fragments {
            frag.x += frag.vx * dt;
            frag.y += frag.vy * dt;
            frag.vx *= self.cfg.eject_decel;
            frag.vy *= self.cfg.eject_decel;
            let r = geometry::mass_to_radius(frag.mass, self.cfg.slow_base);
            let (cx, cy) = geometry::clamp_to_bounds(frag.x, frag.y, r, &self.cfg);
            frag.x = cx;
            frag.y = cy;
        }
    }

    fn eat_food(&mut self) {
        let mut eaten_indices = Vec::new();
        let mut any = false;
        for player in &mut self.players {
            for (fi, food) in self.food.iter().enumerate() {
                if eaten_indices.contains(&fi) {
                    continue;
                }
                if geometry::covers_morsel(player.x, player.y, player.mass, food.x, food.y, &self.cfg)
                {
                    player.mass += food.mass;
                    eaten_indices.push(fi);
                    any = true;
                }
            }
        }
        eaten_indices.sort_unstable_by(|a, b| b.cmp(a));
        for i in eaten_indices {
            self.food.swap_remove(i);
        }
        if any {
            self.leaderboard_dirty = true;
        }
    }

    fn eat_fragments(&mut self) {
        let mut eaten_indices = Vec::new();
        for player in &mut self.players {
            for (fi, frag) in self.fragments.iter().enumerate() {
                if eaten_indices.contains(&fi) || !frag.is_edible(&self.cfg) {
                    continue;
                }
                if geometry::covers_morsel(player.x, player.y, player.mass, frag.x, frag.y, &self.cfg)
                {
                    player.mass += frag.mass;
                    eaten_indices.push(fi);
                }
            }
        }
        if !eaten_indices.is_empty() {
            self.leaderboard_dirty = true;
        }
        eaten_indices.sort_unstable_by(|a, b| b.cmp(a));
        for i in eaten_indices {
            self.fragments.swap_remove(i);
        }
    }

    /// Player-vs-player resolution. Pairs are scanned in insertion order
    /// against the state at the start of the pass; a player consumed here
    /// neither eats nor is eaten again within the same tick.
    fn eat_players(&mut self) {
        let mut consumed: Vec<usize> = Vec::new();
        let mut kills: Vec<(usize, usize)> = Vec::new();

        for i in 0..self.players.len() {
            if consumed.contains(&i) {
                continue;
            }
            for j in 0..self.players.len() {
                if i == j || consumed.contains(&j) {
                    continue;
                }
                let eater = &self.players[i];
                let victim = &self.players[j];
                if geometry::can_eat(
                    eater.x, eater.y, eater.mass,
                    victim.x, victim.y, victim.mass,
                    &self.cfg,
                ) {
                    kills.push((i, j));
                    consumed.push(j);
                }
            }
        }

        if kills.is_empty() {
            return;
        }

        for &(ei, vi) in &kills {
            let victim_mass = self.players[vi].mass;
            self.players[ei].mass += victim_mass;

            let eater = &self.players[ei];
            let victim = &self.players[vi];
            self.events.push(GameEvent::PlayerEaten {
                eater_id: eater.id,
                eater_name: eater.name.clone(),
                eater_wallet: eater.wallet.clone(),
                victim_id: victim.id,
                victim_name: victim.name.clone(),
                victim_wallet: victim.wallet.clone(),
                victim_mass,
            });
        }

        consumed.sort_unstable_by(|a, b| b.cmp(a));
        for vi in consumed {
            self.players.remove(vi);
        }
        self.leaderboard_dirty = true;
    }

    /// A big enough player swallows a virus and bursts, shedding part of
    /// its mass as a ring of fragments. Total mass is conserved.
    fn pop_viruses(&mut self) {
        let mut popped = Vec::new();
        for (vi, virus) in self.viruses.iter().enumerate() {
            let eater = self.players.iter().position(|p| {
                p.mass >= self.cfg.virus_pop_min_mass
                    && geometry::can_eat(p.x, p.y, p.mass, virus.x, virus.y, virus.mass, &self.cfg)
            });
            let Some(pi) = eater else { continue };
            popped.push(vi);

            let virus_mass = virus.mass;
            let player = &mut self.players[pi];
            player.mass += virus_mass;

            let count = self.cfg.virus_pop_fragments.max(1);
            let shed = player.mass * self.cfg.virus_pop_loss;
            let per_fragment = shed / count as f64;
            player.mass -= shed;

            let r = player.radius(self.cfg.slow_base);
            let (px, py, color, id) = (player.x, player.y, player.color.clone(), player.id);
            for k in 0..count {
                let angle = (k as f64 / count as f64) * std::f64::consts::TAU;
                self.fragments.push(MassFragment {
                    x: px + angle.cos() * r,
                    y: py + angle.sin() * r,
                    mass: per_fragment,
                    vx: angle.cos() * self.cfg.eject_speed,
                    vy: angle.sin() * self.cfg.eject_speed,
                    color: color.clone(),
                });
            }
            self.events.push(GameEvent::VirusPopped {
                player_id: id,
                shed_mass: shed,
            });
        }
        if !popped.is_empty() {
            self.leaderboard_dirty = true;
        }
        popped.sort_unstable_by(|a, b| b.cmp(a));
        for vi in popped {
            self.viruses.swap_remove(vi);
        }
    }

    /// Eject a fixed morsel of mass toward the player's movement target.
    pub fn eject(&mut self, player_id: u64) {
        let cfg = self.cfg.clone();
        let Some(player) = self.player_mut(player_id) else { return };
        if player.mass < cfg.eject_min_mass {
            return;
        }
        player.mass -= cfg.eject_mass;
        let (nx, ny) = geometry::normalize(player.target_x - player.x, player.target_y - player.y);
        let r = player.radius(cfg.slow_base);
        let frag = MassFragment {
            x: player.x + nx * r,
            y: player.y + ny * r,
            mass: cfg.eject_mass,
            vx: nx * cfg.eject_speed,
            vy: ny * cfg.eject_speed,
            color: player.color.clone(),
        };
        self.fragments.push(frag);
        self.leaderboard_dirty = true;
    }

    fn decay_mass(&mut self, dt: f64) {
        for player in &mut self.players {
            if player.mass > self.cfg.decay_min_mass {
                player.mass -= player.mass * self.cfg.mass_decay_rate * dt;
                if player.mass < self.cfg.min_mass {
                    player.mass = self.cfg.min_mass;
                }
            }
        }
    }

    /// Top entity pools back up to their configured counts. Stands in for
    /// the external replenishment collaborator.
    fn replenish(&mut self) {
        while self.food.len() < self.cfg.food_count {
            self.food.push(Food::random(&self.cfg));
        }
        while self.viruses.len() < self.cfg.virus_count {
            self.viruses.push(Virus::random(&self.cfg));
        }
    }
}
