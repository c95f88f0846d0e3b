//! Adversarial hunters.
//!
//! Each hunter runs a two-state machine. Detection compares the Chebyshev
//! distance to a hidden per-hunter radius; the same metric governs the spawn
//! margin. Kills use Manhattan distance 1 regardless of state.
//!
//! The detection radius never leaves this module: it has no public accessor
//! and is not serialised.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, HunterConfig};
use crate::constants::{HUNTER_BORDER, LOG_HUNTERS};
use crate::rng::CountingRng;
use crate::world::{Position, WorldGrid};
use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HunterState {
    Patrol,
    Chase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }
}

/// A state change worth recording in the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunterTransition {
    pub id: u32,
    pub from: HunterState,
    pub to: HunterState,
}

/// Movement and turning parameters shared by all hunters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HunterRules {
    pub chase_speed: u32,
    pub patrol_speed: u32,
    pub hysteresis: u32,
    pub min_turn_interval: u32,
    pub turn_chance: f64,
}

impl From<&HunterConfig> for HunterRules {
    fn from(cfg: &HunterConfig) -> Self {
        Self {
            chase_speed: cfg.chase_speed,
            patrol_speed: cfg.patrol_speed,
            hysteresis: cfg.hysteresis,
            min_turn_interval: cfg.min_turn_interval,
            turn_chance: cfg.turn_chance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hunter {
    id: u32,
    position: Position,
    detection_radius: u32,
    state: HunterState,
    heading: Heading,
    steps_on_heading: u32,
    last_known_target: Option<Position>,
}

impl Hunter {
    #[must_use]
    pub const fn new(id: u32, position: Position, detection_radius: u32, heading: Heading) -> Self {
        Self {
            id,
            position,
            detection_radius,
            state: HunterState::Patrol,
            heading,
            steps_on_heading: 0,
            last_known_target: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn state(&self) -> HunterState {
        self.state
    }

    #[must_use]
    pub const fn heading(&self) -> Heading {
        self.heading
    }

    /// Organism position this hunter last chased toward.
    #[must_use]
    pub const fn last_known_target(&self) -> Option<Position> {
        self.last_known_target
    }

    /// Advance one tick: update state, then move.
    pub fn tick<R: RngCore>(
        &mut self,
        target: Position,
        world: &WorldGrid,
        rules: &HunterRules,
        rng: &mut CountingRng<R>,
    ) -> Option<HunterTransition> {
        let transition = self.update_state(target, rules.hysteresis);
        match self.state {
            HunterState::Chase => {
                self.last_known_target = Some(target);
                self.chase(target, world, rules.chase_speed);
            }
            HunterState::Patrol => self.patrol(world, rules, rng),
        }
        transition
    }

    fn update_state(&mut self, target: Position, hysteresis: u32) -> Option<HunterTransition> {
        let distance = self.position.chebyshev(target);
        let from = self.state;
        self.state = match self.state {
            HunterState::Patrol if distance <= self.detection_radius => HunterState::Chase,
            HunterState::Chase if distance > self.detection_radius + hysteresis => {
                self.steps_on_heading = 0;
                HunterState::Patrol
            }
            state => state,
        };
        (from != self.state).then(|| {
            debug!(
                target: LOG_HUNTERS,
                "hunter {} {:?} -> {:?} at distance {distance}", self.id, from, self.state
            );
            HunterTransition {
                id: self.id,
                from,
                to: self.state,
            }
        })
    }

    /// Greedy unit steps toward `target`, preferring the axis with the larger
    /// gap and falling back to the other axis when blocked.
    fn chase(&mut self, target: Position, world: &WorldGrid, speed: u32) {
        for _ in 0..speed {
            if self.position.manhattan(target) <= 1 {
                break;
            }
            let dx = (target.x - self.position.x).signum();
            let dy = (target.y - self.position.y).signum();
            let horizontal = (dx, 0);
            let vertical = (0, dy);
            let order = if self.position.x.abs_diff(target.x) >= self.position.y.abs_diff(target.y) {
                [horizontal, vertical]
            } else {
                [vertical, horizontal]
            };
            let next = order
                .into_iter()
                .filter(|&(sx, sy)| sx != 0 || sy != 0)
                .map(|(sx, sy)| self.position.offset(sx, sy))
                .find(|&p| world.is_passable(p));
            match next {
                Some(p) => self.position = p,
                None => break,
            }
        }
    }

    fn patrol<R: RngCore>(&mut self, world: &WorldGrid, rules: &HunterRules, rng: &mut CountingRng<R>) {
        self.steps_on_heading += 1;
        if self.steps_on_heading > rules.min_turn_interval && rng.bernoulli(rules.turn_chance) {
            self.heading = Heading::ALL[rng.index(Heading::ALL.len())];
            self.steps_on_heading = 0;
        }
        for _ in 0..rules.patrol_speed {
            let (dx, dy) = self.heading.delta();
            let next = self.position.offset(dx, dy);
            if world.is_passable(next) {
                self.position = next;
            } else {
                self.heading = self.heading.reversed();
                self.steps_on_heading = 0;
                break;
            }
        }
    }

    #[cfg(test)]
    pub(crate) const fn detection_radius(&self) -> u32 {
        self.detection_radius
    }
}

/// Place `cfg.count` hunters by bounded rejection sampling.
///
/// # Errors
///
/// Returns [`ConfigError::PlacementExhausted`] if any hunter cannot be placed
/// within `attempts` draws.
pub fn spawn_hunters<R: RngCore>(
    cfg: &HunterConfig,
    world: &WorldGrid,
    organism_spawn: Position,
    attempts: u32,
    rng: &mut CountingRng<R>,
) -> Result<Vec<Hunter>, ConfigError> {
    let (w, h) = (i64::from(world.width()), i64::from(world.height()));
    let border = i64::from(HUNTER_BORDER);
    let mut hunters: Vec<Hunter> = Vec::with_capacity(cfg.count as usize);
    for id in 0..cfg.count {
        let mut placed = None;
        for _ in 0..attempts {
            let x = rng.int_inclusive(border, w - border - 1);
            let y = rng.int_inclusive(border, h - border - 1);
            let pos = Position::new(x as i32, y as i32);
            if world.is_passable(pos)
                && pos.chebyshev(organism_spawn) >= cfg.spawn_margin
                && hunters.iter().all(|other| other.position != pos)
            {
                placed = Some(pos);
                break;
            }
        }
        let Some(position) = placed else {
            return Err(ConfigError::PlacementExhausted {
                what: "hunter",
                attempts,
            });
        };
        let radius = rng.int_inclusive(
            i64::from(cfg.min_detection_radius),
            i64::from(cfg.max_detection_radius),
        ) as u32;
        let heading = Heading::ALL[rng.index(Heading::ALL.len())];
        hunters.push(Hunter::new(id, position, radius, heading));
    }
    Ok(hunters)
}

/// First hunter within Manhattan distance 1 of `pos`, in id order.
#[must_use]
pub fn adjacent_hunter(hunters: &[Hunter], pos: Position) -> Option<u32> {
    hunters
        .iter()
        .find(|h| h.position.manhattan(pos) <= 1)
        .map(Hunter::id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::rng::{RngBundle, StreamId};
    use crate::world::Biome;

    fn open_world() -> WorldGrid {
        let mut cfg = MapConfig::default();
        cfg.width = 40;
        cfg.height = 40;
        cfg.biome_weights = crate::world::BiomeTable::splat(0.0);
        cfg.biome_weights.plains = 1.0;
        cfg.num_lakes = 0;
        cfg.num_rivers = 0;
        let mut rngs = RngBundle::from_user_seed(1);
        let world = WorldGrid::generate(&cfg, rngs.stream(StreamId::World));
        assert!(world.cells().iter().all(|c| c.biome == Biome::Plains));
        world
    }

    fn rules() -> HunterRules {
        HunterRules::from(&HunterConfig::default())
    }

    #[test]
    fn detects_within_radius_then_chases() {
        let world = open_world();
        let mut rng = CountingRng::new(3);
        let target = Position::new(20, 20);
        let mut hunter = Hunter::new(0, Position::new(24, 20), 5, Heading::North);
        let transition = hunter.tick(target, &world, &rules(), &mut rng);
        assert_eq!(
            transition,
            Some(HunterTransition {
                id: 0,
                from: HunterState::Patrol,
                to: HunterState::Chase
            })
        );
        assert_eq!(hunter.position(), Position::new(22, 20));
        assert_eq!(hunter.last_known_target(), Some(target));
    }

    #[test]
    fn hysteresis_delays_giving_up() {
        let mut hunter = Hunter::new(0, Position::new(20, 20), 5, Heading::North);
        hunter.state = HunterState::Chase;
        // Distance 7 = radius + hysteresis: keep chasing.
        assert!(hunter.update_state(Position::new(27, 20), 2).is_none());
        assert_eq!(hunter.state(), HunterState::Chase);
        let t = hunter.update_state(Position::new(28, 20), 2);
        assert_eq!(t.map(|t| t.to), Some(HunterState::Patrol));
    }

    #[test]
    fn chase_stops_adjacent() {
        let world = open_world();
        let mut rng = CountingRng::new(4);
        let target = Position::new(20, 20);
        let mut hunter = Hunter::new(0, Position::new(22, 20), 5, Heading::West);
        hunter.tick(target, &world, &rules(), &mut rng);
        assert_eq!(hunter.position().manhattan(target), 1);
        assert_eq!(adjacent_hunter(&[hunter], target), Some(0));
    }

    #[test]
    fn patrol_moves_along_heading_without_draws_early() {
        let world = open_world();
        let mut rng = CountingRng::new(5);
        let mut hunter = Hunter::new(0, Position::new(10, 10), 3, Heading::East);
        hunter.tick(Position::new(30, 30), &world, &rules(), &mut rng);
        assert_eq!(hunter.position(), Position::new(11, 10));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn patrol_bounces_off_edges() {
        let world = open_world();
        let mut rng = CountingRng::new(6);
        let mut hunter = Hunter::new(0, Position::new(0, 10), 3, Heading::West);
        hunter.tick(Position::new(30, 30), &world, &rules(), &mut rng);
        assert_eq!(hunter.position(), Position::new(0, 10));
        assert_eq!(hunter.heading(), Heading::East);
    }

    #[test]
    fn spawn_respects_margin_and_radius_bounds() {
        let mut rngs = RngBundle::from_user_seed(12);
        let world = WorldGrid::generate(&MapConfig::default(), rngs.stream(StreamId::World));
        let spawn = world.find_spawn(rngs.stream(StreamId::Spawn), 1000).unwrap();
        let cfg = HunterConfig {
            enabled: true,
            ..HunterConfig::default()
        };
        let hunters =
            spawn_hunters(&cfg, &world, spawn, 1000, rngs.stream(StreamId::Hunters)).unwrap();
        assert_eq!(hunters.len(), 5);
        for h in &hunters {
            assert!(h.position().chebyshev(spawn) >= cfg.spawn_margin);
            assert!(world.is_passable(h.position()));
            assert!((3..=8).contains(&h.detection_radius()));
            assert_eq!(h.state(), HunterState::Patrol);
        }
    }

    #[test]
    fn impossible_margin_fails_fast() {
        let world = open_world();
        let cfg = HunterConfig {
            enabled: true,
            spawn_margin: 500,
            ..HunterConfig::default()
        };
        let mut rng = CountingRng::new(7);
        let err = spawn_hunters(&cfg, &world, Position::new(20, 20), 25, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PlacementExhausted {
                what: "hunter",
                attempts: 25
            }
        ));
    }
}
