//! Objective placement and graduated hints.
//!
//! Distances here are Manhattan. The found check uses a Chebyshev radius so a
//! `found_radius` of 1 covers all eight neighbours.
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, TrophyConfig};
use crate::constants::{BUCKET_CLOSE, BUCKET_MODERATE, BUCKET_VERY_CLOSE, COMPASS_TAN_22_5_MILLI};
use crate::rng::CountingRng;
use crate::world::{Position, WorldGrid};
use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceBucket {
    VeryClose,
    Close,
    Moderate,
    Far,
}

impl DistanceBucket {
    #[must_use]
    pub const fn from_distance(distance: u32) -> Self {
        if distance < BUCKET_VERY_CLOSE {
            Self::VeryClose
        } else if distance < BUCKET_CLOSE {
            Self::Close
        } else if distance < BUCKET_MODERATE {
            Self::Moderate
        } else {
            Self::Far
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warmth {
    Warmer,
    Colder,
    Same,
}

/// Compass heading. North is toward smaller `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    /// Quantise the vector `from -> to` to 4 or 8 headings using integer
    /// arithmetic only. Returns `None` for a zero vector.
    #[must_use]
    pub fn between(from: Position, to: Position, points: u8) -> Option<Self> {
        let dx = i64::from(to.x) - i64::from(from.x);
        let dy = i64::from(to.y) - i64::from(from.y);
        if dx == 0 && dy == 0 {
            return None;
        }
        let horizontal = if dx >= 0 { Self::E } else { Self::W };
        let vertical = if dy < 0 { Self::N } else { Self::S };
        if points == 4 {
            return Some(if dx.abs() > dy.abs() { horizontal } else { vertical });
        }
        let (ax, ay) = (dx.abs(), dy.abs());
        if ay * 1000 <= COMPASS_TAN_22_5_MILLI * ax {
            return Some(horizontal);
        }
        if ax * 1000 <= COMPASS_TAN_22_5_MILLI * ay {
            return Some(vertical);
        }
        Some(match (vertical, horizontal) {
            (Self::N, Self::E) => Self::NE,
            (Self::N, _) => Self::NW,
            (_, Self::E) => Self::SE,
            _ => Self::SW,
        })
    }
}

/// Hint payload for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrophyHint {
    pub distance: DistanceBucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmth: Option<Warmth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Compass>,
}

/// True trophy state, recorded in the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrophyRecord {
    pub position: Position,
    pub found: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrophyTracker {
    position: Position,
    found: bool,
    previous_distance: Option<u32>,
    cfg: TrophyConfig,
}

impl TrophyTracker {
    #[must_use]
    pub const fn new(position: Position, cfg: TrophyConfig) -> Self {
        Self {
            position,
            found: false,
            previous_distance: None,
            cfg,
        }
    }

    /// Rejection-sample a passable cell at least `min_distance_from_spawn`
    /// (Manhattan) from the organism spawn.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PlacementExhausted`] when no cell qualifies
    /// within `attempts` draws.
    pub fn place<R: RngCore>(
        cfg: &TrophyConfig,
        world: &WorldGrid,
        spawn: Position,
        attempts: u32,
        rng: &mut CountingRng<R>,
    ) -> Result<Self, ConfigError> {
        let (w, h) = (i64::from(world.width()), i64::from(world.height()));
        for _ in 0..attempts {
            let pos = Position::new(
                rng.int_inclusive(0, w - 1) as i32,
                rng.int_inclusive(0, h - 1) as i32,
            );
            if world.is_passable(pos) && pos.manhattan(spawn) >= cfg.min_distance_from_spawn {
                return Ok(Self::new(pos, cfg.clone()));
            }
        }
        Err(ConfigError::PlacementExhausted {
            what: "trophy",
            attempts,
        })
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn found(&self) -> bool {
        self.found
    }

    #[must_use]
    pub const fn record(&self) -> TrophyRecord {
        TrophyRecord {
            position: self.position,
            found: self.found,
        }
    }

    /// Returns `true` only on the step the trophy becomes found.
    pub fn check_found(&mut self, organism: Position) -> bool {
        if self.found || organism.chebyshev(self.position) > self.cfg.found_radius {
            return false;
        }
        self.found = true;
        true
    }

    /// Hint for `step`, or `None` once found. Call at most once per step; the
    /// warmer/colder signal compares against the previous call.
    pub fn hint(&mut self, organism: Position, step: u32) -> Option<TrophyHint> {
        if self.found {
            return None;
        }
        let distance = organism.manhattan(self.position);
        let warmth = if self.cfg.warm_cold_enabled {
            self.previous_distance.map(|prev| match distance.cmp(&prev) {
                std::cmp::Ordering::Less => Warmth::Warmer,
                std::cmp::Ordering::Greater => Warmth::Colder,
                std::cmp::Ordering::Equal => Warmth::Same,
            })
        } else {
            None
        };
        self.previous_distance = Some(distance);
        let direction = if step % self.cfg.hint_interval.max(1) == 0 {
            Compass::between(organism, self.position, self.cfg.compass_points)
        } else {
            None
        };
        Some(TrophyHint {
            distance: DistanceBucket::from_distance(distance),
            warmth,
            direction,
        })
    }
}
