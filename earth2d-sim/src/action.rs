//! Agent actions and their resolution.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{ACTIVITY_BUILD_SHELTER, ACTIVITY_FORAGE, ACTIVITY_IDLE, ACTIVITY_MOVE};

/// Every action an agent may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    MoveN,
    MoveS,
    MoveE,
    MoveW,
    Rest,
    Drink,
    Forage,
    BuildShelter,
    Hide,
    /// Reserved; resolves with no effect beyond the idle drain.
    Signal,
}

impl Action {
    pub const ALL: [Self; 10] = [
        Self::MoveN,
        Self::MoveS,
        Self::MoveE,
        Self::MoveW,
        Self::Rest,
        Self::Drink,
        Self::Forage,
        Self::BuildShelter,
        Self::Hide,
        Self::Signal,
    ];

    pub const MOVES: [Self; 4] = [Self::MoveN, Self::MoveS, Self::MoveE, Self::MoveW];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::MoveN => "MOVE_N",
            Self::MoveS => "MOVE_S",
            Self::MoveE => "MOVE_E",
            Self::MoveW => "MOVE_W",
            Self::Rest => "REST",
            Self::Drink => "DRINK",
            Self::Forage => "FORAGE",
            Self::BuildShelter => "BUILD_SHELTER",
            Self::Hide => "HIDE",
            Self::Signal => "SIGNAL",
        }
    }

    /// Grid delta for movement actions.
    #[must_use]
    pub const fn delta(self) -> Option<(i32, i32)> {
        match self {
            Self::MoveN => Some((0, -1)),
            Self::MoveS => Some((0, 1)),
            Self::MoveE => Some((1, 0)),
            Self::MoveW => Some((-1, 0)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_move(self) -> bool {
        self.delta().is_some()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let action = match normalized.as_str() {
            "MOVE_N" | "N" | "NORTH" => Self::MoveN,
            "MOVE_S" | "S" | "SOUTH" => Self::MoveS,
            "MOVE_E" | "E" | "EAST" => Self::MoveE,
            "MOVE_W" | "W" | "WEST" => Self::MoveW,
            "REST" => Self::Rest,
            "DRINK" => Self::Drink,
            "FORAGE" => Self::Forage,
            "BUILD_SHELTER" | "SHELTER" => Self::BuildShelter,
            "HIDE" => Self::Hide,
            "SIGNAL" => Self::Signal,
            _ => return Err(UnknownAction(s.to_string())),
        };
        Ok(action)
    }
}

/// Why a requested action degraded to a no-op step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReason {
    /// The request did not name an action.
    Unrecognized { requested: String },
    /// The action was not allowed by the current mask.
    Masked { action: Action },
}

/// The action the episode actually carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedAction {
    Performed { action: Action },
    NoOp { reason: InvalidReason },
}

impl ResolvedAction {
    #[must_use]
    pub const fn action(&self) -> Option<Action> {
        match self {
            Self::Performed { action } => Some(*action),
            Self::NoOp { .. } => None,
        }
    }

    /// Energy/hydration activity multiplier. `move_cost` is the movement cost
    /// of the destination cell and only matters for moves.
    #[must_use]
    pub fn activity(&self, move_cost: f64) -> f64 {
        match self.action() {
            Some(Action::Forage) => ACTIVITY_FORAGE,
            Some(Action::BuildShelter) => ACTIVITY_BUILD_SHELTER,
            Some(a) if a.is_move() => ACTIVITY_MOVE * move_cost,
            _ => ACTIVITY_IDLE,
        }
    }
}

/// Actions whose preconditions currently hold, in [`Action::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionMask(SmallVec<[Action; 10]>);

impl ActionMask {
    #[must_use]
    pub fn from_fn(mut allowed: impl FnMut(Action) -> bool) -> Self {
        Self(Action::ALL.into_iter().filter(|&a| allowed(a)).collect())
    }

    #[must_use]
    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
