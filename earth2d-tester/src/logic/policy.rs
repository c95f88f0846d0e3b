use std::fmt;
use std::str::FromStr;

use earth2d_sim::{Action, Compass, Decision, DecisionPolicy, HunterSighting, Observation};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

/// Built-in decision strategies for headless runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Random,
    Heuristic,
    Rest,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Random, Self::Heuristic, Self::Rest];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Heuristic => "heuristic",
            Self::Rest => "rest",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn DecisionPolicy + Send> {
        match self {
            Self::Random => Box::new(RandomPolicy::new(seed)),
            Self::Heuristic => Box::new(HeuristicPolicy),
            Self::Rest => Box::new(RestPolicy),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Uniform choice over the currently legal actions.
struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl DecisionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide(&mut self, observation: &Observation) -> Decision {
        let legal: Vec<Action> = observation.action_mask.iter().collect();
        legal
            .choose(&mut self.rng)
            .map_or_else(|| Decision::new(Action::Rest), |&a| Decision::new(a))
    }
}

struct RestPolicy;

impl DecisionPolicy for RestPolicy {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn decide(&mut self, _observation: &Observation) -> Decision {
        Decision::new(Action::Rest).with_confidence(1.0)
    }
}

/// Fixed survival priorities: water and food first, then temperature,
/// fatigue, threats, top-ups, the trophy, and finally exploration.
struct HeuristicPolicy;

impl DecisionPolicy for HeuristicPolicy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn decide(&mut self, obs: &Observation) -> Decision {
        let v = &obs.vitals;
        let local = &obs.local;
        let allowed = |a: Action| obs.action_mask.contains(a);

        if v.hydration < 25.0 && allowed(Action::Drink) {
            return decision(Action::Drink, 0.95, "critical dehydration");
        }
        if v.energy < 25.0 && local.vegetation > 0.1 && allowed(Action::Forage) {
            return decision(Action::Forage, 0.9, "critical energy");
        }

        let air_extreme = local.temperature > 35.0 || local.temperature < 5.0;
        let core_drifting = v.core_temp < 35.5 || v.core_temp > 38.5;
        if (air_extreme || core_drifting) && obs.shelter_steps_remaining == 0 {
            if local.shelter_quality > 0.3 {
                return decision(Action::Rest, 0.9, "temperature stress, natural shelter");
            }
            if allowed(Action::BuildShelter) && v.fatigue < 80.0 {
                return decision(Action::BuildShelter, 0.85, "temperature stress");
            }
            if core_drifting {
                return decision(Action::Rest, 0.75, "conserving body heat");
            }
        }

        if v.fatigue > 75.0 {
            return decision(Action::Rest, 0.85, "high fatigue");
        }

        if let Some(nearest) = obs.visible_hunters.iter().min_by_key(|h| h.distance) {
            if nearest.distance <= 6 {
                if let Some(action) = flee(obs, nearest) {
                    return decision(action, 0.95, format!("fleeing hunter {}", nearest.id));
                }
            } else if nearest.distance <= 10 && allowed(Action::Hide) {
                return decision(Action::Hide, 0.8, format!("hunter {} spotted", nearest.id));
            }
        }

        if local.wildlife_risk > 0.3 && allowed(Action::Hide) {
            return decision(Action::Hide, 0.75, "high wildlife risk");
        }

        if v.hydration < 50.0
            && let Some(action) = toward_water(obs)
        {
            return decision(action, 0.7, "low hydration, heading to water");
        }
        if v.energy < 50.0 && local.vegetation > 0.1 && allowed(Action::Forage) {
            return decision(Action::Forage, 0.7, "low energy");
        }
        if v.hydration < 70.0 && allowed(Action::Drink) {
            return decision(Action::Drink, 0.6, "topping up hydration");
        }
        if v.energy < 70.0 && local.vegetation > 0.2 && allowed(Action::Forage) {
            return decision(Action::Forage, 0.55, "topping up energy");
        }
        if v.fatigue > 50.0 {
            return decision(Action::Rest, 0.5, "moderate fatigue");
        }

        if let Some(direction) = obs.trophy.and_then(|hint| hint.direction)
            && let Some(action) = compass_move(direction).filter(|&a| allowed(a))
        {
            return decision(action, 0.5, "following trophy hint");
        }

        if v.hydration < 60.0
            && let Some(action) = toward_water(obs)
        {
            return decision(action, 0.45, "keeping close to water");
        }

        [Action::MoveE, Action::MoveS, Action::MoveN, Action::MoveW]
            .into_iter()
            .find(|&a| allowed(a))
            .map_or_else(
                || decision(Action::Rest, 0.2, "no better option"),
                |a| decision(a, 0.3, "exploring"),
            )
    }
}

fn decision(action: Action, confidence: f32, rationale: impl Into<String>) -> Decision {
    Decision::new(action)
        .with_confidence(confidence)
        .with_rationale(rationale)
}

/// Step directly away from `hunter`, or sideways if that is blocked.
fn flee(obs: &Observation, hunter: &HunterSighting) -> Option<Action> {
    let dx = obs.position.x - hunter.position.x;
    let dy = obs.position.y - hunter.position.y;
    let candidates = if dx.abs() >= dy.abs() {
        let away = if dx > 0 { Action::MoveE } else { Action::MoveW };
        [away, Action::MoveN, Action::MoveS]
    } else {
        let away = if dy > 0 { Action::MoveS } else { Action::MoveN };
        [away, Action::MoveE, Action::MoveW]
    };
    candidates
        .into_iter()
        .find(|&a| obs.action_mask.contains(a))
}

fn toward_water(obs: &Observation) -> Option<Action> {
    let sighting = obs.neighbourhood.nearest_water?;
    if sighting.distance == 0 {
        return None;
    }
    compass_move(sighting.direction).filter(|&a| obs.action_mask.contains(a))
}

/// Collapse a compass heading onto one cardinal move. Diagonals resolve to
/// their vertical component.
const fn compass_move(direction: Compass) -> Option<Action> {
    match direction {
        Compass::N | Compass::NE | Compass::NW => Some(Action::MoveN),
        Compass::S | Compass::SE | Compass::SW => Some(Action::MoveS),
        Compass::E => Some(Action::MoveE),
        Compass::W => Some(Action::MoveW),
    }
}
