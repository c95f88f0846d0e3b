//! Organism vitals and their per-step evolution.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::action::{Action, ResolvedAction};
use crate::config::PhysiologyConfig;
use crate::constants::{
    HEAT_SURCHARGE_PER_10C, HEAT_SURCHARGE_THRESHOLD_C, NATURAL_SHELTER_DAMPING,
    SHELTER_DRIFT_FACTOR, VITAL_MAX, VITAL_MIN,
};
use crate::episode::SimEvent;
use crate::observation::ExploredSet;
use crate::rng::CountingRng;
use crate::world::{Position, WorldGrid};
use rand::RngCore;

/// The six bounded vitals. Core temperature is in °C; the others are `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hydration: f64,
    pub energy: f64,
    pub core_temp: f64,
    pub fatigue: f64,
    pub injury: f64,
    pub infection: f64,
}

impl Vitals {
    #[must_use]
    pub const fn initial(cfg: &PhysiologyConfig) -> Self {
        Self {
            hydration: cfg.initial_hydration,
            energy: cfg.initial_energy,
            core_temp: cfg.initial_core_temp,
            fatigue: cfg.initial_fatigue,
            injury: cfg.initial_injury,
            infection: cfg.initial_infection,
        }
    }

    pub(crate) fn clamp(&mut self) {
        self.hydration = self.hydration.clamp(VITAL_MIN, VITAL_MAX);
        self.energy = self.energy.clamp(VITAL_MIN, VITAL_MAX);
        self.fatigue = self.fatigue.clamp(VITAL_MIN, VITAL_MAX);
        self.injury = self.injury.clamp(VITAL_MIN, VITAL_MAX);
        self.infection = self.infection.clamp(VITAL_MIN, VITAL_MAX);
    }
}

/// Terminal cause, listed in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CauseOfDeath {
    Dehydration,
    Starvation,
    Hypothermia,
    Hyperthermia,
    Trauma,
    Infection,
    Hunted,
}

impl CauseOfDeath {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Dehydration => "DEHYDRATION",
            Self::Starvation => "STARVATION",
            Self::Hypothermia => "HYPOTHERMIA",
            Self::Hyperthermia => "HYPERTHERMIA",
            Self::Trauma => "TRAUMA",
            Self::Infection => "INFECTION",
            Self::Hunted => "HUNTED",
        }
    }
}

/// The single controlled entity.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganismState {
    pub position: Position,
    pub vitals: Vitals,
    alive: bool,
    cause_of_death: Option<CauseOfDeath>,
    pub steps: u32,
    /// Steps of personal shelter remaining.
    pub shelter_steps: u32,
    pub explored: ExploredSet,
}

impl OrganismState {
    #[must_use]
    pub fn spawn(position: Position, cfg: &PhysiologyConfig, width: u32, height: u32) -> Self {
        Self {
            position,
            vitals: Vitals::initial(cfg),
            alive: true,
            cause_of_death: None,
            steps: 0,
            shelter_steps: 0,
            explored: ExploredSet::new(width, height),
        }
    }

    #[must_use]
    pub const fn alive(&self) -> bool {
        self.alive
    }

    #[must_use]
    pub const fn cause_of_death(&self) -> Option<CauseOfDeath> {
        self.cause_of_death
    }

    #[must_use]
    pub const fn sheltered(&self) -> bool {
        self.shelter_steps > 0
    }

    /// Record death. Only the first call has any effect.
    pub const fn kill(&mut self, cause: CauseOfDeath) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.cause_of_death = Some(cause);
        true
    }
}

pub type StepEvents = SmallVec<[SimEvent; 4]>;

/// Inputs fixed for one physiology update.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub action: &'a ResolvedAction,
    /// Ambient temperature at the organism's (post-move) cell.
    pub ambient: f64,
    pub hours: u32,
    pub drain_multiplier: f64,
}

/// Apply one step of action effects, drains, thermal drift and infection.
///
/// DRINK and FORAGE whose preconditions fail still consume the turn and only
/// emit [`SimEvent::PreconditionNotMet`].
pub fn apply_step<R: RngCore>(
    organism: &mut OrganismState,
    world: &mut WorldGrid,
    ctx: StepContext<'_>,
    cfg: &PhysiologyConfig,
    rng: &mut CountingRng<R>,
) -> StepEvents {
    let mut events = StepEvents::new();
    let hours = f64::from(ctx.hours);
    let pos = organism.position;
    let Some(cell) = world.cell(pos).cloned() else {
        return events;
    };

    match ctx.action.action() {
        Some(Action::Drink) => {
            if world.is_water_adjacent(pos) {
                let before = organism.vitals.hydration;
                organism.vitals.hydration = (before + cfg.drink_restore).min(VITAL_MAX);
                events.push(SimEvent::Drank {
                    gain: organism.vitals.hydration - before,
                });
            } else {
                events.push(SimEvent::PreconditionNotMet {
                    action: Action::Drink,
                });
            }
        }
        Some(Action::Forage) => {
            if cell.vegetation >= cfg.forage_min_biomass {
                let gain = (cell.vegetation * cfg.forage_gain_per_biomass).min(cfg.forage_max_gain);
                world.deplete_vegetation(pos, cfg.forage_depletion);
                let before = organism.vitals.energy;
                organism.vitals.energy = (before + gain).min(VITAL_MAX);
                events.push(SimEvent::Foraged {
                    gain: organism.vitals.energy - before,
                });
            } else {
                events.push(SimEvent::PreconditionNotMet {
                    action: Action::Forage,
                });
            }
        }
        Some(Action::BuildShelter) => {
            organism.shelter_steps = cfg.shelter_duration_steps;
            events.push(SimEvent::ShelterBuilt {
                duration: cfg.shelter_duration_steps,
            });
        }
        _ => {}
    }

    let activity = ctx.action.activity(cell.biome.movement_cost());
    let heat = if ctx.ambient > HEAT_SURCHARGE_THRESHOLD_C {
        (ctx.ambient - HEAT_SURCHARGE_THRESHOLD_C) / 10.0 * HEAT_SURCHARGE_PER_10C
    } else {
        0.0
    };
    let v = &mut organism.vitals;
    v.hydration -= (cfg.hydration_base_drain * activity + heat) * hours * ctx.drain_multiplier;
    v.energy -= cfg.energy_base_drain * activity * hours * ctx.drain_multiplier;

    if ctx.action.action() == Some(Action::Rest) {
        v.fatigue -= cfg.rest_fatigue_recovery * hours;
    } else {
        v.fatigue += cfg.fatigue_base_gain * activity * hours * ctx.drain_multiplier;
    }

    let mut k = cfg.thermal_drift_k * (1.0 - NATURAL_SHELTER_DAMPING * cell.biome.shelter_quality());
    if organism.shelter_steps > 0 {
        k *= SHELTER_DRIFT_FACTOR;
    }
    let blend = (k * hours).clamp(0.0, 1.0);
    v.core_temp += (ctx.ambient - v.core_temp) * blend;

    if v.injury >= cfg.infection_injury_threshold && v.injury > 0.0 {
        let severity = v.injury / VITAL_MAX;
        if rng.bernoulli(cfg.infection_chance * severity) {
            let amount = cfg.infection_growth * severity * hours;
            v.infection += amount;
            events.push(SimEvent::InfectionProgressed { amount });
        }
    }
    v.clamp();

    if organism.shelter_steps > 0 {
        organism.shelter_steps -= 1;
        if organism.shelter_steps == 0 {
            events.push(SimEvent::ShelterCollapsed);
        }
    }
    events
}

/// First matching cause in priority order, or `None` while all vitals hold.
#[must_use]
pub fn evaluate_death(vitals: &Vitals, hunted: bool, cfg: &PhysiologyConfig) -> Option<CauseOfDeath> {
    if vitals.hydration <= cfg.death_hydration {
        Some(CauseOfDeath::Dehydration)
    } else if vitals.energy <= cfg.death_energy {
        Some(CauseOfDeath::Starvation)
    } else if vitals.core_temp < cfg.death_core_temp_low {
        Some(CauseOfDeath::Hypothermia)
    } else if vitals.core_temp > cfg.death_core_temp_high {
        Some(CauseOfDeath::Hyperthermia)
    } else if vitals.injury >= cfg.death_injury {
        Some(CauseOfDeath::Trauma)
    } else if vitals.infection >= cfg.death_infection {
        Some(CauseOfDeath::Infection)
    } else if hunted {
        Some(CauseOfDeath::Hunted)
    } else {
        None
    }
}

/// Number of vitals within `margin` of their death threshold.
#[must_use]
pub fn near_death_count(vitals: &Vitals, cfg: &PhysiologyConfig, margin: f64) -> usize {
    [
        vitals.hydration - cfg.death_hydration <= margin,
        vitals.energy - cfg.death_energy <= margin,
        vitals.core_temp - cfg.death_core_temp_low <= margin / 2.0,
        cfg.death_core_temp_high - vitals.core_temp <= margin / 2.0,
        cfg.death_injury - vitals.injury <= margin,
        cfg.death_infection - vitals.infection <= margin,
    ]
    .into_iter()
    .filter(|&near| near)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::InvalidReason;
    use crate::config::MapConfig;
    use crate::rng::{RngBundle, StreamId};
    use crate::world::Biome;

    fn setup(seed: u64) -> (WorldGrid, OrganismState, RngBundle) {
        let mut rngs = RngBundle::from_user_seed(seed);
        let world = WorldGrid::generate(&MapConfig::default(), rngs.stream(StreamId::World));
        let spawn = world.find_spawn(rngs.stream(StreamId::Spawn), 1000).unwrap();
        let organism = OrganismState::spawn(spawn, &PhysiologyConfig::default(), 80, 60);
        (world, organism, rngs)
    }

    fn performed(action: Action) -> ResolvedAction {
        ResolvedAction::Performed { action }
    }

    fn ctx(action: &ResolvedAction, ambient: f64) -> StepContext<'_> {
        StepContext {
            action,
            ambient,
            hours: 1,
            drain_multiplier: 1.0,
        }
    }

    #[test]
    fn rest_drains_at_base_rate_and_recovers_fatigue() {
        let (mut world, mut org, mut rngs) = setup(42);
        let cfg = PhysiologyConfig::default();
        let rest = performed(Action::Rest);
        let events = apply_step(
            &mut org,
            &mut world,
            ctx(&rest, 20.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!(events.is_empty());
        assert!((org.vitals.hydration - (80.0 - 0.8)).abs() < 1e-9);
        assert!((org.vitals.energy - (80.0 - 0.6)).abs() < 1e-9);
        assert!((org.vitals.fatigue - 6.0).abs() < 1e-9);
    }

    #[test]
    fn heat_surcharges_hydration() {
        let (mut world, mut org, mut rngs) = setup(42);
        let cfg = PhysiologyConfig::default();
        let rest = performed(Action::Rest);
        apply_step(
            &mut org,
            &mut world,
            ctx(&rest, 40.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!((org.vitals.hydration - (80.0 - 0.8 - 0.8)).abs() < 1e-9);
    }

    #[test]
    fn drink_without_water_is_a_noop_event() {
        let (mut world, mut org, mut rngs) = setup(42);
        let cfg = PhysiologyConfig::default();
        let far = (0..60)
            .flat_map(|y| (0..80).map(move |x| Position::new(x, y)))
            .find(|&p| world.distance_to_water(p) > 2 && world.is_passable(p))
            .unwrap();
        org.position = far;
        let drink = performed(Action::Drink);
        let events = apply_step(
            &mut org,
            &mut world,
            ctx(&drink, 20.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert_eq!(
            events.as_slice(),
            &[SimEvent::PreconditionNotMet {
                action: Action::Drink
            }]
        );
        assert!(org.vitals.hydration < 80.0);
    }

    #[test]
    fn drink_next_to_water_restores() {
        let (mut world, mut org, mut rngs) = setup(42);
        let cfg = PhysiologyConfig::default();
        let shore = (0..60)
            .flat_map(|y| (0..80).map(move |x| Position::new(x, y)))
            .find(|&p| world.distance_to_water(p) == 1)
            .unwrap();
        org.position = shore;
        let drink = performed(Action::Drink);
        let events = apply_step(
            &mut org,
            &mut world,
            ctx(&drink, 20.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!(matches!(events[0], SimEvent::Drank { .. }));
        assert!(org.vitals.hydration > 100.0 - 1.0);
    }

    #[test]
    fn forage_depletes_biomass() {
        let (mut world, mut org, mut rngs) = setup(8);
        let cfg = PhysiologyConfig::default();
        let lush = (0..60)
            .flat_map(|y| (0..80).map(move |x| Position::new(x, y)))
            .find(|&p| world.cell(p).unwrap().biome == Biome::Forest && world.cell(p).unwrap().vegetation > 0.3)
            .unwrap();
        org.position = lush;
        let before = world.cell(lush).unwrap().vegetation;
        let forage = performed(Action::Forage);
        apply_step(
            &mut org,
            &mut world,
            ctx(&forage, 15.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!(world.cell(lush).unwrap().vegetation < before);
        assert!(org.vitals.energy > 80.0);
    }

    #[test]
    fn injury_never_self_decreases() {
        let (mut world, mut org, mut rngs) = setup(1);
        let cfg = PhysiologyConfig::default();
        org.vitals.injury = 60.0;
        let rest = performed(Action::Rest);
        let mut last_infection = 0.0;
        for _ in 0..50 {
            apply_step(
                &mut org,
                &mut world,
                ctx(&rest, 20.0),
                &cfg,
                rngs.stream(StreamId::Physiology),
            );
            assert!((org.vitals.injury - 60.0).abs() < 1e-12);
            assert!(org.vitals.infection >= last_infection);
            last_infection = org.vitals.infection;
        }
        assert!(last_infection > 0.0);
    }

    #[test]
    fn shelter_slows_thermal_drift_and_expires() {
        let (mut world, mut org, mut rngs) = setup(3);
        let cfg = PhysiologyConfig::default();
        let mut bare = org.clone();
        let build = performed(Action::BuildShelter);
        let events = apply_step(
            &mut org,
            &mut world,
            ctx(&build, -10.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!(matches!(events[0], SimEvent::ShelterBuilt { duration: 12 }));
        let rest = performed(Action::Rest);
        apply_step(
            &mut bare,
            &mut world,
            ctx(&rest, -10.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!(org.vitals.core_temp > bare.vitals.core_temp);

        let mut collapsed = false;
        for _ in 0..12 {
            let events = apply_step(
                &mut org,
                &mut world,
                ctx(&rest, 10.0),
                &cfg,
                rngs.stream(StreamId::Physiology),
            );
            collapsed |= events.contains(&SimEvent::ShelterCollapsed);
        }
        assert!(collapsed);
        assert!(!org.sheltered());
    }

    #[test]
    fn death_priority_is_fixed() {
        let cfg = PhysiologyConfig::default();
        let mut v = Vitals::initial(&cfg);
        assert_eq!(evaluate_death(&v, false, &cfg), None);
        assert_eq!(evaluate_death(&v, true, &cfg), Some(CauseOfDeath::Hunted));
        v.injury = 100.0;
        v.infection = 100.0;
        assert_eq!(evaluate_death(&v, true, &cfg), Some(CauseOfDeath::Trauma));
        v.core_temp = 29.0;
        assert_eq!(evaluate_death(&v, true, &cfg), Some(CauseOfDeath::Hypothermia));
        v.energy = 0.0;
        assert_eq!(evaluate_death(&v, true, &cfg), Some(CauseOfDeath::Starvation));
        v.hydration = 0.0;
        assert_eq!(evaluate_death(&v, true, &cfg), Some(CauseOfDeath::Dehydration));
    }

    #[test]
    fn kill_is_irreversible_and_single() {
        let (_, mut org, _) = setup(5);
        assert!(org.kill(CauseOfDeath::Trauma));
        assert!(!org.kill(CauseOfDeath::Hunted));
        assert!(!org.alive());
        assert_eq!(org.cause_of_death(), Some(CauseOfDeath::Trauma));
    }

    #[test]
    fn noop_uses_idle_activity() {
        let (mut world, mut org, mut rngs) = setup(42);
        let cfg = PhysiologyConfig::default();
        let noop = ResolvedAction::NoOp {
            reason: InvalidReason::Unrecognized {
                requested: "DANCE".into(),
            },
        };
        apply_step(
            &mut org,
            &mut world,
            ctx(&noop, 20.0),
            &cfg,
            rngs.stream(StreamId::Physiology),
        );
        assert!((org.vitals.hydration - 79.2).abs() < 1e-9);
        assert!((org.vitals.fatigue - 10.7).abs() < 1e-9);
    }
}
