//! Wildlife risk field, stochastic encounters and optional environmental
//! exposure.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::config::{DifficultyConfig, HazardConfig};
use crate::constants::{
    COLD_EXPOSURE_CORE_LOSS_PER_C, COLD_EXPOSURE_FATIGUE, COLD_EXPOSURE_THRESHOLD_C, DAWN_HOURS,
    DUSK_HOURS, HEAT_STRESS_HYDRATION_PER_C, HEAT_STRESS_THRESHOLD_C, LOG_HAZARDS,
    NIGHT_END_HOUR, NIGHT_START_HOUR, SWAMP_INFECTION_PER_HOUR,
};
use crate::episode::SimEvent;
use crate::physiology::{OrganismState, StepEvents};
use crate::rng::CountingRng;
use crate::world::{Biome, Cell};
use rand::RngCore;

/// Per-step wildlife risk of a cell in `[0, 1]`.
#[must_use]
pub fn wildlife_risk(cell: &Cell, cfg: &HazardConfig) -> f64 {
    (cfg.wildlife_base.get(cell.biome) * (0.5 + cell.vegetation) * cfg.risk_scale).clamp(0.0, 1.0)
}

/// Outcome of a successful encounter roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub injury: f64,
    pub energy_loss: f64,
    pub infection: f64,
}

/// Wildlife activity multiplier for the hour of day.
#[must_use]
pub fn activity_multiplier(hour: u32, cfg: &HazardConfig) -> f64 {
    if DAWN_HOURS.contains(&hour) || DUSK_HOURS.contains(&hour) {
        cfg.dawn_dusk_multiplier
    } else if hour >= NIGHT_START_HOUR || hour <= NIGHT_END_HOUR {
        cfg.night_multiplier
    } else {
        1.0
    }
}

/// How exposed the organism is while carrying out `action`. No-op steps count
/// as ordinary activity.
#[must_use]
pub fn stealth_factor(action: Option<Action>, cfg: &HazardConfig) -> f64 {
    match action {
        Some(Action::Hide) => cfg.hide_factor,
        Some(Action::Rest) => cfg.rest_factor,
        Some(Action::Forage | Action::BuildShelter) => cfg.noisy_factor,
        _ => 1.0,
    }
}

/// Roll for a wildlife encounter at `hour`. No draw is made on risk-free
/// cells.
pub fn roll_encounter<R: RngCore>(
    risk: f64,
    action: Option<Action>,
    hour: u32,
    cfg: &HazardConfig,
    difficulty: &DifficultyConfig,
    rng: &mut CountingRng<R>,
) -> Option<Encounter> {
    if risk <= 0.0 {
        return None;
    }
    let p = risk
        * activity_multiplier(hour, cfg)
        * stealth_factor(action, cfg)
        * difficulty.wildlife_multiplier;
    if !rng.bernoulli(p) {
        return None;
    }
    let encounter = Encounter {
        injury: rng.uniform_range(cfg.injury_min, cfg.injury_max),
        energy_loss: rng.uniform_range(cfg.energy_loss_min, cfg.energy_loss_max),
        infection: rng.uniform_range(cfg.infection_min, cfg.infection_max),
    };
    debug!(
        target: LOG_HAZARDS,
        "wildlife encounter hour={hour} p={p:.3} injury={:.2} energy_loss={:.2} infection={:.2}",
        encounter.injury, encounter.energy_loss, encounter.infection
    );
    Some(encounter)
}

pub fn apply_encounter(organism: &mut OrganismState, encounter: &Encounter) -> SimEvent {
    organism.vitals.injury += encounter.injury;
    organism.vitals.energy -= encounter.energy_loss;
    organism.vitals.infection += encounter.infection;
    organism.vitals.clamp();
    SimEvent::WildlifeEncounter {
        injury: encounter.injury,
        energy_loss: encounter.energy_loss,
        infection: encounter.infection,
    }
}

/// Deterministic heat, cold and swamp exposure. Only called when
/// `hazards.environmental` is enabled.
pub fn apply_environmental(
    organism: &mut OrganismState,
    biome: Biome,
    ambient: f64,
    hours: u32,
    difficulty: &DifficultyConfig,
) -> StepEvents {
    let mut events = StepEvents::new();
    let hours = f64::from(hours);
    let sheltered = organism.sheltered();
    let v = &mut organism.vitals;

    let heat_threshold = HEAT_STRESS_THRESHOLD_C / difficulty.hazard_multiplier;
    if !sheltered && ambient > heat_threshold {
        let loss = (ambient - heat_threshold) * HEAT_STRESS_HYDRATION_PER_C * hours;
        v.hydration -= loss;
        events.push(SimEvent::HeatStress { hydration_loss: loss });
    }
    if !sheltered && ambient < COLD_EXPOSURE_THRESHOLD_C && v.fatigue > COLD_EXPOSURE_FATIGUE {
        let loss = (COLD_EXPOSURE_THRESHOLD_C - ambient)
            * COLD_EXPOSURE_CORE_LOSS_PER_C
            * difficulty.hazard_multiplier
            * hours;
        v.core_temp -= loss;
        events.push(SimEvent::ColdExposure { core_temp_loss: loss });
    }
    if biome == Biome::Swamp {
        let gain = SWAMP_INFECTION_PER_HOUR * difficulty.hazard_multiplier * hours;
        v.infection += gain;
        events.push(SimEvent::SwampExposure { infection_gain: gain });
    }
    v.clamp();
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysiologyConfig;
    use crate::world::Position;

    fn cell(biome: Biome, vegetation: f64) -> Cell {
        Cell {
            biome,
            elevation: 100.0,
            moisture: 0.5,
            water: biome == Biome::Water,
            vegetation,
            vegetation_capacity: vegetation,
            impassable: biome == Biome::Water,
        }
    }

    fn organism() -> OrganismState {
        OrganismState::spawn(Position::new(10, 10), &PhysiologyConfig::default(), 32, 32)
    }

    #[test]
    fn risk_follows_biome_and_vegetation() {
        let cfg = HazardConfig::default();
        assert!(wildlife_risk(&cell(Biome::Water, 0.0), &cfg).abs() < f64::EPSILON);
        let sparse = wildlife_risk(&cell(Biome::Forest, 0.1), &cfg);
        let dense = wildlife_risk(&cell(Biome::Forest, 0.9), &cfg);
        assert!(dense > sparse);
        assert!(wildlife_risk(&cell(Biome::Forest, 0.5), &cfg) > wildlife_risk(&cell(Biome::Desert, 0.5), &cfg));
    }

    #[test]
    fn zero_risk_consumes_no_draws() {
        let mut rng = CountingRng::new(1);
        let hit = roll_encounter(
            0.0,
            None,
            12,
            &HazardConfig::default(),
            &DifficultyConfig::default(),
            &mut rng,
        );
        assert!(hit.is_none());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn certain_encounter_respects_ranges() {
        let cfg = HazardConfig::default();
        let mut rng = CountingRng::new(2);
        for _ in 0..100 {
            let hit = roll_encounter(1.0, None, 12, &cfg, &DifficultyConfig::default(), &mut rng)
                .unwrap();
            assert!((cfg.injury_min..cfg.injury_max).contains(&hit.injury));
            assert!((cfg.energy_loss_min..cfg.energy_loss_max).contains(&hit.energy_loss));
            assert!((cfg.infection_min..cfg.infection_max).contains(&hit.infection));
        }
    }

    #[test]
    fn hiding_reduces_encounter_rate() {
        let cfg = HazardConfig::default();
        let difficulty = DifficultyConfig::default();
        let count = |action| {
            let mut rng = CountingRng::new(9);
            (0..2000)
                .filter(|_| roll_encounter(0.5, action, 12, &cfg, &difficulty, &mut rng).is_some())
                .count()
        };
        let exposed = count(Some(Action::MoveN));
        let hidden = count(Some(Action::Hide));
        assert!(hidden * 2 < exposed, "hidden={hidden} exposed={exposed}");
    }

    #[test]
    fn wildlife_is_more_active_at_night() {
        let cfg = HazardConfig::default();
        let difficulty = DifficultyConfig::default();
        let count = |hour| {
            let mut rng = CountingRng::new(21);
            (0..4000)
                .filter(|_| roll_encounter(0.3, None, hour, &cfg, &difficulty, &mut rng).is_some())
                .count()
        };
        let noon = count(12);
        let dusk = count(19);
        let night = count(2);
        assert!(noon < dusk && dusk < night, "noon={noon} dusk={dusk} night={night}");

        assert!((activity_multiplier(6, &cfg) - 1.5).abs() < f64::EPSILON);
        assert!((activity_multiplier(23, &cfg) - 1.8).abs() < f64::EPSILON);
        assert!((activity_multiplier(4, &cfg) - 1.8).abs() < f64::EPSILON);
        assert!((activity_multiplier(21, &cfg) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resting_is_quieter_than_foraging() {
        let cfg = HazardConfig::default();
        let difficulty = DifficultyConfig::default();
        let count = |action| {
            let mut rng = CountingRng::new(33);
            (0..4000)
                .filter(|_| roll_encounter(0.4, action, 12, &cfg, &difficulty, &mut rng).is_some())
                .count()
        };
        let resting = count(Some(Action::Rest));
        let walking = count(Some(Action::MoveE));
        let foraging = count(Some(Action::Forage));
        assert!(resting < walking, "resting={resting} walking={walking}");
        assert!(walking < foraging, "walking={walking} foraging={foraging}");
        assert!(stealth_factor(Some(Action::Rest), &cfg) < 1.0);
        assert!(stealth_factor(Some(Action::BuildShelter), &cfg) > 1.0);
    }

    #[test]
    fn encounter_adds_injury() {
        let mut org = organism();
        let event = apply_encounter(
            &mut org,
            &Encounter {
                injury: 7.0,
                energy_loss: 3.0,
                infection: 1.5,
            },
        );
        assert!(matches!(event, SimEvent::WildlifeEncounter { .. }));
        assert!((org.vitals.injury - 7.0).abs() < 1e-12);
        assert!((org.vitals.energy - 77.0).abs() < 1e-12);
        assert!((org.vitals.infection - 1.5).abs() < 1e-12);
    }

    #[test]
    fn environmental_exposure() {
        let difficulty = DifficultyConfig::default();
        let mut org = organism();
        let events = apply_environmental(&mut org, Biome::Desert, 45.0, 1, &difficulty);
        assert!(matches!(events[0], SimEvent::HeatStress { .. }));

        let mut cold = organism();
        cold.vitals.fatigue = 80.0;
        let events = apply_environmental(&mut cold, Biome::Tundra, -20.0, 1, &difficulty);
        assert!(matches!(events[0], SimEvent::ColdExposure { .. }));
        assert!(cold.vitals.core_temp < 37.0);

        let mut wet = organism();
        let events = apply_environmental(&mut wet, Biome::Swamp, 15.0, 1, &difficulty);
        assert_eq!(events.len(), 1);
        assert!(wet.vitals.infection > 0.0);

        let mut sheltered = organism();
        sheltered.shelter_steps = 3;
        let events = apply_environmental(&mut sheltered, Biome::Desert, 45.0, 1, &difficulty);
        assert!(events.is_empty());
    }
}
