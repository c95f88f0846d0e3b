//! Episode orchestration.
//!
//! An [`Episode`] owns the world, the organism, the hunters, the trophy and
//! every random stream. Each step runs in a fixed order: advance the clock
//! (and vegetation regrowth), resolve the action, physiology, hazards,
//! hunters, trophy, death evaluation, then build the next observation and
//! append a replay event.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::{Action, InvalidReason, ResolvedAction};
use crate::climate::{ClimateModel, SimClock};
use crate::config::{ConfigError, SimConfig};
use crate::constants::{LOG_EPISODE, REPLAY_FORMAT_VERSION};
use crate::hazards::{apply_encounter, apply_environmental, roll_encounter, wildlife_risk};
use crate::hunters::{Hunter, HunterRules, HunterTransition, adjacent_hunter, spawn_hunters};
use crate::observation::{
    Observation, ObservationInput, SightingLog, build_observation, view_radius, visible_hunters,
};
use crate::physiology::{CauseOfDeath, OrganismState, StepContext, Vitals, apply_step, evaluate_death};
use crate::policy::{Decision, DecisionPolicy};
use crate::replay::{
    EpisodeSummary, HunterRecord, ReplayEvent, ReplayHeader, ReplayLog, observation_digest,
};
use crate::rng::{RngBundle, StreamId};
use crate::trophy::{TrophyHint, TrophyTracker};
use crate::world::{Position, WorldGrid};

/// Something that happened to the organism during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    Moved { from: Position, to: Position },
    InvalidAction { requested: String },
    PreconditionNotMet { action: Action },
    Drank { gain: f64 },
    Foraged { gain: f64 },
    ShelterBuilt { duration: u32 },
    ShelterCollapsed,
    InfectionProgressed { amount: f64 },
    WildlifeEncounter {
        injury: f64,
        energy_loss: f64,
        infection: f64,
    },
    HeatStress { hydration_loss: f64 },
    ColdExposure { core_temp_loss: f64 },
    SwampExposure { infection_gain: f64 },
    TrophyFound { position: Position },
    Died { cause: CauseOfDeath },
    StepCapReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpisodeStatus {
    Running,
    Died { cause: CauseOfDeath },
    Won,
    /// Step budget exhausted; scored as a draw.
    StepCap,
}

impl EpisodeStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Died { .. } => "died",
            Self::Won => "won",
            Self::StepCap => "step_cap",
        }
    }
}

/// Result of a single [`Episode::step`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: u32,
    pub status: EpisodeStatus,
    pub resolved: ResolvedAction,
    pub events: Vec<SimEvent>,
    /// `false` when the episode had already ended and nothing changed.
    pub advanced: bool,
}

/// One self-contained simulation run.
#[derive(Debug, Clone)]
pub struct Episode {
    config: SimConfig,
    seed: u64,
    rngs: RngBundle,
    world: WorldGrid,
    climate: ClimateModel,
    clock: SimClock,
    organism: OrganismState,
    hunters: Vec<Hunter>,
    hunter_rules: HunterRules,
    trophy: Option<TrophyTracker>,
    sightings: SightingLog,
    observation: Observation,
    replay: ReplayLog,
    status: EpisodeStatus,
    step: u32,
    encounters: u32,
    invalid_actions: u32,
}

impl Episode {
    /// Validate `config`, generate the world and place every entity.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when validation fails or a placement cannot be
    /// satisfied within the attempt budget.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rngs = RngBundle::from_user_seed(seed);
        let attempts = config.map.placement_attempts;

        let world = WorldGrid::generate(&config.map, rngs.stream(StreamId::World));
        let spawn = world.find_spawn(rngs.stream(StreamId::Spawn), attempts)?;
        let hunters = if config.hunters.enabled {
            spawn_hunters(
                &config.hunters,
                &world,
                spawn,
                attempts,
                rngs.stream(StreamId::Hunters),
            )?
        } else {
            Vec::new()
        };
        let mut trophy = if config.trophy.enabled {
            Some(TrophyTracker::place(
                &config.trophy,
                &world,
                spawn,
                attempts,
                rngs.stream(StreamId::Trophy),
            )?)
        } else {
            None
        };

        let radius = view_radius(&config);
        let mut organism =
            OrganismState::spawn(spawn, &config.physiology, world.width(), world.height());
        organism.explored.reveal(spawn, radius);
        let mut sightings = SightingLog::default();
        sightings.record(&visible_hunters(&hunters, spawn, radius), 0);

        let climate = ClimateModel::new(
            config.climate.clone(),
            config.difficulty.temperature_extremity,
        );
        let clock = SimClock::new(config.sim.start_day, config.sim.start_hour);
        let hint = trophy.as_mut().and_then(|t| t.hint(spawn, 0));
        let observation = build_observation(&ObservationInput {
            step: 0,
            clock: &clock,
            world: &world,
            climate: &climate,
            organism: &organism,
            hunters: &hunters,
            sightings: &sightings,
            trophy_hint: hint,
            trophy_found: false,
            events: &[],
            config: &config,
        });
        let replay = ReplayLog::new(ReplayHeader {
            format_version: REPLAY_FORMAT_VERSION,
            seed,
            config: config.clone(),
            initial_observation_digest: observation_digest(&observation),
        });

        info!(
            target: LOG_EPISODE,
            "episode start seed={seed} map={}x{} spawn=({}, {}) hunters={} trophy={}",
            world.width(),
            world.height(),
            spawn.x,
            spawn.y,
            hunters.len(),
            trophy.is_some()
        );

        Ok(Self {
            hunter_rules: HunterRules::from(&config.hunters),
            config,
            seed,
            rngs,
            world,
            climate,
            clock,
            organism,
            hunters,
            trophy,
            sightings,
            observation,
            replay,
            status: EpisodeStatus::Running,
            step: 0,
            encounters: 0,
            invalid_actions: 0,
        })
    }

    /// Advance one step with a typed action.
    pub fn step(&mut self, action: Action) -> StepOutcome {
        self.advance(action.key().to_string(), Some(action))
    }

    /// Advance one step with an action name as an agent produced it.
    /// Unrecognised names resolve to a no-op step.
    pub fn step_raw(&mut self, requested: &str) -> StepOutcome {
        self.advance(requested.to_string(), requested.parse().ok())
    }

    /// Ask `policy` for a decision on the current observation and apply it.
    pub fn step_with(&mut self, policy: &mut dyn DecisionPolicy) -> (Decision, StepOutcome) {
        let decision = policy.decide(&self.observation);
        let outcome = self.step(decision.action);
        (decision, outcome)
    }

    /// Run `policy` until the episode terminates.
    pub fn run(&mut self, policy: &mut dyn DecisionPolicy) -> EpisodeSummary {
        while !self.status.is_terminal() {
            self.step_with(policy);
        }
        self.summary()
    }

    fn advance(&mut self, requested: String, parsed: Option<Action>) -> StepOutcome {
        if self.status.is_terminal() {
            return StepOutcome {
                step: self.step,
                status: self.status,
                resolved: ResolvedAction::NoOp {
                    reason: InvalidReason::Unrecognized { requested },
                },
                events: Vec::new(),
                advanced: false,
            };
        }

        let hours = self.config.sim.hours_per_step;
        self.clock.advance(hours);
        self.world
            .regrow(hours, self.config.map.vegetation_regrowth_rate);

        let mut events = Vec::new();
        let resolved = self.resolve(&requested, parsed);
        match &resolved {
            ResolvedAction::NoOp { reason } => {
                debug!(target: LOG_EPISODE, "step {} no-op: {reason:?}", self.step + 1);
                self.invalid_actions += 1;
                events.push(SimEvent::InvalidAction {
                    requested: requested.clone(),
                });
            }
            ResolvedAction::Performed { action } => {
                if let Some((dx, dy)) = action.delta() {
                    let from = self.organism.position;
                    let to = from.offset(dx, dy);
                    self.organism.position = to;
                    events.push(SimEvent::Moved { from, to });
                }
            }
        }

        let pos = self.organism.position;
        let (ambient, biome, risk) = match self.world.cell(pos) {
            Some(cell) => (
                self.climate.temperature(cell, &self.clock),
                cell.biome,
                wildlife_risk(cell, &self.config.hazards),
            ),
            None => (self.config.physiology.initial_core_temp, crate::world::Biome::Plains, 0.0),
        };

        events.extend(apply_step(
            &mut self.organism,
            &mut self.world,
            StepContext {
                action: &resolved,
                ambient,
                hours,
                drain_multiplier: self.config.difficulty.drain_multiplier,
            },
            &self.config.physiology,
            self.rngs.stream(StreamId::Physiology),
        ));

        if let Some(encounter) = roll_encounter(
            risk,
            resolved.action(),
            self.clock.hour(),
            &self.config.hazards,
            &self.config.difficulty,
            self.rngs.stream(StreamId::Hazards),
        ) {
            self.encounters += 1;
            events.push(apply_encounter(&mut self.organism, &encounter));
        }
        if self.config.hazards.environmental {
            events.extend(apply_environmental(
                &mut self.organism,
                biome,
                ambient,
                hours,
                &self.config.difficulty,
            ));
        }

        let mut transitions: Vec<HunterTransition> = Vec::new();
        for hunter in &mut self.hunters {
            if let Some(t) = hunter.tick(
                pos,
                &self.world,
                &self.hunter_rules,
                self.rngs.stream(StreamId::Hunters),
            ) {
                transitions.push(t);
            }
        }

        let found_now = self
            .trophy
            .as_mut()
            .is_some_and(|t| t.check_found(pos));
        if found_now {
            events.push(SimEvent::TrophyFound { position: pos });
        }

        let hunted = adjacent_hunter(&self.hunters, pos).is_some();
        if let Some(cause) = evaluate_death(&self.organism.vitals, hunted, &self.config.physiology)
            && self.organism.kill(cause)
        {
            events.push(SimEvent::Died { cause });
        }

        self.step += 1;
        self.organism.steps = self.step;
        self.status = self.next_status();
        if self.status == EpisodeStatus::StepCap {
            events.push(SimEvent::StepCapReached);
        }

        let radius = view_radius(&self.config);
        self.organism.explored.reveal(pos, radius);
        self.sightings
            .record(&visible_hunters(&self.hunters, pos, radius), self.step);
        let hint = self.trophy.as_mut().and_then(|t| t.hint(pos, self.step));
        self.observation = self.observe(hint, &events);

        self.replay.push(ReplayEvent {
            step: self.step,
            day_of_year: self.clock.day_of_year(),
            hour: self.clock.hour(),
            requested,
            resolved: resolved.clone(),
            position: pos,
            vitals: self.organism.vitals,
            hunters: self
                .hunters
                .iter()
                .map(|h| HunterRecord {
                    id: h.id(),
                    position: h.position(),
                    state: h.state(),
                })
                .collect(),
            hunter_transitions: transitions,
            trophy: self.trophy.as_ref().map(TrophyTracker::record),
            events: events.clone(),
            status: self.status,
            observation_digest: observation_digest(&self.observation),
        });

        if self.status.is_terminal() {
            let summary = self.summary();
            info!(
                target: LOG_EPISODE,
                "episode end seed={} steps={} status={} cause={:?}",
                self.seed,
                self.step,
                self.status.label(),
                self.organism.cause_of_death()
            );
            self.replay.finish(summary);
        }

        StepOutcome {
            step: self.step,
            status: self.status,
            resolved,
            events,
            advanced: true,
        }
    }

    fn resolve(&self, requested: &str, parsed: Option<Action>) -> ResolvedAction {
        let Some(action) = parsed else {
            return ResolvedAction::NoOp {
                reason: InvalidReason::Unrecognized {
                    requested: requested.to_string(),
                },
            };
        };
        match action.delta() {
            Some((dx, dy)) if !self.world.is_passable(self.organism.position.offset(dx, dy)) => {
                ResolvedAction::NoOp {
                    reason: InvalidReason::Masked { action },
                }
            }
            _ => ResolvedAction::Performed { action },
        }
    }

    fn next_status(&self) -> EpisodeStatus {
        if let Some(cause) = self.organism.cause_of_death() {
            EpisodeStatus::Died { cause }
        } else if self.config.trophy.win_on_found && self.trophy.as_ref().is_some_and(TrophyTracker::found) {
            EpisodeStatus::Won
        } else if self.step >= self.config.sim.max_steps {
            EpisodeStatus::StepCap
        } else {
            EpisodeStatus::Running
        }
    }

    fn observe(&self, hint: Option<TrophyHint>, events: &[SimEvent]) -> Observation {
        build_observation(&ObservationInput {
            step: self.step,
            clock: &self.clock,
            world: &self.world,
            climate: &self.climate,
            organism: &self.organism,
            hunters: &self.hunters,
            sightings: &self.sightings,
            trophy_hint: hint,
            trophy_found: self.trophy.as_ref().is_some_and(TrophyTracker::found),
            events,
            config: &self.config,
        })
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn summary(&self) -> EpisodeSummary {
        let hours = self.clock.total_hours();
        EpisodeSummary {
            seed: self.seed,
            steps: self.step,
            hours,
            days: hours as f64 / 24.0,
            status: self.status,
            cause_of_death: self.organism.cause_of_death(),
            final_position: self.organism.position,
            final_vitals: self.organism.vitals,
            trophy_found: self.trophy.as_ref().is_some_and(TrophyTracker::found),
            explored_cells: self.organism.explored.count(),
            encounters: self.encounters,
            invalid_actions: self.invalid_actions,
            draws: self.rngs.draw_counts().into_iter().collect::<BTreeMap<_, _>>(),
        }
    }

    /// Observation for the current step.
    #[must_use]
    pub const fn observation(&self) -> &Observation {
        &self.observation
    }

    #[must_use]
    pub const fn status(&self) -> EpisodeStatus {
        self.status
    }

    #[must_use]
    pub const fn step_count(&self) -> u32 {
        self.step
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn world(&self) -> &WorldGrid {
        &self.world
    }

    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[must_use]
    pub const fn organism(&self) -> &OrganismState {
        &self.organism
    }

    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.organism.vitals
    }

    #[must_use]
    pub fn hunters(&self) -> &[Hunter] {
        &self.hunters
    }

    #[must_use]
    pub const fn trophy(&self) -> Option<&TrophyTracker> {
        self.trophy.as_ref()
    }

    #[must_use]
    pub const fn replay(&self) -> &ReplayLog {
        &self.replay
    }

    #[must_use]
    pub fn into_replay(self) -> ReplayLog {
        self.replay
    }
}
