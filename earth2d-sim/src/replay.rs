//! Append-only replay log.
//!
//! A replay holds the seed, the full configuration snapshot and one record per
//! step. Re-running the recorded actions against a fresh episode built from
//! the same seed and config must reproduce every record, including the digest
//! of each observation.
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use std::path::Path;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::action::ResolvedAction;
use crate::config::{ConfigError, SimConfig};
use crate::constants::{LOG_REPLAY, REPLAY_FORMAT_VERSION};
use crate::episode::{Episode, EpisodeStatus, SimEvent};
use crate::hunters::{HunterState, HunterTransition};
use crate::observation::Observation;
use crate::physiology::{CauseOfDeath, Vitals};
use crate::rng::StreamId;
use crate::trophy::TrophyRecord;
use crate::world::Position;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay is malformed or truncated: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("failed to access replay: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported replay format {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("replay steps are not contiguous (expected {expected}, found {found})")]
    NonContiguous { expected: u32, found: u32 },
    #[error("replay ends at step {step} without a summary")]
    MissingSummary { step: u32 },
    #[error("replay is truncated: summary reports {expected} steps, log ends at step {found}")]
    Truncated { expected: u32, found: u32 },
    #[error("replay config is no longer valid: {0}")]
    Config(#[from] ConfigError),
    #[error("replay diverged at step {step} in {field}")]
    Divergence { step: u32, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub format_version: u32,
    pub seed: u64,
    pub config: SimConfig,
    pub initial_observation_digest: u64,
}

/// True hunter state at the end of a step. Not agent-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunterRecord {
    pub id: u32,
    pub position: Position,
    pub state: HunterState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    pub step: u32,
    pub day_of_year: u32,
    pub hour: u32,
    /// Action exactly as requested by the agent.
    pub requested: String,
    pub resolved: ResolvedAction,
    pub position: Position,
    pub vitals: Vitals,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hunters: Vec<HunterRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hunter_transitions: Vec<HunterTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trophy: Option<TrophyRecord>,
    #[serde(default)]
    pub events: Vec<SimEvent>,
    pub status: EpisodeStatus,
    pub observation_digest: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub seed: u64,
    pub steps: u32,
    pub hours: u64,
    pub days: f64,
    pub status: EpisodeStatus,
    pub cause_of_death: Option<CauseOfDeath>,
    pub final_position: Position,
    pub final_vitals: Vitals,
    pub trophy_found: bool,
    pub explored_cells: usize,
    pub encounters: u32,
    pub invalid_actions: u32,
    pub draws: BTreeMap<StreamId, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    header: ReplayHeader,
    events: Vec<ReplayEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<EpisodeSummary>,
}

/// Result of a successful [`ReplayLog::verify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayVerification {
    pub steps: u32,
    pub status: EpisodeStatus,
}

impl ReplayLog {
    #[must_use]
    pub const fn new(header: ReplayHeader) -> Self {
        Self {
            header,
            events: Vec::new(),
            summary: None,
        }
    }

    pub(crate) fn push(&mut self, event: ReplayEvent) {
        self.events.push(event);
    }

    pub(crate) fn finish(&mut self, summary: EpisodeSummary) {
        self.summary = Some(summary);
    }

    #[must_use]
    pub const fn header(&self) -> &ReplayHeader {
        &self.header
    }

    #[must_use]
    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    #[must_use]
    pub const fn summary(&self) -> Option<&EpisodeSummary> {
        self.summary.as_ref()
    }

    /// Requested action strings in step order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.requested.as_str())
    }

    /// # Errors
    ///
    /// Returns [`ReplayError::Corrupt`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and structurally validate a replay document.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Corrupt`] for malformed JSON,
    /// [`ReplayError::Truncated`] when the events stop short of the summary,
    /// and the matching variant for version, ordering or config problems.
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let log: Self = serde_json::from_str(json)?;
        log.validate()?;
        Ok(log)
    }

    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] or [`ReplayError::Corrupt`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ReplayLog::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ReplayError> {
        if self.header.format_version != REPLAY_FORMAT_VERSION {
            return Err(ReplayError::VersionMismatch {
                expected: REPLAY_FORMAT_VERSION,
                found: self.header.format_version,
            });
        }
        self.header.config.validate()?;
        for (expected, event) in (1_u32..).zip(&self.events) {
            if event.step != expected {
                return Err(ReplayError::NonContiguous {
                    expected,
                    found: event.step,
                });
            }
        }
        let terminal_at = self.events.iter().position(|e| e.status.is_terminal());
        if let Some(idx) = terminal_at
            && idx + 1 != self.events.len()
        {
            return Err(ReplayError::NonContiguous {
                expected: self.events[idx].step,
                found: self.events[idx + 1].step,
            });
        }
        if let Some(last) = self.events.last()
            && last.status.is_terminal()
            && self.summary.is_none()
        {
            return Err(ReplayError::MissingSummary { step: last.step });
        }
        if let Some(summary) = &self.summary {
            let found = self.events.last().map_or(0, |e| e.step);
            let complete = self.events.last().is_some_and(|last| {
                last.status.is_terminal() && last.status == summary.status
            });
            if !complete || summary.steps != found {
                return Err(ReplayError::Truncated {
                    expected: summary.steps,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Re-simulate the recorded actions and compare every step.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Divergence`] at the first differing step, or
    /// [`ReplayError::Config`] if the episode cannot be rebuilt.
    pub fn verify(&self) -> Result<ReplayVerification, ReplayError> {
        let mut episode = Episode::new(self.header.config.clone(), self.header.seed)?;
        if observation_digest(episode.observation()) != self.header.initial_observation_digest {
            return Err(diverged(0, "initial_observation_digest"));
        }
        for recorded in &self.events {
            episode.step_raw(&recorded.requested);
            let Some(replayed) = episode.replay().events().last() else {
                return Err(diverged(recorded.step, "step"));
            };
            if let Some(field) = first_difference(recorded, replayed) {
                return Err(diverged(recorded.step, field));
            }
        }
        if let Some(summary) = &self.summary
            && *summary != episode.summary()
        {
            return Err(diverged(episode.step_count(), "summary"));
        }
        Ok(ReplayVerification {
            steps: episode.step_count(),
            status: episode.status(),
        })
    }
}

fn diverged(step: u32, field: &'static str) -> ReplayError {
    warn!(target: LOG_REPLAY, "replay diverged at step {step} in {field}");
    ReplayError::Divergence { step, field }
}

fn first_difference(recorded: &ReplayEvent, replayed: &ReplayEvent) -> Option<&'static str> {
    let checks: [(&'static str, bool); 9] = [
        ("step", recorded.step == replayed.step),
        ("resolved", recorded.resolved == replayed.resolved),
        ("position", recorded.position == replayed.position),
        ("vitals", recorded.vitals == replayed.vitals),
        ("hunters", recorded.hunters == replayed.hunters),
        ("trophy", recorded.trophy == replayed.trophy),
        ("events", recorded.events == replayed.events),
        ("status", recorded.status == replayed.status),
        (
            "observation_digest",
            recorded.observation_digest == replayed.observation_digest,
        ),
    ];
    checks
        .into_iter()
        .find_map(|(field, same)| (!same).then_some(field))
}

/// XxHash64 of the canonical JSON encoding of an observation.
#[must_use]
pub fn observation_digest(observation: &Observation) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    match serde_json::to_vec(observation) {
        Ok(bytes) => hasher.write(&bytes),
        Err(err) => warn!(target: LOG_REPLAY, "observation could not be encoded: {err}"),
    }
    hasher.finish()
}
