//! Decision contract between the simulation and any strategy.
//!
//! Strategies live outside the core. They see only an [`Observation`] and
//! answer with a [`Decision`]; timeouts and fallbacks are the caller's job.
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::observation::Observation;

/// Decision returned by a [`DecisionPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Decision {
    #[must_use]
    pub const fn new(action: Action) -> Self {
        Self {
            action,
            confidence: None,
            rationale: None,
        }
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Policy interface for automated strategies.
pub trait DecisionPolicy {
    /// Name used for logging and reports.
    fn name(&self) -> &'static str;

    /// Choose the next action.
    fn decide(&mut self, observation: &Observation) -> Decision;

    /// Clear any per-episode memory before a new episode.
    fn reset(&mut self) {}
}
