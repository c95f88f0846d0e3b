use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use earth2d_sim::constants::NEAR_DEATH_MARGIN;
use earth2d_sim::physiology::near_death_count;
use earth2d_sim::{Episode, EpisodeStatus, Position, ReplayLog, SimConfig};
use log::{debug, info};
use serde::Serialize;

use crate::logic::policy::Strategy;

/// Settings shared by every episode of a batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub sim: SimConfig,
    pub strategy: Strategy,
    pub replay_dir: Option<PathBuf>,
}

impl BatchConfig {
    #[must_use]
    pub const fn new(sim: SimConfig, strategy: Strategy) -> Self {
        Self {
            sim,
            strategy,
            replay_dir: None,
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: Option<u32>) -> Self {
        if let Some(max_steps) = max_steps {
            self.sim.sim.max_steps = max_steps;
        }
        self
    }

    #[must_use]
    pub fn with_replay_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.replay_dir = dir;
        self
    }
}

/// Per-episode evaluation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeMetrics {
    pub seed: u64,
    pub strategy: String,
    pub survived_steps: u32,
    pub survived_hours: u64,
    pub survived_days: f64,
    pub outcome: String,
    pub cause_of_death: Option<String>,
    pub trophy_found: bool,
    pub explored_cells: usize,
    pub unique_cells_visited: usize,
    pub exploration_rate: f64,
    pub avg_risk_exposure: f64,
    pub encounter_count: u32,
    pub near_death_count: usize,
    pub invalid_action_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_path: Option<String>,
}

/// Per-strategy rollup across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAggregate {
    pub strategy: String,
    pub episodes: usize,
    pub mean_survival_steps: f64,
    pub mean_survival_days: f64,
    pub win_rate: f64,
    pub step_cap_rate: f64,
    pub mean_exploration_rate: f64,
    pub total_near_death: usize,
    pub causes: BTreeMap<String, usize>,
}

/// Run one episode to termination and collect its metrics.
///
/// # Errors
///
/// Fails if the configuration is rejected or the replay cannot be written.
pub fn run_episode(batch: &BatchConfig, seed: u64) -> Result<(EpisodeMetrics, ReplayLog)> {
    let mut episode = Episode::new(batch.sim.clone(), seed)
        .with_context(|| format!("seed {seed}: configuration rejected"))?;
    let mut policy = batch.strategy.create_policy(seed);
    policy.reset();

    let physiology = &batch.sim.physiology;
    let mut visited: HashSet<Position> = HashSet::from([episode.observation().position]);
    let mut near_death = 0;
    let mut risk_total = 0.0;

    while !episode.status().is_terminal() {
        let (decision, outcome) = episode.step_with(policy.as_mut());
        debug!(
            "seed {seed} step {}: {} ({})",
            outcome.step,
            decision.action,
            decision.rationale.as_deref().unwrap_or("-")
        );
        let obs = episode.observation();
        visited.insert(obs.position);
        near_death += near_death_count(&obs.vitals, physiology, NEAR_DEATH_MARGIN);
        risk_total += obs.local.wildlife_risk;
    }

    let summary = episode.summary();
    let log = episode.into_replay();
    let steps = summary.steps.max(1);
    let mut metrics = EpisodeMetrics {
        seed,
        strategy: batch.strategy.label().to_string(),
        survived_steps: summary.steps,
        survived_hours: summary.hours,
        survived_days: summary.days,
        outcome: summary.status.label().to_string(),
        cause_of_death: summary.cause_of_death.map(|c| c.key().to_string()),
        trophy_found: summary.trophy_found,
        explored_cells: summary.explored_cells,
        unique_cells_visited: visited.len(),
        exploration_rate: visited.len() as f64 / f64::from(steps),
        avg_risk_exposure: risk_total / f64::from(steps),
        encounter_count: summary.encounters,
        near_death_count: near_death,
        invalid_action_count: summary.invalid_actions,
        replay_path: None,
    };

    if let Some(dir) = &batch.replay_dir {
        let path = write_replay(dir, batch.strategy, seed, &log)?;
        metrics.replay_path = Some(path.display().to_string());
    }

    info!(
        "seed {seed} [{}]: {} after {} steps",
        metrics.strategy, metrics.outcome, metrics.survived_steps
    );
    Ok((metrics, log))
}

/// Run every seed in order.
///
/// # Errors
///
/// Stops at the first episode that fails to start or persist.
pub fn run_batch(batch: &BatchConfig, seeds: &[u64]) -> Result<Vec<EpisodeMetrics>> {
    seeds
        .iter()
        .map(|&seed| run_episode(batch, seed).map(|(metrics, _)| metrics))
        .collect()
}

fn write_replay(dir: &Path, strategy: Strategy, seed: u64, log: &ReplayLog) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("{}-seed{seed}.json", strategy.label()));
    log.save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Group metrics by strategy and summarise each group.
#[must_use]
pub fn aggregate(records: &[EpisodeMetrics]) -> Vec<StrategyAggregate> {
    let mut groups: BTreeMap<&str, Vec<&EpisodeMetrics>> = BTreeMap::new();
    for record in records {
        groups.entry(record.strategy.as_str()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(strategy, group)| {
            #[allow(clippy::cast_precision_loss)]
            let n = group.len() as f64;
            let mut causes = BTreeMap::new();
            for record in &group {
                if let Some(cause) = &record.cause_of_death {
                    *causes.entry(cause.clone()).or_insert(0) += 1;
                }
            }
            let share = |label: &str| {
                group.iter().filter(|r| r.outcome == label).count() as f64 / n
            };
            StrategyAggregate {
                strategy: strategy.to_string(),
                episodes: group.len(),
                mean_survival_steps: group.iter().map(|r| f64::from(r.survived_steps)).sum::<f64>() / n,
                mean_survival_days: group.iter().map(|r| r.survived_days).sum::<f64>() / n,
                win_rate: share(EpisodeStatus::Won.label()),
                step_cap_rate: share(EpisodeStatus::StepCap.label()),
                mean_exploration_rate: group.iter().map(|r| r.exploration_rate).sum::<f64>() / n,
                total_near_death: group.iter().map(|r| r.near_death_count).sum(),
                causes,
            }
        })
        .collect()
}
