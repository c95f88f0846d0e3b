//! Earth2D simulation core
//!
//! Deterministic, turn-based survival simulation on a procedurally generated
//! 2D world. The crate owns world generation, climate, physiology, hazards,
//! hunters, the trophy objective, the fog-limited observation and the replay
//! log. Decision strategies, rendering and batch evaluation live outside and
//! talk to the core only through [`Observation`] and [`Action`].

pub mod action;
pub mod climate;
pub mod config;
pub mod constants;
pub mod episode;
pub mod hazards;
pub mod hunters;
pub mod observation;
pub mod physiology;
pub mod policy;
pub mod replay;
pub mod rng;
pub mod trophy;
pub mod world;

// Re-export commonly used types
pub use action::{Action, ActionMask, InvalidReason, ResolvedAction, UnknownAction};
pub use climate::{ClimateModel, SimClock};
pub use config::{
    ClimateConfig, ConfigError, DifficultyConfig, EpisodeConfig, FogConfig, HazardConfig,
    HunterConfig, MapConfig, PhysiologyConfig, SimConfig, TrophyConfig,
};
pub use episode::{Episode, EpisodeStatus, SimEvent, StepOutcome};
pub use hunters::{Heading, Hunter, HunterState, HunterTransition};
pub use observation::{
    CellView, GridView, HunterSighting, LastSighting, LocalView, Neighbourhood, Observation,
    SightingLog, Visibility, WaterSighting,
};
pub use physiology::{CauseOfDeath, OrganismState, Vitals};
pub use policy::{Decision, DecisionPolicy};
pub use replay::{
    EpisodeSummary, HunterRecord, ReplayError, ReplayEvent, ReplayHeader, ReplayLog,
    ReplayVerification, observation_digest,
};
pub use rng::{CountingRng, RngBundle, StreamId};
pub use trophy::{Compass, DistanceBucket, TrophyHint, TrophyRecord, TrophyTracker, Warmth};
pub use world::{Biome, BiomeTable, Cell, Position, WorldGrid};
