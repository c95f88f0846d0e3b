//! Centralized tuning constants for the Earth2D simulation core.
//!
//! Anything a scenario author should be able to adjust lives in
//! [`crate::config::SimConfig`]. The values here shape the model itself and are
//! only changed in code.

// Logging targets -----------------------------------------------------------
pub(crate) const LOG_EPISODE: &str = "earth2d::episode";
pub(crate) const LOG_HUNTERS: &str = "earth2d::hunters";
pub(crate) const LOG_HAZARDS: &str = "earth2d::hazards";
pub(crate) const LOG_REPLAY: &str = "earth2d::replay";

// World ---------------------------------------------------------------------
/// Elevation in metres of the highest normalised sample.
pub const MAX_ELEVATION_M: f64 = 3000.0;
/// Spawn cells must sit at least this many cells inside the map border.
pub const SPAWN_BORDER: i32 = 5;
/// Hunters spawn at least this far inside the border.
pub const HUNTER_BORDER: i32 = 2;
/// Smallest map edge accepted by validation.
pub const MIN_MAP_EDGE: u32 = 16;
/// Largest map edge accepted by validation.
pub const MAX_MAP_EDGE: u32 = 1024;
/// Upper bound on noise octaves.
pub const MAX_OCTAVES: u32 = 8;
/// Normalised elevation a river source must reach.
pub(crate) const RIVER_SOURCE_ELEVATION: f64 = 0.7;
/// Floor used when a fully depleted cell starts regrowing.
pub(crate) const REGROWTH_SEED_FRACTION: f64 = 0.01;
pub(crate) const VEGETATION_JITTER_LOW: f64 = 0.85;
pub(crate) const VEGETATION_JITTER_HIGH: f64 = 1.15;

// Physiology ----------------------------------------------------------------
pub const VITAL_MIN: f64 = 0.0;
pub const VITAL_MAX: f64 = 100.0;
pub(crate) const ACTIVITY_IDLE: f64 = 1.0;
pub(crate) const ACTIVITY_FORAGE: f64 = 1.3;
pub(crate) const ACTIVITY_BUILD_SHELTER: f64 = 1.4;
pub(crate) const ACTIVITY_MOVE: f64 = 1.5;
/// Ambient temperature above which hydration drain is surcharged.
pub(crate) const HEAT_SURCHARGE_THRESHOLD_C: f64 = 30.0;
/// Extra hydration drain per 10 °C above the threshold, per hour.
pub(crate) const HEAT_SURCHARGE_PER_10C: f64 = 0.8;
/// Thermal drift multiplier while inside a personal shelter.
pub(crate) const SHELTER_DRIFT_FACTOR: f64 = 0.3;
/// How strongly natural shelter damps thermal drift.
pub(crate) const NATURAL_SHELTER_DAMPING: f64 = 0.5;

// Environmental hazards -----------------------------------------------------
pub(crate) const HEAT_STRESS_THRESHOLD_C: f64 = 38.0;
pub(crate) const HEAT_STRESS_HYDRATION_PER_C: f64 = 0.15;
pub(crate) const COLD_EXPOSURE_THRESHOLD_C: f64 = 0.0;
pub(crate) const COLD_EXPOSURE_FATIGUE: f64 = 60.0;
pub(crate) const COLD_EXPOSURE_CORE_LOSS_PER_C: f64 = 0.02;
pub(crate) const SWAMP_INFECTION_PER_HOUR: f64 = 0.2;

// Wildlife activity windows, inclusive hours of day.
pub(crate) const DAWN_HOURS: std::ops::RangeInclusive<u32> = 5..=7;
pub(crate) const DUSK_HOURS: std::ops::RangeInclusive<u32> = 18..=20;
pub(crate) const NIGHT_START_HOUR: u32 = 22;
pub(crate) const NIGHT_END_HOUR: u32 = 4;

// Trophy hints ----------------------------------------------------------------
pub const BUCKET_VERY_CLOSE: u32 = 5;
pub const BUCKET_CLOSE: u32 = 15;
pub const BUCKET_MODERATE: u32 = 30;
/// tan(22.5°) scaled by 1000, for integer 8-way compass quantisation.
pub(crate) const COMPASS_TAN_22_5_MILLI: i64 = 414;

// Harness-facing thresholds ---------------------------------------------------
/// A vital within this margin of its death threshold counts as near-death.
pub const NEAR_DEATH_MARGIN: f64 = 10.0;

// Replay ----------------------------------------------------------------------
pub const REPLAY_FORMAT_VERSION: u32 = 1;
