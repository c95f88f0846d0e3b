//! Strongly typed simulation configuration.
//!
//! Every section and field is optional in the JSON form and falls back to a
//! neutral default; unknown keys are rejected. Optional features (hunters,
//! trophy, fog of war, environmental hazards) default to disabled so a config
//! that omits them reproduces the base episode exactly.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants::{MAX_MAP_EDGE, MAX_OCTAVES, MIN_MAP_EDGE};
use crate::world::BiomeTable;

/// Errors raised while loading or validating a [`SimConfig`], or while
/// satisfying its placement constraints at episode start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("{field} must be between {min:.3} and {max:.3} (got {value:.3})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be at least {min:.3} (got {value:.3})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} bounds inverted (min {min:.3} > max {max:.3})")]
    BoundsInverted {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("could not place {what} within {attempts} attempts")]
    PlacementExhausted { what: &'static str, attempts: u32 },
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_nan() || !(min..=max).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

fn check_bounds(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::BoundsInverted { field, min, max });
    }
    Ok(())
}

/// Root configuration consumed read-only at episode start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub map: MapConfig,
    pub sim: EpisodeConfig,
    pub climate: ClimateConfig,
    pub physiology: PhysiologyConfig,
    pub hazards: HazardConfig,
    pub hunters: HunterConfig,
    pub trophy: TrophyConfig,
    pub fog_of_war: FogConfig,
    pub difficulty: DifficultyConfig,
}

impl SimConfig {
    /// Parse a JSON document. Missing keys take defaults; unknown keys fail.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed or carries
    /// unknown keys.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid config document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.map.validate()?;
        self.sim.validate()?;
        self.climate.validate()?;
        self.physiology.validate()?;
        self.hazards.validate()?;
        self.hunters.validate()?;
        self.trophy.validate()?;
        self.fog_of_war.validate()?;
        self.difficulty.validate()?;
        Ok(())
    }
}

/// World generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub biome_weights: BiomeTable<f64>,
    pub elevation_octaves: u32,
    pub elevation_scale: f64,
    pub moisture_octaves: u32,
    pub moisture_scale: f64,
    pub num_lakes: u32,
    pub num_rivers: u32,
    pub lake_max_cells: u32,
    /// Lakes flood neighbours up to this many metres above the basin floor.
    pub lake_depth_m: f64,
    /// Normalised elevation at which mountain cells become impassable.
    pub impassable_elevation: f64,
    /// Logistic regrowth rate of depleted vegetation, per simulated hour.
    pub vegetation_regrowth_rate: f64,
    /// Attempt budget for every rejection-sampled placement.
    pub placement_attempts: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 60,
            biome_weights: BiomeTable {
                plains: 0.30,
                forest: 0.25,
                desert: 0.10,
                tundra: 0.05,
                mountain: 0.10,
                water: 0.10,
                swamp: 0.10,
            },
            elevation_octaves: 4,
            elevation_scale: 0.05,
            moisture_octaves: 3,
            moisture_scale: 0.08,
            num_lakes: 3,
            num_rivers: 2,
            lake_max_cells: 40,
            lake_depth_m: 60.0,
            impassable_elevation: 0.92,
            vegetation_regrowth_rate: 0.01,
            placement_attempts: 1000,
        }
    }
}

impl MapConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let edge = MIN_MAP_EDGE..=MAX_MAP_EDGE;
        if !edge.contains(&self.width) || !edge.contains(&self.height) {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let mut total = 0.0;
        for (_, weight) in self.biome_weights.iter() {
            check_min("map.biome_weights", weight, 0.0)?;
            total += weight;
        }
        check_min("map.biome_weights (sum)", total, f64::EPSILON)?;
        check_range(
            "map.elevation_octaves",
            f64::from(self.elevation_octaves),
            1.0,
            f64::from(MAX_OCTAVES),
        )?;
        check_range(
            "map.moisture_octaves",
            f64::from(self.moisture_octaves),
            1.0,
            f64::from(MAX_OCTAVES),
        )?;
        check_range("map.elevation_scale", self.elevation_scale, 0.001, 1.0)?;
        check_range("map.moisture_scale", self.moisture_scale, 0.001, 1.0)?;
        check_range("map.num_lakes", f64::from(self.num_lakes), 0.0, 64.0)?;
        check_range("map.num_rivers", f64::from(self.num_rivers), 0.0, 64.0)?;
        check_min("map.lake_max_cells", f64::from(self.lake_max_cells), 1.0)?;
        check_min("map.lake_depth_m", self.lake_depth_m, 0.0)?;
        check_range("map.impassable_elevation", self.impassable_elevation, 0.0, 1.0)?;
        check_range(
            "map.vegetation_regrowth_rate",
            self.vegetation_regrowth_rate,
            0.0,
            1.0,
        )?;
        check_min(
            "map.placement_attempts",
            f64::from(self.placement_attempts),
            1.0,
        )?;
        Ok(())
    }
}

/// Clock and episode length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EpisodeConfig {
    pub hours_per_step: u32,
    pub max_steps: u32,
    pub start_day: u32,
    pub start_hour: u32,
    /// Hunter visibility radius when fog of war is disabled.
    pub observation_radius: u32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            hours_per_step: 1,
            max_steps: 500,
            start_day: 80,
            start_hour: 6,
            observation_radius: 3,
        }
    }
}

impl EpisodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("sim.hours_per_step", f64::from(self.hours_per_step), 1.0, 24.0)?;
        check_min("sim.max_steps", f64::from(self.max_steps), 1.0)?;
        check_range("sim.start_day", f64::from(self.start_day), 0.0, 364.0)?;
        check_range("sim.start_hour", f64::from(self.start_hour), 0.0, 23.0)?;
        check_range(
            "sim.observation_radius",
            f64::from(self.observation_radius),
            0.0,
            f64::from(MAX_MAP_EDGE),
        )?;
        Ok(())
    }
}

/// Per-biome temperature model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClimateConfig {
    /// Degrees lost per 1000 m of elevation.
    pub lapse_rate: f64,
    pub base_temperature: BiomeTable<f64>,
    pub seasonal_amplitude: BiomeTable<f64>,
    pub diurnal_amplitude: BiomeTable<f64>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            lapse_rate: 6.5,
            base_temperature: BiomeTable {
                plains: 15.0,
                forest: 12.0,
                desert: 28.0,
                tundra: -5.0,
                mountain: 5.0,
                water: 14.0,
                swamp: 18.0,
            },
            seasonal_amplitude: BiomeTable {
                plains: 12.0,
                forest: 10.0,
                desert: 10.0,
                tundra: 18.0,
                mountain: 12.0,
                water: 6.0,
                swamp: 8.0,
            },
            diurnal_amplitude: BiomeTable {
                plains: 6.0,
                forest: 4.0,
                desert: 14.0,
                tundra: 5.0,
                mountain: 8.0,
                water: 2.0,
                swamp: 4.0,
            },
        }
    }
}

impl ClimateConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("climate.lapse_rate", self.lapse_rate, 0.0, 20.0)?;
        for (_, base) in self.base_temperature.iter() {
            check_range("climate.base_temperature", base, -60.0, 60.0)?;
        }
        for (_, amp) in self.seasonal_amplitude.iter() {
            check_range("climate.seasonal_amplitude", amp, 0.0, 40.0)?;
        }
        for (_, amp) in self.diurnal_amplitude.iter() {
            check_range("climate.diurnal_amplitude", amp, 0.0, 40.0)?;
        }
        Ok(())
    }
}

/// Initial vitals, drain rates, action effects and death thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysiologyConfig {
    pub initial_hydration: f64,
    pub initial_energy: f64,
    pub initial_core_temp: f64,
    pub initial_fatigue: f64,
    pub initial_injury: f64,
    pub initial_infection: f64,
    pub hydration_base_drain: f64,
    pub energy_base_drain: f64,
    pub fatigue_base_gain: f64,
    pub rest_fatigue_recovery: f64,
    pub thermal_drift_k: f64,
    pub shelter_duration_steps: u32,
    pub drink_restore: f64,
    pub forage_min_biomass: f64,
    pub forage_gain_per_biomass: f64,
    pub forage_max_gain: f64,
    pub forage_depletion: f64,
    pub infection_injury_threshold: f64,
    pub infection_chance: f64,
    pub infection_growth: f64,
    pub death_hydration: f64,
    pub death_energy: f64,
    pub death_core_temp_low: f64,
    pub death_core_temp_high: f64,
    pub death_injury: f64,
    pub death_infection: f64,
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        Self {
            initial_hydration: 80.0,
            initial_energy: 80.0,
            initial_core_temp: 37.0,
            initial_fatigue: 10.0,
            initial_injury: 0.0,
            initial_infection: 0.0,
            hydration_base_drain: 0.8,
            energy_base_drain: 0.6,
            fatigue_base_gain: 0.7,
            rest_fatigue_recovery: 4.0,
            thermal_drift_k: 0.008,
            shelter_duration_steps: 12,
            drink_restore: 25.0,
            forage_min_biomass: 0.1,
            forage_gain_per_biomass: 20.0,
            forage_max_gain: 15.0,
            forage_depletion: 0.1,
            infection_injury_threshold: 20.0,
            infection_chance: 0.5,
            infection_growth: 0.3,
            death_hydration: 0.0,
            death_energy: 0.0,
            death_core_temp_low: 30.0,
            death_core_temp_high: 42.0,
            death_injury: 100.0,
            death_infection: 100.0,
        }
    }
}

impl PhysiologyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("physiology.initial_hydration", self.initial_hydration, 0.0, 100.0)?;
        check_range("physiology.initial_energy", self.initial_energy, 0.0, 100.0)?;
        check_range("physiology.initial_core_temp", self.initial_core_temp, 20.0, 45.0)?;
        check_range("physiology.initial_fatigue", self.initial_fatigue, 0.0, 100.0)?;
        check_range("physiology.initial_injury", self.initial_injury, 0.0, 100.0)?;
        check_range("physiology.initial_infection", self.initial_infection, 0.0, 100.0)?;
        check_min("physiology.hydration_base_drain", self.hydration_base_drain, 0.0)?;
        check_min("physiology.energy_base_drain", self.energy_base_drain, 0.0)?;
        check_min("physiology.fatigue_base_gain", self.fatigue_base_gain, 0.0)?;
        check_min("physiology.rest_fatigue_recovery", self.rest_fatigue_recovery, 0.0)?;
        check_range("physiology.thermal_drift_k", self.thermal_drift_k, 0.0, 1.0)?;
        check_min("physiology.drink_restore", self.drink_restore, 0.0)?;
        check_range("physiology.forage_min_biomass", self.forage_min_biomass, 0.0, 1.0)?;
        check_min(
            "physiology.forage_gain_per_biomass",
            self.forage_gain_per_biomass,
            0.0,
        )?;
        check_min("physiology.forage_max_gain", self.forage_max_gain, 0.0)?;
        check_range("physiology.forage_depletion", self.forage_depletion, 0.0, 1.0)?;
        check_min(
            "physiology.infection_injury_threshold",
            self.infection_injury_threshold,
            0.0,
        )?;
        check_range("physiology.infection_chance", self.infection_chance, 0.0, 1.0)?;
        check_min("physiology.infection_growth", self.infection_growth, 0.0)?;
        check_bounds(
            "physiology.death_core_temp",
            self.death_core_temp_low,
            self.death_core_temp_high,
        )?;
        Ok(())
    }
}

/// Wildlife encounters and the optional environmental hazards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HazardConfig {
    pub injury_min: f64,
    pub injury_max: f64,
    pub energy_loss_min: f64,
    pub energy_loss_max: f64,
    pub infection_min: f64,
    pub infection_max: f64,
    /// Encounter probability multiplier applied while hiding.
    pub hide_factor: f64,
    /// Encounter probability multiplier applied while resting.
    pub rest_factor: f64,
    /// Encounter probability multiplier for FORAGE and BUILD_SHELTER.
    pub noisy_factor: f64,
    pub dawn_dusk_multiplier: f64,
    pub night_multiplier: f64,
    /// Scales the per-cell wildlife risk field into a per-step probability.
    pub risk_scale: f64,
    pub wildlife_base: BiomeTable<f64>,
    pub environmental: bool,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            injury_min: 3.0,
            injury_max: 15.0,
            energy_loss_min: 2.0,
            energy_loss_max: 6.0,
            infection_min: 0.0,
            infection_max: 3.0,
            hide_factor: 0.4,
            rest_factor: 0.7,
            noisy_factor: 1.1,
            dawn_dusk_multiplier: 1.5,
            night_multiplier: 1.8,
            risk_scale: 0.3,
            wildlife_base: BiomeTable {
                plains: 0.08,
                forest: 0.2,
                desert: 0.06,
                tundra: 0.05,
                mountain: 0.1,
                water: 0.0,
                swamp: 0.15,
            },
            environmental: false,
        }
    }
}

impl HazardConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_min("hazards.injury_min", self.injury_min, 0.0)?;
        check_bounds("hazards.injury", self.injury_min, self.injury_max)?;
        check_min("hazards.energy_loss_min", self.energy_loss_min, 0.0)?;
        check_bounds("hazards.energy_loss", self.energy_loss_min, self.energy_loss_max)?;
        check_min("hazards.infection_min", self.infection_min, 0.0)?;
        check_bounds("hazards.infection", self.infection_min, self.infection_max)?;
        check_range("hazards.hide_factor", self.hide_factor, 0.0, 1.0)?;
        check_range("hazards.rest_factor", self.rest_factor, 0.0, 1.0)?;
        check_range("hazards.noisy_factor", self.noisy_factor, 1.0, 2.0)?;
        check_range("hazards.dawn_dusk_multiplier", self.dawn_dusk_multiplier, 0.0, 3.0)?;
        check_range("hazards.night_multiplier", self.night_multiplier, 0.0, 3.0)?;
        check_range("hazards.risk_scale", self.risk_scale, 0.0, 1.0)?;
        for (_, base) in self.wildlife_base.iter() {
            check_range("hazards.wildlife_base", base, 0.0, 1.0)?;
        }
        Ok(())
    }
}

/// Adversarial hunter NPCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HunterConfig {
    pub enabled: bool,
    pub count: u32,
    pub min_detection_radius: u32,
    pub max_detection_radius: u32,
    pub chase_speed: u32,
    pub patrol_speed: u32,
    /// Minimum Chebyshev distance from the organism spawn.
    pub spawn_margin: u32,
    /// Extra distance beyond the detection radius before a chase is abandoned.
    pub hysteresis: u32,
    pub min_turn_interval: u32,
    pub turn_chance: f64,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: 5,
            min_detection_radius: 3,
            max_detection_radius: 8,
            chase_speed: 2,
            patrol_speed: 1,
            spawn_margin: 15,
            hysteresis: 2,
            min_turn_interval: 5,
            turn_chance: 0.2,
        }
    }
}

impl HunterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("hunters.count", f64::from(self.count), 0.0, 64.0)?;
        check_min(
            "hunters.min_detection_radius",
            f64::from(self.min_detection_radius),
            1.0,
        )?;
        check_bounds(
            "hunters.detection_radius",
            f64::from(self.min_detection_radius),
            f64::from(self.max_detection_radius),
        )?;
        check_range("hunters.chase_speed", f64::from(self.chase_speed), 1.0, 8.0)?;
        check_range("hunters.patrol_speed", f64::from(self.patrol_speed), 1.0, 8.0)?;
        check_range("hunters.turn_chance", self.turn_chance, 0.0, 1.0)?;
        Ok(())
    }
}

/// Objective placement and graduated hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrophyConfig {
    pub enabled: bool,
    /// Minimum Manhattan distance from the organism spawn.
    pub min_distance_from_spawn: u32,
    pub hint_interval: u32,
    pub warm_cold_enabled: bool,
    /// Compass resolution: 4 or 8 principal headings.
    pub compass_points: u8,
    /// Chebyshev radius around the trophy that counts as found.
    pub found_radius: u32,
    pub win_on_found: bool,
}

impl Default for TrophyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_distance_from_spawn: 25,
            hint_interval: 10,
            warm_cold_enabled: true,
            compass_points: 4,
            found_radius: 1,
            win_on_found: true,
        }
    }
}

impl TrophyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_min("trophy.hint_interval", f64::from(self.hint_interval), 1.0)?;
        if self.compass_points != 4 && self.compass_points != 8 {
            return Err(ConfigError::RangeViolation {
                field: "trophy.compass_points",
                min: 4.0,
                max: 8.0,
                value: f64::from(self.compass_points),
            });
        }
        check_range("trophy.found_radius", f64::from(self.found_radius), 0.0, 3.0)?;
        Ok(())
    }
}

/// Partial observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FogConfig {
    pub enabled: bool,
    /// Chebyshev radius of the visible window.
    pub visibility_radius: u32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            visibility_radius: 5,
        }
    }
}

impl FogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "fog_of_war.visibility_radius",
            f64::from(self.visibility_radius),
            1.0,
            f64::from(MAX_MAP_EDGE),
        )
    }
}

/// Global difficulty multipliers; all neutral at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DifficultyConfig {
    pub drain_multiplier: f64,
    pub hazard_multiplier: f64,
    pub wildlife_multiplier: f64,
    pub temperature_extremity: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            drain_multiplier: 1.0,
            hazard_multiplier: 1.0,
            wildlife_multiplier: 1.0,
            temperature_extremity: 1.0,
        }
    }
}

impl DifficultyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("difficulty.drain_multiplier", self.drain_multiplier, 0.0, 10.0)?;
        check_range("difficulty.hazard_multiplier", self.hazard_multiplier, 0.1, 10.0)?;
        check_range(
            "difficulty.wildlife_multiplier",
            self.wildlife_multiplier,
            0.0,
            10.0,
        )?;
        check_range(
            "difficulty.temperature_extremity",
            self.temperature_extremity,
            0.0,
            5.0,
        )?;
        Ok(())
    }
}
