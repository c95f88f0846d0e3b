//! Simulation clock and the ambient temperature model.
//!
//! Temperature is a pure function of the cell and the clock:
//! `base(biome) + seasonal + diurnal - lapse_rate * elevation_km`, with both
//! periodic terms scaled by the difficulty's temperature extremity.
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

use crate::config::ClimateConfig;
use crate::world::Cell;

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_YEAR: u32 = 365;

/// Day-of-year and hour-of-day, advanced by the episode each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    day_of_year: u32,
    hour: u32,
    total_hours: u64,
}

impl SimClock {
    #[must_use]
    pub const fn new(start_day: u32, start_hour: u32) -> Self {
        Self {
            day_of_year: start_day % DAYS_PER_YEAR,
            hour: start_hour % HOURS_PER_DAY,
            total_hours: 0,
        }
    }

    pub const fn advance(&mut self, hours: u32) {
        let hour = self.hour + hours;
        self.hour = hour % HOURS_PER_DAY;
        self.day_of_year = (self.day_of_year + hour / HOURS_PER_DAY) % DAYS_PER_YEAR;
        self.total_hours += hours as u64;
    }

    #[must_use]
    pub const fn day_of_year(&self) -> u32 {
        self.day_of_year
    }

    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.hour
    }

    /// Hours elapsed since the episode started.
    #[must_use]
    pub const fn total_hours(&self) -> u64 {
        self.total_hours
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClimateModel {
    cfg: ClimateConfig,
    extremity: f64,
}

impl ClimateModel {
    #[must_use]
    pub const fn new(cfg: ClimateConfig, extremity: f64) -> Self {
        Self { cfg, extremity }
    }

    /// Ambient temperature in °C for `cell` at `clock`.
    #[must_use]
    pub fn temperature(&self, cell: &Cell, clock: &SimClock) -> f64 {
        let base = self.cfg.base_temperature.get(cell.biome);
        let season_phase = TAU * f64::from(clock.day_of_year()) / f64::from(DAYS_PER_YEAR);
        let day_phase = TAU * f64::from(clock.hour()) / f64::from(HOURS_PER_DAY) - FRAC_PI_2;
        let seasonal =
            self.cfg.seasonal_amplitude.get(cell.biome) * self.extremity * season_phase.sin();
        let diurnal = self.cfg.diurnal_amplitude.get(cell.biome) * self.extremity * day_phase.sin();
        base + seasonal + diurnal - self.cfg.lapse_rate * cell.elevation / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Biome;

    fn cell(biome: Biome, elevation: f64) -> Cell {
        Cell {
            biome,
            elevation,
            moisture: 0.5,
            water: false,
            vegetation: 0.3,
            vegetation_capacity: 0.3,
            impassable: false,
        }
    }

    #[test]
    fn clock_wraps_hours_and_days() {
        let mut clock = SimClock::new(364, 22);
        clock.advance(3);
        assert_eq!(clock.hour(), 1);
        assert_eq!(clock.day_of_year(), 0);
        assert_eq!(clock.total_hours(), 3);
        clock.advance(48);
        assert_eq!(clock.hour(), 1);
        assert_eq!(clock.day_of_year(), 2);
    }

    #[test]
    fn lapse_rate_cools_high_cells() {
        let model = ClimateModel::new(ClimateConfig::default(), 1.0);
        let clock = SimClock::new(80, 6);
        let low = model.temperature(&cell(Biome::Plains, 0.0), &clock);
        let high = model.temperature(&cell(Biome::Plains, 2000.0), &clock);
        assert!((low - high - 13.0).abs() < 1e-9);
    }

    #[test]
    fn afternoon_is_warmer_than_dawn() {
        let model = ClimateModel::new(ClimateConfig::default(), 1.0);
        let dawn = model.temperature(&cell(Biome::Desert, 0.0), &SimClock::new(100, 0));
        let afternoon = model.temperature(&cell(Biome::Desert, 0.0), &SimClock::new(100, 12));
        assert!(afternoon > dawn);
    }

    #[test]
    fn zero_extremity_flattens_cycles() {
        let model = ClimateModel::new(ClimateConfig::default(), 0.0);
        let c = cell(Biome::Tundra, 0.0);
        let a = model.temperature(&c, &SimClock::new(10, 3));
        let b = model.temperature(&c, &SimClock::new(200, 15));
        assert!((a - b).abs() < 1e-12);
        assert!((a + 5.0).abs() < 1e-12);
    }
}
