//! Agent-visible projection of the true episode state.
//!
//! Everything a decision policy sees goes through [`build_observation`]. Fog
//! of war, hunter visibility and the hidden detection radius are all enforced
//! here: the builder reads true state and copies out only what the organism
//! could perceive.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::{Action, ActionMask};
use crate::climate::{ClimateModel, SimClock};
use crate::config::SimConfig;
use crate::episode::SimEvent;
use crate::hazards::wildlife_risk;
use crate::hunters::{Hunter, HunterState};
use crate::physiology::{CauseOfDeath, OrganismState, Vitals};
use crate::trophy::{Compass, TrophyHint};
use crate::world::{Biome, Position, WorldGrid};

/// Cells the organism has ever seen. Only grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploredSet {
    width: u32,
    height: u32,
    seen: Vec<bool>,
    count: usize,
}

impl ExploredSet {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            seen: vec![false; width as usize * height as usize],
            count: 0,
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// Mark every in-bounds cell within Chebyshev `radius` of `center`.
    pub fn reveal(&mut self, center: Position, radius: u32) {
        let r = radius as i32;
        for y in center.y - r..=center.y + r {
            for x in center.x - r..=center.x + r {
                if let Some(i) = self.index(Position::new(x, y))
                    && !self.seen[i]
                {
                    self.seen[i] = true;
                    self.count += 1;
                }
            }
        }
    }

    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.seen[i])
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Visible,
    Explored,
    Unexplored,
}

/// One cell of the grid view. Explored cells keep only static terrain;
/// unexplored cells carry nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biome: Option<Biome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impassable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vegetation: Option<f64>,
}

impl CellView {
    const UNEXPLORED: Self = Self {
        visibility: Visibility::Unexplored,
        biome: None,
        elevation: None,
        water: None,
        impassable: None,
        vegetation: None,
    };
}

/// Full-map grid view, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridView {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<CellView>,
}

impl GridView {
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<&CellView> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return None;
        }
        self.cells
            .get(pos.y as usize * self.width as usize + pos.x as usize)
    }
}

/// Summary of the cell the organism stands on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalView {
    pub biome: Biome,
    pub temperature: f64,
    pub elevation: f64,
    pub vegetation: f64,
    pub wildlife_risk: f64,
    pub shelter_quality: f64,
    pub movement_cost: f64,
    pub water_adjacent: bool,
    /// `None` when the map holds no water at all.
    pub distance_to_water: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterSighting {
    pub distance: u32,
    pub direction: Compass,
}

/// Aggregates over the currently visible window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbourhood {
    pub nearest_water: Option<WaterSighting>,
    pub mean_temperature: f64,
    pub max_wildlife_risk: f64,
}

/// A hunter currently in view: position and state only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunterSighting {
    pub id: u32,
    pub position: Position,
    pub state: HunterState,
    pub distance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSighting {
    pub position: Position,
    pub state: HunterState,
    pub step: u32,
}

/// Last place each hunter was seen, built only from past sightings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SightingLog(BTreeMap<u32, LastSighting>);

impl SightingLog {
    pub fn record(&mut self, sightings: &[HunterSighting], step: u32) {
        for s in sightings {
            self.0.insert(
                s.id,
                LastSighting {
                    position: s.position,
                    state: s.state,
                    step,
                },
            );
        }
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&LastSighting> {
        self.0.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &LastSighting)> {
        self.0.iter().map(|(&id, s)| (id, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub step: u32,
    pub clock: SimClock,
    pub position: Position,
    pub vitals: Vitals,
    pub alive: bool,
    pub cause_of_death: Option<CauseOfDeath>,
    pub shelter_steps_remaining: u32,
    pub local: LocalView,
    pub neighbourhood: Neighbourhood,
    pub grid: GridView,
    pub visible_hunters: Vec<HunterSighting>,
    pub last_sightings: SightingLog,
    pub trophy: Option<TrophyHint>,
    pub trophy_found: bool,
    pub action_mask: ActionMask,
    pub events: Vec<SimEvent>,
    pub explored_cells: usize,
}

/// Everything the builder reads.
#[derive(Debug, Clone, Copy)]
pub struct ObservationInput<'a> {
    pub step: u32,
    pub clock: &'a SimClock,
    pub world: &'a WorldGrid,
    pub climate: &'a ClimateModel,
    pub organism: &'a OrganismState,
    pub hunters: &'a [Hunter],
    pub sightings: &'a SightingLog,
    pub trophy_hint: Option<TrophyHint>,
    pub trophy_found: bool,
    pub events: &'a [SimEvent],
    pub config: &'a SimConfig,
}

/// Radius of the organism's view window.
#[must_use]
pub const fn view_radius(config: &SimConfig) -> u32 {
    if config.fog_of_war.enabled {
        config.fog_of_war.visibility_radius
    } else {
        config.sim.observation_radius
    }
}

/// Hunters within Chebyshev `radius` of `center`, in id order.
#[must_use]
pub fn visible_hunters(hunters: &[Hunter], center: Position, radius: u32) -> Vec<HunterSighting> {
    hunters
        .iter()
        .filter(|h| h.position().chebyshev(center) <= radius)
        .map(|h| HunterSighting {
            id: h.id(),
            position: h.position(),
            state: h.state(),
            distance: h.position().chebyshev(center),
        })
        .collect()
}

/// Valid actions for an organism at `pos`.
///
/// Moves into impassable cells are hard-masked: requesting one resolves to a
/// no-op and counts as an invalid action. DRINK and FORAGE are advisory here.
/// They drop out of the mask when their precondition fails, but a request
/// still consumes the turn as a performed action and only emits
/// [`SimEvent::PreconditionNotMet`].
#[must_use]
pub fn action_mask(
    world: &WorldGrid,
    organism: &OrganismState,
    forage_min_biomass: f64,
) -> ActionMask {
    if !organism.alive() {
        return ActionMask::default();
    }
    let pos = organism.position;
    let vegetation = world.cell(pos).map_or(0.0, |c| c.vegetation);
    ActionMask::from_fn(|action| match action {
        Action::Drink => world.is_water_adjacent(pos),
        Action::Forage => vegetation >= forage_min_biomass,
        a => a
            .delta()
            .is_none_or(|(dx, dy)| world.is_passable(pos.offset(dx, dy))),
    })
}

#[must_use]
pub fn build_observation(input: &ObservationInput<'_>) -> Observation {
    let cfg = input.config;
    let world = input.world;
    let pos = input.organism.position;
    let radius = view_radius(cfg);

    let grid = grid_view(input, radius);
    let local = local_view(input);
    let neighbourhood = neighbourhood(input, radius);

    Observation {
        step: input.step,
        clock: *input.clock,
        position: pos,
        vitals: input.organism.vitals,
        alive: input.organism.alive(),
        cause_of_death: input.organism.cause_of_death(),
        shelter_steps_remaining: input.organism.shelter_steps,
        local,
        neighbourhood,
        grid,
        visible_hunters: visible_hunters(input.hunters, pos, radius),
        last_sightings: input.sightings.clone(),
        trophy: input.trophy_hint,
        trophy_found: input.trophy_found,
        action_mask: action_mask(world, input.organism, cfg.physiology.forage_min_biomass),
        events: input.events.to_vec(),
        explored_cells: input.organism.explored.count(),
    }
}

fn grid_view(input: &ObservationInput<'_>, radius: u32) -> GridView {
    let world = input.world;
    let pos = input.organism.position;
    let fog = input.config.fog_of_war.enabled;
    let mut cells = Vec::with_capacity(world.cells().len());
    for y in 0..world.height() as i32 {
        for x in 0..world.width() as i32 {
            let p = Position::new(x, y);
            let Some(cell) = world.cell(p) else {
                cells.push(CellView::UNEXPLORED);
                continue;
            };
            let visibility = if !fog || p.chebyshev(pos) <= radius {
                Visibility::Visible
            } else if input.organism.explored.contains(p) {
                Visibility::Explored
            } else {
                Visibility::Unexplored
            };
            cells.push(match visibility {
                Visibility::Unexplored => CellView::UNEXPLORED,
                Visibility::Explored | Visibility::Visible => CellView {
                    visibility,
                    biome: Some(cell.biome),
                    elevation: Some(cell.elevation),
                    water: Some(cell.water),
                    impassable: Some(cell.impassable),
                    vegetation: (visibility == Visibility::Visible).then_some(cell.vegetation),
                },
            });
        }
    }
    GridView {
        width: world.width(),
        height: world.height(),
        cells,
    }
}

fn local_view(input: &ObservationInput<'_>) -> LocalView {
    let world = input.world;
    let pos = input.organism.position;
    let distance = world.distance_to_water(pos);
    match world.cell(pos) {
        Some(cell) => LocalView {
            biome: cell.biome,
            temperature: input.climate.temperature(cell, input.clock),
            elevation: cell.elevation,
            vegetation: cell.vegetation,
            wildlife_risk: wildlife_risk(cell, &input.config.hazards),
            shelter_quality: cell.biome.shelter_quality(),
            movement_cost: cell.biome.movement_cost(),
            water_adjacent: world.is_water_adjacent(pos),
            distance_to_water: (distance != u32::MAX).then_some(distance),
        },
        None => LocalView {
            biome: Biome::Plains,
            temperature: 0.0,
            elevation: 0.0,
            vegetation: 0.0,
            wildlife_risk: 0.0,
            shelter_quality: 0.0,
            movement_cost: 1.0,
            water_adjacent: false,
            distance_to_water: None,
        },
    }
}

fn neighbourhood(input: &ObservationInput<'_>, radius: u32) -> Neighbourhood {
    let world = input.world;
    let center = input.organism.position;
    let r = radius as i32;
    let mut nearest: Option<(u32, Position)> = None;
    let mut temp_sum = 0.0;
    let mut count = 0_u32;
    let mut max_risk = 0.0_f64;
    for y in center.y - r..=center.y + r {
        for x in center.x - r..=center.x + r {
            let p = Position::new(x, y);
            let Some(cell) = world.cell(p) else {
                continue;
            };
            temp_sum += input.climate.temperature(cell, input.clock);
            count += 1;
            max_risk = max_risk.max(wildlife_risk(cell, &input.config.hazards));
            if cell.water {
                let d = p.manhattan(center);
                if nearest.is_none_or(|(best, _)| d < best) {
                    nearest = Some((d, p));
                }
            }
        }
    }
    Neighbourhood {
        nearest_water: nearest.and_then(|(distance, p)| {
            Compass::between(center, p, 4).map(|direction| WaterSighting {
                distance,
                direction,
            })
        }),
        mean_temperature: if count > 0 {
            temp_sum / f64::from(count)
        } else {
            0.0
        },
        max_wildlife_risk: max_risk,
    }
}
