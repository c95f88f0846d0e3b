//! Procedural world generation.
//!
//! The grid is generated once per episode from the world stream. Terrain and
//! elevation are frozen afterwards; only vegetation biomass changes (foraging
//! depletes it, regrowth restores it toward the generated capacity).
//!
//! Generation order is fixed: elevation noise, moisture noise, terrain
//! classification, rivers, lakes, vegetation jitter. Every pass iterates in
//! row-major order so floating-point results are reproducible.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{ConfigError, MapConfig};
use crate::constants::{
    MAX_ELEVATION_M, REGROWTH_SEED_FRACTION, RIVER_SOURCE_ELEVATION, SPAWN_BORDER,
    VEGETATION_JITTER_HIGH, VEGETATION_JITTER_LOW,
};
use crate::rng::CountingRng;
use rand::RngCore;

/// Static cell classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Biome {
    Plains,
    Forest,
    Desert,
    Tundra,
    Mountain,
    Water,
    Swamp,
}

impl Biome {
    pub const ALL: [Self; 7] = [
        Self::Plains,
        Self::Forest,
        Self::Desert,
        Self::Tundra,
        Self::Mountain,
        Self::Water,
        Self::Swamp,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Plains => "PLAINS",
            Self::Forest => "FOREST",
            Self::Desert => "DESERT",
            Self::Tundra => "TUNDRA",
            Self::Mountain => "MOUNTAIN",
            Self::Water => "WATER",
            Self::Swamp => "SWAMP",
        }
    }

    /// Cost multiplier for entering a cell of this biome.
    #[must_use]
    pub const fn movement_cost(self) -> f64 {
        match self {
            Self::Plains => 1.0,
            Self::Forest => 1.3,
            Self::Desert => 1.4,
            Self::Tundra => 1.2,
            Self::Mountain => 2.0,
            Self::Water => 3.0,
            Self::Swamp => 1.8,
        }
    }

    /// Natural shelter in `[0, 1]`; damps thermal drift.
    #[must_use]
    pub const fn shelter_quality(self) -> f64 {
        match self {
            Self::Forest => 0.6,
            Self::Mountain => 0.4,
            Self::Swamp => 0.3,
            Self::Plains => 0.1,
            Self::Tundra | Self::Desert => 0.05,
            Self::Water => 0.0,
        }
    }

    /// Baseline vegetation biomass before moisture and elevation modifiers.
    #[must_use]
    pub const fn vegetation_base(self) -> f64 {
        match self {
            Self::Plains => 0.35,
            Self::Forest => 0.7,
            Self::Desert => 0.05,
            Self::Tundra => 0.15,
            Self::Mountain => 0.1,
            Self::Water => 0.0,
            Self::Swamp => 0.4,
        }
    }
}

/// One value per biome. Used for weights and per-biome climate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BiomeTable<T> {
    pub plains: T,
    pub forest: T,
    pub desert: T,
    pub tundra: T,
    pub mountain: T,
    pub water: T,
    pub swamp: T,
}

impl<T: Copy> BiomeTable<T> {
    #[must_use]
    pub const fn splat(value: T) -> Self {
        Self {
            plains: value,
            forest: value,
            desert: value,
            tundra: value,
            mountain: value,
            water: value,
            swamp: value,
        }
    }

    #[must_use]
    pub const fn get(&self, biome: Biome) -> T {
        match biome {
            Biome::Plains => self.plains,
            Biome::Forest => self.forest,
            Biome::Desert => self.desert,
            Biome::Tundra => self.tundra,
            Biome::Mountain => self.mountain,
            Biome::Water => self.water,
            Biome::Swamp => self.swamp,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Biome, T)> + '_ {
        Biome::ALL.into_iter().map(move |b| (b, self.get(b)))
    }
}

/// Grid coordinate. `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }
}

/// North, south, west, east.
pub const NEIGHBOURS4: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub biome: Biome,
    /// Metres above the lowest point of the map.
    pub elevation: f64,
    pub moisture: f64,
    pub water: bool,
    pub vegetation: f64,
    pub vegetation_capacity: f64,
    pub impassable: bool,
}

/// Fixed-size terrain grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    distance_to_water: Vec<u32>,
}

impl WorldGrid {
    /// Generate a world from the world stream.
    pub fn generate<R: RngCore>(cfg: &MapConfig, rng: &mut CountingRng<R>) -> Self {
        let w = cfg.width as usize;
        let h = cfg.height as usize;
        let elevation = fractal_noise(w, h, cfg.elevation_octaves, cfg.elevation_scale, rng);
        let moisture = fractal_noise(w, h, cfg.moisture_octaves, cfg.moisture_scale, rng);
        let mut biomes = classify_terrain(&elevation, &moisture, cfg);

        let lake_sources = carve_rivers(&mut biomes, &elevation, w, h, cfg, rng);
        fill_lakes(&mut biomes, &elevation, w, h, cfg, lake_sources, rng);

        let cells = biomes
            .iter()
            .zip(elevation.iter().zip(moisture.iter()))
            .map(|(&biome, (&elev, &moist))| {
                let water = biome == Biome::Water;
                let jitter = rng.uniform_range(VEGETATION_JITTER_LOW, VEGETATION_JITTER_HIGH);
                let vegetation = if water {
                    0.0
                } else {
                    (biome.vegetation_base() * (0.5 + moist) * (1.0 - 0.5 * elev) * jitter)
                        .clamp(0.0, 1.0)
                };
                Cell {
                    biome,
                    elevation: elev * MAX_ELEVATION_M,
                    moisture: moist,
                    water,
                    vegetation,
                    vegetation_capacity: vegetation,
                    impassable: water
                        || (biome == Biome::Mountain && elev >= cfg.impassable_elevation),
                }
            })
            .collect::<Vec<_>>();

        let distance_to_water = water_distances(&cells, w, h);
        Self {
            width: cfg.width,
            height: cfg.height,
            cells,
            distance_to_water,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    #[must_use]
    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// Row-major cell slice.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn is_passable(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(|c| !c.impassable)
    }

    /// True when the cell itself or a 4-neighbour holds water.
    #[must_use]
    pub fn is_water_adjacent(&self, pos: Position) -> bool {
        std::iter::once((0, 0))
            .chain(NEIGHBOURS4)
            .any(|(dx, dy)| self.cell(pos.offset(dx, dy)).is_some_and(|c| c.water))
    }

    /// 4-neighbour BFS distance to the nearest water cell, `u32::MAX` if none.
    #[must_use]
    pub fn distance_to_water(&self, pos: Position) -> u32 {
        self.index(pos)
            .map_or(u32::MAX, |i| self.distance_to_water[i])
    }

    /// Remove biomass from a cell, returning the amount actually taken.
    pub fn deplete_vegetation(&mut self, pos: Position, amount: f64) -> f64 {
        let Some(i) = self.index(pos) else {
            return 0.0;
        };
        let cell = &mut self.cells[i];
        let taken = amount.min(cell.vegetation).max(0.0);
        cell.vegetation -= taken;
        taken
    }

    /// Logistic regrowth of depleted cells toward their generated capacity.
    pub fn regrow(&mut self, hours: u32, rate: f64) {
        if rate <= 0.0 {
            return;
        }
        let dt = f64::from(hours);
        for cell in &mut self.cells {
            let capacity = cell.vegetation_capacity;
            if capacity <= 0.0 || cell.vegetation >= capacity {
                continue;
            }
            let current = cell.vegetation.max(capacity * REGROWTH_SEED_FRACTION);
            let growth = rate * current * (1.0 - current / capacity) * dt;
            cell.vegetation = (current + growth).min(capacity);
        }
    }

    /// Pick a spawn cell: passable, not water or mountain, away from the border.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PlacementExhausted`] when no candidate is found
    /// within `attempts` draws.
    pub fn find_spawn<R: RngCore>(
        &self,
        rng: &mut CountingRng<R>,
        attempts: u32,
    ) -> Result<Position, ConfigError> {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        let border = i64::from(SPAWN_BORDER);
        for _ in 0..attempts {
            let x = rng.int_inclusive(border, w - border - 1);
            let y = rng.int_inclusive(border, h - border - 1);
            let pos = Position::new(x as i32, y as i32);
            if let Some(cell) = self.cell(pos)
                && !cell.impassable
                && !matches!(cell.biome, Biome::Water | Biome::Mountain)
            {
                return Ok(pos);
            }
        }
        Err(ConfigError::PlacementExhausted {
            what: "spawn",
            attempts,
        })
    }
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Multi-octave value noise, bilinearly upsampled, normalised to `[0, 1]`.
/// Each octave's lattice is capped at the grid size.
fn fractal_noise<R: RngCore>(
    w: usize,
    h: usize,
    octaves: u32,
    scale: f64,
    rng: &mut CountingRng<R>,
) -> Vec<f64> {
    let mut field = vec![0.0; w * h];
    for octave in 0..octaves {
        let freq = f64::from(1_u32 << octave);
        let amplitude = 1.0 / freq;
        // Finer than one lattice point per cell adds draws but no detail.
        let lw = ((w as f64 * scale * freq) as usize).clamp(2, w.max(2));
        let lh = ((h as f64 * scale * freq) as usize).clamp(2, h.max(2));
        let lattice: Vec<f64> = (0..lw * lh)
            .map(|_| rng.uniform_range(-1.0, 1.0))
            .collect();

        for y in 0..h {
            let fy = y as f64 * (lh - 1) as f64 / (h.max(2) - 1) as f64;
            let y0 = (fy.floor() as usize).min(lh - 1);
            let y1 = (y0 + 1).min(lh - 1);
            let ty = smoothstep(fy - y0 as f64);
            for x in 0..w {
                let fx = x as f64 * (lw - 1) as f64 / (w.max(2) - 1) as f64;
                let x0 = (fx.floor() as usize).min(lw - 1);
                let x1 = (x0 + 1).min(lw - 1);
                let tx = smoothstep(fx - x0 as f64);
                let top = lattice[y0 * lw + x0] * (1.0 - tx) + lattice[y0 * lw + x1] * tx;
                let bottom = lattice[y1 * lw + x0] * (1.0 - tx) + lattice[y1 * lw + x1] * tx;
                field[y * w + x] += amplitude * (top * (1.0 - ty) + bottom * ty);
            }
        }
    }

    let (lo, hi) = field
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    if span > 1e-12 {
        for v in &mut field {
            *v = (*v - lo) / span;
        }
    } else {
        field.fill(0.5);
    }
    field
}

/// Cell indices sorted ascending by `values`, ties broken by index.
fn sorted_indices(values: &[f64], subset: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut order: Vec<usize> = subset.collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
    order
}

fn band(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).min(total)
}

/// Quantile classification. Elevation decides water (lowest band), mountain
/// (highest band) and tundra (just below mountain); moisture splits the
/// remaining middle band into desert, plains, forest and swamp.
fn classify_terrain(elevation: &[f64], moisture: &[f64], cfg: &MapConfig) -> Vec<Biome> {
    let n = elevation.len();
    let weights = &cfg.biome_weights;
    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    let share = |b: Biome| weights.get(b).max(0.0) / total;

    let by_elevation = sorted_indices(elevation, 0..n);
    let water_n = band(n, share(Biome::Water));
    let mountain_n = band(n, share(Biome::Mountain)).min(n - water_n);
    let tundra_n = band(n, share(Biome::Tundra)).min(n - water_n - mountain_n);

    let mut biomes = vec![Biome::Plains; n];
    for &i in &by_elevation[..water_n] {
        biomes[i] = Biome::Water;
    }
    for &i in &by_elevation[n - mountain_n..] {
        biomes[i] = Biome::Mountain;
    }
    for &i in &by_elevation[n - mountain_n - tundra_n..n - mountain_n] {
        biomes[i] = Biome::Tundra;
    }

    let middle = &by_elevation[water_n..n - mountain_n - tundra_n];
    let by_moisture = sorted_indices(moisture, middle.iter().copied());
    let wet_order = [Biome::Desert, Biome::Plains, Biome::Forest, Biome::Swamp];
    let wet_total: f64 = wet_order.iter().map(|&b| share(b)).sum();
    if wet_total <= 0.0 {
        return biomes;
    }
    let m = by_moisture.len();
    let mut cumulative = 0.0;
    let mut start = 0;
    for (k, &biome) in wet_order.iter().enumerate() {
        cumulative += share(biome) / wet_total;
        let end = if k + 1 == wet_order.len() {
            m
        } else {
            band(m, cumulative).max(start)
        };
        for &i in &by_moisture[start..end] {
            biomes[i] = biome;
        }
        start = end;
    }
    biomes
}

/// Steepest-descent rivers. Returns the local minima where rivers stalled,
/// which become lake seeds.
fn carve_rivers<R: RngCore>(
    biomes: &mut [Biome],
    elevation: &[f64],
    w: usize,
    h: usize,
    cfg: &MapConfig,
    rng: &mut CountingRng<R>,
) -> Vec<usize> {
    let mut stalled = Vec::new();
    for _ in 0..cfg.num_rivers {
        let source = (0..cfg.placement_attempts).find_map(|_| {
            let i = rng.index(w * h);
            (elevation[i] >= RIVER_SOURCE_ELEVATION && biomes[i] != Biome::Water).then_some(i)
        });
        let Some(mut current) = source else {
            continue;
        };

        let mut path = vec![current];
        loop {
            let (x, y) = (current % w, current / w);
            if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                break;
            }
            let neighbours = NEIGHBOURS4.map(|(dx, dy)| {
                ((y as i64 + i64::from(dy)) as usize) * w + (x as i64 + i64::from(dx)) as usize
            });
            if neighbours.iter().any(|&nb| biomes[nb] == Biome::Water) {
                break;
            }
            let lowest = neighbours
                .iter()
                .copied()
                .min_by(|&a, &b| elevation[a].total_cmp(&elevation[b]).then(a.cmp(&b)));
            match lowest {
                Some(next) if elevation[next] < elevation[current] => {
                    path.push(next);
                    current = next;
                }
                _ => {
                    stalled.push(current);
                    break;
                }
            }
        }
        for i in path {
            biomes[i] = Biome::Water;
        }
    }
    stalled
}

/// Flood-fill basins from river terminals and from randomly chosen interior
/// local minima.
fn fill_lakes<R: RngCore>(
    biomes: &mut [Biome],
    elevation: &[f64],
    w: usize,
    h: usize,
    cfg: &MapConfig,
    mut seeds: Vec<usize>,
    rng: &mut CountingRng<R>,
) {
    let mut minima: Vec<usize> = (1..h - 1)
        .flat_map(|y| (1..w - 1).map(move |x| y * w + x))
        .filter(|&i| biomes[i] != Biome::Water)
        .filter(|&i| {
            let (x, y) = (i % w, i / w);
            (y - 1..=y + 1)
                .flat_map(|ny| (x - 1..=x + 1).map(move |nx| ny * w + nx))
                .all(|j| elevation[j] >= elevation[i])
        })
        .collect();
    rng.shuffle(&mut minima);
    seeds.extend(minima.into_iter().take(cfg.num_lakes as usize));

    let depth = cfg.lake_depth_m / MAX_ELEVATION_M;
    let cap = cfg.lake_max_cells as usize;
    for seed in seeds {
        let ceiling = elevation[seed] + depth;
        let mut queue = VecDeque::from([seed]);
        let mut filled = 0;
        let mut visited = vec![false; w * h];
        visited[seed] = true;
        while let Some(i) = queue.pop_front() {
            if filled >= cap {
                break;
            }
            biomes[i] = Biome::Water;
            filled += 1;
            let (x, y) = (i as i64 % w as i64, i as i64 / w as i64);
            for (dx, dy) in NEIGHBOURS4 {
                let (nx, ny) = (x + i64::from(dx), y + i64::from(dy));
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if !visited[j] && elevation[j] <= ceiling {
                    visited[j] = true;
                    queue.push_back(j);
                }
            }
        }
    }
}

fn water_distances(cells: &[Cell], w: usize, h: usize) -> Vec<u32> {
    let mut dist = vec![u32::MAX; w * h];
    let mut queue = VecDeque::new();
    for (i, cell) in cells.iter().enumerate() {
        if cell.water {
            dist[i] = 0;
            queue.push_back(i);
        }
    }
    while let Some(i) = queue.pop_front() {
        let (x, y) = (i % w, i / w);
        let next = dist[i] + 1;
        let mut visit = |j: usize| {
            if dist[j] == u32::MAX {
                dist[j] = next;
                queue.push_back(j);
            }
        };
        if y > 0 {
            visit(i - w);
        }
        if y + 1 < h {
            visit(i + w);
        }
        if x > 0 {
            visit(i - 1);
        }
        if x + 1 < w {
            visit(i + 1);
        }
    }
    dist
}
