use crate::config::LandscapeConfig;
use crate::error::SimError;
use crate::grid::Grid;
use anyhow::Result;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Uniform;
use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Vegetation class of a cell. `Matorral` is the baseline of the spread model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VegetationType {
    Subalpine,
    Wet,
    Dry,
    #[default]
    Matorral,
}

impl VegetationType {
    pub const ALL: [VegetationType; 4] = [
        VegetationType::Subalpine,
        VegetationType::Wet,
        VegetationType::Dry,
        VegetationType::Matorral,
    ];

    /// Position in lookup tables indexed by class.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Immutable attributes of one landscape cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Cell {
    pub elevation: f32,
    /// Direction the wind blows towards, in radians.
    pub wind_direction: f32,
    pub vegetation_type: VegetationType,
    pub fire_weather_index: f32,
    pub aspect: f32,
    pub burnable: bool,
}

/// Read-only raster of cells shared by every replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landscape {
    cells: Grid<Cell>,
}

impl Landscape {
    /// Builds a landscape from a row-major cell buffer (`index = x + y * width`).
    pub fn new(width: usize, height: usize, cells: Vec<Cell>) -> Result<Self, SimError> {
        let actual = cells.len();
        let cells = Grid::from_vec(width, height, cells).ok_or(SimError::LandscapeShape {
            expected: width * height,
            actual,
        })?;
        Ok(Self { cells })
    }

    /// A landscape where every cell is a copy of `cell`.
    pub fn uniform(width: usize, height: usize, cell: Cell) -> Self {
        Self {
            cells: Grid::filled(width, height, cell),
        }
    }

    /// Generates a random landscape from configuration.
    ///
    /// Elevations are drawn from a normal distribution, vegetation classes from
    /// the configured weights and burnability from a Bernoulli trial, all from a
    /// single `StdRng` seeded with `config.seed`, so the same config always
    /// yields the same landscape.
    pub fn generate(config: &LandscapeConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let elevation_dist = Normal::new(config.elevation_mean, config.elevation_sd)
            .map_err(|e| anyhow::anyhow!("Invalid elevation distribution: {}", e))?;
        let jitter = config.wind_jitter.abs();
        let wind_dist = Uniform::new_inclusive(-jitter, jitter)?;
        let aspect_dist = Uniform::new_inclusive(-1.0f32, 1.0f32)?;
        let weights = config.vegetation_weights();
        let vegetation_dist = WeightedIndex::new(weights)
            .map_err(|e| anyhow::anyhow!("Invalid vegetation weights: {}", e))?;
        let p_burnable = f64::from(1.0 - config.non_burnable_fraction).clamp(0.0, 1.0);

        let num_cells = config.width * config.height;
        let mut cells = Vec::with_capacity(num_cells);
        for _ in 0..num_cells {
            cells.push(Cell {
                elevation: rng.sample(&elevation_dist),
                wind_direction: config.wind_direction + rng.sample(&wind_dist),
                vegetation_type: VegetationType::ALL[rng.sample(&vegetation_dist)],
                fire_weather_index: config.fire_weather_index,
                aspect: rng.sample(&aspect_dist),
                burnable: rng.random_bool(p_burnable),
            });
        }

        log::debug!(
            "Generated {}x{} landscape (seed {}), {} burnable cells.",
            config.width,
            config.height,
            config.seed,
            cells.iter().filter(|c| c.burnable).count()
        );

        Ok(Self::new(config.width, config.height, cells)?)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cells.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.cells.height()
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.cells.contains(x, y)
    }

    pub fn burnable_count(&self) -> usize {
        self.cells.as_slice().iter().filter(|c| c.burnable).count()
    }

    /// Population mean and standard deviation of the elevation layer.
    pub fn elevation_stats(&self) -> (f64, f64) {
        let n = self.cells.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let values = self.cells.as_slice().iter().map(|c| f64::from(c.elevation));
        let mean = values.clone().sum::<f64>() / n as f64;
        let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
        (mean, var.sqrt())
    }
}

impl std::ops::Index<(usize, usize)> for Landscape {
    type Output = Cell;

    #[inline(always)]
    fn index(&self, coords: (usize, usize)) -> &Cell {
        &self.cells[coords]
    }
}
