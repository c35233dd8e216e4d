use crate::burn_state::BurnState;
use crate::spread::{SpreadModel, MOORE_NEIGHBORS};
use log::{debug, trace};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use wildfire_common::{Grid, Landscape, SimError, SimulationParams, SpreadSettings, VegetationType};

/// Lifecycle of a single replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirePhase {
    /// Ignitions are loaded and form generation 0.
    Seeded,
    /// At least one generation step ran and ignited new cells.
    Propagating,
    /// The last step ignited nothing; the fire is out.
    Terminated,
}

/// Outcome of one replicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireResult {
    pub width: usize,
    pub height: usize,
    /// In-bounds neighbour evaluations performed, burned or not.
    pub processed_cells: u64,
    pub time_taken: Duration,
    pub burn_state: BurnState,
}

// Timing and the processed counter are measurements, not part of the fire.
impl PartialEq for FireResult {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.burn_state == other.burn_state
    }
}

impl FireResult {
    /// A fire that never burned anything.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            processed_cells: 0,
            time_taken: Duration::ZERO,
            burn_state: BurnState::new(width, height),
        }
    }

    pub fn burned_layer(&self) -> &Grid<bool> {
        self.burn_state.burned()
    }

    /// Burned coordinates in ignition order.
    pub fn burned_ids(&self) -> &[(usize, usize)] {
        self.burn_state.burned_ids()
    }

    pub fn generation_ends(&self) -> &[usize] {
        self.burn_state.generation_ends()
    }

    pub fn generations(&self) -> impl Iterator<Item = &[(usize, usize)]> + '_ {
        self.burn_state.generations()
    }

    pub fn burned_count(&self) -> usize {
        self.burn_state.burned_count()
    }

    /// Processed cells per second. Zero when no measurable time elapsed.
    pub fn throughput(&self) -> f64 {
        let secs = self.time_taken.as_secs_f64();
        if secs > 0.0 {
            self.processed_cells as f64 / secs
        } else {
            0.0
        }
    }

    /// Burned cells per vegetation class.
    pub fn fire_stats(&self, landscape: &Landscape) -> FireStats {
        let mut counts = [0usize; 4];
        for &(x, y) in self.burned_ids() {
            counts[landscape[(x, y)].vegetation_type.index()] += 1;
        }
        FireStats { counts }
    }
}

/// Burned-cell counts broken down by vegetation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FireStats {
    counts: [usize; 4],
}

impl FireStats {
    pub fn count(&self, vegetation: VegetationType) -> usize {
        self.counts[vegetation.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Checks everything a replicate needs before it can be seeded: finite
/// coefficients, usable spread settings and a non-empty set of distinct,
/// in-bounds ignition cells.
pub fn validate_inputs(
    landscape: &Landscape,
    ignitions: &[(usize, usize)],
    params: &SimulationParams,
    settings: &SpreadSettings,
) -> Result<(), SimError> {
    params.validate()?;
    settings.validate()?;
    if ignitions.is_empty() {
        return Err(SimError::EmptyIgnitionSet);
    }
    let (width, height) = (landscape.width(), landscape.height());
    let mut seen = HashSet::with_capacity(ignitions.len());
    for &(x, y) in ignitions {
        if !landscape.contains(x, y) {
            return Err(SimError::IgnitionOutOfBounds { x, y, width, height });
        }
        if !seen.insert((x, y)) {
            return Err(SimError::DuplicateIgnition { x, y });
        }
    }
    Ok(())
}

/// Single-replicate fire-spread state machine.
///
/// Each call to [`step`](Self::step) burns one generation: every cell of the
/// previous generation tries to ignite its unburned, burnable Moore neighbours
/// with one Bernoulli draw each. Draws are taken from the simulation's own
/// seeded generator in frontier order and [`MOORE_NEIGHBORS`] order, so a seed
/// fully determines the fire.
pub struct FireSimulation<'a> {
    landscape: &'a Landscape,
    model: SpreadModel,
    rng: StdRng,
    state: BurnState,
    phase: FirePhase,
    processed_cells: u64,
    elapsed: Duration,
}

impl<'a> FireSimulation<'a> {
    /// Validates the inputs and seeds generation 0 with `ignitions`.
    pub fn new(
        landscape: &'a Landscape,
        ignitions: &[(usize, usize)],
        params: SimulationParams,
        settings: SpreadSettings,
        seed: u64,
    ) -> Result<Self, SimError> {
        let start = Instant::now();
        validate_inputs(landscape, ignitions, &params, &settings)?;

        let mut state = BurnState::new(landscape.width(), landscape.height());
        for &(x, y) in ignitions {
            state.ignite(x, y);
        }
        state.close_generation();

        Ok(Self {
            landscape,
            model: SpreadModel::new(params, settings),
            rng: StdRng::seed_from_u64(seed),
            state,
            phase: FirePhase::Seeded,
            processed_cells: 0,
            elapsed: start.elapsed(),
        })
    }

    pub fn phase(&self) -> FirePhase {
        self.phase
    }

    pub fn state(&self) -> &BurnState {
        &self.state
    }

    /// Number of closed generations, counting the ignitions as generation 0.
    pub fn generation(&self) -> usize {
        self.state.generation_ends().len()
    }

    /// Burns one generation. Returns `true` while the fire is still spreading.
    pub fn step(&mut self) -> bool {
        if self.phase == FirePhase::Terminated {
            return false;
        }
        let step_start = Instant::now();
        let (width, height) = (self.landscape.width(), self.landscape.height());

        for b in self.state.last_generation_range() {
            let (x, y) = self.state.burned_ids()[b];
            let burning = &self.landscape[(x, y)];

            for neighbor in &MOORE_NEIGHBORS {
                // 0 - 1 wraps to usize::MAX and fails the bounds check
                let nx = x.wrapping_add_signed(neighbor.dx);
                let ny = y.wrapping_add_signed(neighbor.dy);
                if nx >= width || ny >= height {
                    continue;
                }
                self.processed_cells += 1;

                let candidate = &self.landscape[(nx, ny)];
                if !candidate.burnable || self.state.is_burned(nx, ny) {
                    continue;
                }

                let prob = self.model.probability(burning, candidate, neighbor.angle);
                let draw: f64 = self.rng.random();
                if draw < prob {
                    self.state.ignite(nx, ny);
                }
            }
        }

        let ignited = self.state.pending().len();
        if ignited == 0 {
            self.phase = FirePhase::Terminated;
        } else {
            self.state.close_generation();
            self.phase = FirePhase::Propagating;
        }
        self.elapsed += step_start.elapsed();

        trace!(
            "Generation {} ignited {} cells ({} burned, {} processed).",
            self.generation(),
            ignited,
            self.state.burned_count(),
            self.processed_cells
        );
        self.phase != FirePhase::Terminated
    }

    /// Steps until the fire terminates and returns the result.
    pub fn run(mut self) -> FireResult {
        while self.step() {}
        debug!(
            "Fire terminated after {} generations: {} cells burned, {} processed in {:.3} ms.",
            self.generation(),
            self.state.burned_count(),
            self.processed_cells,
            self.elapsed.as_secs_f64() * 1000.0
        );
        self.into_result()
    }

    /// Snapshot of the fire so far, whatever its phase.
    pub fn into_result(self) -> FireResult {
        FireResult {
            width: self.landscape.width(),
            height: self.landscape.height(),
            processed_cells: self.processed_cells,
            time_taken: self.elapsed,
            burn_state: self.state,
        }
    }
}

/// Runs one replicate from `ignitions` to termination with a generator seeded by `seed`.
pub fn simulate_one(
    landscape: &Landscape,
    ignitions: &[(usize, usize)],
    params: &SimulationParams,
    settings: &SpreadSettings,
    seed: u64,
) -> Result<FireResult, SimError> {
    Ok(FireSimulation::new(landscape, ignitions, *params, *settings, seed)?.run())
}
