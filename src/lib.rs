//! Stochastic wildfire spread over a raster landscape.
//!
//! [`simulate_one`] runs a single fire replicate as a generational cellular
//! automaton; [`simulate_many`] runs many seeded replicates on a thread pool
//! and reduces them into per-cell burn counts.

pub mod burn_state;
pub mod monte_carlo;
pub mod rng;
pub mod simulation;
pub mod spread;

pub use burn_state::BurnState;
pub use monte_carlo::simulate_many;
pub use rng::replicate_seed;
pub use simulation::{
    simulate_one, validate_inputs, FirePhase, FireResult, FireSimulation, FireStats,
};
pub use spread::{spread_probability, Neighbor, SpreadModel, MOORE_NEIGHBORS};

pub use wildfire_common as common;
