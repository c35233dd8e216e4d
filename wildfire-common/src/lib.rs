pub mod aggregate;
pub mod config;
pub mod error;
pub mod grid;
pub mod landscape;
pub mod sim_params;

// Re-export key types for easier use by dependent crates
pub use aggregate::{AggregateMetrics, AggregateResult};
pub use config::{IgnitionConfig, LandscapeConfig, ModelConfig, OutputConfig, RunConfig, SimulationConfig, SpreadConfig, VegetationWeights};
pub use error::SimError;
pub use grid::Grid;
pub use landscape::{Cell, Landscape, VegetationType};
pub use sim_params::{RunSettings, SimulationParams, SpreadSettings};
