use thiserror::Error;

/// Errors surfaced by the fire-spread core.
///
/// Every variant is raised before a replicate starts propagating; once a fire
/// is seeded it always runs to termination without failing. `ThreadPool` is the
/// only failure that does not come from the caller's inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("ignition cell ({x}, {y}) lies outside the {width}x{height} landscape")]
    IgnitionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("ignition cell ({x}, {y}) is listed more than once")]
    DuplicateIgnition { x: usize, y: usize },
    #[error("ignition set is empty")]
    EmptyIgnitionSet,
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("landscape expects {expected} cells but {actual} were supplied")]
    LandscapeShape { expected: usize, actual: usize },
    #[error("elevation standard deviation is zero, cannot standardize elevations")]
    ZeroElevationSd,
    #[error("no replicates were run, throughput and burn probabilities are undefined")]
    ZeroReplicates,
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl SimError {
    /// Caller-facing preconditions: bad ignitions, settings or landscape shape.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SimError::IgnitionOutOfBounds { .. }
                | SimError::DuplicateIgnition { .. }
                | SimError::EmptyIgnitionSet
                | SimError::InvalidSetting(_)
                | SimError::LandscapeShape { .. }
        )
    }

    /// Inputs that would silently turn results into NaN.
    pub fn is_numeric_degeneracy(&self) -> bool {
        matches!(self, SimError::ZeroElevationSd | SimError::ZeroReplicates)
    }
}
