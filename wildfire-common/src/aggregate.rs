use crate::error::SimError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Performance figures of a Monte Carlo run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Lowest per-replicate throughput, in processed cells per second.
    pub min_throughput: f64,
    /// Highest per-replicate throughput, in processed cells per second.
    pub max_throughput: f64,
    /// Busy time of the longest-running worker (seconds). Wall-clock floor of the run.
    pub parallel_time_secs: f64,
    /// Sum of all workers' busy time (seconds).
    pub total_busy_secs: f64,
    /// Measured wall time from pool start to the last fold (seconds).
    pub wall_time_secs: f64,
    pub total_processed_cells: u64,
    /// Threads in the pool, including any that claimed no replicate.
    pub workers: usize,
}

/// Burn frequency of every cell across all replicates of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Number of replicates in which each cell burned.
    pub burn_counts: Grid<u32>,
    pub replicates: u32,
    /// `None` when no replicate ran.
    pub metrics: Option<AggregateMetrics>,
}

impl AggregateResult {
    /// An all-zero result, the state before any replicate is folded in.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            burn_counts: Grid::new(width, height),
            replicates: 0,
            metrics: None,
        }
    }

    pub fn width(&self) -> usize {
        self.burn_counts.width()
    }

    pub fn height(&self) -> usize {
        self.burn_counts.height()
    }

    /// Run metrics, or `ZeroReplicates` if nothing ran.
    pub fn metrics(&self) -> Result<&AggregateMetrics, SimError> {
        self.metrics.as_ref().ok_or(SimError::ZeroReplicates)
    }

    /// The burn-probability map: per-cell fraction of replicates that burned it.
    pub fn burn_probabilities(&self) -> Result<Grid<f64>, SimError> {
        if self.replicates == 0 {
            return Err(SimError::ZeroReplicates);
        }
        let n = f64::from(self.replicates);
        Ok(self.burn_counts.map(|&count| f64::from(count) / n))
    }

    pub fn max_count(&self) -> u32 {
        self.burn_counts.as_slice().iter().copied().max().unwrap_or(0)
    }

    /// Cells burned in at least one replicate.
    pub fn ever_burned(&self) -> usize {
        self.burn_counts.as_slice().iter().filter(|&&c| c > 0).count()
    }
}
