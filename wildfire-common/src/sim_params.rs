use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Regression coefficients of the logistic spread model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationParams {
    pub intercept: f64,
    pub wind: f64,
    pub elevation: f64,
    pub slope: f64,
    pub subalpine: f64,
    pub wet: f64,
    pub dry: f64,
    pub fwi: f64,
    pub aspect: f64,
}

impl SimulationParams {
    /// Additive offset per vegetation class, indexed by `VegetationType::index`.
    /// Matorral is the baseline and carries no offset.
    #[inline]
    pub fn vegetation_offsets(&self) -> [f64; 4] {
        [self.subalpine, self.wet, self.dry, 0.0]
    }

    /// Rejects non-finite coefficients, which would turn every probability into NaN.
    pub fn validate(&self) -> Result<(), SimError> {
        let named = [
            ("intercept", self.intercept),
            ("wind", self.wind),
            ("elevation", self.elevation),
            ("slope", self.slope),
            ("subalpine", self.subalpine),
            ("wet", self.wet),
            ("dry", self.dry),
            ("fwi", self.fwi),
            ("aspect", self.aspect),
        ];
        match named.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(SimError::InvalidSetting(format!(
                "coefficient {} must be finite, got {}",
                name, value
            ))),
            None => Ok(()),
        }
    }
}

/// Scalar inputs of the spread model shared by every replicate of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSettings {
    /// Distance between neighbouring cell centres, in elevation units.
    pub distance: f64,
    pub elevation_mean: f64,
    pub elevation_sd: f64,
    /// Scales the logistic output; the ignition probability never exceeds it.
    pub upper_limit: f64,
}

impl Default for SpreadSettings {
    fn default() -> Self {
        Self {
            distance: 30.0,
            elevation_mean: 1163.3,
            elevation_sd: 399.5,
            upper_limit: 0.5,
        }
    }
}

impl SpreadSettings {
    /// Rejects settings that would make the spread model divide by zero or
    /// produce NaN probabilities.
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return Err(SimError::InvalidSetting(format!(
                "distance must be positive and finite, got {}",
                self.distance
            )));
        }
        if !self.elevation_mean.is_finite() {
            return Err(SimError::InvalidSetting(format!(
                "elevation_mean must be finite, got {}",
                self.elevation_mean
            )));
        }
        if self.elevation_sd == 0.0 {
            return Err(SimError::ZeroElevationSd);
        }
        if !self.elevation_sd.is_finite() || self.elevation_sd < 0.0 {
            return Err(SimError::InvalidSetting(format!(
                "elevation_sd must be positive and finite, got {}",
                self.elevation_sd
            )));
        }
        if !self.upper_limit.is_finite() || self.upper_limit < 0.0 {
            return Err(SimError::InvalidSetting(format!(
                "upper_limit must be non-negative and finite, got {}",
                self.upper_limit
            )));
        }
        Ok(())
    }
}

/// How a Monte Carlo run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    pub replicates: u32,
    /// Replicate `i` draws from a stream derived from `(base_seed, i)`.
    pub base_seed: u64,
    /// Worker threads; `None` uses rayon's default pool size.
    pub workers: Option<usize>,
}

impl RunSettings {
    pub fn new(replicates: u32, base_seed: u64) -> Self {
        Self {
            replicates,
            base_seed,
            workers: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}
