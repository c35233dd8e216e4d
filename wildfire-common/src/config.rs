use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{RunSettings, SimulationParams, SpreadSettings};
use std::path::Path;

// Synthetic landscape the engine generates when no raster is supplied
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LandscapeConfig {
    pub width: usize,
    pub height: usize,
    #[serde(default = "default_landscape_seed")]
    pub seed: u64,
    #[serde(default = "default_elevation_mean")]
    pub elevation_mean: f32,
    #[serde(default = "default_elevation_sd")]
    pub elevation_sd: f32,
    #[serde(default)]
    pub wind_direction: f32, // radians, 0 = towards +x
    #[serde(default)]
    pub wind_jitter: f32, // max per-cell deviation from wind_direction
    #[serde(default)]
    pub fire_weather_index: f32,
    #[serde(default)]
    pub non_burnable_fraction: f32,
    #[serde(default)]
    pub vegetation: VegetationWeights,
}

// Relative frequency of each vegetation class in a generated landscape
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VegetationWeights {
    pub subalpine: f32,
    pub wet: f32,
    pub dry: f32,
    pub matorral: f32,
}

impl Default for VegetationWeights {
    fn default() -> Self {
        VegetationWeights {
            subalpine: 1.0,
            wet: 1.0,
            dry: 1.0,
            matorral: 1.0,
        }
    }
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        LandscapeConfig {
            width: 64,
            height: 64,
            seed: default_landscape_seed(),
            elevation_mean: default_elevation_mean(),
            elevation_sd: default_elevation_sd(),
            wind_direction: 0.0,
            wind_jitter: 0.0,
            fire_weather_index: 0.0,
            non_burnable_fraction: 0.0,
            vegetation: VegetationWeights::default(),
        }
    }
}

impl LandscapeConfig {
    /// Weights in `VegetationType::ALL` order.
    pub fn vegetation_weights(&self) -> [f32; 4] {
        let v = &self.vegetation;
        [v.subalpine, v.wet, v.dry, v.matorral]
    }
}

// Ignition points, generation 0 of every replicate
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct IgnitionConfig {
    pub points: Vec<(usize, usize)>,
}

// Logistic model coefficients
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default = "default_wind_coef")]
    pub wind: f64,
    #[serde(default = "default_coef")]
    pub elevation: f64,
    #[serde(default = "default_coef")]
    pub slope: f64,
    #[serde(default = "default_coef")]
    pub subalpine: f64,
    #[serde(default = "default_coef")]
    pub wet: f64,
    #[serde(default = "default_coef")]
    pub dry: f64,
    #[serde(default = "default_coef")]
    pub fwi: f64,
    #[serde(default = "default_coef")]
    pub aspect: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            intercept: 0.0,
            wind: default_wind_coef(),
            elevation: default_coef(),
            slope: default_coef(),
            subalpine: default_coef(),
            wet: default_coef(),
            dry: default_coef(),
            fwi: default_coef(),
            aspect: default_coef(),
        }
    }
}

// Scalar inputs of the spread model
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpreadConfig {
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_spread_elevation_mean")]
    pub elevation_mean: f64,
    #[serde(default = "default_spread_elevation_sd")]
    pub elevation_sd: f64,
    #[serde(default = "default_upper_limit")]
    pub upper_limit: f64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        SpreadConfig {
            distance: default_distance(),
            elevation_mean: default_spread_elevation_mean(),
            elevation_sd: default_spread_elevation_sd(),
            upper_limit: default_upper_limit(),
        }
    }
}

// Monte Carlo run settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub replicates: u32,
    #[serde(default)]
    pub base_seed: u64,
    #[serde(default)]
    pub workers: Option<usize>, // None = rayon default
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_aggregate: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default)]
    pub save_generation_log: bool, // CSV of replicate 0's burned cells per generation
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "wildfire".to_string(),
            save_aggregate: true,
            format: None,
            save_generation_log: false,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub landscape: LandscapeConfig,
    pub ignition: IgnitionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub spread: SpreadConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values the engine cannot recover from once a run starts.
    pub fn validate(&self) -> Result<()> {
        let land = &self.landscape;
        if land.width == 0 || land.height == 0 {
            anyhow::bail!("landscape width and height must be greater than 0.");
        }
        if !land.elevation_sd.is_finite() || land.elevation_sd < 0.0 {
            anyhow::bail!("landscape.elevation_sd must be finite and non-negative.");
        }
        let finite = [
            ("elevation_mean", land.elevation_mean),
            ("wind_direction", land.wind_direction),
            ("wind_jitter", land.wind_jitter),
            ("fire_weather_index", land.fire_weather_index),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            anyhow::bail!("landscape.{} must be finite, got {}.", name, value);
        }
        if !(0.0..=1.0).contains(&land.non_burnable_fraction) {
            anyhow::bail!("landscape.non_burnable_fraction must lie in [0, 1].");
        }
        if land.vegetation_weights().iter().any(|w| !w.is_finite() || *w < 0.0) {
            anyhow::bail!("vegetation weights must be finite and non-negative.");
        }
        if self.ignition.points.is_empty() {
            anyhow::bail!("ignition.points must list at least one cell.");
        }
        if let Some(&(x, y)) = self.ignition.points.iter().find(|&&(x, y)| x >= land.width || y >= land.height) {
            anyhow::bail!("ignition point ({}, {}) lies outside the {}x{} landscape.", x, y, land.width, land.height);
        }
        if self.run.workers == Some(0) {
            anyhow::bail!("run.workers must be greater than 0 when set.");
        }
        self.simulation_params().validate()?;
        self.spread_settings().validate()?;
        Ok(())
    }

    /// Converts the model section into the coefficients used at runtime.
    pub fn simulation_params(&self) -> SimulationParams {
        let m = &self.model;
        SimulationParams {
            intercept: m.intercept,
            wind: m.wind,
            elevation: m.elevation,
            slope: m.slope,
            subalpine: m.subalpine,
            wet: m.wet,
            dry: m.dry,
            fwi: m.fwi,
            aspect: m.aspect,
        }
    }

    pub fn spread_settings(&self) -> SpreadSettings {
        SpreadSettings {
            distance: self.spread.distance,
            elevation_mean: self.spread.elevation_mean,
            elevation_sd: self.spread.elevation_sd,
            upper_limit: self.spread.upper_limit,
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            replicates: self.run.replicates,
            base_seed: self.run.base_seed,
            workers: self.run.workers,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_landscape_seed() -> u64 {
    42
}

fn default_elevation_mean() -> f32 {
    1163.3
}

fn default_elevation_sd() -> f32 {
    399.5
}

fn default_wind_coef() -> f64 {
    0.5
}

fn default_coef() -> f64 {
    0.2
}

fn default_distance() -> f64 {
    30.0
}

fn default_spread_elevation_mean() -> f64 {
    1163.3
}

fn default_spread_elevation_sd() -> f64 {
    399.5
}

fn default_upper_limit() -> f64 {
    0.5
}
