//! Logistic ignition-probability model.

use std::f64::consts::PI;
use wildfire_common::{Cell, SimulationParams, SpreadSettings};

/// One of the eight Moore-neighbourhood moves, with the direction the fire
/// travels along it (radians, counter-clockwise from +x, y growing downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub dx: isize,
    pub dy: isize,
    pub angle: f64,
}

/// Moore neighbourhood in evaluation order. The simulator draws random numbers
/// in this order, so changing it changes every seeded result.
pub const MOORE_NEIGHBORS: [Neighbor; 8] = [
    Neighbor { dx: -1, dy: -1, angle: PI * 3.0 / 4.0 },
    Neighbor { dx: -1, dy: 0, angle: PI },
    Neighbor { dx: -1, dy: 1, angle: PI * 5.0 / 4.0 },
    Neighbor { dx: 0, dy: -1, angle: PI / 2.0 },
    Neighbor { dx: 0, dy: 1, angle: PI * 3.0 / 2.0 },
    Neighbor { dx: 1, dy: -1, angle: PI / 4.0 },
    Neighbor { dx: 1, dy: 0, angle: 0.0 },
    Neighbor { dx: 1, dy: 1, angle: PI * 7.0 / 4.0 },
];

/// Coefficients and scalar settings bundled for repeated evaluation.
#[derive(Debug, Clone, Copy)]
pub struct SpreadModel {
    params: SimulationParams,
    settings: SpreadSettings,
    vegetation_offsets: [f64; 4],
}

impl SpreadModel {
    pub fn new(params: SimulationParams, settings: SpreadSettings) -> Self {
        Self {
            params,
            settings,
            vegetation_offsets: params.vegetation_offsets(),
        }
    }

    /// Linear predictor for fire moving from `burning` into `neighbour` along `angle`.
    #[inline]
    pub fn linear_predictor(&self, burning: &Cell, neighbour: &Cell, angle: f64) -> f64 {
        let p = &self.params;
        let s = &self.settings;
        let burning_elev = f64::from(burning.elevation);
        let neighbour_elev = f64::from(neighbour.elevation);

        let slope_term = ((neighbour_elev - burning_elev) / s.distance).atan().sin();
        let wind_term = (angle - f64::from(burning.wind_direction)).cos();
        let elev_term = (neighbour_elev - s.elevation_mean) / s.elevation_sd;

        let mut linpred = p.intercept;
        linpred += self.vegetation_offsets[neighbour.vegetation_type.index()];
        linpred += p.fwi * f64::from(neighbour.fire_weather_index);
        linpred += p.aspect * f64::from(neighbour.aspect);
        linpred += wind_term * p.wind + elev_term * p.elevation + slope_term * p.slope;
        linpred
    }

    /// Ignition probability in `[0, upper_limit]`.
    #[inline]
    pub fn probability(&self, burning: &Cell, neighbour: &Cell, angle: f64) -> f64 {
        let linpred = self.linear_predictor(burning, neighbour, angle);
        self.settings.upper_limit / (1.0 + (-linpred).exp())
    }
}

/// Stand-alone form of [`SpreadModel::probability`].
pub fn spread_probability(
    burning: &Cell,
    neighbour: &Cell,
    params: &SimulationParams,
    angle: f64,
    settings: &SpreadSettings,
) -> f64 {
    SpreadModel::new(*params, *settings).probability(burning, neighbour, angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wildfire_common::VegetationType;

    fn cell(elevation: f32, vegetation_type: VegetationType) -> Cell {
        Cell {
            elevation,
            vegetation_type,
            burnable: true,
            ..Cell::default()
        }
    }

    fn settings(upper_limit: f64) -> SpreadSettings {
        SpreadSettings {
            distance: 30.0,
            elevation_mean: 1000.0,
            elevation_sd: 100.0,
            upper_limit,
        }
    }

    #[test]
    fn zero_predictor_gives_half_the_limit() {
        let flat = cell(1000.0, VegetationType::Matorral);
        let model = SpreadModel::new(SimulationParams::default(), settings(0.8));
        assert_relative_eq!(model.probability(&flat, &flat, 0.0), 0.4);
    }

    #[test]
    fn terms_combine_linearly() {
        let burning = Cell {
            wind_direction: 0.0,
            ..cell(1000.0, VegetationType::Matorral)
        };
        let neighbour = Cell {
            fire_weather_index: 2.0,
            aspect: -0.5,
            ..cell(1030.0, VegetationType::Dry)
        };
        let params = SimulationParams {
            intercept: 0.1,
            wind: 0.5,
            elevation: 0.2,
            slope: 0.3,
            subalpine: 9.0,
            wet: 9.0,
            dry: 0.7,
            fwi: 0.25,
            aspect: 0.4,
        };
        let model = SpreadModel::new(params, settings(1.0));
        // slope: sin(atan(30/30)) = sqrt(2)/2, wind: cos(0) = 1, elev: 30/100
        let expected = 0.1 + 0.7 + 0.25 * 2.0 + 0.4 * -0.5
            + 0.5 * 1.0
            + 0.2 * 0.3
            + 0.3 * std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(model.linear_predictor(&burning, &neighbour, 0.0), expected, epsilon = 1e-6);
        assert_relative_eq!(
            model.probability(&burning, &neighbour, 0.0),
            1.0 / (1.0 + (-expected).exp()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn vegetation_offset_follows_neighbour_class() {
        let params = SimulationParams {
            subalpine: 1.0,
            wet: -1.0,
            dry: 2.0,
            ..SimulationParams::default()
        };
        let model = SpreadModel::new(params, settings(1.0));
        let burning = cell(1000.0, VegetationType::Subalpine);
        let offsets: Vec<f64> = VegetationType::ALL
            .iter()
            .map(|&veg| model.linear_predictor(&burning, &cell(1000.0, veg), PI / 2.0))
            .collect();
        assert_eq!(offsets, vec![1.0, -1.0, 2.0, 0.0]);
    }

    #[test]
    fn wind_alignment_favours_downwind_spread() {
        let params = SimulationParams {
            wind: 2.0,
            ..SimulationParams::default()
        };
        let model = SpreadModel::new(params, settings(1.0));
        let burning = Cell {
            wind_direction: std::f32::consts::FRAC_PI_2,
            ..cell(1000.0, VegetationType::Matorral)
        };
        let neighbour = cell(1000.0, VegetationType::Matorral);
        let downwind = model.probability(&burning, &neighbour, PI / 2.0);
        let upwind = model.probability(&burning, &neighbour, PI * 3.0 / 2.0);
        assert!(downwind > 0.5 && upwind < 0.5);
    }

    #[test]
    fn probability_stays_within_limit() {
        let params = SimulationParams {
            intercept: -3.0,
            wind: 1.5,
            elevation: -2.0,
            slope: 4.0,
            subalpine: 0.3,
            wet: -0.3,
            dry: 1.0,
            fwi: 0.8,
            aspect: -1.2,
        };
        for upper in [0.0, 0.25, 1.0] {
            let model = SpreadModel::new(params, settings(upper));
            for elev in [-5000.0f32, 0.0, 950.0, 1200.0, 9000.0] {
                for veg in VegetationType::ALL {
                    let burning = cell(1000.0, VegetationType::Wet);
                    let neighbour = Cell {
                        fire_weather_index: elev / 100.0,
                        aspect: 1.0,
                        ..cell(elev, veg)
                    };
                    for n in MOORE_NEIGHBORS {
                        let p = model.probability(&burning, &neighbour, n.angle);
                        assert!((0.0..=upper).contains(&p), "p = {p}, upper = {upper}");
                    }
                }
            }
        }
    }

    #[test]
    fn zero_limit_never_ignites() {
        let c = cell(1000.0, VegetationType::Dry);
        let params = SimulationParams {
            intercept: 1e6,
            ..SimulationParams::default()
        };
        assert_eq!(spread_probability(&c, &c, &params, 0.0, &settings(0.0)), 0.0);
    }

    #[test]
    fn neighbor_table_covers_the_moore_ring_once() {
        let mut offsets: Vec<(isize, isize)> = MOORE_NEIGHBORS.iter().map(|n| (n.dx, n.dy)).collect();
        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), 8);
        assert!(!offsets.contains(&(0, 0)));
        for n in MOORE_NEIGHBORS {
            // angle points along (dx, -dy) because rows grow downward
            let (sin, cos) = n.angle.sin_cos();
            let scale = cos.abs().max(sin.abs());
            assert_relative_eq!(cos / scale, n.dx as f64, epsilon = 1e-9);
            assert_relative_eq!(sin / scale, -n.dy as f64, epsilon = 1e-9);
        }
    }
}
