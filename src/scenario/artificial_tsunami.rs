//! Synthetic tsunami in a 10 km × 10 km basin of constant 100 m depth.

use std::f64::consts::PI;

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge};

use super::{DisplacementSchedule, Scenario, ScenarioError};

const DEPTH: f64 = 100.0;
const HALF_WIDTH: f64 = 5000.0;

/// Shape of the synthetic seabed uplift centred at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpliftShape {
    /// `amplitude * exp(-r² / (2 sigma²))`
    Gaussian { amplitude: f64, sigma: f64 },
    /// `5 sin((x/500 + 1) π) (y²/500² + 1)` on [-500, 500]², zero outside
    SineBump,
}

impl UpliftShape {
    fn displacement(&self, x: f64, y: f64) -> f64 {
        match *self {
            UpliftShape::Gaussian { amplitude, sigma } => {
                amplitude * (-(x * x + y * y) / (2.0 * sigma * sigma)).exp()
            }
            UpliftShape::SineBump => {
                if x.abs() > 500.0 || y.abs() > 500.0 {
                    0.0
                } else {
                    5.0 * ((x / 500.0 + 1.0) * PI).sin() * (y * y / 250_000.0 + 1.0)
                }
            }
        }
    }
}

/// Seabed uplift under a resting 100 m water column.
///
/// Static bathymetry is -100 m everywhere; the uplift is reported as a
/// displacement. Without a rise time the uplift is present from t = 0;
/// with one it grows linearly until the rise time, exercising the moving
/// seabed path of the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtificialTsunamiScenario {
    shape: UpliftShape,
    rise_time: Option<f64>,
    end_time: f64,
}

impl ArtificialTsunamiScenario {
    pub fn new(shape: UpliftShape) -> Self {
        Self {
            shape,
            rise_time: None,
            end_time: 100.0,
        }
    }

    /// Let the uplift grow linearly over `rise_time` seconds.
    pub fn with_rise_time(mut self, rise_time: f64) -> Self {
        self.rise_time = Some(rise_time);
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    fn ramp(&self, t: f64) -> f64 {
        match self.rise_time {
            Some(rise) if rise > 0.0 => (t / rise).clamp(0.0, 1.0),
            _ => 1.0,
        }
    }
}

impl Default for ArtificialTsunamiScenario {
    fn default() -> Self {
        Self::new(UpliftShape::Gaussian {
            amplitude: 5.0,
            sigma: 250.0,
        })
    }
}

impl Scenario for ArtificialTsunamiScenario {
    fn name(&self) -> &'static str {
        "artificial-tsunami"
    }

    fn boundary_extent(&self) -> Bounds2D {
        Bounds2D::new(-HALF_WIDTH, HALF_WIDTH, -HALF_WIDTH, HALF_WIDTH)
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(DEPTH)
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(-DEPTH)
    }

    fn bathymetry_and_displacement(&self, x: f64, y: f64, t: f64) -> Result<(f64, f64), ScenarioError> {
        let bed = self.bathymetry(x, y)?;
        Ok((bed, self.ramp(t) * self.shape.displacement(x, y)))
    }

    fn displacement_schedule(&self) -> Option<DisplacementSchedule> {
        self.rise_time.filter(|rise| *rise > 0.0).map(|rise| DisplacementSchedule {
            end_time: rise,
            max_dt: rise / 20.0,
        })
    }

    fn boundary_type(&self, _edge: Edge) -> BoundaryType {
        BoundaryType::Outflow
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}
