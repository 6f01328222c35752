//! Lake at rest forced by a periodic point-like mass source.

use std::f64::consts::PI;

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge};

use super::{Scenario, ScenarioError};

/// Flat basin of constant depth with a source `amplitude * sin(2π t / period)`
/// acting inside a disc.
///
/// Used to test wave propagation away from a localized disturbance.
#[derive(Clone, Debug, PartialEq)]
pub struct OscillatingSourceScenario {
    extent: Bounds2D,
    depth: f64,
    center: (f64, f64),
    radius: f64,
    /// Peak source rate in m/s
    amplitude: f64,
    period: f64,
    boundary: BoundaryType,
    end_time: f64,
}

impl OscillatingSourceScenario {
    pub fn new(extent: Bounds2D, depth: f64, center: (f64, f64), radius: f64) -> Self {
        Self {
            extent,
            depth,
            center,
            radius,
            amplitude: 0.01,
            period: 10.0,
            boundary: BoundaryType::Outflow,
            end_time: 100.0,
        }
    }

    pub fn with_forcing(mut self, amplitude: f64, period: f64) -> Self {
        self.amplitude = amplitude;
        self.period = period;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }
}

impl Default for OscillatingSourceScenario {
    fn default() -> Self {
        Self::new(Bounds2D::new(0.0, 1000.0, 0.0, 1000.0), 10.0, (500.0, 500.0), 50.0)
    }
}

impl Scenario for OscillatingSourceScenario {
    fn name(&self) -> &'static str {
        "oscillating-source"
    }

    fn boundary_extent(&self) -> Bounds2D {
        self.extent
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(self.depth)
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(-self.depth)
    }

    fn boundary_type(&self, _edge: Edge) -> BoundaryType {
        self.boundary
    }

    fn has_source_term(&self) -> bool {
        true
    }

    fn source_term(&self, x: f64, y: f64, t: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        let (cx, cy) = self.center;
        if (x - cx).powi(2) + (y - cy).powi(2) > self.radius * self.radius {
            return Ok(0.0);
        }
        Ok(self.amplitude * (2.0 * PI * t / self.period).sin())
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}
