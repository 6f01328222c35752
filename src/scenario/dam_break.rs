//! Dam break scenarios.

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge};

use super::{Scenario, ScenarioError};

/// Bottom profile of a dam break basin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BedProfile {
    /// Constant bed elevation
    Flat(f64),
    /// Bed jumps from `left` to `right` at `x`
    Step { x: f64, left: f64, right: f64 },
}

impl BedProfile {
    fn elevation(&self, x: f64) -> f64 {
        match *self {
            BedProfile::Flat(z) => z,
            BedProfile::Step { x: step, left, right } => {
                if x < step {
                    left
                } else {
                    right
                }
            }
        }
    }
}

/// Water column of height `h_upstream` left of the dam and `h_downstream`
/// right of it, released at t = 0.
///
/// # Example
///
/// ```
/// use swe_blocks::scenario::{DamBreakScenario, Scenario};
///
/// let s = DamBreakScenario::standard();
/// assert_eq!(s.initial_water_height(10.0, 50.0).unwrap(), 10.0);
/// assert_eq!(s.initial_water_height(60.0, 50.0).unwrap(), 5.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DamBreakScenario {
    extent: Bounds2D,
    dam_x: f64,
    h_upstream: f64,
    h_downstream: f64,
    bed: BedProfile,
    boundary: BoundaryType,
    end_time: f64,
}

impl DamBreakScenario {
    pub fn new(extent: Bounds2D, dam_x: f64, h_upstream: f64, h_downstream: f64) -> Self {
        Self {
            extent,
            dam_x,
            h_upstream,
            h_downstream,
            bed: BedProfile::Flat(0.0),
            boundary: BoundaryType::Wall,
            end_time: 15.0,
        }
    }

    /// 100 m × 100 m walled basin, 10 m of water for x < 50 and 5 m beyond.
    pub fn standard() -> Self {
        Self::new(Bounds2D::new(0.0, 100.0, 0.0, 100.0), 50.0, 10.0, 5.0)
    }

    pub fn with_bed(mut self, bed: BedProfile) -> Self {
        self.bed = bed;
        self
    }

    /// Boundary type on all four outer edges.
    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }
}

impl Scenario for DamBreakScenario {
    fn name(&self) -> &'static str {
        "dam-break"
    }

    fn boundary_extent(&self) -> Bounds2D {
        self.extent
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(if x < self.dam_x {
            self.h_upstream
        } else {
            self.h_downstream
        })
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(self.bed.elevation(x))
    }

    fn boundary_type(&self, _edge: Edge) -> BoundaryType {
        self.boundary
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}

/// Cylindrical water column of height `h_inside` within `radius` of the
/// centre, `h_outside` elsewhere, flat bed at zero.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialDamBreakScenario {
    extent: Bounds2D,
    center: (f64, f64),
    radius: f64,
    h_inside: f64,
    h_outside: f64,
    boundary: BoundaryType,
    end_time: f64,
}

impl RadialDamBreakScenario {
    pub fn new(extent: Bounds2D, center: (f64, f64), radius: f64, h_inside: f64, h_outside: f64) -> Self {
        Self {
            extent,
            center,
            radius,
            h_inside,
            h_outside,
            boundary: BoundaryType::Outflow,
            end_time: 15.0,
        }
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

impl Default for RadialDamBreakScenario {
    /// 15 m column of radius 100 m in a 1 km basin filled to 10 m.
    fn default() -> Self {
        Self::new(Bounds2D::new(0.0, 1000.0, 0.0, 1000.0), (500.0, 500.0), 100.0, 15.0, 10.0)
    }
}

impl Scenario for RadialDamBreakScenario {
    fn name(&self) -> &'static str {
        "radial-dam-break"
    }

    fn boundary_extent(&self) -> Bounds2D {
        self.extent
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        let (cx, cy) = self.center;
        let r2 = (x - cx).powi(2) + (y - cy).powi(2);
        Ok(if r2 < self.radius * self.radius {
            self.h_inside
        } else {
            self.h_outside
        })
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(0.0)
    }

    fn boundary_type(&self, _edge: Edge) -> BoundaryType {
        self.boundary
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}
