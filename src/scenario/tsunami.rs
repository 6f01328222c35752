//! Tsunami from loaded bathymetry and a one-shot seabed displacement.

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge, EdgeMap};

use super::{GriddedField, Scenario, ScenarioError};

/// Push bed elevations in (-20, 20) m out to ±20 m.
///
/// Keeps shallow coastal cells from producing extreme wave speeds and
/// near-zero-height land from flickering between wet and dry.
pub fn clamp_coastal_bathymetry(b: f64) -> f64 {
    if b < 0.0 && b > -20.0 {
        -20.0
    } else if b > 0.0 && b < 20.0 {
        20.0
    } else {
        b
    }
}

/// Loaded bathymetry plus a displacement that is present from t = 0.
///
/// The domain is the sampled range of the bathymetry grid. Water height is
/// `max(-b, 0)` on the static bed, so the displacement shows up as a
/// free-surface anomaly.
#[derive(Clone, Debug)]
pub struct TsunamiScenario {
    bathymetry: GriddedField,
    displacement: Option<GriddedField>,
    extent: Bounds2D,
    boundaries: EdgeMap<BoundaryType>,
    end_time: f64,
}

impl TsunamiScenario {
    /// # Errors
    ///
    /// [`ScenarioError::InvalidDataset`] if the bathymetry grid spans no area.
    pub fn new(bathymetry: GriddedField, displacement: Option<GriddedField>) -> Result<Self, ScenarioError> {
        let extent = bathymetry
            .extent()
            .ok_or_else(|| ScenarioError::InvalidDataset("bathymetry grid spans no area".into()))?;
        Ok(Self {
            bathymetry,
            displacement,
            extent,
            boundaries: EdgeMap::uniform(BoundaryType::Outflow),
            end_time: 100.0,
        })
    }

    pub fn with_boundaries(mut self, boundaries: EdgeMap<BoundaryType>) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    fn displacement_at(&self, x: f64, y: f64) -> f64 {
        match &self.displacement {
            Some(d) if d.covers(x, y) => d.lookup(x, y),
            _ => 0.0,
        }
    }
}

impl Scenario for TsunamiScenario {
    fn name(&self) -> &'static str {
        "tsunami"
    }

    fn boundary_extent(&self) -> Bounds2D {
        self.extent
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        Ok((-self.bathymetry(x, y)?).max(0.0))
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(clamp_coastal_bathymetry(self.bathymetry.lookup(x, y)))
    }

    fn bathymetry_and_displacement(&self, x: f64, y: f64, _t: f64) -> Result<(f64, f64), ScenarioError> {
        Ok((self.bathymetry(x, y)?, self.displacement_at(x, y)))
    }

    fn boundary_type(&self, edge: Edge) -> BoundaryType {
        self.boundaries[edge]
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> TsunamiScenario {
        let axis: Vec<f64> = (0..=10).map(|k| k as f64 * 100.0).collect();
        let bathymetry = GriddedField::from_fn(axis.clone(), axis, |x, _| if x < 800.0 { -500.0 } else { 5.0 }).unwrap();
        let displacement = GriddedField::from_fn(vec![400.0, 500.0, 600.0], vec![400.0, 500.0, 600.0], |_, _| 1.5).unwrap();
        TsunamiScenario::new(bathymetry, Some(displacement)).unwrap()
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_coastal_bathymetry(-3.0), -20.0);
        assert_eq!(clamp_coastal_bathymetry(7.0), 20.0);
        assert_eq!(clamp_coastal_bathymetry(0.0), 0.0);
        assert_eq!(clamp_coastal_bathymetry(-300.0), -300.0);
        assert_eq!(clamp_coastal_bathymetry(42.0), 42.0);
    }

    #[test]
    fn test_heights_and_displacement() {
        let s = scenario();
        assert_eq!(s.initial_water_height(100.0, 100.0).unwrap(), 500.0);
        assert_eq!(s.initial_water_height(900.0, 100.0).unwrap(), 0.0);
        assert_eq!(s.bathymetry(900.0, 100.0).unwrap(), 20.0);
        assert_eq!(s.bathymetry_and_displacement(500.0, 500.0, 0.0).unwrap(), (-500.0, 1.5));
        assert_eq!(s.bathymetry_and_displacement(100.0, 500.0, 0.0).unwrap(), (-500.0, 0.0));
    }

    #[test]
    fn test_extent_from_grid() {
        let s = scenario();
        assert_eq!(s.boundary_extent(), Bounds2D::new(0.0, 1000.0, 0.0, 1000.0));
        assert!(s.bathymetry(1000.5, 0.0).is_err());
    }
}
