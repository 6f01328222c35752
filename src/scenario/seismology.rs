//! Tsunami generation from a time-dependent earthquake displacement.

use tracing::info;

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge, EdgeMap};

use super::{DisplacementSchedule, DisplacementSeries, GriddedField, Scenario, ScenarioError};
use super::tsunami::clamp_coastal_bathymetry;

/// Loaded bathymetry with a displacement series from a rupture model.
///
/// The seabed moves while `t` lies within the series; the engine samples
/// it after every step with `dt` no larger than the series' sample
/// spacing.
#[derive(Clone, Debug)]
pub struct SeismologyScenario {
    bathymetry: GriddedField,
    displacement: DisplacementSeries,
    extent: Bounds2D,
    fixed_time: Option<f64>,
    boundaries: EdgeMap<BoundaryType>,
    end_time: f64,
}

impl SeismologyScenario {
    pub fn new(bathymetry: GriddedField, displacement: DisplacementSeries) -> Result<Self, ScenarioError> {
        let extent = bathymetry
            .extent()
            .ok_or_else(|| ScenarioError::InvalidDataset("bathymetry grid spans no area".into()))?;
        info!(
            "Seismology scenario on {} with displacement until t = {:.2}s",
            extent,
            displacement.end_time()
        );
        Ok(Self {
            bathymetry,
            displacement,
            extent,
            fixed_time: None,
            boundaries: EdgeMap::uniform(BoundaryType::Outflow),
            end_time: 100.0,
        })
    }

    /// Evaluate the displacement at `time` regardless of the query time.
    ///
    /// Turns the series into a static uplift, e.g. the final rupture state.
    pub fn fix_time(mut self, time: f64) -> Self {
        self.fixed_time = Some(time);
        self
    }

    pub fn with_boundaries(mut self, boundaries: EdgeMap<BoundaryType>) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }
}

impl Scenario for SeismologyScenario {
    fn name(&self) -> &'static str {
        "seismology"
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

    fn bathymetry_and_displacement(&self, x: f64, y: f64, t: f64) -> Result<(f64, f64), ScenarioError> {
        let bed = self.bathymetry(x, y)?;
        let t = self.fixed_time.unwrap_or(t);
        let displacement = if self.displacement.covers(x, y) {
            self.displacement.value(x, y, t)
        } else {
            0.0
        };
        Ok((bed, displacement))
    }

    fn displacement_schedule(&self) -> Option<DisplacementSchedule> {
        if self.fixed_time.is_some() {
            return None;
        }
        self.displacement.min_time_spacing().map(|max_dt| DisplacementSchedule {
            end_time: self.displacement.end_time(),
            max_dt,
        })
    }

    fn boundary_type(&self, edge: Edge) -> BoundaryType {
        self.boundaries[edge]
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }
}
