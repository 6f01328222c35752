//! Gridded bathymetry and displacement datasets.
//!
//! Datasets are sampled on rectilinear axes and queried by nearest
//! neighbour in space. Displacement series are linearly interpolated in
//! time. Both persist as bincode files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Bounds2D;

use super::ScenarioError;

/// Index of the sample in the ascending `axis` closest to `value`.
fn nearest_index(axis: &[f64], value: f64) -> usize {
    let upper = axis.partition_point(|&a| a < value);
    if upper == 0 {
        0
    } else if upper == axis.len() {
        axis.len() - 1
    } else if value - axis[upper - 1] <= axis[upper] - value {
        upper - 1
    } else {
        upper
    }
}

fn validate_axis(name: &str, axis: &[f64]) -> Result<(), ScenarioError> {
    if axis.is_empty() {
        return Err(ScenarioError::InvalidDataset(format!("{} axis is empty", name)));
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(ScenarioError::InvalidDataset(format!("{} axis has non-finite values", name)));
    }
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ScenarioError::InvalidDataset(format!(
            "{} axis is not strictly increasing",
            name
        )));
    }
    Ok(())
}

fn axis_span(axis: &[f64]) -> (f64, f64) {
    (axis[0], axis[axis.len() - 1])
}

/// Scalar field sampled on a rectilinear grid.
///
/// `values[j * x.len() + i]` is the sample at `(x[i], y[j])`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GriddedField {
    x: Vec<f64>,
    y: Vec<f64>,
    values: Vec<f64>,
}

impl GriddedField {
    /// Build a field, validating axes and sizes.
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: Vec<f64>) -> Result<Self, ScenarioError> {
        let field = Self { x, y, values };
        field.validate()?;
        Ok(field)
    }

    /// Sample `f` on the given axes.
    pub fn from_fn<F>(x: Vec<f64>, y: Vec<f64>, f: F) -> Result<Self, ScenarioError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let values = y
            .iter()
            .flat_map(|&yj| x.iter().map(move |&xi| (xi, yj)))
            .map(|(xi, yj)| f(xi, yj))
            .collect();
        Self::new(x, y, values)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        validate_axis("x", &self.x)?;
        validate_axis("y", &self.y)?;
        let expected = self.x.len() * self.y.len();
        if self.values.len() != expected {
            return Err(ScenarioError::InvalidDataset(format!(
                "expected {} values for {}×{} grid, got {}",
                expected,
                self.x.len(),
                self.y.len(),
                self.values.len()
            )));
        }
        Ok(())
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Range of the sample coordinates, `None` for a single row or column.
    pub fn extent(&self) -> Option<Bounds2D> {
        let (x_min, x_max) = axis_span(&self.x);
        let (y_min, y_max) = axis_span(&self.y);
        Bounds2D::try_new(x_min, x_max, y_min, y_max)
    }

    /// Whether `(x, y)` lies within the sampled range.
    pub fn covers(&self, x: f64, y: f64) -> bool {
        let (x_min, x_max) = axis_span(&self.x);
        let (y_min, y_max) = axis_span(&self.y);
        x >= x_min && x <= x_max && y >= y_min && y <= y_max
    }

    /// Nearest-neighbour sample.
    pub fn lookup(&self, x: f64, y: f64) -> f64 {
        let i = nearest_index(&self.x, x);
        let j = nearest_index(&self.y, y);
        self.values[j * self.x.len() + i]
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let reader = BufReader::new(File::open(path)?);
        let field: Self = bincode::deserialize_from(reader)?;
        field.validate()?;
        Ok(field)
    }
}

/// Seabed displacement sampled on (time, y, x).
///
/// `frames[(k * y.len() + j) * x.len() + i]` is the displacement at
/// `(x[i], y[j])` and time `times[k]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplacementSeries {
    x: Vec<f64>,
    y: Vec<f64>,
    times: Vec<f64>,
    frames: Vec<f64>,
}

impl DisplacementSeries {
    pub fn new(x: Vec<f64>, y: Vec<f64>, times: Vec<f64>, frames: Vec<f64>) -> Result<Self, ScenarioError> {
        let series = Self { x, y, times, frames };
        series.validate()?;
        Ok(series)
    }

    /// Sample `f(x, y, t)` on the given axes.
    pub fn from_fn<F>(x: Vec<f64>, y: Vec<f64>, times: Vec<f64>, f: F) -> Result<Self, ScenarioError>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let mut frames = Vec::with_capacity(x.len() * y.len() * times.len());
        for &t in &times {
            for &yj in &y {
                for &xi in &x {
                    frames.push(f(xi, yj, t));
                }
            }
        }
        Self::new(x, y, times, frames)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        validate_axis("x", &self.x)?;
        validate_axis("y", &self.y)?;
        validate_axis("time", &self.times)?;
        let expected = self.x.len() * self.y.len() * self.times.len();
        if self.frames.len() != expected {
            return Err(ScenarioError::InvalidDataset(format!(
                "expected {} displacement samples, got {}",
                expected,
                self.frames.len()
            )));
        }
        Ok(())
    }

    /// Whether `(x, y)` lies inside the displacement grid.
    pub fn covers(&self, x: f64, y: f64) -> bool {
        let (x_min, x_max) = axis_span(&self.x);
        let (y_min, y_max) = axis_span(&self.y);
        x >= x_min && x <= x_max && y >= y_min && y <= y_max
    }

    /// Time of the last sample.
    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Smallest spacing between consecutive samples, `None` for one frame.
    pub fn min_time_spacing(&self) -> Option<f64> {
        self.times.windows(2).map(|w| w[1] - w[0]).reduce(f64::min)
    }

    fn sample(&self, k: usize, i: usize, j: usize) -> f64 {
        self.frames[(k * self.y.len() + j) * self.x.len() + i]
    }

    /// Displacement at `(x, y)` and time `t`.
    ///
    /// Nearest sample in space, linear in time, held constant before the
    /// first and after the last frame.
    pub fn value(&self, x: f64, y: f64, t: f64) -> f64 {
        let i = nearest_index(&self.x, x);
        let j = nearest_index(&self.y, y);
        let n = self.times.len();

        if n == 1 || t <= self.times[0] {
            return self.sample(0, i, j);
        }
        if t >= self.times[n - 1] {
            return self.sample(n - 1, i, j);
        }

        let k = self.times.partition_point(|&tk| tk <= t) - 1;
        let weight = (t - self.times[k]) / (self.times[k + 1] - self.times[k]);
        self.sample(k, i, j) * (1.0 - weight) + self.sample(k + 1, i, j) * weight
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let reader = BufReader::new(File::open(path)?);
        let series: Self = bincode::deserialize_from(reader)?;
        series.validate()?;
        Ok(series)
    }
}
