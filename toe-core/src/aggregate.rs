//! Area-weighted averages over the spatial dimensions of a field
//!
//! The reduction is defined per [`Field`] variant:
//!
//! - a single [`DataArray`] is averaged over its lon/lat dimensions, weighted
//!   by cell area unless explicit weights are given;
//! - a [`Dataset`] has every variable with a longitude dimension averaged the
//!   same way, while the other variables pass through. Any declared spatial
//!   dimension still left afterwards is summed away.
//!
//! Missing data (NaN or infinite values) gets zero weight, so it is excluded
//! from both the weighted sum and the total weight rather than being treated
//! as zero. A slice with no valid data at all has zero total weight and
//! averages to NaN; this is not an error.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::{array, Array2};
//! use toe_core::aggregate::global_average;
//! use toe_core::labeled::{DataArray, Field};
//!
//! let mut values = Array2::from_elem((4, 3), 2.0);
//! values[[1, 1]] = f64::NAN;
//! let field = DataArray::new(
//!     values.into_dyn(),
//!     &["lon", "lat"],
//!     vec![array![0.0, 90.0, 180.0, 270.0], array![-60.0, 0.0, 60.0]],
//! )
//! .unwrap();
//!
//! let mean = global_average(&Field::Single(field), None).unwrap();
//! assert_eq!(mean.as_single().unwrap().data().sum(), 2.0);
//! ```

use crate::area::area_field;
use crate::errors::{ToeError, ToeResult};
use crate::labeled::{sum_axes, DataArray, Dataset, Field};
use crate::parameters::GridParameters;
use crate::FloatValue;
use log::debug;
use ndarray::{Array1, Zip};

/// Area-weighted mean over the spatial dimensions named in [`GridParameters`]
#[derive(Debug, Clone, Default)]
pub struct AreaWeightedMean {
    parameters: GridParameters,
}

impl AreaWeightedMean {
    /// Build an aggregator, rejecting parameters that fail [`GridParameters::validate`]
    pub fn from_parameters(parameters: GridParameters) -> ToeResult<Self> {
        parameters.validate()?;
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &GridParameters {
        &self.parameters
    }

    /// Reduce a single field or a collection of fields
    ///
    /// `weights`, when given, are used for every field and must be
    /// broadcastable by dimension name against each field that is reduced.
    pub fn reduce(&self, data: &Field, weights: Option<&DataArray>) -> ToeResult<Field> {
        match data {
            Field::Single(array) => self.reduce_array(array, weights).map(Field::Single),
            Field::Collection(dataset) => {
                self.reduce_dataset(dataset, weights).map(Field::Collection)
            }
        }
    }

    /// Weighted mean of one field over its spatial dimensions
    pub fn reduce_array(
        &self,
        data: &DataArray,
        weights: Option<&DataArray>,
    ) -> ToeResult<DataArray> {
        match weights {
            Some(weights) => self.weighted_mean(data, weights),
            None => {
                let areas = self.area_weights(data)?;
                self.weighted_mean(data, &areas)
            }
        }
    }

    /// Reduce every spatial variable of a collection
    ///
    /// Area weights are computed once per distinct pair of lon/lat
    /// coordinates and shared between the variables that use them.
    pub fn reduce_dataset(
        &self,
        dataset: &Dataset,
        weights: Option<&DataArray>,
    ) -> ToeResult<Dataset> {
        let lon_dim = self.parameters.lon_dim.as_str();
        let mut areas: Vec<(Array1<FloatValue>, Array1<FloatValue>, DataArray)> = Vec::new();

        let mut reduced = Dataset::new();
        for (name, variable) in dataset.iter() {
            let result = if !variable.has_dim(lon_dim) {
                variable.clone()
            } else if let Some(weights) = weights {
                self.weighted_mean(variable, weights)?
            } else {
                let (lon, lat) = self.spatial_coords(variable)?;
                let index = match areas.iter().position(|(lo, la, _)| lo == lon && la == lat) {
                    Some(index) => {
                        debug!("Reusing cell areas for '{}'", name);
                        index
                    }
                    None => {
                        areas.push((lon.clone(), lat.clone(), area_field(lon, lat, &self.parameters)?));
                        areas.len() - 1
                    }
                };
                self.weighted_mean(variable, &areas[index].2)?
            };
            reduced.insert(name, result);
        }

        let spatial = self.parameters.spatial_dims();
        reduced
            .into_iter()
            .map(|(name, variable)| {
                let leftover: Vec<&str> = spatial
                    .iter()
                    .copied()
                    .filter(|d| variable.has_dim(d))
                    .collect();
                if leftover.is_empty() {
                    Ok((name, variable))
                } else {
                    debug!("Summing leftover {:?} dimension(s) of '{}'", leftover, name);
                    variable.sum_dims(&leftover).map(|v| (name, v))
                }
            })
            .collect()
    }

    fn spatial_coords<'a>(
        &self,
        data: &'a DataArray,
    ) -> ToeResult<(&'a Array1<FloatValue>, &'a Array1<FloatValue>)> {
        let lookup = |dim: &str| {
            data.coord(dim).map_err(|_| {
                ToeError::InvalidInput(format!(
                    "field {} has no '{}' dimension to derive cell areas from",
                    describe(data),
                    dim
                ))
            })
        };
        Ok((
            lookup(&self.parameters.lon_dim)?,
            lookup(&self.parameters.lat_dim)?,
        ))
    }

    fn area_weights(&self, data: &DataArray) -> ToeResult<DataArray> {
        let (lon, lat) = self.spatial_coords(data)?;
        area_field(lon, lat, &self.parameters)
    }

    fn weighted_mean(&self, data: &DataArray, weights: &DataArray) -> ToeResult<DataArray> {
        let dims = self.parameters.spatial_dims();
        let axes = data.axes_of(&dims).map_err(|e| {
            ToeError::InvalidInput(format!(
                "cannot average field {} over {:?}: {}",
                describe(data),
                dims,
                e
            ))
        })?;
        let weights = data.broadcast_by_name(weights)?;

        let valid_weights = Zip::from(data.data())
            .and(&weights)
            .map_collect(|&d, &w| if d.is_finite() && w.is_finite() { w } else { 0.0 });
        let weighted = Zip::from(data.data())
            .and(&valid_weights)
            .map_collect(|&d, &w| if w != 0.0 { d * w } else { 0.0 });

        let total = sum_axes(valid_weights, &axes);
        let mean = sum_axes(weighted, &axes) / &total;
        data.reduced(&dims, mean)
    }
}

fn describe(data: &DataArray) -> String {
    data.name()
        .map(|n| format!("'{}'", n))
        .unwrap_or_else(|| "<unnamed>".to_string())
}

/// Area-weighted global average with default [`GridParameters`]
pub fn global_average(data: &Field, weights: Option<&DataArray>) -> ToeResult<Field> {
    AreaWeightedMean::default().reduce(data, weights)
}
