//! Labeled arrays
//!
//! A minimal labeled-array model for gridded fields:
//!
//! - [`DataArray`]: an N-dimensional array with named dimensions and one
//!   coordinate array per dimension
//! - [`Dataset`]: a named collection of [`DataArray`]s
//! - [`Field`]: either of the above, so that reductions can be defined per variant
//!
//! # Examples
//!
//! ```rust
//! use ndarray::{array, Array2};
//! use toe_core::labeled::DataArray;
//!
//! let field = DataArray::new(
//!     Array2::<f64>::zeros((4, 3)).into_dyn(),
//!     &["lon", "lat"],
//!     vec![array![0.0, 90.0, 180.0, 270.0], array![-45.0, 0.0, 45.0]],
//! )
//! .unwrap();
//! assert_eq!(field.shape(), &[4, 3]);
//! assert_eq!(field.coord("lat").unwrap()[2], 45.0);
//! ```

use crate::errors::{ToeError, ToeResult};
use crate::FloatValue;
use log::debug;
use ndarray::{Array1, Array2, ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An N-dimensional numeric array with named dimensions and coordinates
///
/// Construction checks that there is one unique name and one coordinate array
/// per axis, and that every coordinate array has the length of its axis.
/// Every transformation returns a new array; the receiver is never modified.
/// Deserialization runs the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataArray")]
pub struct DataArray {
    name: Option<String>,
    dims: Vec<String>,
    coords: Vec<Array1<FloatValue>>,
    data: ArrayD<FloatValue>,
    attrs: BTreeMap<String, String>,
}

/// Unchecked serialized form of [`DataArray`]
#[derive(Deserialize)]
struct RawDataArray {
    #[serde(default)]
    name: Option<String>,
    dims: Vec<String>,
    coords: Vec<Array1<FloatValue>>,
    data: ArrayD<FloatValue>,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
}

impl TryFrom<RawDataArray> for DataArray {
    type Error = ToeError;

    fn try_from(raw: RawDataArray) -> ToeResult<Self> {
        validate_layout(&raw.data, &raw.dims, &raw.coords)?;
        Ok(Self {
            name: raw.name,
            dims: raw.dims,
            coords: raw.coords,
            data: raw.data,
            attrs: raw.attrs,
        })
    }
}

impl DataArray {
    /// Create a labeled array from data, dimension names and coordinates
    pub fn new<S: AsRef<str>>(
        data: ArrayD<FloatValue>,
        dims: &[S],
        coords: Vec<Array1<FloatValue>>,
    ) -> ToeResult<Self> {
        let dims: Vec<String> = dims.iter().map(|d| d.as_ref().to_string()).collect();
        validate_layout(&data, &dims, &coords)?;
        Ok(Self {
            name: None,
            dims,
            coords,
            data,
            attrs: BTreeMap::new(),
        })
    }

    /// Create a labeled array whose coordinates are the axis indices
    pub fn with_index_coords<S: AsRef<str>>(data: ArrayD<FloatValue>, dims: &[S]) -> ToeResult<Self> {
        let coords = data
            .shape()
            .iter()
            .map(|&n| Array1::range(0.0, n as FloatValue, 1.0))
            .collect();
        Self::new(data, dims, coords)
    }

    /// Create a 2-D labeled array, transposing the data if its axes are swapped
    ///
    /// `data` may be laid out either as `(len(coords[0]), len(coords[1]))` or
    /// the transpose of that; the result always has the axis order of `dims`.
    pub fn from_2d_any_order<S: AsRef<str>>(
        data: Array2<FloatValue>,
        dims: [S; 2],
        coords: [Array1<FloatValue>; 2],
    ) -> ToeResult<Self> {
        let expected = (coords[0].len(), coords[1].len());
        let data = if data.dim() == expected {
            data
        } else if data.dim() == (expected.1, expected.0) {
            debug!(
                "Transposing {:?} array to match ({}, {})",
                data.dim(),
                dims[0].as_ref(),
                dims[1].as_ref()
            );
            data.reversed_axes()
        } else {
            return Err(ToeError::InvalidInput(format!(
                "data of shape {:?} matches neither {:?} nor its transpose",
                data.dim(),
                expected
            )));
        };
        let [c0, c1] = coords;
        Self::new(data.into_dyn(), &dims, vec![c0, c1])
    }

    /// Set the name of the array
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add or replace a descriptive attribute
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    /// Replace the data, keeping dimensions, coordinates, name and attributes
    pub fn with_data(&self, data: ArrayD<FloatValue>) -> ToeResult<Self> {
        if data.shape() != self.shape() {
            return Err(ToeError::InvalidInput(format!(
                "replacement data has shape {:?}, expected {:?}",
                data.shape(),
                self.shape()
            )));
        }
        Ok(Self {
            data,
            ..self.clone()
        })
    }

    /// Replace the coordinate values of one dimension
    pub fn with_coord(&self, dim: &str, values: Array1<FloatValue>) -> ToeResult<Self> {
        let axis = self.axis_index(dim)?;
        if values.len() != self.data.len_of(Axis(axis)) {
            return Err(ToeError::InvalidInput(format!(
                "coordinate '{}' needs {} values, got {}",
                dim,
                self.data.len_of(Axis(axis)),
                values.len()
            )));
        }
        let mut out = self.clone();
        out.coords[axis] = values;
        Ok(out)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<FloatValue> {
        &self.data
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Position of `dim` among the array axes, if present
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Position of `dim` among the array axes
    pub fn axis_index(&self, dim: &str) -> ToeResult<usize> {
        self.axis_of(dim)
            .ok_or_else(|| ToeError::DimensionNotFound(dim.to_string()))
    }

    /// Coordinate values along `dim`
    pub fn coord(&self, dim: &str) -> ToeResult<&Array1<FloatValue>> {
        self.axis_index(dim).map(|axis| &self.coords[axis])
    }

    /// Broadcast `weights` against this array by dimension name
    ///
    /// Every dimension of `weights` must exist here with the same length; the
    /// weights are transposed into this array's axis order and repeated along
    /// the dimensions they lack.
    pub fn broadcast_by_name(&self, weights: &DataArray) -> ToeResult<ArrayD<FloatValue>> {
        let mut positions = Vec::with_capacity(weights.dims.len());
        for (w_axis, dim) in weights.dims.iter().enumerate() {
            let axis = self.axis_of(dim).ok_or_else(|| {
                ToeError::InvalidInput(format!(
                    "weights have dimension '{}' which the data does not",
                    dim
                ))
            })?;
            let (expected, got) = (self.data.len_of(Axis(axis)), weights.data.len_of(Axis(w_axis)));
            if expected != got {
                return Err(ToeError::InvalidInput(format!(
                    "weights have length {} along '{}', data has {}",
                    got, dim, expected
                )));
            }
            positions.push((axis, w_axis));
        }

        // Order the weight axes as they appear in the data, then add unit
        // axes for every data dimension the weights do not carry.
        positions.sort_unstable();
        let permutation: Vec<usize> = positions.iter().map(|&(_, w_axis)| w_axis).collect();
        let mut view: ArrayViewD<FloatValue> = weights.data.view().permuted_axes(permutation);
        for axis in 0..self.dims.len() {
            if !positions.iter().any(|&(a, _)| a == axis) {
                view.insert_axis_inplace(Axis(axis));
            }
        }

        view.broadcast(self.data.raw_dim())
            .map(|b| b.to_owned())
            .ok_or_else(|| {
                ToeError::InvalidInput(format!(
                    "weights of shape {:?} cannot be broadcast to {:?}",
                    weights.shape(),
                    self.shape()
                ))
            })
    }

    /// Drop `dims` by replacing the data with `reduced`
    ///
    /// `reduced` must already have the remaining axes in order.
    pub(crate) fn reduced(&self, dims: &[&str], reduced: ArrayD<FloatValue>) -> ToeResult<Self> {
        let mut kept_dims = Vec::new();
        let mut kept_coords = Vec::new();
        for (dim, coord) in self.dims.iter().zip(self.coords.iter()) {
            if !dims.contains(&dim.as_str()) {
                kept_dims.push(dim.clone());
                kept_coords.push(coord.clone());
            }
        }
        validate_layout(&reduced, &kept_dims, &kept_coords)?;
        Ok(Self {
            name: self.name.clone(),
            dims: kept_dims,
            coords: kept_coords,
            data: reduced,
            attrs: self.attrs.clone(),
        })
    }

    /// Sum over `dims`, skipping NaN values
    ///
    /// A slice that is entirely NaN sums to zero.
    pub fn sum_dims(&self, dims: &[&str]) -> ToeResult<Self> {
        let axes = self.axes_of(dims)?;
        let summed = sum_axes(self.data.mapv(|v| if v.is_nan() { 0.0 } else { v }), &axes);
        self.reduced(dims, summed)
    }

    /// Axis indices of `dims`, in descending order so they can be removed one by one
    pub(crate) fn axes_of(&self, dims: &[&str]) -> ToeResult<Vec<usize>> {
        let mut axes = dims
            .iter()
            .map(|d| self.axis_index(d))
            .collect::<ToeResult<Vec<_>>>()?;
        axes.sort_unstable_by(|a, b| b.cmp(a));
        axes.dedup();
        Ok(axes)
    }
}

/// Sum `data` over `axes`, which must be sorted in descending order
pub(crate) fn sum_axes(data: ArrayD<FloatValue>, axes: &[usize]) -> ArrayD<FloatValue> {
    axes.iter()
        .fold(data, |acc, &axis| acc.sum_axis(Axis(axis)))
}

fn validate_layout(
    data: &ArrayD<FloatValue>,
    dims: &[String],
    coords: &[Array1<FloatValue>],
) -> ToeResult<()> {
    if dims.len() != data.ndim() {
        return Err(ToeError::InvalidInput(format!(
            "{} dimension name(s) given for a {}-dimensional array",
            dims.len(),
            data.ndim()
        )));
    }
    if coords.len() != dims.len() {
        return Err(ToeError::InvalidInput(format!(
            "{} coordinate array(s) given for {} dimension(s)",
            coords.len(),
            dims.len()
        )));
    }
    for (i, dim) in dims.iter().enumerate() {
        if dims[..i].contains(dim) {
            return Err(ToeError::InvalidInput(format!(
                "dimension '{}' appears more than once",
                dim
            )));
        }
        if coords[i].len() != data.len_of(Axis(i)) {
            return Err(ToeError::InvalidInput(format!(
                "coordinate '{}' has {} values but the axis has length {}",
                dim,
                coords[i].len(),
                data.len_of(Axis(i))
            )));
        }
    }
    Ok(())
}

/// A named collection of labeled arrays
///
/// Variables are kept in name order. Inserting a variable sets its name to
/// the key it is stored under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    variables: BTreeMap<String, DataArray>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, returning any previous variable with the same name
    pub fn insert(&mut self, name: &str, variable: DataArray) -> Option<DataArray> {
        self.variables
            .insert(name.to_string(), variable.with_name(name))
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_variable(mut self, name: &str, variable: DataArray) -> Self {
        self.insert(name, variable);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataArray)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True if any variable carries `dim`
    pub fn has_dim(&self, dim: &str) -> bool {
        self.variables.values().any(|v| v.has_dim(dim))
    }
}

impl FromIterator<(String, DataArray)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (String, DataArray)>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for (name, variable) in iter {
            dataset.insert(&name, variable);
        }
        dataset
    }
}

impl IntoIterator for Dataset {
    type Item = (String, DataArray);
    type IntoIter = std::collections::btree_map::IntoIter<String, DataArray>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

/// Either a single labeled array or a named collection of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Single(DataArray),
    Collection(Dataset),
}

impl Field {
    pub fn as_single(&self) -> Option<&DataArray> {
        match self {
            Field::Single(array) => Some(array),
            Field::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Dataset> {
        match self {
            Field::Single(_) => None,
            Field::Collection(dataset) => Some(dataset),
        }
    }
}

impl From<DataArray> for Field {
    fn from(array: DataArray) -> Self {
        Field::Single(array)
    }
}

impl From<Dataset> for Field {
    fn from(dataset: Dataset) -> Self {
        Field::Collection(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn lon_lat_field() -> DataArray {
        DataArray::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(),
            &["lon", "lat"],
            vec![array![0.0, 180.0], array![-30.0, 0.0, 30.0]],
        )
        .unwrap()
    }

    #[test]
    fn construction_checks_layout() {
        let data = Array2::<f64>::zeros((2, 3)).into_dyn();
        assert!(DataArray::new(data.clone(), &["lon"], vec![array![0.0, 1.0]]).is_err());
        assert!(DataArray::new(
            data.clone(),
            &["lon", "lat"],
            vec![array![0.0, 1.0], array![0.0, 1.0]]
        )
        .is_err());
        assert!(DataArray::new(
            data.clone(),
            &["lon", "lon"],
            vec![array![0.0, 1.0], array![0.0, 1.0, 2.0]]
        )
        .is_err());
        assert!(DataArray::new(
            data,
            &["lon", "lat"],
            vec![array![0.0, 1.0], array![0.0, 1.0, 2.0]]
        )
        .is_ok());
    }

    #[test]
    fn index_coords() {
        let field =
            DataArray::with_index_coords(Array2::<f64>::zeros((2, 3)).into_dyn(), &["x", "y"])
                .unwrap();
        assert_eq!(*field.coord("y").unwrap(), array![0.0, 1.0, 2.0]);
    }

    #[test]
    fn two_d_any_order_transposes() {
        let lon = array![0.0, 120.0, 240.0];
        let lat = array![-45.0, 45.0];
        // (lat, lon) layout
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let field =
            DataArray::from_2d_any_order(data, ["lon", "lat"], [lon.clone(), lat.clone()]).unwrap();
        assert_eq!(field.shape(), &[3, 2]);
        assert_eq!(field.data()[[2, 0]], 3.0);
        assert_eq!(field.data()[[0, 1]], 4.0);

        let bad = Array2::<f64>::zeros((4, 4));
        assert!(DataArray::from_2d_any_order(bad, ["lon", "lat"], [lon, lat]).is_err());
    }

    #[test]
    fn missing_coord() {
        let field = lon_lat_field();
        assert_eq!(
            field.coord("time"),
            Err(ToeError::DimensionNotFound("time".to_string()))
        );
    }

    #[test]
    fn with_coord_does_not_touch_original() {
        let field = lon_lat_field();
        let shifted = field.with_coord("lon", array![10.0, 20.0]).unwrap();
        assert_eq!(*field.coord("lon").unwrap(), array![0.0, 180.0]);
        assert_eq!(*shifted.coord("lon").unwrap(), array![10.0, 20.0]);
        assert!(field.with_coord("lon", array![1.0]).is_err());
    }

    #[test]
    fn broadcast_transposes_and_repeats() {
        let data = DataArray::with_index_coords(
            Array3::<f64>::zeros((2, 2, 3)).into_dyn(),
            &["time", "lon", "lat"],
        )
        .unwrap();
        // Weights laid out (lat, lon)
        let weights = DataArray::with_index_coords(
            array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn(),
            &["lat", "lon"],
        )
        .unwrap();
        let broadcast = data.broadcast_by_name(&weights).unwrap();
        assert_eq!(broadcast.shape(), &[2, 2, 3]);
        for t in 0..2 {
            assert_eq!(broadcast[[t, 0, 0]], 1.0);
            assert_eq!(broadcast[[t, 1, 0]], 2.0);
            assert_eq!(broadcast[[t, 0, 2]], 5.0);
            assert_eq!(broadcast[[t, 1, 2]], 6.0);
        }
    }

    #[test]
    fn broadcast_rejects_mismatch() {
        let data = lon_lat_field();
        let wrong_len = DataArray::with_index_coords(
            Array2::<f64>::ones((2, 2)).into_dyn(),
            &["lon", "lat"],
        )
        .unwrap();
        assert!(matches!(
            data.broadcast_by_name(&wrong_len),
            Err(ToeError::InvalidInput(_))
        ));

        let extra_dim =
            DataArray::with_index_coords(Array2::<f64>::ones((2, 5)).into_dyn(), &["lon", "time"])
                .unwrap();
        assert!(matches!(
            data.broadcast_by_name(&extra_dim),
            Err(ToeError::InvalidInput(_))
        ));
    }

    #[test]
    fn sum_dims_skips_nan() {
        let field = DataArray::new(
            array![[1.0, f64::NAN, 3.0], [4.0, 5.0, f64::NAN]].into_dyn(),
            &["lon", "lat"],
            vec![array![0.0, 180.0], array![-30.0, 0.0, 30.0]],
        )
        .unwrap()
        .with_name("tas")
        .with_attr("units", "K");

        let by_lat = field.sum_dims(&["lon"]).unwrap();
        assert_eq!(by_lat.dims(), &["lat".to_string()]);
        assert_eq!(by_lat.data().as_slice().unwrap(), &[5.0, 5.0, 3.0]);
        assert_eq!(*by_lat.coord("lat").unwrap(), array![-30.0, 0.0, 30.0]);
        assert_eq!(by_lat.name(), Some("tas"));
        assert_eq!(by_lat.attrs()["units"], "K");

        let total = field.sum_dims(&["lat", "lon"]).unwrap();
        assert_eq!(total.shape(), &[] as &[usize]);
        assert_eq!(total.data().sum(), 13.0);
    }

    #[test]
    fn dataset_names_variables() {
        let dataset = Dataset::new().with_variable("tas", lon_lat_field());
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get("tas").unwrap().name(), Some("tas"));
        assert!(dataset.has_dim("lat"));
        assert!(!dataset.has_dim("time"));
    }

    #[test]
    fn field_variants() {
        let single: Field = lon_lat_field().into();
        assert!(single.as_single().is_some());
        assert!(single.as_collection().is_none());

        let collection: Field = Dataset::new().into();
        assert!(collection.as_collection().is_some());
    }

    #[test]
    fn deserialization_round_trip() {
        let field = lon_lat_field().with_name("tas").with_attr("units", "K");
        let json = serde_json::to_string(&Field::Single(field.clone())).unwrap();
        let parsed: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_single(), Some(&field));
    }

    #[test]
    fn deserialization_checks_layout() {
        let valid = serde_json::to_value(lon_lat_field()).unwrap();

        let mut missing_coord = valid.clone();
        missing_coord["coords"].as_array_mut().unwrap().pop();
        let err = serde_json::from_value::<DataArray>(missing_coord).unwrap_err();
        assert!(err.to_string().contains("coordinate array(s)"));

        let mut extra_dim = valid.clone();
        extra_dim["dims"].as_array_mut().unwrap().push("time".into());
        assert!(serde_json::from_value::<DataArray>(extra_dim).is_err());

        let mut short_dims = valid.clone();
        short_dims["dims"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<DataArray>(short_dims).is_err());

        let mut nested = serde_json::json!({ "variables": { "tas": valid } });
        nested["variables"]["tas"]["coords"]
            .as_array_mut()
            .unwrap()
            .pop();
        assert!(serde_json::from_value::<Dataset>(nested).is_err());
    }
}
