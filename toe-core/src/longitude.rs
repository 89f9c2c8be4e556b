//! Longitude conventions
//!
//! Converts fields from a [0, 360) longitude convention to [-180, 180).
//! [`shift_lons`] only relabels the coordinate; [`roll_to_monotonic`] then
//! rotates data and coordinate together so that longitudes increase again.
//!
//! The rotation offset is `floor(len / 2) - 1`, derived from the length of
//! the dimension alone. It restores monotonic order for grids split evenly
//! across the dateline, which is the case for an evenly spaced [0, 360) grid
//! of even length shifted with `negative_dateline = true`. Other grids are
//! rotated by the same offset regardless, and a warning is logged when the
//! result is not strictly increasing.
//!
//! ```rust
//! use ndarray::{array, Array1};
//! use toe_core::labeled::DataArray;
//! use toe_core::longitude::{roll_to_monotonic, shift_lons};
//!
//! let field = DataArray::new(
//!     array![1.0, 2.0, 3.0, 4.0].into_dyn(),
//!     &["lon"],
//!     vec![array![0.0, 90.0, 180.0, 270.0]],
//! )
//! .unwrap();
//!
//! let shifted = shift_lons(&field, "lon", true).unwrap();
//! assert_eq!(*shifted.coord("lon").unwrap(), array![0.0, 90.0, 180.0, -90.0]);
//!
//! let rolled = roll_to_monotonic(&shifted, "lon").unwrap();
//! assert_eq!(*rolled.coord("lon").unwrap(), array![-90.0, 0.0, 90.0, 180.0]);
//! assert_eq!(rolled.data().as_slice().unwrap(), &[4.0, 1.0, 2.0, 3.0]);
//! ```

use crate::errors::{ToeError, ToeResult};
use crate::labeled::DataArray;
use crate::parameters::GridParameters;
use crate::FloatValue;
use log::warn;
use ndarray::{concatenate, Array1, Axis, Slice};

/// Map one longitude from [0, 360) to [-180, 180)
///
/// With `negative_dateline` a longitude of exactly 180 is kept as +180;
/// otherwise it becomes -180 (180 W).
pub fn shift_lon(lon: FloatValue, negative_dateline: bool) -> FloatValue {
    let wraps = if negative_dateline {
        lon > 180.0
    } else {
        lon >= 180.0
    };
    if wraps {
        lon - 360.0
    } else {
        lon
    }
}

/// Copy of `field` with its `lon_dim` coordinate mapped to [-180, 180)
///
/// The data is not reordered.
pub fn shift_lons(
    field: &DataArray,
    lon_dim: &str,
    negative_dateline: bool,
) -> ToeResult<DataArray> {
    let shifted = field
        .coord(lon_dim)?
        .mapv(|v| shift_lon(v, negative_dateline));
    field.with_coord(lon_dim, shifted)
}

/// Rotate data and coordinate of `dim` cyclically by `shift` positions
///
/// A positive shift moves elements towards higher indices, wrapping the tail
/// around to the front.
pub fn roll(field: &DataArray, dim: &str, shift: isize) -> ToeResult<DataArray> {
    let axis = Axis(field.axis_index(dim)?);
    let n = field.data().len_of(axis);
    if n == 0 {
        return Ok(field.clone());
    }
    let k = shift.rem_euclid(n as isize) as usize;
    if k == 0 {
        return Ok(field.clone());
    }
    let split = n - k;

    let data = field.data();
    let rolled = concatenate(
        axis,
        &[
            data.slice_axis(axis, Slice::from(split..)),
            data.slice_axis(axis, Slice::from(..split)),
        ],
    )
    .map_err(|e| ToeError::InvalidInput(e.to_string()))?;

    let coord = field.coord(dim)?;
    let rolled_coord: Array1<FloatValue> = concatenate(
        Axis(0),
        &[
            coord.slice_axis(Axis(0), Slice::from(split..)),
            coord.slice_axis(Axis(0), Slice::from(..split)),
        ],
    )
    .map_err(|e| ToeError::InvalidInput(e.to_string()))?;

    field.with_data(rolled)?.with_coord(dim, rolled_coord)
}

/// Roll `dim` by `floor(len / 2) - 1` so a dateline-shifted grid increases again
pub fn roll_to_monotonic(field: &DataArray, dim: &str) -> ToeResult<DataArray> {
    let n = field.data().len_of(Axis(field.axis_index(dim)?));
    let offset = (n / 2) as isize - 1;
    let rolled = roll(field, dim, offset)?;

    let coord = rolled.coord(dim)?;
    if !coord.iter().zip(coord.iter().skip(1)).all(|(a, b)| a < b) {
        warn!(
            "'{}' is not strictly increasing after rolling by {}; the grid may not be split evenly across the dateline",
            dim, offset
        );
    }
    Ok(rolled)
}

/// [`shift_lons`] followed by [`roll_to_monotonic`], using the names and
/// dateline convention in `params`
pub fn shift_roll(field: &DataArray, params: &GridParameters) -> ToeResult<DataArray> {
    let shifted = shift_lons(field, &params.lon_dim, params.negative_dateline)?;
    roll_to_monotonic(&shifted, &params.lon_dim)
}
