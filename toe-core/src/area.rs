//! Grid-cell areas for regular lat/lon grids
//!
//! Cell widths are the *mean* absolute spacing of each coordinate array, so a
//! grid that is only approximately regular is treated as if it were exactly
//! regular. Areas are therefore constant along a latitude band.
//!
//! ```rust
//! use ndarray::Array1;
//! use toe_core::area::area_grid;
//!
//! let lon = Array1::range(0.0, 360.0, 2.5);
//! let lat = Array1::linspace(-90.0, 90.0, 73);
//! let areas = area_grid(&lon, &lat, 1.0).unwrap();
//! assert_eq!(areas.dim(), (144, 73));
//!
//! // A full global grid covers the sphere
//! let total: f64 = areas.sum();
//! assert!((total - 4.0 * std::f64::consts::PI).abs() < 1e-6);
//! ```

use crate::errors::{ToeError, ToeResult};
use crate::geometry::cell_area;
use crate::labeled::DataArray;
use crate::parameters::GridParameters;
use crate::FloatValue;
use log::debug;
use ndarray::{Array1, Array2};

/// Areas (in `radius` units squared) of every cell of the grid, shaped `(nlon, nlat)`
pub fn area_grid(
    lon: &Array1<FloatValue>,
    lat: &Array1<FloatValue>,
    radius: FloatValue,
) -> ToeResult<Array2<FloatValue>> {
    let dlon = mean_spacing(lon, "lon")?.to_radians();
    let dlat = mean_spacing(lat, "lat")?.to_radians();
    debug!(
        "Computing cell areas for a {}x{} grid (dlon={:.6} rad, dlat={:.6} rad)",
        lon.len(),
        lat.len(),
        dlon,
        dlat
    );

    let band_areas: Array1<FloatValue> =
        lat.mapv(|l| cell_area((90.0 - l).to_radians(), dlat / 2.0, dlon, radius));

    Ok(Array2::from_shape_fn((lon.len(), lat.len()), |(_, j)| {
        band_areas[j]
    }))
}

/// Cell areas in m² as a labeled `(lon, lat)` field
///
/// Dimension names and the sphere radius come from `params`. The result is
/// named `area` and carries `long_name` and `units` attributes.
pub fn area_field(
    lon: &Array1<FloatValue>,
    lat: &Array1<FloatValue>,
    params: &GridParameters,
) -> ToeResult<DataArray> {
    let areas = area_grid(lon, lat, params.radius)?;
    let field = DataArray::from_2d_any_order(
        areas,
        [params.lon_dim.as_str(), params.lat_dim.as_str()],
        [lon.clone(), lat.clone()],
    )?;
    Ok(field
        .with_name("area")
        .with_attr("long_name", "grid cell area")
        .with_attr("units", "m^2"))
}

/// Mean absolute difference between consecutive coordinate values
fn mean_spacing(values: &Array1<FloatValue>, dim: &str) -> ToeResult<FloatValue> {
    let n = values.len();
    if n < 2 {
        return Err(ToeError::DegenerateGrid {
            dim: dim.to_string(),
            len: n,
        });
    }
    let total: FloatValue = values
        .iter()
        .zip(values.iter().skip(1))
        .map(|(a, b)| b - a)
        .sum();
    Ok((total / (n - 1) as FloatValue).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::R_EARTH;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::f64::consts::PI;

    #[test]
    fn spacing_is_mean_of_differences() {
        assert_eq!(mean_spacing(&array![0.0, 1.0, 3.0], "x").unwrap(), 1.5);
        assert_eq!(mean_spacing(&array![90.0, 0.0, -90.0], "x").unwrap(), 90.0);
        assert_eq!(
            mean_spacing(&array![1.0], "lat"),
            Err(ToeError::DegenerateGrid {
                dim: "lat".to_string(),
                len: 1
            })
        );
    }

    #[test]
    fn areas_constant_along_band() {
        let lon = Array1::range(0.0, 360.0, 30.0);
        let lat = array![-60.0, -20.0, 20.0, 60.0];
        let areas = area_grid(&lon, &lat, R_EARTH).unwrap();
        for j in 0..lat.len() {
            let first = areas[[0, j]];
            assert!(areas.column(j).iter().all(|&a| a == first));
        }
        // Symmetric about the equator
        assert_relative_eq!(areas[[0, 0]], areas[[0, 3]], max_relative = 1e-12);
        assert!(areas[[0, 1]] > areas[[0, 0]]);
    }

    #[test]
    fn descending_latitudes_give_same_areas() {
        let lon = Array1::range(0.0, 360.0, 10.0);
        let up = Array1::linspace(-90.0, 90.0, 19);
        let down = Array1::linspace(90.0, -90.0, 19);
        let a = area_grid(&lon, &up, 1.0).unwrap();
        let b = area_grid(&lon, &down, 1.0).unwrap();
        for j in 0..19 {
            assert_relative_eq!(a[[0, j]], b[[0, 18 - j]], max_relative = 1e-12);
        }
    }

    #[test]
    fn pole_rows_are_finite_and_positive() {
        let lon = Array1::range(0.0, 360.0, 5.0);
        let lat = Array1::linspace(-90.0, 90.0, 37);
        let areas = area_grid(&lon, &lat, R_EARTH).unwrap();
        let nlat = lat.len();
        for j in [0, nlat - 1] {
            assert!(areas.column(j).iter().all(|a| a.is_finite() && *a > 0.0));
        }
        let cap = R_EARTH.powi(2) * (1.0 - 2.5_f64.to_radians().cos()) * 5.0_f64.to_radians();
        assert_relative_eq!(areas[[0, 0]], cap, max_relative = 1e-12);
    }

    #[test]
    fn field_has_metadata_and_layout() {
        let lon = array![0.0, 90.0, 180.0, 270.0];
        let lat = array![-45.0, 0.0, 45.0];
        let field = area_field(&lon, &lat, &GridParameters::default()).unwrap();
        assert_eq!(field.name(), Some("area"));
        assert_eq!(field.dims(), &["lon".to_string(), "lat".to_string()]);
        assert_eq!(field.shape(), &[4, 3]);
        assert_eq!(field.attrs()["units"], "m^2");
        assert_eq!(field.attrs()["long_name"], "grid cell area");
        assert_eq!(*field.coord("lat").unwrap(), lat);
    }

    #[test]
    fn field_uses_configured_names_and_radius() {
        let params = GridParameters {
            radius: 1.0,
            lon_dim: "x".to_string(),
            lat_dim: "y".to_string(),
            ..Default::default()
        };
        let lon = Array1::range(0.0, 360.0, 90.0);
        let lat = Array1::linspace(-90.0, 90.0, 5);
        let field = area_field(&lon, &lat, &params).unwrap();
        assert!(field.has_dim("x"));
        assert!(field.has_dim("y"));
        assert_relative_eq!(field.data().sum(), 4.0 * PI, max_relative = 1e-12);
    }

    #[test]
    fn square_grid_keeps_axis_order() {
        let lon = array![0.0, 120.0, 240.0];
        let lat = array![-60.0, 0.0, 60.0];
        let field = area_field(&lon, &lat, &GridParameters::default()).unwrap();
        // Equatorial band is the middle latitude column
        assert!(field.data()[[0, 1]] > field.data()[[0, 0]]);
        assert_eq!(field.data()[[0, 0]], field.data()[[2, 0]]);
    }
}
