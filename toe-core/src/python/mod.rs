//! Python bindings for the grid statistics
//!
//! Exposed as `toe._lib.core`. The functions take and return numpy arrays;
//! labeled arrays are assembled from explicit dimension names on the way in.

use crate::errors::ToeError;
use crate::geometry::R_EARTH;
use crate::labeled::DataArray;
use crate::parameters::GridParameters;
use crate::{aggregate, area, geometry, utils, FloatValue};
use ndarray::Array1;
use numpy::{
    AllowTypeChange, IntoPyArray, PyArray1, PyArray2, PyArrayDyn, PyArrayLikeDyn, PyReadonlyArray1,
    PyReadonlyArrayDyn,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(err: ToeError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Area (m^2) of every cell of the grid, shaped (len(lon), len(lat))
#[pyfunction]
#[pyo3(name = "area_grid", signature = (lon, lat, radius=R_EARTH))]
pub fn py_area_grid<'py>(
    py: Python<'py>,
    lon: PyReadonlyArray1<'py, FloatValue>,
    lat: PyReadonlyArray1<'py, FloatValue>,
    radius: FloatValue,
) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
    let areas = area::area_grid(&lon.as_array().to_owned(), &lat.as_array().to_owned(), radius)
        .map_err(to_py_err)?;
    Ok(areas.into_pyarray(py))
}

/// Great-circle distance in degrees between points, scaled by `r`
///
/// Each argument may be a scalar or an array; they broadcast together, so a
/// single point can be measured against a whole grid.
#[pyfunction]
#[pyo3(name = "great_circle_dist", signature = (lon1, lat1, lon2, lat2, r=1.0))]
pub fn py_great_circle_dist<'py>(
    py: Python<'py>,
    lon1: PyArrayLikeDyn<'py, FloatValue, AllowTypeChange>,
    lat1: PyArrayLikeDyn<'py, FloatValue, AllowTypeChange>,
    lon2: PyArrayLikeDyn<'py, FloatValue, AllowTypeChange>,
    lat2: PyArrayLikeDyn<'py, FloatValue, AllowTypeChange>,
    r: FloatValue,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let distances = geometry::great_circle_distances(
        lon1.as_array(),
        lat1.as_array(),
        lon2.as_array(),
        lat2.as_array(),
        r,
    )
    .map_err(to_py_err)?;
    Ok(distances.into_pyarray(py))
}

/// Map longitudes from [0, 360) to [-180, 180)
#[pyfunction]
#[pyo3(name = "shift_lons", signature = (lons, negative_dateline=true))]
pub fn py_shift_lons<'py>(
    py: Python<'py>,
    lons: PyReadonlyArray1<'py, FloatValue>,
    negative_dateline: bool,
) -> Bound<'py, PyArray1<FloatValue>> {
    lons.as_array()
        .mapv(|v| crate::longitude::shift_lon(v, negative_dateline))
        .into_pyarray(py)
}

/// Area-weighted average of `data` over its lon/lat axes
///
/// `dims` names every axis of `data` and must include "lon" and "lat".
/// `weights`, if given, is shaped (len(lon), len(lat)); otherwise cell areas
/// are used. Missing values get zero weight.
#[pyfunction]
#[pyo3(name = "global_avg", signature = (data, dims, lon, lat, weights=None))]
pub fn py_global_avg<'py>(
    py: Python<'py>,
    data: PyReadonlyArrayDyn<'py, FloatValue>,
    dims: Vec<String>,
    lon: PyReadonlyArray1<'py, FloatValue>,
    lat: PyReadonlyArray1<'py, FloatValue>,
    weights: Option<PyReadonlyArrayDyn<'py, FloatValue>>,
) -> PyResult<Bound<'py, PyArrayDyn<FloatValue>>> {
    let params = GridParameters::default();
    let data = data.as_array().to_owned();
    let lon = lon.as_array().to_owned();
    let lat = lat.as_array().to_owned();

    let coords = dims
        .iter()
        .zip(data.shape())
        .map(|(dim, &n)| {
            if *dim == params.lon_dim {
                lon.clone()
            } else if *dim == params.lat_dim {
                lat.clone()
            } else {
                Array1::range(0.0, n as FloatValue, 1.0)
            }
        })
        .collect();
    let field = DataArray::new(data, &dims[..], coords).map_err(to_py_err)?;

    let weights = weights
        .map(|w| {
            DataArray::new(
                w.as_array().to_owned(),
                &params.spatial_dims()[..],
                vec![lon.clone(), lat.clone()],
            )
        })
        .transpose()
        .map_err(to_py_err)?;

    let mean = aggregate::AreaWeightedMean::from_parameters(params)
        .map_err(to_py_err)?
        .reduce_array(&field, weights.as_ref())
        .map_err(to_py_err)?;
    Ok(mean.data().clone().into_pyarray(py))
}

/// The calendar months within `width` of `month`, wrapping around the year
#[pyfunction]
#[pyo3(name = "months_surrounding", signature = (month, width=1))]
pub fn py_months_surrounding(month: u32, width: u32) -> PyResult<Vec<u32>> {
    utils::months_surrounding(month, width).map_err(to_py_err)
}

/// Index of the element of `values` closest to `value`
#[pyfunction]
#[pyo3(name = "find_nearest")]
pub fn py_find_nearest(values: PyReadonlyArray1<'_, FloatValue>, value: FloatValue) -> Option<usize> {
    let values = values.as_array().to_vec();
    utils::find_nearest(&values, value)
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_area_grid, m)?)?;
    m.add_function(wrap_pyfunction!(py_great_circle_dist, m)?)?;
    m.add_function(wrap_pyfunction!(py_shift_lons, m)?)?;
    m.add_function(wrap_pyfunction!(py_global_avg, m)?)?;
    m.add_function(wrap_pyfunction!(py_months_surrounding, m)?)?;
    m.add_function(wrap_pyfunction!(py_find_nearest, m)?)?;
    m.add("R_EARTH", R_EARTH)?;
    Ok(())
}
