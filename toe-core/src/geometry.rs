//! Spherical geometry shared by the area engine and the distance helpers
//!
//! Both functions keep the numerically stable forms: the polar-cap sector
//! for cells centred on a pole, and the `atan2` (Vincenty, equal axes) form of
//! the great-circle distance instead of a plain `acos`.

use crate::errors::{ToeError, ToeResult};
use crate::FloatValue;
use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};
use std::f64::consts::PI;

/// Earth's radius (m) used for cell areas unless overridden
pub const R_EARTH: FloatValue = 6_375_000.0;

/// Colatitudes closer than this to 0 or π are treated as lying on a pole
const POLE_TOLERANCE: FloatValue = 1e-12;

/// Area of one cell of a latitude band on a sphere
///
/// The band is centred on `colatitude` (radians from the north pole) and spans
/// `half_width` radians either side of it; `lon_spacing` is the longitudinal
/// width of the cell in radians. The result is in `radius` units squared:
///
/// $$A = r^2 \left| \cos(\theta - \Delta/2) - \cos(\theta + \Delta/2) \right| \Delta\lambda$$
///
/// At a pole the two cosines are equal and the difference vanishes, so a
/// polar-cap sector $r^2 |\cos(\Delta/2) - 1| \Delta\lambda$ is used instead.
///
/// ```rust
/// use toe_core::geometry::cell_area;
///
/// // Northern hemisphere of a unit sphere as one band, split into 4 sectors
/// let quarter = cell_area(std::f64::consts::FRAC_PI_4, std::f64::consts::FRAC_PI_4,
///                         std::f64::consts::FRAC_PI_2, 1.0);
/// assert!(quarter > 0.0);
/// ```
pub fn cell_area(
    colatitude: FloatValue,
    half_width: FloatValue,
    lon_spacing: FloatValue,
    radius: FloatValue,
) -> FloatValue {
    let r2 = radius * radius;
    if is_pole(colatitude) {
        r2 * (half_width.cos() - 1.0).abs() * lon_spacing
    } else {
        r2 * ((colatitude - half_width).cos() - (colatitude + half_width).cos()).abs() * lon_spacing
    }
}

fn is_pole(colatitude: FloatValue) -> bool {
    colatitude.abs() < POLE_TOLERANCE || (colatitude - PI).abs() < POLE_TOLERANCE
}

/// Great-circle distance between two points given in degrees
///
/// Returns the central angle in degrees multiplied by `r`; pass `r = 1.0` for
/// the bare angle. NaN inputs propagate to the output.
pub fn great_circle_distance(
    lon1: FloatValue,
    lat1: FloatValue,
    lon2: FloatValue,
    lat2: FloatValue,
    r: FloatValue,
) -> FloatValue {
    let (s1, c1) = lat1.to_radians().sin_cos();
    let (s2, c2) = lat2.to_radians().sin_cos();
    let (sd, cd) = (lon1 - lon2).to_radians().sin_cos();

    let y = ((c2 * sd).powi(2) + (c1 * s2 - s1 * c2 * cd).powi(2)).sqrt();
    let x = s1 * s2 + c1 * c2 * cd;
    r * y.atan2(x).to_degrees()
}

/// Elementwise [`great_circle_distance`] over arrays that broadcast together
///
/// Shapes combine under the usual trailing-axis broadcasting rules, so a
/// single point given as 0-d arrays can be measured against a whole grid.
pub fn great_circle_distances(
    lon1: ArrayViewD<FloatValue>,
    lat1: ArrayViewD<FloatValue>,
    lon2: ArrayViewD<FloatValue>,
    lat2: ArrayViewD<FloatValue>,
    r: FloatValue,
) -> ToeResult<ArrayD<FloatValue>> {
    let shapes = [lon1.shape(), lat1.shape(), lon2.shape(), lat2.shape()];
    let mismatch = || {
        ToeError::InvalidInput(format!(
            "coordinate arrays of shapes {:?}, {:?}, {:?} and {:?} do not broadcast together",
            shapes[0], shapes[1], shapes[2], shapes[3]
        ))
    };
    let shape = IxDyn(&broadcast_shape(&shapes).ok_or_else(mismatch)?);

    Ok(Zip::from(lon1.broadcast(shape.clone()).ok_or_else(mismatch)?)
        .and(lat1.broadcast(shape.clone()).ok_or_else(mismatch)?)
        .and(lon2.broadcast(shape.clone()).ok_or_else(mismatch)?)
        .and(lat2.broadcast(shape).ok_or_else(mismatch)?)
        .map_collect(|&a, &b, &c, &d| great_circle_distance(a, b, c, d, r)))
}

/// Common shape of `shapes`, aligning trailing axes; length-1 axes stretch
fn broadcast_shape(shapes: &[&[usize]]) -> Option<Vec<usize>> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut shape = vec![1; ndim];
    for s in shapes {
        let offset = ndim - s.len();
        for (out, &n) in shape[offset..].iter_mut().zip(s.iter()) {
            if *out == 1 {
                *out = n;
            } else if n != 1 && n != *out {
                return None;
            }
        }
    }
    Some(shape)
}
