//! Area-weighted spatial statistics for regular longitude/latitude grids
//!
//! - [`geometry`]: spherical cell areas and great-circle distances
//! - [`area`]: per-cell areas of a lat/lon grid
//! - [`aggregate`]: missing-data-aware area-weighted averages
//! - [`longitude`]: conversion between [0, 360) and [-180, 180) longitudes
//! - [`labeled`]: the labeled-array types the above operate on

pub mod aggregate;
pub mod area;
pub mod errors;
pub mod geometry;
pub mod labeled;
pub mod longitude;
pub mod parameters;
#[cfg(feature = "python")]
pub mod python;
pub mod utils;

pub type FloatValue = f64;
