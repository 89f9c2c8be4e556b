//! Grid-cell areas, area-weighted averages and longitude handling for
//! regular lat/lon grids. See [`toe_core`] for the implementation.

pub use toe_core::*;

#[cfg(feature = "python")]
mod python;
