//! Grid parameters
//!
//! Configuration shared by the area engine, the aggregator and the longitude
//! helpers. Every field has a default, so a partial TOML document is enough:
//!
//! ```rust
//! use toe_core::parameters::GridParameters;
//!
//! let params = GridParameters::from_toml_str("radius = 6371000.0").unwrap();
//! assert_eq!(params.radius, 6371000.0);
//! assert_eq!(params.lon_dim, "lon");
//! ```

use crate::errors::{ToeError, ToeResult};
use crate::geometry::R_EARTH;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    /// Sphere radius (m) used for cell areas.
    ///
    /// Default: 6,375,000 m
    pub radius: FloatValue,

    /// Name of the longitude dimension.
    ///
    /// Default: "lon"
    pub lon_dim: String,

    /// Name of the latitude dimension.
    ///
    /// Default: "lat"
    pub lat_dim: String,

    /// Keep a longitude of exactly 180 as +180 when shifting to [-180, 180).
    ///
    /// When false, 180 maps to -180 (180 W).
    /// Default: true
    pub negative_dateline: bool,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            radius: R_EARTH,
            lon_dim: "lon".to_string(),
            lat_dim: "lat".to_string(),
            negative_dateline: true,
        }
    }
}

impl GridParameters {
    /// Parse parameters from a TOML document, filling in defaults
    pub fn from_toml_str(source: &str) -> ToeResult<Self> {
        let params: Self = toml::from_str(source).map_err(|e| ToeError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters describe a usable grid
    pub fn validate(&self) -> ToeResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ToeError::Config(format!(
                "radius must be positive and finite, got {}",
                self.radius
            )));
        }
        if self.lon_dim == self.lat_dim {
            return Err(ToeError::Config(format!(
                "lon_dim and lat_dim must differ, both are '{}'",
                self.lon_dim
            )));
        }
        Ok(())
    }

    /// The declared spatial dimensions, longitude first
    pub fn spatial_dims(&self) -> [&str; 2] {
        [self.lon_dim.as_str(), self.lat_dim.as_str()]
    }
}
