use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Smallest number of points per edge used when transforming bounds
pub const MIN_DENSIFY_POINTS: i32 = 21;

/// Processing provenance written into every item's `processing:*` properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingInfo {
    pub facility: String,
    pub level: String,
    pub version: String,
    pub software_name: String,
    pub software_repo: String,
}

impl Default for ProcessingInfo {
    fn default() -> Self {
        Self {
            facility: "AXIS-3 LAND".to_string(),
            level: "L3".to_string(),
            version: "1.1.0".to_string(),
            software_name: "Axis3LandSbas".to_string(),
            software_repo: "https://github.com/HellenicSpaceCenter/Axis3LandSbas".to_string(),
        }
    }
}

/// Catalog build parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogParams {
    /// EPSG code every stored raster is warped into
    pub canonical_epsg: u32,
    /// EPSG code of the published bbox/geometry/centroid
    pub public_epsg: u32,
    /// Points per edge for the densified bounds transform
    pub densify_points: i32,
    /// Thumbnail edge length in pixels
    pub thumbnail_size: usize,
    pub thumbnail_quality: u8,
    /// Area of interest named in titles
    pub area_name: String,
    pub processing: ProcessingInfo,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            canonical_epsg: 2100,
            public_epsg: 4326,
            densify_points: MIN_DENSIFY_POINTS,
            thumbnail_size: 255,
            thumbnail_quality: 85,
            area_name: "Greece".to_string(),
            processing: ProcessingInfo::default(),
        }
    }
}

impl CatalogParams {
    /// Load parameters from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: CatalogParams = serde_json::from_str(&text)?;
        Ok(params)
    }

    /// Densify count actually used, never below the minimum
    pub fn effective_densify_points(&self) -> i32 {
        self.densify_points.max(MIN_DENSIFY_POINTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: CatalogParams =
            serde_json::from_str(r#"{"canonical_epsg": 32634, "processing": {"level": "L2"}}"#)
                .unwrap();
        assert_eq!(params.canonical_epsg, 32634);
        assert_eq!(params.public_epsg, 4326);
        assert_eq!(params.processing.level, "L2");
        assert_eq!(params.processing.facility, "AXIS-3 LAND");
    }

    #[test]
    fn densify_is_clamped_to_minimum() {
        let params = CatalogParams {
            densify_points: 5,
            ..Default::default()
        };
        assert_eq!(params.effective_densify_points(), 21);
    }
}
