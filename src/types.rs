//! Shared types used across cogcat.
//! Includes the input `AssetDescriptor`, on-disk `NormalizedRaster`, `Georeference`,
//! `Bounds`, and the catalog-facing `AssetClass` and `MediaType` enums.
use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Detect GDAL subdataset strings like `HDF5:"file.h5"://name` or `NETCDF:"file.nc"://var`.
pub fn is_subdataset_string(s: &str) -> bool {
    ((s.contains("HDF5:\"") || s.contains("NETCDF:\"")) && s.contains("\"://"))
        || s.starts_with("HDF5:")
        || s.starts_with("NETCDF:")
}

/// A gridded dataset held in memory, serialized to a container file before expansion
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    /// File stem used for the serialized container
    pub name: String,
    /// One (rows, cols) array per band; all bands share a shape
    pub bands: Vec<Array2<f32>>,
    pub geotransform: Option<[f64; 6]>,
    /// Projection as WKT or an `EPSG:` code
    pub projection: Option<String>,
    pub nodata: Option<f64>,
}

/// One input entry of an item
#[derive(Debug, Clone)]
pub enum AssetDescriptor {
    Path(PathBuf),
    Subdataset(String),
    Gridded(GriddedDataset),
}

impl AssetDescriptor {
    /// Classify a command-line string: subdataset references stay verbatim, anything else is a path
    pub fn parse(entry: &str) -> Self {
        if is_subdataset_string(entry) {
            AssetDescriptor::Subdataset(entry.to_string())
        } else {
            AssetDescriptor::Path(PathBuf::from(entry))
        }
    }
}

impl From<&Path> for AssetDescriptor {
    fn from(path: &Path) -> Self {
        AssetDescriptor::Path(path.to_path_buf())
    }
}

impl From<GriddedDataset> for AssetDescriptor {
    fn from(grid: GriddedDataset) -> Self {
        AssetDescriptor::Gridded(grid)
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetDescriptor::Path(p) => write!(f, "{}", p.display()),
            AssetDescriptor::Subdataset(s) => write!(f, "{}", s),
            AssetDescriptor::Gridded(g) => write!(f, "<in-memory {}>", g.name),
        }
    }
}

/// CRS + affine transform pair
#[derive(Debug, Clone, PartialEq)]
pub struct Georeference {
    /// GDAL order: [origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height]
    pub geotransform: [f64; 6],
    pub wkt: String,
    pub epsg: Option<u32>,
}

/// The first well-formed georeference seen for an item, with the pixel size it applies to
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGeoreference {
    pub source: PathBuf,
    pub width: usize,
    pub height: usize,
    pub georef: Georeference,
}

/// An on-disk Cloud-Optimized raster produced by input expansion
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRaster {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    /// STAC data type of band 1
    pub data_type: String,
    pub georef: Option<Georeference>,
}

impl NormalizedRaster {
    pub fn has_raster_suffix(&self) -> bool {
        has_raster_suffix(&self.path)
    }

    /// Mean absolute pixel size of the affine transform
    pub fn resolution(&self) -> Option<f64> {
        self.georef
            .as_ref()
            .map(|g| (g.geotransform[1].abs() + g.geotransform[5].abs()) / 2.0)
    }
}

pub fn has_raster_suffix(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("tif" | "tiff")
    )
}

/// Axis-aligned box `[min_x, min_y, max_x, max_y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of a pixel grid, taking all four corners so rotated transforms are covered
    pub fn from_geotransform(gt: &[f64; 6], width: usize, height: usize) -> Self {
        let corner = |px: f64, py: f64| {
            (
                gt[0] + px * gt[1] + py * gt[2],
                gt[3] + px * gt[4] + py * gt[5],
            )
        };
        let (w, h) = (width as f64, height as f64);
        let corners = [corner(0.0, 0.0), corner(w, 0.0), corner(w, h), corner(0.0, h)];
        let mut b = Bounds::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        b
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Asset class code used in `product:id`
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AssetClass {
    /// Continuous raster
    RasterContinuous,
    /// Fallback for anything that is not a catalogued raster
    NonGeospatial,
}

impl AssetClass {
    pub fn code(&self) -> &'static str {
        match self {
            AssetClass::RasterContinuous => "RAS-CNT",
            AssetClass::NonGeospatial => "NON-GEO",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MediaType {
    CloudOptimizedGeoTiff,
    NetCdf,
    Jpeg,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::CloudOptimizedGeoTiff => {
                "image/tiff; application=geotiff; profile=cloud-optimized"
            }
            MediaType::NetCdf => "application/x-netcdf",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tif" | "tiff" => Some(MediaType::CloudOptimizedGeoTiff),
            "nc" | "netcdf" => Some(MediaType::NetCdf),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdataset_strings_are_recognized() {
        assert!(is_subdataset_string(r#"HDF5:"geo/geo_velocity.h5"://velocityStd"#));
        assert!(is_subdataset_string(r#"NETCDF:"/data/a.nc":velocity"#));
        assert!(!is_subdataset_string("/data/geo_velocity.tif"));
        assert!(matches!(
            AssetDescriptor::parse(r#"HDF5:"x.h5"://a"#),
            AssetDescriptor::Subdataset(_)
        ));
        assert!(matches!(
            AssetDescriptor::parse("x.tif"),
            AssetDescriptor::Path(_)
        ));
    }

    #[test]
    fn bounds_cover_all_corners() {
        let gt = [100.0, 10.0, 0.0, 500.0, 0.0, -10.0];
        let b = Bounds::from_geotransform(&gt, 4, 3);
        assert_eq!(b, Bounds::new(100.0, 470.0, 140.0, 500.0));
    }

    #[test]
    fn raster_suffix_is_case_insensitive() {
        assert!(has_raster_suffix(Path::new("a/B.TIF")));
        assert!(has_raster_suffix(Path::new("a/b.tiff")));
        assert!(!has_raster_suffix(Path::new("a/b.nc")));
    }
}
