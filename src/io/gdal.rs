use gdal::raster::ResampleAlg;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Metadata, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::ffi::{CStr, c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use thiserror::Error;

use crate::types::Georeference;

/// Errors encountered when using the GDAL layer
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("{utility} failed: {message}")]
    Utility {
        utility: &'static str,
        message: String,
    },
}

/// Per-band description used for `raster:bands`
#[derive(Debug, Clone, PartialEq)]
pub struct BandInfo {
    /// STAC data type name (e.g. `uint8`, `float32`)
    pub data_type: String,
    pub nodata: Option<f64>,
}

/// Metadata extracted from a GDAL-supported raster
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform, `None` when absent or the identity
    pub geotransform: Option<[f64; 6]>,
    /// Projection in WKT format, `None` when absent
    pub projection: Option<String>,
    /// EPSG code of the projection, if it carries one
    pub epsg: Option<u32>,
    pub band_info: Vec<BandInfo>,
}

impl RasterMetadata {
    pub fn georeference(&self) -> Option<Georeference> {
        match (&self.geotransform, &self.projection) {
            (Some(gt), Some(wkt)) => Some(Georeference {
                geotransform: *gt,
                wkt: wkt.clone(),
                epsg: self.epsg,
            }),
            _ => None,
        }
    }
}

const IDENTITY_GT: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Map GDAL type names onto the STAC raster extension vocabulary
pub fn stac_data_type(gdal_name: &str) -> String {
    match gdal_name {
        "Byte" => "uint8".to_string(),
        "Int8" => "int8".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// Lowest PROJ match confidence accepted when identifying a CRS without an authority
const MIN_MATCH_CONFIDENCE: c_int = 70;

fn authority_epsg(srs: &SpatialRef) -> Option<u32> {
    let name = srs.auth_name()?;
    if !name.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    srs.auth_code().ok().and_then(|c| u32::try_from(c).ok())
}

fn c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null strings returned by OSRGetAuthority* are owned by the SRS handle.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Best EPSG entry of the PROJ database equivalent to `srs`
fn matched_epsg(srs: &SpatialRef) -> Option<u32> {
    let mut count: c_int = 0;
    let mut confidence: *mut c_int = ptr::null_mut();
    // SAFETY: the match array and the confidence buffer are released before returning;
    // authority strings are copied out while their handles are alive.
    unsafe {
        let matches =
            gdal_sys::OSRFindMatches(srs.to_c_hsrs(), ptr::null_mut(), &mut count, &mut confidence);
        if matches.is_null() {
            return None;
        }
        let mut found = None;
        if count > 0 && !confidence.is_null() && *confidence >= MIN_MATCH_CONFIDENCE {
            let best = *matches;
            let name = c_str(gdal_sys::OSRGetAuthorityName(best, ptr::null()));
            if name.is_some_and(|n| n.eq_ignore_ascii_case("EPSG")) {
                found = c_str(gdal_sys::OSRGetAuthorityCode(best, ptr::null()))
                    .and_then(|code| code.parse::<u32>().ok());
            }
        }
        gdal_sys::OSRFreeSRSArray(matches);
        if !confidence.is_null() {
            gdal_sys::VSIFree(confidence.cast());
        }
        found
    }
}

/// EPSG code of a WKT projection: its authority node, else the identified
/// equivalent from the PROJ database
pub fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    let mut srs = SpatialRef::from_wkt(wkt).ok()?;
    if let Some(code) = authority_epsg(&srs) {
        return Some(code);
    }
    if srs.auto_identify_epsg().is_ok() {
        if let Some(code) = authority_epsg(&srs) {
            return Some(code);
        }
    }
    matched_epsg(&srs)
}

/// Reader for generic geospatial rasters via GDAL
pub struct RasterReader {
    pub path: PathBuf,
    pub dataset: Dataset,
    pub metadata: RasterMetadata,
}

impl RasterReader {
    /// Open a GDAL-supported raster (e.g., GeoTIFF, NetCDF, HDF5 subdataset)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat(format!(
                "No raster bands found in {:?}",
                path.as_ref()
            )));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) if gt != IDENTITY_GT => Some(gt),
            _ => None,
        };
        let proj = dataset.projection();
        let (projection, epsg) = if proj.trim().is_empty() {
            (None, None)
        } else {
            let epsg = epsg_from_wkt(&proj);
            (Some(proj), epsg)
        };
        let mut band_info = Vec::with_capacity(bands);
        for idx in 1..=bands {
            let band = dataset.rasterband(idx)?;
            band_info.push(BandInfo {
                data_type: stac_data_type(&band.band_type().name()),
                nodata: band.no_data_value(),
            });
        }
        Ok(RasterReader {
            path: path.as_ref().to_path_buf(),
            dataset,
            metadata: RasterMetadata {
                size_x,
                size_y,
                bands,
                geotransform,
                projection,
                epsg,
                band_info,
            },
        })
    }

    /// True when the file already carries the Cloud-Optimized layout
    pub fn is_cog(&self) -> bool {
        self.dataset
            .metadata_item("LAYOUT", "IMAGE_STRUCTURE")
            .is_some_and(|layout| layout.eq_ignore_ascii_case("COG"))
    }

    /// Read a single band (1-based index) as an f64 ndarray of shape (height, width)
    pub fn read_band(
        &self,
        index: usize,
        e_resample_alg: Option<ResampleAlg>,
    ) -> Result<Array2<f64>, GdalError> {
        if index == 0 || index > self.metadata.bands {
            return Err(GdalError::UnsupportedFormat(format!(
                "Band index {} out of range",
                index
            )));
        }
        let band = self.dataset.rasterband(index)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band.read_as::<f64>((0, 0), window, window, e_resample_alg)?;
        let data_vec = buf.data().to_vec();
        let len = data_vec.len();
        Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec).map_err(
            |_| {
                GdalError::DimensionMismatch(
                    self.metadata.size_x,
                    self.metadata.size_y,
                    len,
                    1,
                )
            },
        )
    }
}

/// Names of the subdatasets advertised by a container, in driver order
pub fn list_subdatasets(dataset: &Dataset) -> Vec<String> {
    let mut names: Vec<(usize, String)> = dataset
        .metadata_domain("SUBDATASETS")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let idx = key
                .strip_prefix("SUBDATASET_")?
                .strip_suffix("_NAME")?
                .parse::<usize>()
                .ok()?;
            Some((idx, value.to_string()))
        })
        .collect();
    names.sort_by_key(|(idx, _)| *idx);
    names.into_iter().map(|(_, name)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gdal_type_names_map_to_stac_vocabulary() {
        assert_eq!(stac_data_type("Byte"), "uint8");
        assert_eq!(stac_data_type("Float32"), "float32");
        assert_eq!(stac_data_type("UInt16"), "uint16");
        assert_eq!(stac_data_type("CFloat64"), "cfloat64");
    }

    #[test]
    fn epsg_is_read_from_authority() {
        let srs = SpatialRef::from_epsg(2100).unwrap();
        let wkt = srs.to_wkt().unwrap();
        assert_eq!(epsg_from_wkt(&wkt), Some(2100));
        assert_eq!(epsg_from_wkt("not a wkt"), None);
    }

    #[test]
    fn epsg_is_identified_without_authority_nodes() {
        let wkt = SpatialRef::from_epsg(2100).unwrap().to_wkt().unwrap();
        let bare = regex::Regex::new(r#",AUTHORITY\["[^"]*","[^"]*"\]"#)
            .unwrap()
            .replace_all(&wkt, "")
            .into_owned();
        assert!(!bare.contains("AUTHORITY"));
        assert!(bare.contains("Greek Grid"));
        assert_eq!(epsg_from_wkt(&bare), Some(2100));
    }

    #[test]
    fn subdatasets_are_listed_in_numeric_order() {
        let driver = gdal::DriverManager::get_driver_by_name("MEM").unwrap();
        let mut ds = driver.create_with_band_type::<u8, _>("", 1, 1, 1).unwrap();
        for (idx, name) in [(2, "second"), (10, "tenth"), (1, "first")] {
            ds.set_metadata_item(&format!("SUBDATASET_{idx}_NAME"), name, "SUBDATASETS")
                .unwrap();
            ds.set_metadata_item(&format!("SUBDATASET_{idx}_DESC"), "[1x1] Float32", "SUBDATASETS")
                .unwrap();
        }
        assert_eq!(list_subdatasets(&ds), vec!["first", "second", "tenth"]);
    }
}
