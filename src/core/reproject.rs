//! Warp rasters into the canonical working CRS.
use std::path::Path;
use tracing::{debug, info};

use crate::core::expand::inspect;
use crate::core::georef::capture;
use crate::error::{Error, Result};
use crate::io::cog::{SwapScratch, warp_to_vrt};
use crate::types::{NormalizedRaster, ReferenceGeoreference};

/// True when the raster must be warped to reach `target_epsg`
pub fn needs_reprojection(raster: &NormalizedRaster, target_epsg: u32) -> bool {
    raster.georef.as_ref().and_then(|g| g.epsg) != Some(target_epsg)
}

/// Warp the raster at `path` into `target_epsg` through a VRT and swap in the re-encoded COG
pub fn warp_in_place(path: &Path, target_epsg: u32) -> Result<()> {
    let scratch = SwapScratch::beside(path)?;
    let vrt = scratch.path("warp.vrt");
    warp_to_vrt(path, &vrt, target_epsg)?;
    scratch.commit_cog(&vrt.to_string_lossy())
}

/// Bring a reconciled raster into `target_epsg`.
///
/// When the warped raster is the one the reference was captured from, the
/// reference is recaptured from the warped geometry.
pub fn reproject(
    raster: NormalizedRaster,
    target_epsg: u32,
    reference: Option<ReferenceGeoreference>,
) -> Result<(NormalizedRaster, Option<ReferenceGeoreference>)> {
    if raster.georef.is_none() {
        return Err(Error::NoReferenceGeoreference {
            asset: raster.path,
            width: raster.width,
            height: raster.height,
        });
    }
    if !needs_reprojection(&raster, target_epsg) {
        debug!("{:?} already in EPSG:{}", raster.path, target_epsg);
        return Ok((raster, reference));
    }

    info!("Reprojecting {:?} to EPSG:{}", raster.path, target_epsg);
    warp_in_place(&raster.path, target_epsg)?;
    let warped = inspect(&raster.path)?;

    let reference = match reference {
        Some(r) if r.source == warped.path => {
            debug!("Recapturing reference from warped {:?}", warped.path);
            capture(&warped)
        }
        other => other,
    };
    Ok((warped, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Georeference;
    use std::path::PathBuf;

    #[test]
    fn rasters_in_target_crs_pass_through() {
        let raster = NormalizedRaster {
            path: PathBuf::from("a.tif"),
            width: 2,
            height: 2,
            bands: 1,
            data_type: "uint8".to_string(),
            georef: Some(Georeference {
                geotransform: [0.0, 1.0, 0.0, 2.0, 0.0, -1.0],
                wkt: String::new(),
                epsg: Some(2100),
            }),
        };
        assert!(!needs_reprojection(&raster, 2100));
        assert!(needs_reprojection(&raster, 4326));
        let (out, reference) = reproject(raster.clone(), 2100, None).unwrap();
        assert_eq!(out, raster);
        assert_eq!(reference, None);
    }

    #[test]
    fn unknown_epsg_requires_warp() {
        let raster = NormalizedRaster {
            path: PathBuf::from("a.tif"),
            width: 2,
            height: 2,
            bands: 1,
            data_type: "uint8".to_string(),
            georef: Some(Georeference {
                geotransform: [0.0, 1.0, 0.0, 2.0, 0.0, -1.0],
                wkt: "LOCAL_CS[\"x\"]".to_string(),
                epsg: None,
            }),
        };
        assert!(needs_reprojection(&raster, 2100));
    }
}
