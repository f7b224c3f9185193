//! Georeference reconciliation.
//!
//! The per-item reference is an explicit value: each call takes the current
//! reference and returns the (possibly newly captured) one, so the caller
//! threads it through the rasters of one item in expansion order.
use std::path::Path;
use tracing::{debug, info};

use crate::core::expand::inspect;
use crate::error::{Error, Result};
use crate::io::cog::{SwapScratch, georeferenced_vrt};
use crate::types::{Georeference, NormalizedRaster, ReferenceGeoreference};

/// Reference captured from a georeferenced raster
pub fn capture(raster: &NormalizedRaster) -> Option<ReferenceGeoreference> {
    raster.georef.as_ref().map(|georef| ReferenceGeoreference {
        source: raster.path.clone(),
        width: raster.width,
        height: raster.height,
        georef: georef.clone(),
    })
}

/// Burn `georef` into the raster at `path`: VRT with the reference, re-encoded, swapped in
pub fn apply_georeference(path: &Path, georef: &Georeference) -> Result<()> {
    let scratch = SwapScratch::beside(path)?;
    let vrt = scratch.path("georef.vrt");
    georeferenced_vrt(path, &vrt, georef)?;
    scratch.commit_cog(&vrt.to_string_lossy())
}

/// Ensure `raster` carries CRS and transform.
///
/// A georeferenced raster passes through and becomes the reference when none
/// exists yet. An ungeoreferenced one is fixed from a reference of identical
/// pixel size; anything else is fatal.
pub fn reconcile(
    raster: NormalizedRaster,
    reference: Option<ReferenceGeoreference>,
) -> Result<(NormalizedRaster, Option<ReferenceGeoreference>)> {
    if raster.georef.is_some() {
        let reference = match reference {
            Some(r) => Some(r),
            None => {
                debug!("Reference georeference taken from {:?}", raster.path);
                capture(&raster)
            }
        };
        return Ok((raster, reference));
    }

    let Some(reference) = reference else {
        return Err(Error::NoReferenceGeoreference {
            asset: raster.path,
            width: raster.width,
            height: raster.height,
        });
    };
    if (raster.width, raster.height) != (reference.width, reference.height) {
        return Err(Error::GeoreferenceSizeMismatch {
            asset: raster.path,
            expected_width: reference.width,
            expected_height: reference.height,
            width: raster.width,
            height: raster.height,
        });
    }

    info!(
        "Assigning georeference of {:?} to {:?}",
        reference.source, raster.path
    );
    apply_georeference(&raster.path, &reference.georef)?;
    let fixed = inspect(&raster.path)?;
    Ok((fixed, Some(reference)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raster(name: &str, w: usize, h: usize, georef: Option<Georeference>) -> NormalizedRaster {
        NormalizedRaster {
            path: PathBuf::from(name),
            width: w,
            height: h,
            bands: 1,
            data_type: "float32".to_string(),
            georef,
        }
    }

    fn georef() -> Georeference {
        Georeference {
            geotransform: [400000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0],
            wkt: "PROJCS[\"x\"]".to_string(),
            epsg: Some(2100),
        }
    }

    #[test]
    fn first_georeferenced_raster_becomes_reference() {
        let (_, reference) = reconcile(raster("a.tif", 4, 3, Some(georef())), None).unwrap();
        let reference = reference.unwrap();
        assert_eq!(reference.source, PathBuf::from("a.tif"));
        assert_eq!((reference.width, reference.height), (4, 3));

        let mut other = georef();
        other.epsg = Some(4326);
        let (_, kept) =
            reconcile(raster("b.tif", 9, 9, Some(other)), Some(reference.clone())).unwrap();
        assert_eq!(kept, Some(reference));
    }

    #[test]
    fn missing_georeference_without_reference_is_fatal() {
        let err = reconcile(raster("a.tif", 4, 3, None), None).unwrap_err();
        assert!(matches!(
            err,
            Error::NoReferenceGeoreference {
                width: 4,
                height: 3,
                ..
            }
        ));
    }

    #[test]
    fn size_mismatch_names_expected_size() {
        let reference = capture(&raster("a.tif", 4, 3, Some(georef())));
        let err = reconcile(raster("b.tif", 5, 3, None), reference).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("b.tif"));
        assert!(msg.contains("4x3"));
        assert!(msg.contains("5x3"));
    }
}
