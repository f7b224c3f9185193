//! Cloud-Optimized GeoTIFF encoding and warping.
//!
//! COG encodes and VRT copies go through the `COG` and `VRT` drivers'
//! `create_copy`. `gdalwarp` has no safe binding and runs in-process through
//! `gdal-sys`. In-place rewrites go through [`SwapScratch`]: the new file is
//! produced in a scratch directory beside the target and renamed over it, and
//! the scratch directory (intermediate VRTs included) is removed on every exit
//! path when it is dropped.
use std::ffi::{CStr, CString, c_char, c_int};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;

use gdal::raster::RasterCreationOptions;
use gdal::{Dataset, DriverManager};
use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;
use crate::io::gdal::GdalError;
use crate::types::Georeference;

/// Creation options of every Cloud-Optimized raster written by this crate
pub const COG_CREATION_OPTIONS: [&str; 7] = [
    "BLOCKSIZE=512",
    "COMPRESS=LZW",
    "LEVEL=9",
    "BIGTIFF=IF_SAFER",
    "OVERVIEWS=AUTO",
    "SPARSE_OK=YES",
    "NUM_THREADS=ALL_CPUS",
];

/// [`COG_CREATION_OPTIONS`] as a GDAL creation option list
pub fn cog_creation_options() -> std::result::Result<RasterCreationOptions, GdalError> {
    let mut options = RasterCreationOptions::new();
    for opt in COG_CREATION_OPTIONS {
        if let Some((key, value)) = opt.split_once('=') {
            options.set_name_value(key, value)?;
        }
    }
    Ok(options)
}

/// `gdalwarp` argument vector for a bilinear, multithreaded warp into a VRT
pub fn warp_args(target_epsg: u32) -> Vec<String> {
    let target_srs = format!("EPSG:{}", target_epsg);
    [
        "-of",
        "VRT",
        "-overwrite",
        "-t_srs",
        target_srs.as_str(),
        "-r",
        "bilinear",
        "-multi",
        "-wo",
        "NUM_THREADS=ALL_CPUS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn last_error_message() -> String {
    // SAFETY: CPLGetLastErrorMsg returns a pointer to a thread-local buffer owned by GDAL.
    let msg = unsafe { gdal_sys::CPLGetLastErrorMsg() };
    if msg.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
}

fn utility_error(utility: &'static str) -> GdalError {
    let message = last_error_message();
    GdalError::Utility {
        utility,
        message: if message.is_empty() {
            "unknown error".to_string()
        } else {
            message
        },
    }
}

fn to_cstring(utility: &'static str, s: &str) -> std::result::Result<CString, GdalError> {
    CString::new(s).map_err(|e| GdalError::Utility {
        utility,
        message: e.to_string(),
    })
}

/// Owned, NULL-terminated argv for the GDAL utility option parsers
struct CArgs {
    _owned: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl CArgs {
    fn new(utility: &'static str, args: &[String]) -> std::result::Result<Self, GdalError> {
        let owned = args
            .iter()
            .map(|a| to_cstring(utility, a))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*mut c_char> = owned.iter().map(|c| c.as_ptr() as *mut c_char).collect();
        ptrs.push(ptr::null_mut());
        Ok(Self {
            _owned: owned,
            ptrs,
        })
    }

    fn as_mut_ptr(&mut self) -> *mut *mut c_char {
        self.ptrs.as_mut_ptr()
    }
}

/// In-process `gdalwarp src dest <args>`
pub fn warp(src: &Dataset, dest: &Path, args: &[String]) -> std::result::Result<(), GdalError> {
    const UTILITY: &str = "gdalwarp";
    let mut argv = CArgs::new(UTILITY, args)?;
    let dest_c = to_cstring(UTILITY, &dest.to_string_lossy())?;
    debug!("{} -> {:?} {:?}", UTILITY, dest, args);
    // SAFETY: argv, dest_c and the source handle array outlive the calls; options and the
    // output handle are released here.
    unsafe {
        let opts = gdal_sys::GDALWarpAppOptionsNew(argv.as_mut_ptr(), ptr::null_mut());
        if opts.is_null() {
            return Err(utility_error(UTILITY));
        }
        let mut sources = [src.c_dataset()];
        let mut usage_error: c_int = 0;
        let out = gdal_sys::GDALWarp(
            dest_c.as_ptr(),
            ptr::null_mut(),
            1,
            sources.as_mut_ptr(),
            opts,
            &mut usage_error,
        );
        gdal_sys::GDALWarpAppOptionsFree(opts);
        if out.is_null() || usage_error != 0 {
            return Err(utility_error(UTILITY));
        }
        gdal_sys::GDALClose(out);
    }
    Ok(())
}

/// Encode any GDAL-readable source (path or subdataset string) as a COG at `dest`
pub fn translate_to_cog(src: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let dataset = Dataset::open(Path::new(src)).map_err(GdalError::from)?;
    let driver = DriverManager::get_driver_by_name("COG").map_err(GdalError::from)?;
    debug!("COG {} -> {:?}", src, dest);
    dataset
        .create_copy(&driver, dest, &cog_creation_options()?)
        .map_err(GdalError::from)?;
    Ok(())
}

/// Write a VRT over `src` with `georef` burned in, leaving `src` untouched
pub fn georeferenced_vrt(src: &Path, dest_vrt: &Path, georef: &Georeference) -> Result<()> {
    let dataset = Dataset::open(src).map_err(GdalError::from)?;
    let driver = DriverManager::get_driver_by_name("VRT").map_err(GdalError::from)?;
    let mut vrt = dataset
        .create_copy(&driver, dest_vrt, &RasterCreationOptions::new())
        .map_err(GdalError::from)?;
    vrt.set_geo_transform(&georef.geotransform)
        .map_err(GdalError::from)?;
    vrt.set_projection(&georef.wkt).map_err(GdalError::from)?;
    Ok(())
}

/// Warp `src` into the target EPSG as a VRT at `dest_vrt`
pub fn warp_to_vrt(src: &Path, dest_vrt: &Path, target_epsg: u32) -> Result<()> {
    let dataset = Dataset::open(src).map_err(GdalError::from)?;
    warp(&dataset, dest_vrt, &warp_args(target_epsg))?;
    Ok(())
}

/// Scratch directory beside a file that is about to be replaced
pub struct SwapScratch {
    dir: TempDir,
    target: PathBuf,
}

impl SwapScratch {
    pub fn beside(target: &Path) -> Result<Self> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let stem = target
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("raster");
        let dir = tempfile::Builder::new()
            .prefix(&format!(".{}.", stem))
            .suffix(".swap")
            .tempdir_in(&parent)?;
        Ok(Self {
            dir,
            target: target.to_path_buf(),
        })
    }

    /// Path of an intermediate file inside the scratch directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Encode `src` as a COG inside the scratch directory and rename it over the target
    pub fn commit_cog(self, src: &str) -> Result<()> {
        let encoded = self.path("encoded.tif");
        translate_to_cog(src, &encoded)?;
        fs::rename(&encoded, &self.target)?;
        debug!("Replaced {:?}", self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cog_options_carry_every_creation_option() {
        let options = cog_creation_options().unwrap();
        for opt in COG_CREATION_OPTIONS {
            let (key, value) = opt.split_once('=').unwrap();
            assert_eq!(options.fetch_name_value(key).as_deref(), Some(value), "{key}");
        }
    }

    #[test]
    fn warp_targets_epsg_with_bilinear_resampling() {
        let args = warp_args(2100);
        let pos = args.iter().position(|a| a == "-t_srs").unwrap();
        assert_eq!(args[pos + 1], "EPSG:2100");
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "bilinear"));
        assert!(args.contains(&"-multi".to_string()));
    }

    #[test]
    fn scratch_is_removed_when_dropped() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a.tif");
        let scratch = SwapScratch::beside(&target).unwrap();
        let dir = scratch.path("x").parent().unwrap().to_path_buf();
        assert!(dir.exists());
        drop(scratch);
        assert!(!dir.exists());
    }
}
