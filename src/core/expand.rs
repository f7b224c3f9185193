//! Input expansion: one asset descriptor in, one or more Cloud-Optimized rasters out.
//!
//! - subdataset string: one COG named from the sanitized subdataset name
//! - `.tif`/`.tiff`: kept when already a COG, re-encoded through a swap otherwise
//! - `.nc`/`.h5` containers: one COG, or one per array (`<stem>_sds<i>.tif`)
//!   when the container holds several
//! - in-memory grid: serialized to GeoTIFF, then encoded like a raster file
//! - anything else: copied verbatim, validated when it is inspected
use gdal::Dataset;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::cog::SwapScratch;
use crate::io::gdal::{RasterReader, list_subdatasets};
use crate::io::writers::write_gridded_tiff;
use crate::types::{AssetDescriptor, GriddedDataset, NormalizedRaster};

const CONTAINER_SUFFIXES: [&str; 5] = ["nc", "netcdf", "h5", "hdf5", "he5"];

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("sanitize regex must compile"))
}

/// File stem for a subdataset string: the array name after `"://`, with unsafe
/// runs replaced by `_`
pub fn sanitize_subdataset_name(sds: &str) -> String {
    let stem = sds.split_once("\"://").map_or(sds, |(_, name)| name);
    let cleaned = unsafe_chars_re().replace_all(stem, "_");
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "asset".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Output names for a container holding `count` arrays
pub fn container_output_names(stem: &str, count: usize) -> Vec<String> {
    if count <= 1 {
        vec![format!("{}.tif", stem)]
    } else {
        (1..=count).map(|i| format!("{}_sds{}.tif", stem, i)).collect()
    }
}

fn lower_suffix(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset")
        .to_string()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Describe an on-disk raster as a `NormalizedRaster`
pub fn inspect(path: &Path) -> Result<NormalizedRaster> {
    let reader = RasterReader::open(path)?;
    let meta = &reader.metadata;
    Ok(NormalizedRaster {
        path: path.to_path_buf(),
        width: meta.size_x,
        height: meta.size_y,
        bands: meta.bands,
        data_type: meta
            .band_info
            .first()
            .map(|b| b.data_type.clone())
            .unwrap_or_else(|| "float32".to_string()),
        georef: meta.georeference(),
    })
}

fn encode_into(src: &str, dest: &Path) -> Result<PathBuf> {
    SwapScratch::beside(dest)?.commit_cog(src)?;
    Ok(dest.to_path_buf())
}

fn expand_subdataset(sds: &str, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    let dest = asset_dir.join(format!("{}.tif", sanitize_subdataset_name(sds)));
    info!("Encoding subdataset {} -> {:?}", sds, dest);
    Ok(vec![encode_into(sds, &dest)?])
}

fn expand_geotiff(entry: &Path, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    let dest = asset_dir.join(format!("{}.tif", file_stem(entry)));
    let is_cog = RasterReader::open(entry)?.is_cog();
    if is_cog {
        if !same_file(entry, &dest) {
            fs::copy(entry, &dest)?;
        }
        debug!("{:?} is already a COG", entry);
        return Ok(vec![dest]);
    }
    info!("Re-encoding {:?} as COG -> {:?}", entry, dest);
    encode_into(&entry.to_string_lossy(), &dest)?;
    Ok(vec![dest])
}

fn expand_container(entry: &Path, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    let dataset =
        Dataset::open(entry).map_err(|_| Error::UnreadableContainer(entry.to_path_buf()))?;
    let subdatasets = list_subdatasets(&dataset);
    let stem = file_stem(entry);

    let sources: Vec<String> = match subdatasets.len() {
        0 if dataset.raster_count() > 0 => vec![entry.to_string_lossy().into_owned()],
        0 => return Err(Error::EmptyContainer(entry.to_path_buf())),
        _ => subdatasets,
    };
    drop(dataset);

    let names = container_output_names(&stem, sources.len());
    info!("Expanding {:?} into {} raster(s)", entry, names.len());
    sources
        .iter()
        .zip(names)
        .map(|(src, name)| encode_into(src, &asset_dir.join(name)))
        .collect()
}

fn expand_gridded(grid: &GriddedDataset, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    let dest = asset_dir.join(format!("{}.tif", sanitize_subdataset_name(&grid.name)));
    let scratch = SwapScratch::beside(&dest)?;
    let serialized = scratch.path("grid.tif");
    write_gridded_tiff(&serialized, grid)?;
    info!("Encoding in-memory grid '{}' -> {:?}", grid.name, dest);
    scratch.commit_cog(&serialized.to_string_lossy())?;
    Ok(vec![dest])
}

fn copy_verbatim(entry: &Path, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    let name = entry
        .file_name()
        .ok_or_else(|| Error::UnsupportedInput(entry.display().to_string()))?;
    let dest = asset_dir.join(name);
    if !same_file(entry, &dest) {
        fs::copy(entry, &dest)?;
    }
    debug!("Copied {:?} verbatim", entry);
    Ok(vec![dest])
}

/// Expand one entry into the paths of its normalized rasters, in order
pub fn expand_to_paths(entry: &AssetDescriptor, asset_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(asset_dir)?;
    match entry {
        AssetDescriptor::Subdataset(sds) => expand_subdataset(sds, asset_dir),
        AssetDescriptor::Gridded(grid) => expand_gridded(grid, asset_dir),
        AssetDescriptor::Path(path) => {
            if !path.exists() {
                return Err(Error::InputNotFound(path.clone()));
            }
            if !path.is_file() {
                return Err(Error::UnsupportedInput(path.display().to_string()));
            }
            match lower_suffix(path).as_deref() {
                Some("tif" | "tiff") => expand_geotiff(path, asset_dir),
                Some(s) if CONTAINER_SUFFIXES.contains(&s) => expand_container(path, asset_dir),
                _ => copy_verbatim(path, asset_dir),
            }
        }
    }
}

/// Expand one entry and describe each resulting raster
pub fn expand(entry: &AssetDescriptor, asset_dir: &Path) -> Result<Vec<NormalizedRaster>> {
    expand_to_paths(entry, asset_dir)?
        .iter()
        .map(|p| inspect(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdataset_names_are_sanitized() {
        assert_eq!(
            sanitize_subdataset_name(r#"HDF5:"geo/geo_velocity.h5"://velocityStd"#),
            "velocityStd"
        );
        assert_eq!(
            sanitize_subdataset_name(r#"HDF5:"a.h5"://group/sub dataset"#),
            "group_sub_dataset"
        );
        assert_eq!(sanitize_subdataset_name(r#"HDF5:"a.h5"://"#), "asset");
        assert_eq!(sanitize_subdataset_name("//x//"), "x");
    }

    #[test]
    fn container_names_get_positional_suffix_only_when_multiple() {
        assert_eq!(container_output_names("geo", 1), vec!["geo.tif"]);
        assert_eq!(
            container_output_names("geo", 3),
            vec!["geo_sds1.tif", "geo_sds2.tif", "geo_sds3.tif"]
        );
    }

    #[test]
    fn missing_input_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = expand_to_paths(
            &AssetDescriptor::Path(tmp.path().join("nope.tif")),
            tmp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }

    #[test]
    fn directory_input_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = expand_to_paths(
            &AssetDescriptor::Path(tmp.path().to_path_buf()),
            &tmp.path().join("out"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput(_)));
    }

    #[test]
    fn unreadable_container_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("broken.nc");
        fs::write(&src, "not a container").unwrap();
        let err = expand_to_paths(&AssetDescriptor::Path(src), &tmp.path().join("assets"))
            .unwrap_err();
        assert!(matches!(err, Error::UnreadableContainer(_)));
    }

    #[test]
    fn other_files_are_copied_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("notes.txt");
        fs::write(&src, "hello").unwrap();
        let out = tmp.path().join("assets");
        let paths = expand_to_paths(&AssetDescriptor::Path(src), &out).unwrap();
        assert_eq!(paths, vec![out.join("notes.txt")]);
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "hello");
    }
}
