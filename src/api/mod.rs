//! High-level library API: build one catalog item (and its collection) from a
//! list of raster inputs. Prefer this entrypoint over the individual `core`
//! stages when integrating cogcat.
//!
//! Stages run in order and any failure aborts the build. Rasters already
//! written under `assets/` are left in place.
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::bbox::{BoundsAccumulator, public_bounds};
use crate::core::expand::{expand_to_paths, inspect};
use crate::core::georef::reconcile;
use crate::core::identifier::{ItemId, next_counter, utc_timestamp, validate};
use crate::core::metadata::{CatalogLayout, Collection, Item, ItemInputs, assemble, persist};
use crate::core::params::CatalogParams;
use crate::core::registry::CollectionRegistry;
use crate::core::reproject::reproject;
use crate::core::thumbnail::{first_raster, write_thumbnail};
use crate::error::{Error, Result};
use crate::types::{AssetDescriptor, NormalizedRaster, ReferenceGeoreference};

/// Inputs and target of one item build
#[derive(Debug, Clone)]
pub struct CatalogRequest {
    pub inputs: Vec<AssetDescriptor>,
    /// Catalog root holding `assets/` and `items/`
    pub output_dir: PathBuf,
    pub collection_id: String,
    pub item_id: String,
    /// Sequence counter for product ids; falls back to the id's legacy
    /// counter, then to 1
    pub counter: Option<u32>,
}

/// Result of a completed build
#[derive(Debug, Clone)]
pub struct CatalogOutput {
    pub collection: Collection,
    pub item: Item,
    pub collection_path: PathBuf,
    pub item_path: PathBuf,
    pub rasters: Vec<NormalizedRaster>,
    pub thumbnail: Option<PathBuf>,
}

/// `<SERVICE_UID>_<YYYYMMDDTHHMMSSdmmm>` for the given instant
pub fn generate_item_id(service_uid: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", service_uid, utc_timestamp(now))
}

/// Fresh ad-hoc id for `service_uid` stamped now, plus the next free counter under `root`
pub fn auto_item_id(root: &Path, service_uid: &str) -> (String, u32) {
    let id = generate_item_id(service_uid, Utc::now());
    let counter = next_counter(root, service_uid);
    info!("Generated item id {} (counter {:06})", id, counter);
    (id, counter)
}

/// Expand, reconcile and reproject every input in order, threading the
/// reference georeference through, and fold public-CRS bounds as rasters are finalized
fn normalize_inputs(
    inputs: &[AssetDescriptor],
    asset_dir: &Path,
    params: &CatalogParams,
) -> Result<(Vec<NormalizedRaster>, BoundsAccumulator)> {
    let mut reference: Option<ReferenceGeoreference> = None;
    let mut rasters = Vec::new();
    let mut bounds = BoundsAccumulator::new();
    let mut written: HashSet<PathBuf> = HashSet::new();

    for entry in inputs {
        info!("Processing input {}", entry);
        for path in expand_to_paths(entry, asset_dir)? {
            if !written.insert(path.clone()) {
                return Err(Error::UnsupportedInput(format!(
                    "{} expands to {:?}, already written by an earlier input",
                    entry, path
                )));
            }
            let raster = inspect(&path)?;
            let (raster, r) = reconcile(raster, reference)?;
            let (raster, r) = reproject(raster, params.canonical_epsg, r)?;
            reference = r;
            bounds.add(public_bounds(
                &raster,
                params.public_epsg,
                params.effective_densify_points(),
            )?);
            rasters.push(raster);
        }
    }
    Ok((rasters, bounds))
}

/// Build and persist one collection + item.
///
/// The id is validated against `registry` before anything is written.
pub fn build_catalog(
    request: &CatalogRequest,
    params: &CatalogParams,
    registry: &CollectionRegistry,
) -> Result<CatalogOutput> {
    if request.inputs.is_empty() {
        return Err(Error::NoAssets);
    }
    let item_id: ItemId = validate(&request.item_id, &request.collection_id, registry)?;
    let counter = request
        .counter
        .or(item_id.legacy_counter())
        .unwrap_or(1);
    info!(
        "Building item {} in collection {} (counter {})",
        request.item_id, request.collection_id, counter
    );

    let layout = CatalogLayout::new(&request.output_dir, &request.collection_id, &request.item_id);
    let (rasters, bounds) = normalize_inputs(&request.inputs, &layout.asset_dir(), params)?;
    let extent = bounds.finish()?;
    info!("Item bbox (EPSG:{}): {:?}", params.public_epsg, extent.bbox.to_array());

    let thumbnail = match first_raster(&rasters) {
        Some(raster) => Some(write_thumbnail(
            &raster.path,
            &layout.thumbnail_path(),
            params.thumbnail_size,
            params.thumbnail_quality,
        )?),
        None => None,
    };

    let inputs = ItemInputs {
        layout: &layout,
        item_id: &item_id,
        counter,
        rasters: &rasters,
        extent: &extent,
        thumbnail: thumbnail.as_deref(),
    };
    let (collection, item) = assemble(&inputs, params, registry)?;
    let (collection_path, item_path) = persist(&layout, &collection, &item)?;

    Ok(CatalogOutput {
        collection,
        item,
        collection_path,
        item_path,
        rasters,
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_parse_as_adhoc() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let id = generate_item_id("LS-DF-SB-S1", now);
        assert_eq!(id, "LS-DF-SB-S1_20250102T030405d000");
        assert!(matches!(ItemId::parse(&id), Some(ItemId::AdHoc(_))));
    }

    #[test]
    fn validation_runs_before_any_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("catalog");
        let request = CatalogRequest {
            inputs: vec![AssetDescriptor::Path(tmp.path().join("missing.tif"))],
            output_dir: out.clone(),
            collection_id: "LS-DF".to_string(),
            item_id: "FS-FM-TC_20250101".to_string(),
            counter: None,
        };
        let err = build_catalog(&request, &CatalogParams::default(), &CollectionRegistry::default())
            .unwrap_err();
        assert!(matches!(err, Error::DisallowedNamespace { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let request = CatalogRequest {
            inputs: Vec::new(),
            output_dir: PathBuf::from("unused"),
            collection_id: "LS-DF".to_string(),
            item_id: "LS-DF-SB-S1_20250101".to_string(),
            counter: None,
        };
        assert!(matches!(
            build_catalog(&request, &CatalogParams::default(), &CollectionRegistry::default()),
            Err(Error::NoAssets)
        ));
    }
}
