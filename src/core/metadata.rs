//! STAC collection/item records, their assembly and persistence.
//!
//! Layout under the catalog root:
//! - `assets/<collection>/<item>/*.tif` and `thumbnail.jpg`
//! - `items/<collection>/collection.json`
//! - `items/<collection>/<item>/<item>.json`
//!
//! Link and asset hrefs are rewritten relative to the JSON document that
//! contains them right before it is written.
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::bbox::{Centroid, ItemExtent, Polygon};
use crate::core::identifier::ItemId;
use crate::core::params::CatalogParams;
use crate::core::registry::CollectionRegistry;
use crate::error::Result;
use crate::io::writers::{relative_href, write_json};
use crate::types::{AssetClass, Bounds, MediaType, NormalizedRaster};

pub const STAC_VERSION: &str = "1.0.0";
pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v1.0.0/schema.json";
pub const RASTER_EXTENSION: &str = "https://stac-extensions.github.io/raster/v1.1.0/schema.json";
pub const PROCESSING_EXTENSION: &str =
    "https://stac-extensions.github.io/processing/v1.2.0/schema.json";

pub const THUMBNAIL_KEY: &str = "thumbnail";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: &str, target: &Path) -> Self {
        Self {
            rel: rel.to_string(),
            href: target.to_string_lossy().into_owned(),
            media_type: None,
            title: None,
        }
    }

    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type.as_str().to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterBand {
    pub data_type: String,
    pub sampling: String,
    pub spatial_resolution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub roles: Vec<String>,
    #[serde(rename = "product:id", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(rename = "proj:shape", default, skip_serializing_if = "Option::is_none")]
    pub proj_shape: Option<[usize; 2]>,
    #[serde(rename = "proj:bbox", default, skip_serializing_if = "Option::is_none")]
    pub proj_bbox: Option<[f64; 4]>,
    #[serde(rename = "proj:transform", default, skip_serializing_if = "Option::is_none")]
    pub proj_transform: Option<[f64; 6]>,
    #[serde(rename = "proj:code", default, skip_serializing_if = "Option::is_none")]
    pub proj_code: Option<String>,
    #[serde(rename = "raster:bands", default, skip_serializing_if = "Option::is_none")]
    pub raster_bands: Option<Vec<RasterBand>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    pub datetime: String,
    pub title: String,
    #[serde(rename = "processing:datetime")]
    pub processing_datetime: String,
    #[serde(rename = "processing:facility")]
    pub processing_facility: String,
    #[serde(rename = "processing:version")]
    pub processing_version: String,
    /// `{<software name>: <version>, "repo": <url>}`
    #[serde(rename = "processing:software")]
    pub processing_software: BTreeMap<String, String>,
    #[serde(rename = "processing:level")]
    pub processing_level: String,
    #[serde(rename = "proj:centroid")]
    pub proj_centroid: Centroid,
    #[serde(rename = "proj:epsg", default, skip_serializing_if = "Option::is_none")]
    pub proj_epsg: Option<u32>,
    #[serde(rename = "proj:wkt2", default, skip_serializing_if = "Option::is_none")]
    pub proj_wkt2: Option<String>,
}

/// Serialize `(key, value)` pairs as a JSON object, keeping their order
mod ordered_map {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, V>(pairs: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let map = BTreeMap::<String, V>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub title: String,
    pub geometry: Polygon,
    pub bbox: [f64; 4],
    pub properties: ItemProperties,
    pub links: Vec<Link>,
    #[serde(with = "ordered_map")]
    pub assets: Vec<(String, Asset)>,
    pub collection: String,
}

impl Item {
    /// Append an extension schema URI unless already listed
    pub fn add_extension(&mut self, uri: &str) {
        if !self.stac_extensions.iter().any(|e| e == uri) {
            self.stac_extensions.push(uri.to_string());
        }
    }

    pub fn asset(&self, key: &str) -> Option<&Asset> {
        self.assets.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<String>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub description: String,
    pub license: String,
    pub extent: Extent,
    pub links: Vec<Link>,
}

/// Deterministic on-disk locations of one item's documents and assets
#[derive(Debug, Clone)]
pub struct CatalogLayout {
    pub root: PathBuf,
    pub collection_id: String,
    pub item_id: String,
}

impl CatalogLayout {
    pub fn new(root: &Path, collection_id: &str, item_id: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            collection_id: collection_id.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.root
            .join("assets")
            .join(&self.collection_id)
            .join(&self.item_id)
    }

    pub fn collection_dir(&self) -> PathBuf {
        self.root.join("items").join(&self.collection_id)
    }

    pub fn item_dir(&self) -> PathBuf {
        self.collection_dir().join(&self.item_id)
    }

    pub fn collection_path(&self) -> PathBuf {
        self.collection_dir().join("collection.json")
    }

    pub fn item_path(&self) -> PathBuf {
        self.item_dir().join(format!("{}.json", self.item_id))
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.asset_dir()
            .join(crate::core::thumbnail::THUMBNAIL_FILE_NAME)
    }
}

/// `<SERVICE_UID>_<timestamp token>_<class code>_<NNNN>`
pub fn product_id(item_id: &ItemId, class: AssetClass, counter: u32) -> String {
    format!(
        "{}_{}_{}_{:04}",
        item_id.service_uid(),
        item_id.token(),
        class.code(),
        counter
    )
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `<label> - <area> - <YYYY-MM-DDTHH:MM:SSZ>`
pub fn item_title(label: &str, area: &str, dt: &DateTime<Utc>) -> String {
    format!("{} - {} - {}", label, area, dt.format("%Y-%m-%dT%H:%M:%SZ"))
}

/// `<label> - <area> - LOS displacement velocity - <ISO timestamp>`
pub fn asset_title(label: &str, area: &str, dt: &DateTime<Utc>) -> String {
    format!(
        "{} - {} - LOS displacement velocity - {}",
        label,
        area,
        format_datetime(dt)
    )
}

/// Asset key: file stem of the raster
pub fn asset_key(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

/// Affine coefficients in `[a, b, c, d, e, f]` order from a GDAL geotransform
pub fn affine_from_geotransform(gt: &[f64; 6]) -> [f64; 6] {
    [gt[1], gt[2], gt[0], gt[4], gt[5], gt[3]]
}

/// Data asset for one finalized raster. The href is left as a path and
/// relativized when the item is written.
pub fn raster_asset(
    raster: &NormalizedRaster,
    item_id: &ItemId,
    counter: u32,
    title: &str,
    canonical_epsg: u32,
) -> Asset {
    let mut asset = Asset {
        href: raster.path.to_string_lossy().into_owned(),
        media_type: MediaType::from_path(&raster.path).map(|m| m.as_str().to_string()),
        title: Some(title.to_string()),
        description: Some(title.to_string()),
        name: Some(title.to_string()),
        roles: vec!["data".to_string()],
        product_id: None,
        proj_shape: None,
        proj_bbox: None,
        proj_transform: None,
        proj_code: None,
        raster_bands: None,
    };

    let class = match (&raster.georef, raster.has_raster_suffix()) {
        (Some(georef), true) => {
            let gt = &georef.geotransform;
            let resolution = raster.resolution().unwrap_or_default();
            asset.proj_shape = Some([raster.height, raster.width]);
            asset.proj_bbox =
                Some(Bounds::from_geotransform(gt, raster.width, raster.height).to_array());
            asset.proj_transform = Some(affine_from_geotransform(gt));
            asset.proj_code = Some(format!("EPSG:{}", canonical_epsg));
            asset.raster_bands = Some(
                (0..raster.bands.max(1))
                    .map(|_| RasterBand {
                        data_type: raster.data_type.clone(),
                        sampling: "area".to_string(),
                        spatial_resolution: resolution,
                    })
                    .collect(),
            );
            AssetClass::RasterContinuous
        }
        _ => AssetClass::NonGeospatial,
    };
    asset.product_id = Some(product_id(item_id, class, counter));
    asset
}

/// Everything the assembler consumes for one item
pub struct ItemInputs<'a> {
    pub layout: &'a CatalogLayout,
    pub item_id: &'a ItemId,
    pub counter: u32,
    pub rasters: &'a [NormalizedRaster],
    pub extent: &'a ItemExtent,
    pub thumbnail: Option<&'a Path>,
}

/// Build the collection and item records for one item
pub fn assemble(
    inputs: &ItemInputs<'_>,
    params: &CatalogParams,
    registry: &CollectionRegistry,
) -> Result<(Collection, Item)> {
    let layout = inputs.layout;
    let info = registry.get(&layout.collection_id)?;
    let label = registry.product_label(&layout.collection_id, inputs.item_id.service_uid())?;
    let dt = inputs.item_id.datetime();
    let title = item_title(label, &params.area_name, &dt);
    let data_title = asset_title(label, &params.area_name, &dt);
    let bbox = inputs.extent.bbox.to_array();

    let mut software = BTreeMap::new();
    software.insert(
        params.processing.software_name.clone(),
        params.processing.version.clone(),
    );
    software.insert("repo".to_string(), params.processing.software_repo.clone());

    let first_georef = inputs.rasters.first().and_then(|r| r.georef.as_ref());
    let properties = ItemProperties {
        datetime: format_datetime(&dt),
        title: title.clone(),
        processing_datetime: dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        processing_facility: params.processing.facility.clone(),
        processing_version: params.processing.version.clone(),
        processing_software: software,
        processing_level: params.processing.level.clone(),
        proj_centroid: inputs.extent.centroid,
        proj_epsg: first_georef.and_then(|g| g.epsg),
        proj_wkt2: first_georef.map(|g| g.wkt.clone()),
    };

    let collection_path = layout.collection_path();
    let item_path = layout.item_path();

    let mut item = Item {
        kind: "Feature".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: Vec::new(),
        id: layout.item_id.clone(),
        title,
        geometry: inputs.extent.geometry.clone(),
        bbox,
        properties,
        links: vec![
            Link::new("root", &collection_path),
            Link::new("parent", &collection_path),
            Link::new("collection", &collection_path),
            Link::new("self", &item_path),
        ],
        assets: Vec::new(),
        collection: layout.collection_id.clone(),
    };
    for ext in [PROJECTION_EXTENSION, RASTER_EXTENSION, PROCESSING_EXTENSION] {
        item.add_extension(ext);
    }

    if let Some(thumb) = inputs.thumbnail {
        item.assets.push((
            THUMBNAIL_KEY.to_string(),
            Asset {
                href: thumb.to_string_lossy().into_owned(),
                media_type: Some(MediaType::Jpeg.as_str().to_string()),
                title: None,
                description: None,
                name: None,
                roles: vec!["thumbnail".to_string()],
                product_id: None,
                proj_shape: None,
                proj_bbox: None,
                proj_transform: None,
                proj_code: None,
                raster_bands: None,
            },
        ));
        item.links.push(
            Link::new("preview", thumb)
                .with_type(MediaType::Jpeg)
                .with_title("Thumbnail preview"),
        );
    }

    for raster in inputs.rasters {
        let mut key = asset_key(&raster.path);
        if item.asset(&key).is_some() {
            key = format!("{}_{}", key, item.assets.len());
        }
        let asset = raster_asset(
            raster,
            inputs.item_id,
            inputs.counter,
            &data_title,
            params.canonical_epsg,
        );
        item.assets.push((key, asset));
    }

    let collection = Collection {
        kind: "Collection".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: Vec::new(),
        id: layout.collection_id.clone(),
        description: info.description.clone(),
        license: "other".to_string(),
        extent: Extent {
            spatial: SpatialExtent { bbox: vec![bbox] },
            temporal: TemporalExtent {
                interval: vec![[None, None]],
            },
        },
        links: vec![
            Link::new("root", &collection_path),
            Link::new("self", &collection_path),
            Link::new("item", &item_path).with_title(&layout.item_id),
        ],
    };

    Ok((collection, item))
}

fn relativize_links(links: &mut [Link], base_dir: &Path) {
    for link in links {
        link.href = relative_href(Path::new(&link.href), base_dir);
    }
}

/// Rewrite every href relative to the document's own directory and write both
/// documents. Returns the collection and item JSON paths.
pub fn persist(
    layout: &CatalogLayout,
    collection: &Collection,
    item: &Item,
) -> Result<(PathBuf, PathBuf)> {
    let collection_dir = layout.collection_dir();
    let item_dir = layout.item_dir();

    let mut collection = collection.clone();
    relativize_links(&mut collection.links, &collection_dir);

    let mut item = item.clone();
    relativize_links(&mut item.links, &item_dir);
    for (_, asset) in item.assets.iter_mut() {
        asset.href = relative_href(Path::new(&asset.href), &item_dir);
    }

    let collection_path = layout.collection_path();
    let item_path = layout.item_path();
    write_json(&collection_path, &collection)?;
    write_json(&item_path, &item)?;
    info!(
        "Catalog written: {:?}, {:?}",
        collection_path, item_path
    );
    Ok((collection_path, item_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bbox::BoundsAccumulator;
    use crate::types::Georeference;

    fn item_id() -> ItemId {
        ItemId::parse("LS-DF-SB-S1_20251217T144338d086").unwrap()
    }

    fn raster(path: PathBuf) -> NormalizedRaster {
        NormalizedRaster {
            path,
            width: 4,
            height: 3,
            bands: 2,
            data_type: "float32".to_string(),
            georef: Some(Georeference {
                geotransform: [400000.0, 30.0, 0.0, 4200000.0, 0.0, -20.0],
                wkt: "PROJCS[\"GGRS87 / Greek Grid\"]".to_string(),
                epsg: Some(2100),
            }),
        }
    }

    #[test]
    fn product_id_uses_four_digit_counter() {
        assert_eq!(
            product_id(&item_id(), AssetClass::RasterContinuous, 7),
            "LS-DF-SB-S1_20251217T144338d086_RAS-CNT_0007"
        );
        let sys = ItemId::parse("LS-DF-PS-S1_20250101").unwrap();
        assert_eq!(
            product_id(&sys, AssetClass::NonGeospatial, 12),
            "LS-DF-PS-S1_20250101_NON-GEO_0012"
        );
    }

    #[test]
    fn raster_asset_carries_projection_fields() {
        let velocity = raster(PathBuf::from("a/velocity.tif"));
        let asset = raster_asset(&velocity, &item_id(), 1, "t", 2100);
        assert_eq!(asset.proj_shape, Some([3, 4]));
        assert_eq!(
            asset.proj_bbox,
            Some([400000.0, 4199940.0, 400120.0, 4200000.0])
        );
        assert_eq!(
            asset.proj_transform,
            Some([30.0, 0.0, 400000.0, 0.0, -20.0, 4200000.0])
        );
        assert_eq!(asset.proj_code.as_deref(), Some("EPSG:2100"));
        let bands = asset.raster_bands.unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].spatial_resolution, 25.0);
        assert_eq!(
            asset.product_id.as_deref(),
            Some("LS-DF-SB-S1_20251217T144338d086_RAS-CNT_0001")
        );
    }

    #[test]
    fn non_tiff_asset_falls_back_to_non_geospatial() {
        let asset = raster_asset(&raster(PathBuf::from("a/data.nc")), &item_id(), 3, "t", 2100);
        assert!(asset.proj_shape.is_none());
        assert_eq!(asset.media_type.as_deref(), Some("application/x-netcdf"));
        assert!(asset.product_id.unwrap().contains("_NON-GEO_0003"));
    }

    #[test]
    fn assembled_item_lists_extensions_once_and_relative_links() {
        let tmp = tempfile::TempDir::new().unwrap();
        let id = item_id();
        let layout = CatalogLayout::new(tmp.path(), "LS-DF", &id.to_string());
        let rasters = vec![raster(layout.asset_dir().join("velocity.tif"))];
        let mut acc = BoundsAccumulator::new();
        acc.add(Bounds::new(23.0, 37.0, 24.0, 38.0));
        let extent = acc.finish().unwrap();
        let thumb = layout.thumbnail_path();
        let inputs = ItemInputs {
            layout: &layout,
            item_id: &id,
            counter: 1,
            rasters: &rasters,
            extent: &extent,
            thumbnail: Some(&thumb),
        };
        let (collection, mut item) =
            assemble(&inputs, &CatalogParams::default(), &CollectionRegistry::default()).unwrap();
        item.add_extension(RASTER_EXTENSION);
        assert_eq!(item.stac_extensions.len(), 3);
        assert_eq!(
            item.properties.processing_software.get("Axis3LandSbas").map(String::as_str),
            Some("1.1.0")
        );
        assert_eq!(item.properties.processing_datetime, "2025-12-17T14:43:38Z");
        assert!(item.title.starts_with("SBAS (Distributed Scatterers)"));

        let (collection_path, item_path) = persist(&layout, &collection, &item).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&item_path).unwrap()).unwrap();
        let hrefs: Vec<&str> = doc["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["href"].as_str().unwrap())
            .collect();
        assert!(hrefs.contains(&"../collection.json"));
        assert!(hrefs.contains(&"LS-DF-SB-S1_20251217T144338d086.json"));
        assert_eq!(
            doc["assets"]["velocity"]["href"],
            "../../../assets/LS-DF/LS-DF-SB-S1_20251217T144338d086/velocity.tif"
        );
        assert_eq!(doc["properties"]["proj:epsg"], 2100);

        let coll: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&collection_path).unwrap()).unwrap();
        assert_eq!(coll["description"], "Deformation Monitoring");
        assert_eq!(coll["extent"]["temporal"]["interval"][0][0], serde_json::Value::Null);
    }
}
