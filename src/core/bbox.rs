//! Item-level bbox, footprint polygon and centroid in the public CRS.
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::GdalError;
use crate::types::{Bounds, NormalizedRaster};

/// GeoJSON polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// Closed ring of an axis-aligned box, (lon, lat) order
    pub fn from_bounds(b: &Bounds) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![vec![
                [b.min_x, b.min_y],
                [b.min_x, b.max_y],
                [b.max_x, b.max_y],
                [b.max_x, b.min_y],
                [b.min_x, b.min_y],
            ]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

/// Union bbox with its derived footprint and centroid
#[derive(Debug, Clone, PartialEq)]
pub struct ItemExtent {
    pub bbox: Bounds,
    pub geometry: Polygon,
    pub centroid: Centroid,
}

/// Running per-axis union of asset bounds
#[derive(Debug, Default, Clone)]
pub struct BoundsAccumulator {
    bbox: Option<Bounds>,
}

impl BoundsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bounds: Bounds) {
        self.bbox = Some(match self.bbox {
            None => bounds,
            Some(acc) => acc.union(&bounds),
        });
    }

    pub fn bbox(&self) -> Option<Bounds> {
        self.bbox
    }

    /// Final extent; fails when nothing was added
    pub fn finish(&self) -> Result<ItemExtent> {
        let bbox = self.bbox.ok_or(Error::NoAssets)?;
        Ok(ItemExtent {
            bbox,
            geometry: Polygon::from_bounds(&bbox),
            centroid: Centroid {
                lat: (bbox.min_y + bbox.max_y) / 2.0,
                lon: (bbox.min_x + bbox.max_x) / 2.0,
            },
        })
    }
}

fn srs_gis_order(mut srs: SpatialRef) -> SpatialRef {
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    srs
}

/// Transform `bounds` from `source_wkt` into EPSG:`target_epsg`, densifying each edge
pub fn transform_bounds(
    bounds: &Bounds,
    source_wkt: &str,
    target_epsg: u32,
    densify_points: i32,
) -> Result<Bounds> {
    let source = srs_gis_order(SpatialRef::from_wkt(source_wkt).map_err(GdalError::from)?);
    let target = srs_gis_order(SpatialRef::from_epsg(target_epsg).map_err(GdalError::from)?);
    let transform = CoordTransform::new(&source, &target).map_err(GdalError::from)?;
    let out = transform
        .transform_bounds(&bounds.to_array(), densify_points)
        .map_err(GdalError::from)?;
    Ok(Bounds::new(out[0], out[1], out[2], out[3]))
}

/// Native bounds of a finalized raster expressed in the public CRS
pub fn public_bounds(
    raster: &NormalizedRaster,
    public_epsg: u32,
    densify_points: i32,
) -> Result<Bounds> {
    let georef = raster
        .georef
        .as_ref()
        .ok_or_else(|| Error::NoReferenceGeoreference {
            asset: raster.path.clone(),
            width: raster.width,
            height: raster.height,
        })?;
    let native = Bounds::from_geotransform(&georef.geotransform, raster.width, raster.height);
    if georef.epsg == Some(public_epsg) {
        return Ok(native);
    }
    let public = transform_bounds(&native, &georef.wkt, public_epsg, densify_points)?;
    debug!("{:?}: {:?} -> {:?}", raster.path, native, public);
    Ok(public)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn union_of_two_boxes() {
        let mut acc = BoundsAccumulator::new();
        acc.add(Bounds::new(0.0, 0.0, 1.0, 1.0));
        acc.add(Bounds::new(2.0, 2.0, 3.0, 3.0));
        let extent = acc.finish().unwrap();
        assert_eq!(extent.bbox.to_array(), [0.0, 0.0, 3.0, 3.0]);
        assert_relative_eq!(extent.centroid.lon, 1.5);
        assert_relative_eq!(extent.centroid.lat, 1.5);
        let ring = &extent.geometry.coordinates[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[1], [0.0, 3.0]);
    }

    #[test]
    fn empty_accumulator_is_an_error() {
        assert!(matches!(BoundsAccumulator::new().finish(), Err(Error::NoAssets)));
    }

    #[test]
    fn projected_bounds_land_in_lon_lat_order() {
        let wkt = SpatialRef::from_epsg(2100).unwrap().to_wkt().unwrap();
        // Around Athens in GGRS87 / Greek Grid
        let b = Bounds::new(470000.0, 4190000.0, 490000.0, 4210000.0);
        let out = transform_bounds(&b, &wkt, 4326, 21).unwrap();
        assert!(out.min_x > 23.0 && out.max_x < 24.5, "{:?}", out);
        assert!(out.min_y > 37.5 && out.max_y < 38.5, "{:?}", out);
        assert!(out.min_x < out.max_x && out.min_y < out.max_y);
    }
}
