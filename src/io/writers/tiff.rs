use gdal::DriverManager;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use std::path::Path;

use crate::io::gdal::GdalError;
use crate::types::GriddedDataset;

/// Serialize an in-memory grid as a float32 GeoTIFF so it can be expanded like any raster file
pub fn write_gridded_tiff(output: &Path, grid: &GriddedDataset) -> Result<(), GdalError> {
    let first = grid.bands.first().ok_or_else(|| {
        GdalError::UnsupportedFormat(format!("Gridded dataset '{}' has no bands", grid.name))
    })?;
    let (rows, cols) = first.dim();
    for band in &grid.bands {
        let (r, c) = band.dim();
        if (r, c) != (rows, cols) {
            return Err(GdalError::DimensionMismatch(cols, rows, c, r));
        }
    }

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f32, _>(output, cols, rows, grid.bands.len())?;

    if let Some(gt) = grid.geotransform {
        ds.set_geo_transform(&gt)?;
    }
    if let Some(projection) = grid.projection.as_deref().filter(|p| !p.trim().is_empty()) {
        let srs = match projection.strip_prefix("EPSG:") {
            Some(code) => {
                let code = code.parse::<u32>().map_err(|_| {
                    GdalError::UnsupportedFormat(format!("Invalid EPSG code: {}", projection))
                })?;
                SpatialRef::from_epsg(code)?
            }
            None => SpatialRef::from_wkt(projection)?,
        };
        ds.set_spatial_ref(&srs)?;
    }

    for (idx, data) in grid.bands.iter().enumerate() {
        let mut band = ds.rasterband(idx + 1)?;
        if let Some(nodata) = grid.nodata {
            band.set_no_data_value(Some(nodata))?;
        }
        let values: Vec<f32> = data.iter().copied().collect();
        let mut buf = Buffer::new((cols, rows), values);
        band.write((0, 0), (cols, rows), &mut buf)?;
    }
    Ok(())
}
