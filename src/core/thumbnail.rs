//! JPEG quicklook of an item's first raster asset.
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::processing::{interleave_rgb, percentile_stretch_u8, resize_rgb_image};
use crate::error::Result;
use crate::io::RasterReader;
use crate::io::writers::write_rgb_jpeg;
use crate::types::NormalizedRaster;

/// File name of the preview inside an item's asset directory
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

/// 1-based band indices mapped to R, G and B
pub fn rgb_band_indices(band_count: usize) -> [usize; 3] {
    match band_count {
        0 | 1 => [1, 1, 1],
        2 => [1, 2, 1],
        _ => [1, 2, 3],
    }
}

/// First asset whose path carries a raster suffix
pub fn first_raster(rasters: &[NormalizedRaster]) -> Option<&NormalizedRaster> {
    rasters.iter().find(|r| r.has_raster_suffix())
}

/// Interleaved RGB quicklook of `src`, `size` x `size` pixels
pub fn render_thumbnail(src: &Path, size: usize) -> Result<Vec<u8>> {
    let reader = RasterReader::open(src)?;
    let (cols, rows) = (reader.metadata.size_x, reader.metadata.size_y);
    let indices = rgb_band_indices(reader.metadata.bands);

    let mut planes: Vec<Vec<u8>> = Vec::with_capacity(3);
    for idx in indices {
        let band = reader.read_band(idx, None)?;
        let nodata = reader.metadata.band_info[idx - 1].nodata;
        planes.push(percentile_stretch_u8(&band, nodata));
    }
    let rgb = interleave_rgb(&planes[0], &planes[1], &planes[2]);
    resize_rgb_image(&rgb, cols, rows, size, size)
}

/// Render and write the quicklook of `src` to `dest`
pub fn write_thumbnail(src: &Path, dest: &Path, size: usize, quality: u8) -> Result<PathBuf> {
    let rgb = render_thumbnail(src, size)?;
    write_rgb_jpeg(dest, size, size, &rgb, quality)?;
    info!("Thumbnail {:?} -> {:?}", src, dest);
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_selection_pads_to_three() {
        assert_eq!(rgb_band_indices(1), [1, 1, 1]);
        assert_eq!(rgb_band_indices(2), [1, 2, 1]);
        assert_eq!(rgb_band_indices(3), [1, 2, 3]);
        assert_eq!(rgb_band_indices(7), [1, 2, 3]);
    }

    #[test]
    fn first_raster_skips_non_tiff_assets() {
        let mk = |p: &str| NormalizedRaster {
            path: PathBuf::from(p),
            width: 1,
            height: 1,
            bands: 1,
            data_type: "uint8".to_string(),
            georef: None,
        };
        let rasters = vec![mk("a.nc"), mk("b.TIF"), mk("c.tif")];
        assert_eq!(first_raster(&rasters).unwrap().path, PathBuf::from("b.TIF"));
        assert!(first_raster(&[mk("a.nc")]).is_none());
    }
}
