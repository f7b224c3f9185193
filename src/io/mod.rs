//! I/O layer for GDAL-backed rasters and catalog outputs.
//! Provides the `gdal` raster reader, `cog` encode/warp utilities, and `writers`
//! for JPEG previews, GeoTIFF grids and JSON catalog documents.
pub mod gdal;
pub use gdal::{BandInfo, GdalError, RasterMetadata, RasterReader};

pub mod cog;
pub use cog::SwapScratch;

pub mod writers;
