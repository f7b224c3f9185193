//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, JSON and image-encoding errors, and provides
//! semantic variants for input, georeferencing and identifier validation failures.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image buffer error: {0}")]
    ImageBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Resize error: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("JPEG encoding error: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("Input path does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Could not open {0} as a raster container")]
    UnreadableContainer(PathBuf),

    #[error("No arrays found in container {0}")]
    EmptyContainer(PathBuf),

    #[error(
        "{asset:?} has no CRS/geotransform ({width}x{height}). Provide a georeferenced raster \
         earlier in the same item, or pre-assign georeferencing"
    )]
    NoReferenceGeoreference {
        asset: PathBuf,
        width: usize,
        height: usize,
    },

    #[error(
        "{asset:?} has no CRS/geotransform and does not match reference size \
         {expected_width}x{expected_height}; got {width}x{height}"
    )]
    GeoreferenceSizeMismatch {
        asset: PathBuf,
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Unknown collection id: {0}")]
    UnknownCollection(String),

    #[error("Item id '{id}' is not valid for collection '{collection}'")]
    InvalidItemId { id: String, collection: String },

    #[error("Service UID '{service_uid}' is not allowed in collection '{collection}'")]
    DisallowedNamespace {
        service_uid: String,
        collection: String,
    },

    #[error("No input data provided: an item needs at least one raster asset")]
    NoAssets,

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },
}
