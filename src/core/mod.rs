//! Core building blocks of a catalog build: identifier grammar, input
//! expansion, georeference reconciliation, reprojection, bounds aggregation,
//! thumbnails and STAC assembly. These are internal primitives consumed by
//! the high-level `api` module.
pub mod bbox;
pub mod expand;
pub mod georef;
pub mod identifier;
pub mod metadata;
pub mod params;
pub mod processing;
pub mod registry;
pub mod reproject;
pub mod thumbnail;
