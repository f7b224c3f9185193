//! Pixel-level helpers used by the quicklook generator.
pub mod resize;
pub mod stretch;

pub use resize::{interleave_rgb, resize_rgb_image};
pub use stretch::percentile_stretch_u8;
