pub mod catalog;
pub mod jpeg;
pub mod tiff;

pub use catalog::{relative_href, write_json};
pub use jpeg::write_rgb_jpeg;
pub use tiff::write_gridded_tiff;
