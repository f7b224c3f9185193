use jpeg_encoder::{ColorType, Encoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};

pub fn write_rgb_jpeg(
    output: &Path,
    cols: usize,
    rows: usize,
    rgb_data: &[u8],
    quality: u8,
) -> Result<()> {
    let width = u16::try_from(cols).map_err(|_| Error::InvalidArgument {
        arg: "thumbnail width",
        value: cols.to_string(),
    })?;
    let height = u16::try_from(rows).map_err(|_| Error::InvalidArgument {
        arg: "thumbnail height",
        value: rows.to_string(),
    })?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    let encoder = Encoder::new(&mut writer, quality);
    encoder.encode(rgb_data, width, height, ColorType::Rgb)?;
    Ok(())
}
