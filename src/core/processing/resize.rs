use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use tracing::debug;

use crate::error::Result;

/// Interleave three equally-sized u8 planes into RGB
pub fn interleave_rgb(r: &[u8], g: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(r.len() * 3);
    for ((&r, &g), &b) in r.iter().zip(g).zip(b) {
        out.push(r);
        out.push(g);
        out.push(b);
    }
    out
}

/// Resize an interleaved RGB image to exactly `target_cols` x `target_rows`
pub fn resize_rgb_image(
    data: &[u8],
    original_cols: usize,
    original_rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> Result<Vec<u8>> {
    if (original_cols, original_rows) == (target_cols, target_rows) {
        return Ok(data.to_vec());
    }
    debug!(
        "Resizing RGB {}x{} -> {}x{}",
        original_cols, original_rows, target_cols, target_rows
    );
    let resize_options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        data.to_vec(),
        PixelType::U8x3,
    )?;
    let mut dst_image = Image::new(target_cols as u32, target_rows as u32, PixelType::U8x3);
    resizer.resize(&src_image, &mut dst_image, &resize_options)?;

    Ok(dst_image.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_planes() {
        assert_eq!(
            interleave_rgb(&[1, 2], &[3, 4], &[5, 6]),
            vec![1, 3, 5, 2, 4, 6]
        );
    }

    #[test]
    fn resizes_to_exact_square() {
        let data = vec![0u8; 10 * 4 * 3];
        let out = resize_rgb_image(&data, 10, 4, 7, 7).unwrap();
        assert_eq!(out.len(), 7 * 7 * 3);
        assert!(out.iter().all(|&v| v == 0));
    }
}
