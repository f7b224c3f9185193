use ndarray::Array2;
use tracing::debug;

/// Lower/upper percentiles of the preview stretch
pub const STRETCH_LOW_PERCENTILE: f64 = 2.0;
pub const STRETCH_HIGH_PERCENTILE: f64 = 98.0;

/// Valid-pixel mask in row-major order: NaN and nodata pixels are invalid.
/// Nodata is compared at single precision, the type rasters are stretched at.
pub fn valid_mask(band: &Array2<f64>, nodata: Option<f64>) -> Vec<bool> {
    let nodata32 = nodata.map(|n| n as f32);
    band.iter()
        .map(|&v| {
            if v.is_nan() {
                return false;
            }
            match nodata32 {
                Some(n) if n.is_nan() => true,
                Some(n) => (v as f32) != n,
                None => true,
            }
        })
        .collect()
}

/// Percentile `p` (0..=100) of sorted values with linear interpolation between ranks
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Stretch window of the valid pixels; `None` when every pixel is masked
pub fn stretch_range(band: &Array2<f64>, mask: &[bool]) -> Option<(f64, f64)> {
    let mut values: Vec<f64> = band
        .iter()
        .zip(mask)
        .filter_map(|(&v, &ok)| ok.then_some(v as f32 as f64))
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let vmin = percentile_sorted(&values, STRETCH_LOW_PERCENTILE)?;
    let mut vmax = percentile_sorted(&values, STRETCH_HIGH_PERCENTILE)?;
    if vmax <= vmin {
        vmax = vmin + 1.0;
    }
    Some((vmin, vmax))
}

/// Linear 2-98% stretch of one band into u8; masked pixels become 0 and an
/// all-masked band yields all zeros
pub fn percentile_stretch_u8(band: &Array2<f64>, nodata: Option<f64>) -> Vec<u8> {
    let mask = valid_mask(band, nodata);
    let Some((vmin, vmax)) = stretch_range(band, &mask) else {
        debug!("Band has no valid pixels; using an all-zero band");
        return vec![0u8; band.len()];
    };
    debug!("Stretch window: [{:.4}, {:.4}]", vmin, vmax);
    let scale = 255.0 / (vmax - vmin);
    band.iter()
        .zip(&mask)
        .map(|(&v, &ok)| {
            if !ok {
                return 0;
            }
            let v = (v as f32 as f64).clamp(vmin, vmax);
            ((v - vmin) * scale) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentiles_interpolate_between_ranks() {
        let v: Vec<f64> = (0..=100).map(|x| x as f64).collect();
        assert_relative_eq!(percentile_sorted(&v, 2.0).unwrap(), 2.0);
        assert_relative_eq!(percentile_sorted(&v, 98.0).unwrap(), 98.0);
        assert_relative_eq!(percentile_sorted(&[1.0, 2.0], 50.0).unwrap(), 1.5);
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn nodata_and_nan_are_masked() {
        let band = Array2::from_shape_vec((1, 4), vec![-9999.0, 1.0, f64::NAN, 2.0]).unwrap();
        assert_eq!(valid_mask(&band, Some(-9999.0)), vec![false, true, false, true]);
        assert_eq!(valid_mask(&band, None), vec![true, true, false, true]);
    }

    #[test]
    fn stretch_spans_full_range_and_zeroes_masked() {
        let values: Vec<f64> = (0..100).map(|x| x as f64).chain([-1.0]).collect();
        let band = Array2::from_shape_vec((1, 101), values).unwrap();
        let out = percentile_stretch_u8(&band, Some(-1.0));
        assert_eq!(out[0], 0);
        assert!(out[99] >= 254);
        assert_eq!(out[100], 0);
        assert!(out[50] > 100 && out[50] < 155);
    }

    #[test]
    fn constant_band_maps_to_zero() {
        let band = Array2::from_elem((3, 3), 7.0);
        assert!(percentile_stretch_u8(&band, None).iter().all(|&v| v == 0));
    }

    #[test]
    fn all_masked_band_is_zero() {
        let band = Array2::from_elem((2, 5), -9999.0);
        let out = percentile_stretch_u8(&band, Some(-9999.0));
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|&v| v == 0));
    }
}
