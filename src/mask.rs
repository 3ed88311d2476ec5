//! Soft masks for the repeating component of a magnitude spectrogram.
//!
//! The repeating model is a median across repetitions. Taking its minimum
//! with the observed spectrogram keeps the background from exceeding the
//! mixture, and the ratio of the two gives a mask in (0, 1].

use crate::utils::{map_indices, median};
use ndarray::Array2;

/// Regularizer added to numerator and denominator of every mask ratio.
pub const EPSILON: f32 = f32::EPSILON;

/// Repeating spectrogram for a single repeating period.
///
/// The time axis is cut into `ceil(n_frames / period)` segments of `period`
/// frames. For each bin of the period, the median is taken over the
/// segments that reach it (the trailing partial segment contributes only to
/// the positions it covers). The result is the element-wise minimum of the
/// spectrogram and that model tiled across segments.
///
/// # Errors
/// Returns an error if `period` is zero.
pub fn repeating_spectrogram(magnitude: &Array2<f32>, period: usize) -> crate::Result<Array2<f32>> {
    if period == 0 {
        return Err(crate::Error::invalid("period", 0, "must be at least one frame"));
    }
    let (n_freq, n_frames) = magnitude.dim();

    let model_rows = map_indices(n_freq, |f| {
        let row = magnitude.row(f);
        (0..period.min(n_frames))
            .map(|p| {
                let mut values: Vec<f32> = row.iter().skip(p).step_by(period).copied().collect();
                median(&mut values)
            })
            .collect::<Vec<f32>>()
    });

    Ok(Array2::from_shape_fn((n_freq, n_frames), |(f, t)| {
        magnitude[(f, t)].min(model_rows[f][t % period])
    }))
}

/// Soft mask for a single repeating period.
///
/// # Example
/// ```
/// use repet::mask::repeating_mask;
/// use ndarray::Array2;
///
/// let mag = Array2::from_shape_fn((4, 12), |(f, t)| (f + t % 3) as f32);
/// let mask = repeating_mask(&mag, 3).unwrap();
/// assert!(mask.iter().all(|&m| m > 0.0 && m <= 1.0));
/// ```
pub fn repeating_mask(magnitude: &Array2<f32>, period: usize) -> crate::Result<Array2<f32>> {
    let repeating = repeating_spectrogram(magnitude, period)?;
    Ok(ratio_mask(&repeating, magnitude))
}

/// Offsets of a period-synchronous median window of `points` entries.
///
/// Five points give `[-2, -1, 0, 1, 2]`; an even count leans forward.
pub fn window_offsets(points: usize) -> Vec<isize> {
    let center = points.div_ceil(2) as isize;
    (1..=points as isize).map(|k| k - center).collect()
}

/// Repeating spectrogram for a frame-varying repeating period.
///
/// Frame `t` is modeled by the per-bin median of the frames
/// `t + k * periods[t]` for the offsets `k` of [`window_offsets`], keeping
/// only indices inside the spectrogram.
///
/// # Errors
/// Returns an error if `periods` does not have one entry per frame or
/// `window_points` is zero.
pub fn adaptive_repeating_spectrogram(
    magnitude: &Array2<f32>,
    periods: &[usize],
    window_points: usize,
) -> crate::Result<Array2<f32>> {
    let (n_freq, n_frames) = magnitude.dim();
    if periods.len() != n_frames {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{} periods", n_frames),
            got: format!("{} periods", periods.len()),
        });
    }
    if window_points == 0 {
        return Err(crate::Error::invalid(
            "median_window_points",
            0,
            "must be at least one point",
        ));
    }

    let offsets = window_offsets(window_points);
    let columns = map_indices(n_frames, |t| {
        let period = periods[t] as isize;
        let frames: Vec<usize> = offsets
            .iter()
            .map(|&k| t as isize + k * period)
            .filter(|&i| i >= 0 && (i as usize) < n_frames)
            .map(|i| i as usize)
            .collect();
        let mut values = Vec::with_capacity(frames.len());
        (0..n_freq)
            .map(|f| {
                values.clear();
                values.extend(frames.iter().map(|&i| magnitude[(f, i)]));
                median(&mut values).min(magnitude[(f, t)])
            })
            .collect::<Vec<f32>>()
    });

    Ok(Array2::from_shape_fn((n_freq, n_frames), |(f, t)| columns[t][f]))
}

/// Soft mask for a frame-varying repeating period.
pub fn adaptive_mask(
    magnitude: &Array2<f32>,
    periods: &[usize],
    window_points: usize,
) -> crate::Result<Array2<f32>> {
    let repeating = adaptive_repeating_spectrogram(magnitude, periods, window_points)?;
    Ok(ratio_mask(&repeating, magnitude))
}

/// `(repeating + EPSILON) / (magnitude + EPSILON)`, element-wise.
pub fn ratio_mask(repeating: &Array2<f32>, magnitude: &Array2<f32>) -> Array2<f32> {
    let mut mask = repeating.clone();
    mask.zip_mut_with(magnitude, |r, &m| *r = (*r + EPSILON) / (m + EPSILON));
    mask
}

/// Frequency bin below which content is kept in the background.
///
/// `ceil(cutoff_frequency * (window_length - 1) / sample_rate)`
pub fn cutoff_bin(cutoff_frequency: f32, window_length: usize, sample_rate: u32) -> usize {
    if sample_rate == 0 || cutoff_frequency <= 0.0 {
        return 0;
    }
    (cutoff_frequency as f64 * (window_length.saturating_sub(1)) as f64 / sample_rate as f64).ceil()
        as usize
}

/// Force the mask to 1 on bins `0..=cutoff` (DC included) so low
/// frequencies stay in the background.
pub fn apply_cutoff(mask: &mut Array2<f32>, cutoff: usize) {
    let n_rows = (cutoff + 1).min(mask.nrows());
    for f in 0..n_rows {
        mask.row_mut(f).fill(1.0);
    }
}

/// Expand a half-spectrum mask (`window_length / 2 + 1` rows) to the full
/// mirrored spectrum, DC and Nyquist not repeated.
///
/// # Errors
/// Returns an error if the mask does not have `window_length / 2 + 1` rows.
pub fn mirror(mask: &Array2<f32>, window_length: usize) -> crate::Result<Array2<f32>> {
    let half = window_length / 2;
    if mask.nrows() != half + 1 {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{} frequency bins", half + 1),
            got: format!("{} frequency bins", mask.nrows()),
        });
    }
    Ok(Array2::from_shape_fn((window_length, mask.ncols()), |(k, t)| {
        if k <= half {
            mask[(k, t)]
        } else {
            mask[(window_length - k, t)]
        }
    }))
}
