//! Self-correlation of spectrograms along time.
//!
//! The beat spectrum is the frequency-averaged, unbiased autocorrelation of a
//! power spectrogram's rows. Peaks reveal the lags (in frames) at which the
//! spectrogram repeats. The beat spectrogram tracks it over time from
//! centered local segments.

use crate::fft::RealFftPlan;
use crate::utils::map_indices;
use ndarray::{Array2, ArrayView2, Axis, s};

/// Unbiased autocorrelation of every column of a matrix.
///
/// Each column is zero-padded to twice its length, its power spectral
/// density taken through a real FFT, and transformed back (Wiener-Khinchin).
/// Lag `k` is divided by `n - k`, the number of overlapping products, so
/// long lags are not suppressed by the shrinking overlap.
///
/// # Arguments
/// * `data` - Matrix of shape `(n_points, n_columns)`
///
/// # Returns
/// Matrix of the same shape; row `k` holds lag `k` of each column.
///
/// # Example
/// ```
/// use repet::beat::autocorrelation;
/// use ndarray::Array2;
///
/// let data = Array2::from_shape_vec((4, 1), vec![1.0, 1.0, 1.0, 1.0]).unwrap();
/// let acf = autocorrelation(data.view());
/// for lag in 0..4 {
///     assert!((acf[(lag, 0)] - 1.0).abs() < 1e-5);
/// }
/// ```
pub fn autocorrelation(data: ArrayView2<'_, f32>) -> Array2<f32> {
    let n_points = data.nrows();
    if n_points == 0 || data.ncols() == 0 {
        return Array2::zeros(data.dim());
    }
    autocorrelation_with(&RealFftPlan::new(2 * n_points), data)
}

/// `autocorrelation` with a caller-owned plan of length `2 * data.nrows()`.
fn autocorrelation_with(plan: &RealFftPlan, data: ArrayView2<'_, f32>) -> Array2<f32> {
    let (n_points, n_columns) = data.dim();
    if n_points == 0 || n_columns == 0 {
        return Array2::zeros((n_points, n_columns));
    }
    debug_assert_eq!(plan.len(), 2 * n_points);

    let columns = map_indices(n_columns, |c| {
        let mut buffer = vec![0.0f32; 2 * n_points];
        for (dst, &src) in buffer.iter_mut().zip(data.column(c).iter()) {
            *dst = src;
        }
        let mut psd: Vec<_> = plan
            .forward(&mut buffer)
            .into_iter()
            .map(|x| num_complex::Complex32::new(x.norm_sqr(), 0.0))
            .collect();
        let raw = plan.inverse(&mut psd);
        raw.into_iter()
            .take(n_points)
            .enumerate()
            .map(|(lag, v)| v / (n_points - lag) as f32)
            .collect::<Vec<f32>>()
    });

    let mut acf = Array2::<f32>::zeros((n_points, n_columns));
    for (c, column) in columns.iter().enumerate() {
        for (lag, &v) in column.iter().enumerate() {
            acf[(lag, c)] = v;
        }
    }
    acf
}

/// Beat spectrum of a power spectrogram.
///
/// # Arguments
/// * `power` - Power spectrogram of shape `(n_freq, n_frames)`
///
/// # Returns
/// One value per lag `0..n_frames`, averaged across frequency channels.
pub fn beat_spectrum(power: ArrayView2<'_, f32>) -> Vec<f32> {
    mean_over_channels(autocorrelation(power.t()))
}

fn mean_over_channels(acf: Array2<f32>) -> Vec<f32> {
    if acf.ncols() == 0 {
        return vec![0.0; acf.nrows()];
    }
    acf.mean_axis(Axis(1))
        .map(|mean| mean.to_vec())
        .unwrap_or_default()
}

/// Beat spectrogram of a power spectrogram.
///
/// Every `segment_step`-th frame (and always the last one) gets the beat
/// spectrum of a `segment_length`-frame window centered on it, the
/// spectrogram being zero-padded at both ends. Frames in between reuse the
/// most recently analyzed column.
///
/// # Arguments
/// * `power` - Power spectrogram of shape `(n_freq, n_frames)`
/// * `segment_length` - Analysis window in frames
/// * `segment_step` - Frames between analyzed columns
///
/// # Returns
/// Matrix of shape `(segment_length, n_frames)`, one beat spectrum per frame.
///
/// # Errors
/// Returns an error if `segment_length` or `segment_step` is zero.
pub fn beat_spectrogram(
    power: ArrayView2<'_, f32>,
    segment_length: usize,
    segment_step: usize,
) -> crate::Result<Array2<f32>> {
    beat_spectrogram_observed(power, segment_length, segment_step, None)
}

/// Frames at which the beat spectrogram is actually analyzed.
pub fn analyzed_frames(n_frames: usize, segment_step: usize) -> Vec<usize> {
    if n_frames == 0 || segment_step == 0 {
        return Vec::new();
    }
    let mut frames: Vec<usize> = (0..n_frames).step_by(segment_step).collect();
    if frames.last() != Some(&(n_frames - 1)) {
        frames.push(n_frames - 1);
    }
    frames
}

pub(crate) fn beat_spectrogram_observed(
    power: ArrayView2<'_, f32>,
    segment_length: usize,
    segment_step: usize,
    on_column: Option<&(dyn Fn() + Sync)>,
) -> crate::Result<Array2<f32>> {
    if segment_length == 0 {
        return Err(crate::Error::InvalidSize {
            name: "segment_length",
            value: 0,
            reason: "must be > 0",
        });
    }
    if segment_step == 0 {
        return Err(crate::Error::InvalidSize {
            name: "segment_step",
            value: 0,
            reason: "must be > 0",
        });
    }

    let (n_freq, n_frames) = power.dim();
    let before = (segment_length - 1).div_ceil(2);
    let mut padded = Array2::<f32>::zeros((n_freq, n_frames + segment_length - 1));
    padded
        .slice_mut(s![.., before..before + n_frames])
        .assign(&power);

    // Every window has the same length: plan once for all columns
    let plan = RealFftPlan::new(2 * segment_length);
    let frames = analyzed_frames(n_frames, segment_step);
    let columns = map_indices(frames.len(), |i| {
        let t = frames[i];
        let window = padded.slice(s![.., t..t + segment_length]);
        let spectrum = mean_over_channels(autocorrelation_with(&plan, window.t()));
        if let Some(notify) = on_column {
            notify();
        }
        spectrum
    });

    let mut spectrogram = Array2::<f32>::zeros((segment_length, n_frames));
    for (i, &start) in frames.iter().enumerate() {
        let end = frames.get(i + 1).copied().unwrap_or(n_frames);
        for t in start..end {
            for (lag, &v) in columns[i].iter().enumerate() {
                spectrogram[(lag, t)] = v;
            }
        }
    }
    Ok(spectrogram)
}
