use super::{Analysis, ProgressFn, Reporter, SeparationConfig, per_channel};
use crate::beat::beat_spectrum;
use crate::mask::repeating_mask;
use crate::period::estimate_period;
use crate::spectrum::{magnitude, stft};
use ndarray::Array2;

/// Separate the repeating background assuming one stationary period.
///
/// Each channel goes through STFT, beat spectrum, a single period estimate,
/// the median repeating mask and the inverse STFT. The output has the shape
/// of `signal` (`channels x samples`).
///
/// # Errors
/// Returns an error for invalid parameters, empty or non-finite input, or a
/// signal shorter than one window or three minimum periods.
///
/// # Example
/// ```
/// use repet::separation::{SeparationConfig, separate_stationary};
/// use ndarray::Array2;
///
/// let cfg = SeparationConfig { period_range: (0.1, 0.5), ..SeparationConfig::default() };
/// let silence = Array2::<f32>::zeros((2, 8000));
/// let background = separate_stationary(&silence, 8000, &cfg, None).unwrap();
/// assert_eq!(background.dim(), (2, 8000));
/// assert!(background.iter().all(|&v| v == 0.0));
/// ```
pub fn separate_stationary(
    signal: &Array2<f32>,
    sample_rate: u32,
    config: &SeparationConfig,
    progress: Option<&ProgressFn<'_>>,
) -> crate::Result<Array2<f32>> {
    crate::utils::valid_audio_2d(signal)?;
    let analysis = Analysis::new(config, sample_rate)?;
    analysis.check_length(signal.ncols())?;

    let reporter = Reporter::new(progress, signal.nrows());
    per_channel(signal, |channel, samples| {
        let (background, period) = separate_channel(samples, &analysis)?;
        log::debug!("channel {}: repeating period {} frames", channel, period);
        reporter.tick();
        Ok(background)
    })
}

/// Repeating period (in STFT frames) the stationary method finds for one channel.
///
/// # Errors
/// Same conditions as [`separate_stationary`].
pub fn estimate_repeating_period(
    samples: &[f32],
    sample_rate: u32,
    config: &SeparationConfig,
) -> crate::Result<usize> {
    crate::utils::valid_audio(samples)?;
    let analysis = Analysis::new(config, sample_rate)?;
    analysis.check_length(samples.len())?;
    let spectrum = stft(samples, &analysis.stft)?;
    let power = magnitude(&spectrum).mapv(|v| v * v);
    estimate_period(&beat_spectrum(power.view()), analysis.periods)
}

/// Background of one channel and the period it was built from.
pub(crate) fn separate_channel(
    samples: &[f32],
    analysis: &Analysis,
) -> crate::Result<(Vec<f32>, usize)> {
    let spectrum = stft(samples, &analysis.stft)?;
    let magnitude = magnitude(&spectrum);
    let power = magnitude.mapv(|v| v * v);
    let period = estimate_period(&beat_spectrum(power.view()), analysis.periods)?;
    let mask = repeating_mask(&magnitude, period)?;
    let background = analysis.reconstruct(&spectrum, mask, samples.len())?;
    Ok((background, period))
}
