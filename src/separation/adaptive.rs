use super::{Analysis, ProgressFn, Reporter, SeparationConfig, per_channel};
use crate::beat::{analyzed_frames, beat_spectrogram_observed};
use crate::mask::adaptive_mask;
use crate::period::estimate_periods;
use crate::spectrum::{magnitude, stft};
use ndarray::Array2;

/// Separate the repeating background with a frame-varying period.
///
/// A beat spectrogram is computed over `segment_length`-second windows every
/// `segment_step` seconds (both converted to frames), a period is estimated
/// for every frame, and each frame is modeled by the median of the frames
/// one, two, ... periods away (`median_window_points` in total).
///
/// # Errors
/// Returns an error for invalid parameters, an analysis window too short to
/// hold three minimum periods, empty or non-finite input, or a signal
/// shorter than one window or three minimum periods.
pub fn separate_adaptive(
    signal: &Array2<f32>,
    sample_rate: u32,
    config: &SeparationConfig,
    progress: Option<&ProgressFn<'_>>,
) -> crate::Result<Array2<f32>> {
    crate::utils::valid_audio_2d(signal)?;
    let analysis = Analysis::new(config, sample_rate)?;
    let n_samples = signal.ncols();
    analysis.check_length(n_samples)?;

    let frames = |seconds: f32| {
        (seconds as f64 * sample_rate as f64 / analysis.stft.step_length as f64).round() as usize
    };
    let segment_length = frames(config.segment_length);
    let segment_step = frames(config.segment_step).max(1);
    if !analysis.periods.admits(segment_length) {
        return Err(crate::Error::invalid(
            "segment_length",
            config.segment_length,
            format!(
                "{} frames cannot hold three periods of {} frames",
                segment_length, analysis.periods.min
            ),
        ));
    }
    log::debug!(
        "adaptive: beat spectrogram window {} frames, step {} frames, median over {} points",
        segment_length,
        segment_step,
        config.median_window_points
    );

    let n_frames = analysis.stft.n_frames(n_samples);
    let reporter = Reporter::new(
        progress,
        signal.nrows() * analyzed_frames(n_frames, segment_step).len(),
    );
    let tick = || reporter.tick();

    per_channel(signal, |channel, samples| {
        let spectrum = stft(samples, &analysis.stft)?;
        let magnitude = magnitude(&spectrum);
        let power = magnitude.mapv(|v| v * v);
        let beat = beat_spectrogram_observed(power.view(), segment_length, segment_step, Some(&tick))?;
        let periods = estimate_periods(&beat, analysis.periods)?;
        log::debug!(
            "channel {}: periods {}..={} frames",
            channel,
            periods.iter().min().copied().unwrap_or(0),
            periods.iter().max().copied().unwrap_or(0)
        );
        let mask = adaptive_mask(&magnitude, &periods, config.median_window_points)?;
        analysis.reconstruct(&spectrum, mask, n_samples)
    })
}
