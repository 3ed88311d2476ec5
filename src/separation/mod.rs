//! Repeating pattern separation pipelines.
//!
//! Every variant takes a multichannel buffer of shape `(channels, samples)`
//! and returns the repeating background with the same shape. Channels are
//! analyzed independently: each gets its own spectrogram, period estimate
//! and mask, only the analysis parameters are shared.
//!
//! - [`separate_stationary`]: one period for the whole signal.
//! - [`separate_segmented`]: the stationary method on overlapping segments,
//!   crossfaded back together.
//! - [`separate_adaptive`]: one period per frame from a beat spectrogram,
//!   with a period-synchronous median filter.

mod adaptive;
mod segmented;
mod stationary;

pub use adaptive::separate_adaptive;
pub use segmented::{SegmentLayout, crossfade, separate_segmented};
pub use stationary::{estimate_repeating_period, separate_stationary};

use crate::mask::{apply_cutoff, cutoff_bin, mirror};
use crate::period::PeriodRange;
use crate::spectrum::{StftConfig, istft};
use crate::utils::map_indices;
use ndarray::Array2;
use num_complex::Complex32;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Separation parameters shared by all variants.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationConfig {
    /// STFT window duration in seconds (rounded up to a power-of-two length).
    pub window_duration: f32,
    /// Admissible repeating periods in seconds, `(min, max)`.
    pub period_range: (f32, f32),
    /// Frequencies below this (Hz) are kept entirely in the background.
    pub cutoff_frequency: f32,
    /// Segment length in seconds (segmented signal split, adaptive beat spectrogram window).
    pub segment_length: f32,
    /// Segment hop in seconds.
    pub segment_step: f32,
    /// Points in the adaptive period-synchronous median filter.
    pub median_window_points: usize,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            window_duration: 0.040,
            period_range: (1.0, 10.0),
            cutoff_frequency: 100.0,
            segment_length: 10.0,
            segment_step: 5.0,
            median_window_points: 5,
        }
    }
}

impl SeparationConfig {
    /// Check the parameters against a sample rate.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidParameter`] for non-positive durations,
    /// an inverted period range, a segment step longer than the segment, a
    /// zero-point median window, or a cutoff at or above Nyquist.
    pub fn validate(&self, sample_rate: u32) -> crate::Result<()> {
        if sample_rate == 0 {
            return Err(crate::Error::invalid("sample_rate", 0, "must be > 0"));
        }
        positive("window_duration", self.window_duration)?;
        positive("segment_length", self.segment_length)?;
        positive("segment_step", self.segment_step)?;

        let (lo, hi) = self.period_range;
        if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || lo > hi {
            return Err(crate::Error::invalid(
                "period_range",
                format!("[{}, {}] s", lo, hi),
                "must satisfy 0 < min <= max",
            ));
        }
        if self.segment_step > self.segment_length {
            return Err(crate::Error::invalid(
                "segment_step",
                self.segment_step,
                format!("must not exceed segment_length ({})", self.segment_length),
            ));
        }
        if self.median_window_points == 0 {
            return Err(crate::Error::invalid(
                "median_window_points",
                0,
                "must be at least one point",
            ));
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !self.cutoff_frequency.is_finite()
            || self.cutoff_frequency < 0.0
            || self.cutoff_frequency >= nyquist
        {
            return Err(crate::Error::invalid(
                "cutoff_frequency",
                self.cutoff_frequency,
                format!("must be in [0, {}) Hz", nyquist),
            ));
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> crate::Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(crate::Error::invalid(name, value, "must be a positive number of seconds"))
    }
}

/// Separation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stationary,
    Segmented,
    Adaptive,
    Similarity,
}

impl Method {
    /// Parse a method name (case-insensitive).
    ///
    /// # Example
    /// ```
    /// use repet::separation::Method;
    ///
    /// assert_eq!(Method::parse("Adaptive"), Some(Method::Adaptive));
    /// assert_eq!(Method::parse("extended"), Some(Method::Segmented));
    /// assert_eq!(Method::parse("unknown"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "stationary" | "original" => Some(Method::Stationary),
            "segmented" | "extended" => Some(Method::Segmented),
            "adaptive" => Some(Method::Adaptive),
            "similarity" | "sim" => Some(Method::Similarity),
            _ => None,
        }
    }
}

/// Units of work completed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Progress callback. Invoked after each channel (stationary), segment
/// (segmented) or analyzed frame (adaptive); it never affects the result.
pub type ProgressFn<'a> = dyn Fn(Progress) + Sync + 'a;

pub(crate) struct Reporter<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    completed: AtomicUsize,
    total: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(callback: Option<&'a ProgressFn<'a>>, total: usize) -> Self {
        Self {
            callback,
            completed: AtomicUsize::new(0),
            total,
        }
    }

    pub(crate) fn tick(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = self.callback {
            callback(Progress {
                completed,
                total: self.total,
            });
        }
    }
}

/// Analysis parameters derived once per call from the config and sample rate.
pub(crate) struct Analysis {
    pub(crate) stft: StftConfig,
    pub(crate) periods: PeriodRange,
    pub(crate) cutoff: usize,
}

impl Analysis {
    pub(crate) fn new(config: &SeparationConfig, sample_rate: u32) -> crate::Result<Self> {
        config.validate(sample_rate)?;
        let stft = StftConfig::from_duration(config.window_duration, sample_rate)?;
        let periods = PeriodRange::from_seconds(config.period_range, sample_rate, stft.step_length)?;
        let cutoff = cutoff_bin(config.cutoff_frequency, stft.window_length, sample_rate);
        log::debug!(
            "analysis: window {} samples, step {}, periods {}..={} frames, cutoff bin {}",
            stft.window_length,
            stft.step_length,
            periods.min,
            periods.max,
            cutoff
        );
        Ok(Self {
            stft,
            periods,
            cutoff,
        })
    }

    /// Reject signals too short for one window or three minimum periods.
    pub(crate) fn check_length(&self, n_samples: usize) -> crate::Result<()> {
        if n_samples < self.stft.window_length {
            return Err(crate::Error::InsufficientSignal {
                length: n_samples,
                required: self.stft.window_length,
                reason: "signal shorter than one analysis window",
            });
        }
        // Padding frames carry no signal, so count samples rather than frames
        let required = 3 * self.periods.min * self.stft.step_length;
        let n_frames = self.stft.n_frames(n_samples);
        if n_samples < required || !self.periods.admits(n_frames) {
            return Err(crate::Error::InsufficientSignal {
                length: n_samples,
                required,
                reason: "signal must hold three repetitions of the minimum period",
            });
        }
        if self.periods.upper_bound(n_frames) < self.periods.max {
            log::warn!(
                "period search capped at {} frames (one third of {} frames), configured max {}",
                self.periods.upper_bound(n_frames),
                n_frames,
                self.periods.max
            );
        }
        Ok(())
    }

    /// Apply a half-spectrum mask to a full STFT and invert it.
    ///
    /// The low-frequency guard band is forced to 1 before mirroring. The
    /// output is truncated to `n_samples`.
    pub(crate) fn reconstruct(
        &self,
        spectrum: &Array2<Complex32>,
        mut mask: Array2<f32>,
        n_samples: usize,
    ) -> crate::Result<Vec<f32>> {
        apply_cutoff(&mut mask, self.cutoff);
        let full = mirror(&mask, self.stft.window_length)?;
        let mut masked = spectrum.clone();
        masked.zip_mut_with(&full, |c, &m| *c *= m);
        let mut background = istft(&masked, &self.stft)?;
        background.truncate(n_samples);
        Ok(background)
    }
}

/// Run `f` on every channel (row) and stack the results.
pub(crate) fn per_channel<F>(signal: &Array2<f32>, f: F) -> crate::Result<Array2<f32>>
where
    F: Fn(usize, &[f32]) -> crate::Result<Vec<f32>> + Sync + Send,
{
    let (n_channels, n_samples) = signal.dim();
    let channels: Vec<Vec<f32>> = map_indices(n_channels, |c| {
        let samples = signal.row(c).to_vec();
        f(c, &samples)
    })
    .into_iter()
    .collect::<crate::Result<_>>()?;

    let mut out = Array2::<f32>::zeros((n_channels, n_samples));
    for (c, samples) in channels.iter().enumerate() {
        for (dst, &src) in out.row_mut(c).iter_mut().zip(samples.iter()) {
            *dst = src;
        }
    }
    Ok(out)
}

/// Run the separation variant named by `method`.
pub fn separate(
    method: Method,
    signal: &Array2<f32>,
    sample_rate: u32,
    config: &SeparationConfig,
    progress: Option<&ProgressFn<'_>>,
) -> crate::Result<Array2<f32>> {
    match method {
        Method::Stationary => separate_stationary(signal, sample_rate, config, progress),
        Method::Segmented => separate_segmented(signal, sample_rate, config, progress),
        Method::Adaptive => separate_adaptive(signal, sample_rate, config, progress),
        Method::Similarity => separate_similarity(signal, sample_rate, config, progress),
    }
}

/// Similarity-matrix variant.
///
/// No algorithm is defined for it, so it always fails rather than return a
/// silent background that would look like a result.
pub fn separate_similarity(
    _signal: &Array2<f32>,
    _sample_rate: u32,
    _config: &SeparationConfig,
    _progress: Option<&ProgressFn<'_>>,
) -> crate::Result<Array2<f32>> {
    Err(crate::Error::Unsupported { method: "similarity" })
}

/// Foreground as the residual of the background: `signal - background`.
///
/// # Errors
/// Returns an error if the two buffers differ in shape.
///
/// # Example
/// ```
/// use repet::separation::foreground;
/// use ndarray::Array2;
///
/// let signal = Array2::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
/// let background = Array2::from_shape_vec((1, 3), vec![0.5, 2.0, 1.0]).unwrap();
/// let fg = foreground(&signal, &background).unwrap();
/// assert_eq!(fg.row(0).to_vec(), vec![0.5, 0.0, 2.0]);
/// ```
pub fn foreground(signal: &Array2<f32>, background: &Array2<f32>) -> crate::Result<Array2<f32>> {
    if signal.dim() != background.dim() {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{:?}", signal.dim()),
            got: format!("{:?}", background.dim()),
        });
    }
    Ok(signal - background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SeparationConfig::default();
        assert!(cfg.validate(44100).is_ok());
        assert!(cfg.validate(8000).is_ok());
    }

    #[test]
    fn test_config_rejects_bad_parameters() {
        let base = SeparationConfig::default();

        let mut cfg = base.clone();
        cfg.window_duration = 0.0;
        assert!(cfg.validate(8000).is_err());

        let mut cfg = base.clone();
        cfg.period_range = (0.0, 2.0);
        assert!(cfg.validate(8000).is_err());

        let mut cfg = base.clone();
        cfg.period_range = (3.0, 2.0);
        assert!(cfg.validate(8000).is_err());

        let mut cfg = base.clone();
        cfg.cutoff_frequency = 4000.0;
        assert!(cfg.validate(8000).is_err());

        let mut cfg = base.clone();
        cfg.segment_step = 11.0;
        assert!(cfg.validate(8000).is_err());

        let mut cfg = base.clone();
        cfg.median_window_points = 0;
        assert!(cfg.validate(8000).is_err());

        assert!(base.validate(0).is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("stationary"), Some(Method::Stationary));
        assert_eq!(Method::parse("ORIGINAL"), Some(Method::Stationary));
        assert_eq!(Method::parse("segmented"), Some(Method::Segmented));
        assert_eq!(Method::parse("adaptive"), Some(Method::Adaptive));
        assert_eq!(Method::parse("sim"), Some(Method::Similarity));
        assert_eq!(Method::parse(""), None);
    }

    #[test]
    fn test_similarity_is_unsupported() {
        let signal = Array2::<f32>::zeros((1, 100));
        let result = separate(Method::Similarity, &signal, 8000, &SeparationConfig::default(), None);
        assert!(matches!(result, Err(crate::Error::Unsupported { .. })));
    }

    #[test]
    fn test_reporter_counts() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: Progress| seen.lock().unwrap().push(p);
        let reporter = Reporter::new(Some(&callback), 3);
        for _ in 0..3 {
            reporter.tick();
        }
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.last(), Some(&Progress { completed: 3, total: 3 }));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_foreground_shape_mismatch() {
        let a = Array2::<f32>::zeros((1, 4));
        let b = Array2::<f32>::zeros((2, 4));
        assert!(foreground(&a, &b).is_err());
    }

    #[test]
    fn test_check_length() {
        let cfg = SeparationConfig {
            period_range: (0.2, 1.0),
            ..SeparationConfig::default()
        };
        let analysis = Analysis::new(&cfg, 8000).unwrap();
        // Window of 512 samples at 8 kHz
        assert!(analysis.check_length(100).is_err());
        // 0.2 s minimum period needs 0.6 s
        assert!(analysis.check_length(4000).is_err());
        // Six hops of 256 per period: the boundary is exactly 3 * 6 * 256
        assert!(analysis.check_length(4607).is_err());
        assert!(analysis.check_length(4608).is_ok());
        assert!(analysis.check_length(8000).is_ok());
    }
}
