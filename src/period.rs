//! Repeating period estimation from beat spectra.

use ndarray::Array2;

/// Inclusive range of candidate repeating periods, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub min: usize,
    pub max: usize,
}

impl PeriodRange {
    /// Build a range in frames; lag 0 is never a candidate.
    ///
    /// # Errors
    /// Returns an error if `min > max`.
    pub fn new(min: usize, max: usize) -> crate::Result<Self> {
        if min > max {
            return Err(crate::Error::invalid(
                "period_range",
                format!("[{}, {}]", min, max),
                "minimum must not exceed maximum",
            ));
        }
        Ok(Self {
            min: min.max(1),
            max: max.max(1),
        })
    }

    /// Convert a range in seconds to frames of `step_length` samples.
    ///
    /// Each bound becomes `round(seconds * sample_rate / step_length)`.
    ///
    /// # Example
    /// ```
    /// use repet::period::PeriodRange;
    ///
    /// let range = PeriodRange::from_seconds((1.0, 10.0), 44100, 1024).unwrap();
    /// assert_eq!(range.min, 43);
    /// assert_eq!(range.max, 431);
    /// ```
    pub fn from_seconds(seconds: (f32, f32), sample_rate: u32, step_length: usize) -> crate::Result<Self> {
        let (lo, hi) = seconds;
        if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || lo > hi {
            return Err(crate::Error::invalid(
                "period_range",
                format!("[{}, {}] s", lo, hi),
                "must satisfy 0 < min <= max",
            ));
        }
        if step_length == 0 {
            return Err(crate::Error::InvalidSize {
                name: "step_length",
                value: 0,
                reason: "must be > 0",
            });
        }
        let frames = |s: f32| (s as f64 * sample_rate as f64 / step_length as f64).round() as usize;
        Self::new(frames(lo), frames(hi))
    }

    /// Largest admissible period for a beat spectrum of `spectrum_length` lags.
    ///
    /// At least three repetitions must fit for the median to be meaningful.
    pub fn upper_bound(&self, spectrum_length: usize) -> usize {
        self.max.min(spectrum_length / 3)
    }

    /// Whether any period can be found in a spectrum of `spectrum_length` lags.
    pub fn admits(&self, spectrum_length: usize) -> bool {
        self.upper_bound(spectrum_length) >= self.min
    }
}

/// Estimate the repeating period from a beat spectrum.
///
/// Returns the lag of the maximum over `[range.min, range.upper_bound(L)]`,
/// where `L` is the beat spectrum length. Ties resolve to the smallest lag.
///
/// # Errors
/// Returns an error if the range admits no lag for this spectrum length.
///
/// # Example
/// ```
/// use repet::period::{PeriodRange, estimate_period};
///
/// let mut spectrum = vec![0.0f32; 30];
/// spectrum[0] = 10.0;
/// spectrum[4] = 3.0;
/// spectrum[8] = 3.0;
/// let range = PeriodRange::new(2, 9).unwrap();
/// assert_eq!(estimate_period(&spectrum, range).unwrap(), 4);
/// ```
pub fn estimate_period(beat_spectrum: &[f32], range: PeriodRange) -> crate::Result<usize> {
    let upper = range.upper_bound(beat_spectrum.len());
    if upper < range.min {
        return Err(crate::Error::InsufficientSignal {
            length: beat_spectrum.len(),
            required: 3 * range.min,
            reason: "beat spectrum must span three repetitions of the minimum period",
        });
    }

    let mut best = range.min;
    for lag in range.min + 1..=upper {
        if beat_spectrum[lag] > beat_spectrum[best] {
            best = lag;
        }
    }
    Ok(best)
}

/// Estimate one repeating period per column of a beat spectrogram.
///
/// # Errors
/// Returns an error if the range admits no lag for the column length.
pub fn estimate_periods(beat_spectrogram: &Array2<f32>, range: PeriodRange) -> crate::Result<Vec<usize>> {
    beat_spectrogram
        .columns()
        .into_iter()
        .map(|column| {
            let spectrum = column.to_vec();
            estimate_period(&spectrum, range)
        })
        .collect()
}
