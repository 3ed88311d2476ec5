//! Framing transform: windowed STFT and its overlap-add inverse.
//!
//! Frames are zero-padded by `window_length - step_length` samples on the
//! left so the first sample is covered by two frames, and on the right up to
//! a whole number of hops. With a periodic Hamming window and a 50% hop the
//! inverse is exact up to floating-point error.

use crate::fft::FftPlan;
use crate::utils::map_indices;
use crate::window;
use ndarray::Array2;
use num_complex::Complex32;

/// STFT analysis parameters.
#[derive(Debug, Clone)]
pub struct StftConfig {
    /// Frame length in samples (also the FFT size).
    pub window_length: usize,
    /// Hop between successive frames in samples.
    pub step_length: usize,
    /// Analysis window of `window_length` samples.
    pub window: Vec<f32>,
}

impl StftConfig {
    /// Periodic Hamming window of `window_length` samples at a 50% hop.
    ///
    /// # Errors
    /// Returns an error if `window_length` is smaller than 2 or odd.
    pub fn new(window_length: usize) -> crate::Result<Self> {
        if window_length < 2 || window_length % 2 != 0 {
            return Err(crate::Error::InvalidSize {
                name: "window_length",
                value: window_length,
                reason: "must be even and at least 2",
            });
        }
        Ok(Self {
            window_length,
            step_length: window_length / 2,
            window: window::hamming(window_length),
        })
    }

    /// Derive the STFT parameters from a window duration.
    ///
    /// The window length is the smallest power of two holding
    /// `window_duration * sample_rate` samples.
    ///
    /// # Example
    /// ```
    /// use repet::spectrum::StftConfig;
    ///
    /// let cfg = StftConfig::from_duration(0.04, 44100).unwrap();
    /// assert_eq!(cfg.window_length, 2048);
    /// assert_eq!(cfg.step_length, 1024);
    /// ```
    pub fn from_duration(window_duration: f32, sample_rate: u32) -> crate::Result<Self> {
        if !(window_duration.is_finite() && window_duration > 0.0) {
            return Err(crate::Error::invalid(
                "window_duration",
                window_duration,
                "must be a positive number of seconds",
            ));
        }
        if sample_rate == 0 {
            return Err(crate::Error::invalid("sample_rate", 0, "must be > 0"));
        }
        let samples = (window_duration as f64 * sample_rate as f64).ceil() as usize;
        Self::new(samples.max(2).next_power_of_two())
    }

    /// Number of bins kept in the non-mirrored half of the spectrum.
    pub fn n_freq(&self) -> usize {
        self.window_length / 2 + 1
    }

    /// Number of frames the forward transform produces for `n_samples`.
    pub fn n_frames(&self, n_samples: usize) -> usize {
        (self.window_length - self.step_length + n_samples).div_ceil(self.step_length)
    }

    fn left_padding(&self) -> usize {
        self.window_length - self.step_length
    }

    fn validate(&self) -> crate::Result<()> {
        if self.step_length == 0 || self.step_length > self.window_length {
            return Err(crate::Error::InvalidSize {
                name: "step_length",
                value: self.step_length,
                reason: "must be in 1..=window_length",
            });
        }
        if self.window.len() != self.window_length {
            return Err(crate::Error::ShapeMismatch {
                expected: format!("window of {} samples", self.window_length),
                got: format!("{} samples", self.window.len()),
            });
        }
        Ok(())
    }
}

#[inline]
fn compute_frame(frame: usize, padded: &[f32], config: &StftConfig, fft: &FftPlan) -> Vec<Complex32> {
    let start = frame * config.step_length;
    let mut buffer: Vec<Complex32> = padded[start..start + config.window_length]
        .iter()
        .zip(config.window.iter())
        .map(|(&sample, &w)| Complex32::new(sample * w, 0.0))
        .collect();
    fft.forward(&mut buffer);
    buffer
}

/// Compute the Short-Time Fourier Transform.
///
/// # Arguments
/// * `y` - Input signal (at least one sample)
/// * `config` - Window and hop
///
/// # Returns
/// Complex matrix of shape `(window_length, n_frames)` holding the full,
/// mirrored spectrum of every frame. No normalization is applied.
///
/// # Errors
/// Returns an error if the signal is empty or non-finite, or the config is
/// inconsistent.
pub fn stft(y: &[f32], config: &StftConfig) -> crate::Result<Array2<Complex32>> {
    crate::utils::valid_audio(y)?;
    config.validate()?;

    let n_frames = config.n_frames(y.len());
    let left = config.left_padding();
    let mut padded = vec![0.0f32; (n_frames - 1) * config.step_length + config.window_length];
    padded[left..left + y.len()].copy_from_slice(y);

    let fft = FftPlan::new(config.window_length);
    let frames = map_indices(n_frames, |frame| compute_frame(frame, &padded, config, &fft));

    let mut stft_matrix = Array2::<Complex32>::zeros((config.window_length, n_frames));
    for (frame, spectrum) in frames.iter().enumerate() {
        for (f, &val) in spectrum.iter().enumerate() {
            stft_matrix[(f, frame)] = val;
        }
    }

    Ok(stft_matrix)
}

/// Compute the inverse STFT by overlap-add.
///
/// Each frame is inverse transformed, its real part overlap-added at
/// `step_length` offsets, the forward padding stripped from both ends, and
/// the result divided by the overlap-add gain of the window. The output may
/// run past the original signal by less than one hop; callers truncate.
///
/// # Errors
/// Returns an error if the matrix is empty or its frame size does not match
/// the config.
pub fn istft(stft_matrix: &Array2<Complex32>, config: &StftConfig) -> crate::Result<Vec<f32>> {
    config.validate()?;
    let (n_bins, n_frames) = stft_matrix.dim();
    if n_bins == 0 || n_frames == 0 {
        return Err(crate::Error::InvalidSize {
            name: "stft_matrix",
            value: 0,
            reason: "STFT matrix must be non-empty",
        });
    }
    if n_bins != config.window_length {
        return Err(crate::Error::ShapeMismatch {
            expected: format!("{} frequency bins", config.window_length),
            got: format!("{} frequency bins", n_bins),
        });
    }

    let fft = FftPlan::new(config.window_length);
    let frames = map_indices(n_frames, |frame| {
        let mut buffer: Vec<Complex32> = stft_matrix.column(frame).to_vec();
        fft.inverse(&mut buffer);
        buffer.into_iter().map(|c| c.re).collect::<Vec<f32>>()
    });

    let n_samples = (n_frames - 1) * config.step_length + config.window_length;
    let mut y = vec![0.0f32; n_samples];
    for (frame, samples) in frames.iter().enumerate() {
        let start = frame * config.step_length;
        for (acc, &s) in y[start..start + config.window_length].iter_mut().zip(samples) {
            *acc += s;
        }
    }

    let pad = config.left_padding();
    let gain = window::overlap_add_gain(&config.window, config.step_length);
    let end = n_samples.saturating_sub(pad).max(pad);
    Ok(y[pad..end].iter().map(|&v| v / gain).collect())
}

/// Magnitude of the non-mirrored half of a full STFT (bins `0..=window_length/2`).
pub fn magnitude(stft_matrix: &Array2<Complex32>) -> Array2<f32> {
    let (n_bins, n_frames) = stft_matrix.dim();
    let n_freq = if n_bins == 0 { 0 } else { n_bins / 2 + 1 };
    Array2::from_shape_fn((n_freq, n_frames), |(f, t)| stft_matrix[(f, t)].norm())
}
