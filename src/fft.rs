use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT plan for forward and inverse complex FFT operations.
///
/// The plans are built once per transform length and shared by every frame
/// of a spectrogram.
///
/// # Example
/// ```
/// use repet::fft::FftPlan;
/// use num_complex::Complex32;
///
/// let plan = FftPlan::new(512);
/// let mut buffer = vec![Complex32::new(1.0, 0.0); 512];
/// plan.forward(&mut buffer);
/// plan.inverse(&mut buffer);
/// assert!((buffer[3].re - 1.0).abs() < 1e-5);
/// ```
pub struct FftPlan {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    len: usize,
}

impl FftPlan {
    /// Create a new FFT plan for a given size.
    ///
    /// # Arguments
    /// * `len` - Size of the FFT (a power of 2 for best performance)
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        Self {
            forward,
            inverse,
            len,
        }
    }

    /// Transform length this plan was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Perform forward FFT in-place. No scaling is applied.
    pub fn forward(&self, buffer: &mut [Complex32]) {
        self.forward.process(buffer);
    }

    /// Perform inverse FFT in-place.
    ///
    /// The output is scaled by 1/len so that `inverse(forward(x)) == x`.
    pub fn inverse(&self, buffer: &mut [Complex32]) {
        self.inverse.process(buffer);
        let scale = 1.0 / self.len as f32;
        for v in buffer.iter_mut() {
            *v *= scale;
        }
    }
}

/// Real-input FFT plan used for the autocorrelation of spectrogram rows.
///
/// Only the non-redundant half of the spectrum (`len / 2 + 1` bins) is
/// produced and consumed.
pub struct RealFftPlan {
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    len: usize,
}

impl RealFftPlan {
    /// Create forward and inverse real FFT plans of length `len`.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        Self {
            forward,
            inverse,
            len,
        }
    }

    /// Transform length this plan was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Real-to-complex forward transform.
    ///
    /// `input` must hold exactly `len` samples and is used as scratch space.
    pub fn forward(&self, input: &mut [f32]) -> Vec<Complex32> {
        let mut spectrum = self.forward.make_output_vec();
        let _ = self.forward.process(input, &mut spectrum);
        spectrum
    }

    /// Complex-to-real inverse transform, scaled by 1/len.
    ///
    /// `spectrum` must hold `len / 2 + 1` bins; the imaginary parts of the DC
    /// and Nyquist bins are ignored.
    pub fn inverse(&self, spectrum: &mut [Complex32]) -> Vec<f32> {
        if let Some(first) = spectrum.first_mut() {
            first.im = 0.0;
        }
        if self.len % 2 == 0 {
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }
        }
        let mut output = self.inverse.make_output_vec();
        let _ = self.inverse.process(spectrum, &mut output);
        let scale = 1.0 / self.len as f32;
        for v in output.iter_mut() {
            *v *= scale;
        }
        output
    }
}

#[cfg(feature = "parallel")]
const _: () = {
    fn _assert_send_sync<T: Send + Sync>() {}
    fn _check() {
        _assert_send_sync::<FftPlan>();
        _assert_send_sync::<RealFftPlan>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_complex_roundtrip() {
        let plan = FftPlan::new(64);
        let original: Vec<Complex32> = (0..64)
            .map(|i| Complex32::new((i as f32 * 0.3).sin(), 0.0))
            .collect();
        let mut buffer = original.clone();
        plan.forward(&mut buffer);
        plan.inverse(&mut buffer);
        for (a, b) in original.iter().zip(buffer.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-5);
            assert_relative_eq!(b.im, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_real_roundtrip() {
        let plan = RealFftPlan::new(32);
        let original: Vec<f32> = (0..32).map(|i| (i as f32 * 0.7).cos()).collect();
        let mut input = original.clone();
        let mut spectrum = plan.forward(&mut input);
        assert_eq!(spectrum.len(), 17);
        let output = plan.inverse(&mut spectrum);
        for (a, b) in original.iter().zip(output.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_real_forward_dc() {
        let plan = RealFftPlan::new(16);
        let mut input = vec![1.0f32; 16];
        let spectrum = plan.forward(&mut input);
        assert_relative_eq!(spectrum[0].re, 16.0, epsilon = 1e-5);
        assert!(spectrum[1..].iter().all(|c| c.norm() < 1e-4));
    }
}
