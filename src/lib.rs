//! Repeating pattern extraction for audio source separation.
//!
//! Many mixtures are a repeating structure (accompaniment, steady noise)
//! overlaid with a varying one (vocals, foreground events). This crate
//! estimates the repeating period of a signal from the self-correlation of
//! its spectrogram, models the repeating part with a median across
//! repetitions, and resynthesizes it as the background. No training data or
//! prior model is involved.
//!
//! # Quick Start
//!
//! ```rust
//! use repet::separation::{SeparationConfig, foreground, separate_stationary};
//! use ndarray::Array2;
//!
//! let sr = 8000;
//! // A click every 0.25 s: a perfectly repeating signal
//! let signal = Array2::from_shape_fn((1, 4 * sr as usize), |(_, i)| {
//!     if i % 2000 < 40 { 0.5 } else { 0.0 }
//! });
//!
//! let cfg = SeparationConfig { period_range: (0.1, 1.0), ..SeparationConfig::default() };
//! let background = separate_stationary(&signal, sr, &cfg, None).unwrap();
//! let fg = foreground(&signal, &background).unwrap();
//! assert_eq!(fg.dim(), signal.dim());
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`spectrum`] | STFT / overlap-add ISTFT with a periodic Hamming window |
//! | [`beat`] | Unbiased autocorrelation, beat spectrum, beat spectrogram |
//! | [`period`] | Repeating period estimation |
//! | [`mask`] | Median repeating masks, low-frequency guard band |
//! | [`separation`] | Stationary, segmented and adaptive pipelines |
//! | [`window`] | Hamming and triangular windows |
//! | [`fft`] | Cached complex and real FFT plans |
//! | [`utils`] | Validation and median helpers |
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]. Invalid parameters and
//! signals too short to analyze are reported before any transform runs.
//! Silence is not an error: it separates into a silent background.
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `parallel` | Process channels, frames and frequency bins on the rayon pool |

#![deny(unsafe_code)]

pub mod error;
pub use error::{Error, Result};

pub mod beat;
pub mod fft;
pub mod mask;
pub mod period;
pub mod separation;
pub mod spectrum;
pub mod utils;
pub mod window;

pub use separation::{
    Method, Progress, SeparationConfig, foreground, separate, separate_adaptive,
    separate_segmented, separate_stationary,
};
