use super::stationary::separate_channel;
use super::{Analysis, ProgressFn, Reporter, SeparationConfig, per_channel};
use crate::window::triangular;
use ndarray::{Array2, s};
use std::ops::Range;

/// How a signal is cut into overlapping segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLayout {
    /// Sample range of every segment, in order.
    pub segments: Vec<Range<usize>>,
    /// Samples shared by consecutive segments.
    pub overlap: usize,
}

impl SegmentLayout {
    /// Lay out segments of `length` samples every `step` samples.
    ///
    /// A signal shorter than `length + step` is a single segment. Otherwise
    /// there are `(n_samples - length) / step + 1` segments and the last one
    /// runs to the end of the signal, so it may be up to `step - 1` samples
    /// longer than the others.
    ///
    /// # Example
    /// ```
    /// use repet::separation::SegmentLayout;
    ///
    /// let layout = SegmentLayout::new(23, 10, 5);
    /// assert_eq!(layout.segments, vec![0..10, 5..15, 10..23]);
    /// assert_eq!(layout.overlap, 5);
    /// ```
    pub fn new(n_samples: usize, length: usize, step: usize) -> Self {
        let overlap = length.saturating_sub(step);
        if step == 0 || n_samples < length + step {
            return Self {
                segments: vec![0..n_samples],
                overlap,
            };
        }
        let count = (n_samples - length) / step + 1;
        let segments = (0..count)
            .map(|i| {
                let start = i * step;
                let end = if i + 1 == count { n_samples } else { start + length };
                start..end
            })
            .collect();
        Self { segments, overlap }
    }

    /// Length of the shortest segment.
    pub fn shortest(&self) -> usize {
        self.segments.iter().map(|r| r.len()).min().unwrap_or(0)
    }
}

/// Blend a segment estimate into the accumulated output.
///
/// `fade` is a symmetric triangular window of `2 * overlap` samples. Over
/// `accumulated[start..start + overlap]` the existing samples are weighted by
/// the falling half and the segment's leading samples by the rising half;
/// the rest of the segment is copied as is. With `fade` empty the segment
/// simply overwrites its range.
///
/// # Example
/// ```
/// use repet::separation::crossfade;
/// use repet::window::triangular;
///
/// let mut out = vec![1.0f32; 6];
/// crossfade(&mut out, &[-1.0; 4], 2, &triangular(4));
/// assert_eq!(out, vec![1.0, 1.0, 0.5, -0.5, -1.0, -1.0]);
/// ```
pub fn crossfade(accumulated: &mut [f32], segment: &[f32], start: usize, fade: &[f32]) {
    let overlap = (fade.len() / 2).min(segment.len());
    let (rising, falling) = fade.split_at(fade.len() / 2);
    for (i, &value) in segment.iter().enumerate() {
        let Some(out) = accumulated.get_mut(start + i) else {
            break;
        };
        *out = if i < overlap {
            *out * falling[i] + value * rising[i]
        } else {
            value
        };
    }
}

/// Separate the repeating background segment by segment.
///
/// The signal is cut into `segment_length`-second segments every
/// `segment_step` seconds; each runs the stationary method independently and
/// consecutive estimates are crossfaded linearly over their overlap. The
/// first segment is not faded in and the last one is not faded out.
///
/// # Errors
/// Returns an error for invalid parameters, empty or non-finite input, or a
/// segment shorter than one window or three minimum periods.
pub fn separate_segmented(
    signal: &Array2<f32>,
    sample_rate: u32,
    config: &SeparationConfig,
    progress: Option<&ProgressFn<'_>>,
) -> crate::Result<Array2<f32>> {
    crate::utils::valid_audio_2d(signal)?;
    let analysis = Analysis::new(config, sample_rate)?;

    let samples = |seconds: f32| (seconds as f64 * sample_rate as f64).round() as usize;
    let length = samples(config.segment_length);
    let step = samples(config.segment_step);
    if length == 0 || step == 0 {
        return Err(crate::Error::invalid(
            "segment_length",
            format!("{} s / {} s", config.segment_length, config.segment_step),
            "segment length and step must span at least one sample",
        ));
    }

    let (n_channels, n_samples) = signal.dim();
    let layout = SegmentLayout::new(n_samples, length, step);
    analysis.check_length(layout.shortest())?;
    log::debug!(
        "segmented: {} segments of {} samples, overlap {}",
        layout.segments.len(),
        length,
        layout.overlap
    );

    let fade = triangular(2 * layout.overlap);
    let reporter = Reporter::new(progress, layout.segments.len());
    let mut background = Array2::<f32>::zeros((n_channels, n_samples));

    for (index, range) in layout.segments.iter().enumerate() {
        let segment = signal.slice(s![.., range.clone()]).to_owned();
        let estimate = per_channel(&segment, |channel, samples| {
            let (estimate, period) = separate_channel(samples, &analysis)?;
            log::trace!(
                "segment {} channel {}: repeating period {} frames",
                index,
                channel,
                period
            );
            Ok(estimate)
        })?;

        for c in 0..n_channels {
            let mut row = background.row_mut(c);
            let Some(out) = row.as_slice_mut() else {
                continue;
            };
            let seg = estimate.row(c).to_vec();
            if index == 0 {
                crossfade(out, &seg, range.start, &[]);
            } else {
                crossfade(out, &seg, range.start, &fade);
            }
        }
        reporter.tick();
    }

    Ok(background)
}
