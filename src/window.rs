/// Compute a periodic Hamming window.
///
/// The periodic form (denominator `n` rather than `n - 1`) satisfies the
/// constant-overlap-add condition at a hop of `n / 2`.
///
/// # Arguments
/// * `n` - Window length
///
/// # Returns
/// Hamming window of length `n`
pub fn hamming(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let m = n as f32;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / m).cos())
        .collect()
}

/// Compute a symmetric triangular window.
///
/// The window never reaches zero at its edges. For even `n`, the first half
/// and the second half sum to exactly 1 sample by sample, which is what the
/// segment crossfade relies on.
///
/// # Arguments
/// * `n` - Window length
///
/// # Returns
/// Triangular window of length `n`
///
/// # Example
/// ```
/// use repet::window::triangular;
///
/// let w = triangular(4);
/// assert_eq!(w, vec![0.25, 0.75, 0.75, 0.25]);
/// ```
pub fn triangular(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let half = n.div_ceil(2);
    let rising: Vec<f32> = if n % 2 == 0 {
        (1..=half)
            .map(|k| (2 * k - 1) as f32 / n as f32)
            .collect()
    } else {
        (1..=half)
            .map(|k| (2 * k) as f32 / (n + 1) as f32)
            .collect()
    };
    let mut window = rising.clone();
    window.extend(rising.iter().rev().skip(n % 2));
    window
}

/// Overlap-add normalization factor for a window and hop.
///
/// Sum of the window samples taken every `step` samples. For a periodic
/// Hamming window at a 50% hop this is `0.08 + 1.0`, and shifted copies of
/// the window sum to that constant everywhere.
pub fn overlap_add_gain(window: &[f32], step: usize) -> f32 {
    if step == 0 {
        return 0.0;
    }
    window.iter().step_by(step).sum()
}
