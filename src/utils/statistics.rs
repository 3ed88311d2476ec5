/// Median of a set of values.
///
/// The slice is reordered in place. An even count averages the two middle
/// values; an empty slice yields 0.0. Values are ordered with
/// `f32::total_cmp`, so a stray NaN never panics.
///
/// # Example
/// ```
/// use repet::utils::median;
///
/// let mut odd = vec![3.0, 1.0, 2.0];
/// assert_eq!(median(&mut odd), 2.0);
///
/// let mut even = vec![4.0, 1.0, 3.0, 2.0];
/// assert_eq!(median(&mut even), 2.5);
/// ```
pub fn median(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let lower = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    0.5 * (lower + upper)
}
