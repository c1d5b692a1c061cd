//! Order statistics shared by the cropper and the quantizer.
//!
//! Both callers gather a full distribution first and only then derive their
//! cut points from it, so nothing here keeps state between calls.

/// Percentile `p` (0..=100) of `values` with linear interpolation between the
/// two closest ranks. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(percentile_of_sorted(&sorted, p))
}

/// Same as [`percentile`] for input that is already sorted ascending.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = (p.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Number of elements of the ascending `sorted` slice strictly below `value`,
/// i.e. the leftmost insertion point.
pub fn count_below(sorted: &[f64], value: f64) -> usize {
    sorted.partition_point(|v| *v < value)
}

/// Number of elements of the ascending `sorted` slice at or below `value`,
/// i.e. the rightmost insertion point.
pub fn count_at_or_below(sorted: &[f64], value: f64) -> usize {
    sorted.partition_point(|v| *v <= value)
}
