//! Small numeric helpers.

/// Round to one decimal place (half away from zero).
#[inline]
pub fn round1(x: f64) -> f64 {
    let r = (x * 10.0).round() / 10.0;
    // Normalise -0.0 so callers never print "-0.0"
    if r == 0.0 { 0.0 } else { r }
}

/// Median of a non-empty slice; averages the two middle values for even lengths.
/// Returns `None` for an empty slice. NaNs sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let n = v.len();
    let mid = n / 2;
    if n % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
