//! Small numeric helpers shared by the detectors and report generators.
//!
//! Every helper returns a finite value for empty input so that reports never
//! carry NaN or infinity.

/// Round to `places` decimal places. The single rounding rule used for every
/// reported number.
pub fn round_dp(x: f64, places: u32) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(places as i32);
    (x * factor).round() / factor
}

/// Arithmetic mean, 0.0 for an empty input.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// `part / whole` as a percentage, 0.0 when `whole` is zero.
pub fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
