//! Numeric conversion helpers and sampling grids
#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}

/// Pixel centre coordinates of a grid with `n` samples and pitch `d`.
///
/// The sample with index `n/2` sits on the optical axis, i.e. the coordinates run from `-n/2 * d` to
/// `(n/2 - 1) * d` for even `n`.
#[must_use]
pub fn centered_coordinates(n: usize, d: f64) -> Vec<f64> {
    let half = usize_to_f64(n / 2);
    (0..n).map(|i| (usize_to_f64(i) - half) * d).collect()
}
