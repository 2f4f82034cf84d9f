//! Two-dimensional FFT helpers on complex fields
//!
//! Fields are stored as [`DMatrix`] with rows along y and columns along x. All transforms are
//! orthonormal, i.e. scaled by `1/sqrt(nx*ny)` in both directions, so that the forward transform
//! followed by the inverse transform is the identity and the energy of a field is preserved.
use nalgebra::DMatrix;
use num::complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

use super::usize_to_f64;

/// Orthonormal 2D FFT of `field` in the given `direction`.
#[must_use]
pub fn fft2(field: &DMatrix<Complex64>, direction: FftDirection) -> DMatrix<Complex64> {
    let (nrows, ncols) = field.shape();
    if nrows == 0 || ncols == 0 {
        return field.clone();
    }
    let mut planner = FftPlanner::<f64>::new();
    // storage is column major: transform along y first
    let mut out = field.clone();
    let col_fft = planner.plan_fft(nrows, direction);
    for column in out.as_mut_slice().chunks_exact_mut(nrows) {
        col_fft.process(column);
    }
    let mut out = out.transpose();
    let row_fft = planner.plan_fft(ncols, direction);
    for row in out.as_mut_slice().chunks_exact_mut(ncols) {
        row_fft.process(row);
    }
    let scale = 1.0 / usize_to_f64(nrows * ncols).sqrt();
    out.transpose().map(|c| c * scale)
}
/// Orthonormal forward 2D FFT.
#[must_use]
pub fn fft2_forward(field: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    fft2(field, FftDirection::Forward)
}
/// Orthonormal inverse 2D FFT.
#[must_use]
pub fn fft2_inverse(field: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    fft2(field, FftDirection::Inverse)
}
/// Cyclically shift `field` by `row_shift` rows and `col_shift` columns (towards larger indices).
fn roll(field: &DMatrix<Complex64>, row_shift: usize, col_shift: usize) -> DMatrix<Complex64> {
    let (nrows, ncols) = field.shape();
    DMatrix::from_fn(nrows, ncols, |r, c| {
        field[((r + nrows - row_shift) % nrows, (c + ncols - col_shift) % ncols)]
    })
}
/// Move the zero-frequency sample to the centre of the array.
#[must_use]
pub fn fftshift(field: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    let (nrows, ncols) = field.shape();
    roll(field, nrows / 2, ncols / 2)
}
/// Inverse of [`fftshift`].
#[must_use]
pub fn ifftshift(field: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    let (nrows, ncols) = field.shape();
    roll(field, nrows - nrows / 2, ncols - ncols / 2)
}
/// Sample frequencies of an FFT with `n` samples and sample spacing `d`.
///
/// The order is the unshifted FFT order: `[0, 1, ..., n/2-1, -n/2, ..., -1] / (d*n)` for even `n`.
#[must_use]
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let norm = 1.0 / (usize_to_f64(n) * d);
    let positive = n.div_ceil(2);
    (0..n)
        .map(|i| {
            if i < positive {
                usize_to_f64(i) * norm
            } else {
                -usize_to_f64(n - i) * norm
            }
        })
        .collect()
}
#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use itertools::iproduct;
    fn ramp(nrows: usize, ncols: usize) -> DMatrix<Complex64> {
        DMatrix::from_fn(nrows, ncols, |r, c| {
            Complex64::new(usize_to_f64(r * ncols + c), usize_to_f64(r) - usize_to_f64(c))
        })
    }
    #[test]
    fn fftfreq_even() {
        assert_eq!(fftfreq(4, 0.5), vec![0.0, 0.5, -1.0, -0.5]);
    }
    #[test]
    fn fftfreq_odd() {
        assert_eq!(fftfreq(5, 1.0), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }
    #[test]
    fn shift_even() {
        let field = ramp(4, 4);
        let shifted = fftshift(&field);
        assert_eq!(shifted[(2, 2)], field[(0, 0)]);
        assert_eq!(shifted[(0, 0)], field[(2, 2)]);
        assert_eq!(ifftshift(&shifted), field);
    }
    #[test]
    fn shift_odd() {
        let field = ramp(3, 5);
        let shifted = fftshift(&field);
        assert_eq!(shifted[(1, 2)], field[(0, 0)]);
        assert_eq!(ifftshift(&shifted), field);
        assert_ne!(fftshift(&shifted), field);
    }
    #[test]
    fn fft_of_delta_is_flat() {
        let mut field = DMatrix::from_element(8, 4, Complex64::new(0.0, 0.0));
        field[(0, 0)] = Complex64::new(1.0, 0.0);
        let spectrum = fft2_forward(&field);
        let expected = 1.0 / 32.0_f64.sqrt();
        for (r, c) in iproduct!(0..8, 0..4) {
            assert_relative_eq!(spectrum[(r, c)].re, expected, epsilon = 1e-14);
            assert_relative_eq!(spectrum[(r, c)].im, 0.0, epsilon = 1e-14);
        }
    }
    #[test]
    fn fft_of_plane_wave() {
        // exp(2 pi i x k / n) peaks in column k
        let (nrows, ncols) = (4, 8);
        let field = DMatrix::from_fn(nrows, ncols, |_, c| {
            Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * usize_to_f64(c) * 3.0 / 8.0)
        });
        let spectrum = fft2_forward(&field);
        let peak = spectrum.map(|c| c.norm()).iamax_full();
        assert_eq!(peak, (0, 3));
        assert_relative_eq!(spectrum[(0, 3)].norm(), 32.0_f64.sqrt(), epsilon = 1e-12);
    }
    #[test]
    fn forward_inverse_identity() {
        let field = ramp(8, 16);
        let back = fft2_inverse(&fft2_forward(&field));
        for (r, c) in iproduct!(0..8, 0..16) {
            assert_relative_eq!(back[(r, c)].re, field[(r, c)].re, epsilon = 1e-10);
            assert_relative_eq!(back[(r, c)].im, field[(r, c)].im, epsilon = 1e-10);
        }
    }
    #[test]
    fn energy_preserved() {
        let field = ramp(16, 8);
        let spectrum = fft2_forward(&field);
        let e_in: f64 = field.iter().map(num::complex::Complex::norm_sqr).sum();
        let e_out: f64 = spectrum.iter().map(num::complex::Complex::norm_sqr).sum();
        assert_relative_eq!(e_in, e_out, max_relative = 1e-12);
    }
}
