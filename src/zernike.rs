#![warn(missing_docs)]
//! Zernike polynomials over a normalized circular pupil
//!
//! The radial part of each polynomial is computed from the Jacobi polynomial representation
//! `R_n^m(rho) = (-1)^k rho^|m| P_k^(|m|,0)(1 - 2 rho^2)` with `k = (n - |m|)/2`, evaluated by the
//! three-term recurrence of the Jacobi polynomials. Polynomials can be generated orthogonal or
//! orthonormal and in one of the common index [`ZernikeOrdering`]s.
//!
//! All indices `j` are 0-based for every ordering. Hence, the piston term always has index 0.
use itertools::Itertools;
use kahan::KahanSummator;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    error::{PopError, PopResult},
    utils::{f64_to_usize, usize_to_f64},
};

/// Index ordering schemes of the Zernike polynomials.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ZernikeOrdering {
    /// ANSI Z80.28 (also OSA) ordering
    #[default]
    Ansi,
    /// Noll ordering, used by Zemax as "Zernike Standard Coefficients"
    Noll,
    /// Fringe or "University of Arizona" ordering
    Fringe,
    /// Standard ordering as used in CodeV or Born & Wolf
    Standard,
}
impl ZernikeOrdering {
    /// Parse an ordering name (case insensitive).
    ///
    /// # Errors
    ///
    /// This function will return an error if the name does not denote a known ordering.
    pub fn from_name(name: &str) -> PopResult<Self> {
        name.parse::<Self>()
            .map_err(|_| PopError::UnsupportedOrdering(format!("unknown ordering '{name}'")))
    }
    /// Return the `(m, n)` (azimuthal, radial) numbers of the 0-based index `j`.
    #[must_use]
    pub fn index_to_mn(self, j: usize) -> (i32, i32) {
        let jf = usize_to_f64(j);
        match self {
            Self::Ansi | Self::Standard => {
                let n = ((-3.0 + 8.0f64.mul_add(jf, 9.0).sqrt()) / 2.0).ceil();
                let n = to_i32(f64_to_usize(n));
                let m = 2 * to_i32(j) - n * (n + 2);
                if self == Self::Ansi {
                    (m, n)
                } else {
                    (-m, n)
                }
            }
            Self::Noll => {
                let index = j + 1;
                let n = 0.5f64.mul_add(8.0f64.mul_add(usize_to_f64(index), -7.0).sqrt() - 3.0, 1.0);
                let n = f64_to_usize(n);
                let cn = n * (n + 1) / 2 + 1;
                let m = if n % 2 == 0 {
                    (index + 1 - cn) / 2 * 2
                } else {
                    (index - cn) / 2 * 2 + 1
                };
                let m = to_i32(m);
                if index % 2 == 1 {
                    (-m, to_i32(n))
                } else {
                    (m, to_i32(n))
                }
            }
            Self::Fringe => {
                let index = j + 1;
                let half_mn = f64_to_usize(usize_to_f64(index).sqrt().ceil()) - 1;
                let g_s = half_mn * half_mn + 1;
                let n = half_mn + (index - g_s) / 2;
                let m = to_i32(2 * half_mn - n);
                let sign = if (index - g_s) % 2 == 1 { -1 } else { 1 };
                (m * sign, to_i32(n))
            }
        }
    }
    /// Return the 0-based index of the polynomial with azimuthal number `m` and radial number `n`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `(m, n)` is not a valid Zernike index pair.
    pub fn mn_to_index(self, m: i32, n: i32) -> PopResult<usize> {
        check_mn(m, n)?;
        let n_u = to_usize(n);
        let m_abs = to_usize(m.abs());
        let j = match self {
            Self::Ansi => to_usize(n * (n + 2) + m) / 2,
            Self::Standard => to_usize(n * (n + 2) - m) / 2,
            Self::Fringe => {
                let a = (1 + (n_u + m_abs) / 2).pow(2);
                let b = 2 * m_abs;
                if m >= 0 {
                    a - b - 1
                } else {
                    a - b
                }
            }
            Self::Noll => {
                let parity = match (m.signum(), n_u % 4) {
                    (1, 0 | 1) | (-1, 2 | 3) => 0,
                    _ => 1,
                };
                n_u * (n_u + 1) / 2 + m_abs + parity - 1
            }
        };
        Ok(j)
    }
}
fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
fn to_usize(value: i32) -> usize {
    usize::try_from(value).unwrap_or_default()
}
fn check_mn(m: i32, n: i32) -> PopResult<()> {
    if n < 0 {
        return Err(PopError::InvalidRadialAzimuthal(format!(
            "radial number n={n} must not be negative"
        )));
    }
    if m.abs() > n {
        return Err(PopError::InvalidRadialAzimuthal(format!(
            "radial number n={n} must not be smaller than |m|={}",
            m.abs()
        )));
    }
    if (n - m) % 2 != 0 {
        return Err(PopError::InvalidRadialAzimuthal(format!(
            "n-m={} must be an even number",
            n - m
        )));
    }
    Ok(())
}
/// Convert the first `n_poly` indices into azimuthal (`m`) and radial (`n`) numbers.
///
/// Returns the tuple `(m, n)`.
#[must_use]
pub fn j2mn(n_poly: usize, ordering: ZernikeOrdering) -> (Vec<i32>, Vec<i32>) {
    (0..n_poly).map(|j| ordering.index_to_mn(j)).unzip()
}
/// Convert azimuthal (`m`) and radial (`n`) numbers into 0-based indices.
///
/// # Errors
///
/// This function will return an error if
///   - `m` and `n` have different lengths.
///   - any `(m, n)` pair is invalid.
pub fn mn2j(m: &[i32], n: &[i32], ordering: ZernikeOrdering) -> PopResult<Vec<usize>> {
    if m.len() != n.len() {
        return Err(PopError::InvalidParameter(
            "m and n must have the same length".into(),
        ));
    }
    m.iter()
        .zip(n)
        .map(|(m, n)| ordering.mn_to_index(*m, *n))
        .collect()
}
/// Jacobi polynomial `P_k^(alpha, beta)(x)` evaluated by the three-term recurrence.
fn jacobi(k: usize, alpha: f64, beta: f64, x: f64) -> f64 {
    let p1 = (alpha + 1.0) + (alpha + beta + 2.0) * (x - 1.0) / 2.0;
    if k == 0 {
        return 1.0;
    }
    let (mut p_prev, mut p) = (1.0, p1);
    for i in 2..=k {
        let n = usize_to_f64(i);
        let s = 2.0 * n + alpha + beta;
        let a = 2.0 * n * (n + alpha + beta) * (s - 2.0);
        let b = (s - 1.0) * (s * (s - 2.0) * x + alpha * alpha - beta * beta);
        let c = 2.0 * (n + alpha - 1.0) * (n + beta - 1.0) * s;
        let next = (b * p - c * p_prev) / a;
        p_prev = p;
        p = next;
    }
    p
}
/// Radial Zernike polynomial `R_n^m(rho)` (Jacobi form).
///
/// # Errors
///
/// This function will return an error if `(m, n)` is not a valid Zernike index pair.
pub fn radial_jacobi(m: i32, n: i32, rho: f64) -> PopResult<f64> {
    check_mn(m, n)?;
    let m_abs = m.unsigned_abs();
    let k = to_usize((n - m.abs()) / 2);
    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
    Ok(sign
        * rho.powi(m.abs())
        * jacobi(k, f64::from(m_abs), 0.0, 2.0f64.mul_add(-rho * rho, 1.0)))
}
fn factorial(n: usize) -> f64 {
    (1..=n).map(usize_to_f64).product()
}
/// Radial Zernike polynomial `R_n^m(rho)` as explicit factorial sum.
///
/// This form is numerically inferior for large `n` and serves as reference for [`radial_jacobi`].
///
/// # Errors
///
/// This function will return an error if `(m, n)` is not a valid Zernike index pair.
pub fn radial_factorial(m: i32, n: i32, rho: f64) -> PopResult<f64> {
    check_mn(m, n)?;
    let n = to_usize(n);
    let m = to_usize(m.abs());
    let value = (0..=(n - m) / 2)
        .map(|k| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * factorial(n - k)
                / (factorial(k) * factorial((n + m) / 2 - k) * factorial((n - m) / 2 - k))
                * rho.powi(to_i32(n - 2 * k))
        })
        .collect::<Vec<f64>>()
        .iter()
        .kahan_sum()
        .sum();
    Ok(value)
}
/// A set of Zernike polynomials sampled on given polar coordinates.
///
/// Sample points with `rho > 1` lie outside the unit pupil. They are masked and evaluate to zero for every
/// polynomial.
#[derive(Debug, Clone)]
pub struct Zernike {
    ordering: ZernikeOrdering,
    normalize: bool,
    m: Vec<i32>,
    n: Vec<i32>,
    mask: Vec<bool>,
    polynomials: Vec<Vec<f64>>,
}
impl Zernike {
    /// Generate the first `n_poly` polynomials of the given `ordering` on the polar coordinates `rho` (normalized
    /// radius) and `phi` (azimuth in radians).
    ///
    /// If `normalize` is true, the polynomials are orthonormal over the unit disk, otherwise orthogonal.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `n_poly` is zero.
    ///   - `rho` and `phi` have different lengths.
    pub fn new(
        n_poly: usize,
        rho: &[f64],
        phi: &[f64],
        ordering: ZernikeOrdering,
        normalize: bool,
    ) -> PopResult<Self> {
        if n_poly == 0 {
            return Err(PopError::InvalidParameter(
                "number of polynomials must be positive".into(),
            ));
        }
        if rho.len() != phi.len() {
            return Err(PopError::InvalidParameter(
                "rho and phi must have the same length".into(),
            ));
        }
        let (m, n) = j2mn(n_poly, ordering);
        let mask: Vec<bool> = rho.iter().map(|r| *r > 1.0).collect();
        let mut polynomials = Vec::with_capacity(n_poly);
        for (m, n) in m.iter().zip(&n) {
            let norm = if !normalize {
                1.0
            } else if *m == 0 {
                f64::from(n + 1).sqrt()
            } else {
                (2.0 * f64::from(n + 1)).sqrt()
            };
            let poly = rho
                .iter()
                .zip(phi)
                .zip(&mask)
                .map(|((r, p), masked)| {
                    if *masked {
                        return Ok(0.0);
                    }
                    let azimuthal = match m.signum() {
                        1 => (f64::from(*m) * p).cos(),
                        -1 => (f64::from(m.abs()) * p).sin(),
                        _ => 1.0,
                    };
                    Ok(norm * radial_jacobi(*m, *n, *r)? * azimuthal)
                })
                .collect::<PopResult<Vec<f64>>>()?;
            polynomials.push(poly);
        }
        Ok(Self {
            ordering,
            normalize,
            m,
            n,
            mask,
            polynomials,
        })
    }
    /// Returns the ordering of this basis.
    #[must_use]
    pub const fn ordering(&self) -> ZernikeOrdering {
        self.ordering
    }
    /// Returns true if the polynomials are orthonormal.
    #[must_use]
    pub const fn normalized(&self) -> bool {
        self.normalize
    }
    /// Azimuthal numbers of the polynomials.
    #[must_use]
    pub fn m(&self) -> &[i32] {
        &self.m
    }
    /// Radial numbers of the polynomials.
    #[must_use]
    pub fn n(&self) -> &[i32] {
        &self.n
    }
    /// Mask of the sample points. `true` marks points outside the unit pupil.
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }
    /// All polynomials.
    #[must_use]
    pub fn polynomials(&self) -> &[Vec<f64>] {
        &self.polynomials
    }
    /// The polynomial with index `j` (if present).
    #[must_use]
    pub fn polynomial(&self, j: usize) -> Option<&[f64]> {
        self.polynomials.get(j).map(Vec::as_slice)
    }
    /// Linear combination `sum(c_k * Z_k)` of the polynomials.
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of coefficients differs from the number of polynomials.
    pub fn combine(&self, coefficients: &[f64]) -> PopResult<Vec<f64>> {
        if coefficients.len() != self.polynomials.len() {
            return Err(PopError::InvalidParameter(format!(
                "expected {} coefficients, got {}",
                self.polynomials.len(),
                coefficients.len()
            )));
        }
        let mut sum = vec![0.0; self.mask.len()];
        for (c, poly) in coefficients.iter().zip(&self.polynomials) {
            for (s, z) in sum.iter_mut().zip(poly) {
                *s = c.mul_add(*z, *s);
            }
        }
        Ok(sum)
    }
    /// Covariance matrix `M[i,j] = mean(Z_i * Z_j)` over the unmasked sample points.
    ///
    /// For a pupil `W = sum(c_k * Z_k)` the rms wavefront error is `sqrt(c^T M c)`. Entries smaller than `1e-10` in
    /// magnitude are set to zero.
    #[must_use]
    pub fn cov(&self) -> DMatrix<f64> {
        let n_poly = self.polynomials.len();
        let unmasked = self.mask.iter().filter(|m| !**m).count();
        let mut cov = DMatrix::zeros(n_poly, n_poly);
        if unmasked == 0 {
            return cov;
        }
        for (i, j) in (0..n_poly).tuple_combinations::<(usize, usize)>().chain((0..n_poly).map(|i| (i, i))) {
            let products: Vec<f64> = self.polynomials[i]
                .iter()
                .zip(&self.polynomials[j])
                .zip(&self.mask)
                .filter(|(_, masked)| !**masked)
                .map(|((a, b), _)| a * b)
                .collect();
            let mean: f64 = KahanSummator::<f64>::kahan_sum(products.iter()).sum() / usize_to_f64(unmasked);
            let mean = if mean.abs() < 1e-10 { 0.0 } else { mean };
            cov[(i, j)] = mean;
            cov[(j, i)] = mean;
        }
        cov
    }
}
