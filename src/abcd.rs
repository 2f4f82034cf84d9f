#![warn(missing_docs)]
//! Paraxial ray transfer matrices
//!
//! An [`AbcdMatrix`] describes the paraxial transfer of a ray `(y, u)` (height and slope) across a single optical
//! surface followed by a thickness. The matrix is built from three primitive factors which are always multiplied in
//! the same order: translation × refraction (or reflection) × magnification.
//! ```rust
//! use poptics::abcd::AbcdMatrix;
//!
//! // a thin lens with 100 mm focal length followed by a 50 mm gap
//! let abcd = AbcdMatrix::new(0.05, 1.0 / 0.1, 1.0, 1.0, 1.0).unwrap();
//! assert!((abcd.thickness() - 0.05).abs() < 1e-15);
//! assert!((abcd.f_eff() - 0.1).abs() < 1e-15);
//! ```
//! All scalar properties ([`thickness`](AbcdMatrix::thickness()), [`magnification`](AbcdMatrix::magnification()),
//! [`power`](AbcdMatrix::power()), ...) are derived from the matrix entries. There is no separately stored copy which
//! could diverge from the matrix.
use std::ops::Mul;

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{PopError, PopResult};

/// A 2x2 paraxial ray transfer matrix together with the propagation direction on entry and exit.
///
/// The direction flags `cin` and `cout` are `+1` for light travelling left-to-right (+z) and `-1` for light
/// travelling right-to-left (-z), e.g. after a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbcdMatrix {
    abcd: Matrix2<f64>,
    cin: i32,
    cout: i32,
}
impl Default for AbcdMatrix {
    /// The identity transfer (no thickness, no power, unit magnification).
    fn default() -> Self {
        Self {
            abcd: Matrix2::identity(),
            cin: 1,
            cout: 1,
        }
    }
}
impl AbcdMatrix {
    /// Create a new [`AbcdMatrix`] for a surface with given `curvature` separating two media with refractive indices
    /// `n1` and `n2` followed by a `thickness`.
    ///
    /// If `n1 == n2` the surface is treated as a thin lens with a focal length of `1/curvature`. Otherwise the surface
    /// is a dioptre (or a mirror if the sign of the refractive index flips). Refractive indices are negative for light
    /// travelling in -z direction.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n1`, `n2` or `magnification` is zero.
    pub fn new(
        thickness: f64,
        curvature: f64,
        n1: f64,
        n2: f64,
        magnification: f64,
    ) -> PopResult<Self> {
        if n1 == 0.0 || n2 == 0.0 || magnification == 0.0 {
            return Err(PopError::InvalidParameter(
                "refractive index and magnification shall not be zero".into(),
            ));
        }
        let translation = Matrix2::new(1.0, thickness, 0.0, 1.0);
        let refraction = if n1 == n2 {
            Matrix2::new(1.0, 0.0, -curvature, 1.0)
        } else {
            Matrix2::new(1.0, 0.0, -(1.0 - n1 / n2) * curvature, n1 / n2)
        };
        let magnify = Matrix2::new(magnification, 0.0, 0.0, 1.0 / magnification);
        Ok(Self {
            abcd: translation * refraction * magnify,
            cin: sign(n1),
            cout: sign(n2),
        })
    }
    /// Create a pure translation over the given `thickness` in a medium of unit index.
    #[must_use]
    pub fn translation(thickness: f64) -> Self {
        Self {
            abcd: Matrix2::new(1.0, thickness, 0.0, 1.0),
            ..Self::default()
        }
    }
    /// Create an [`AbcdMatrix`] directly from a given 2x2 matrix. Both direction flags are set to `+1`.
    #[must_use]
    pub const fn from_matrix(abcd: Matrix2<f64>) -> Self {
        Self {
            abcd,
            cin: 1,
            cout: 1,
        }
    }
    /// Return a copy of this matrix with the given direction flags.
    #[must_use]
    pub const fn with_direction(mut self, cin: i32, cout: i32) -> Self {
        self.cin = cin;
        self.cout = cout;
        self
    }
    /// Returns the raw 2x2 matrix.
    #[must_use]
    pub const fn matrix(&self) -> Matrix2<f64> {
        self.abcd
    }
    /// Direction flag on entry.
    #[must_use]
    pub const fn cin(&self) -> i32 {
        self.cin
    }
    /// Direction flag on exit.
    #[must_use]
    pub const fn cout(&self) -> i32 {
        self.cout
    }
    /// Thickness `B/D`.
    #[must_use]
    pub fn thickness(&self) -> f64 {
        self.abcd[(0, 1)] / self.abcd[(1, 1)]
    }
    /// Optical magnification `(AD-BC)/D`.
    #[must_use]
    pub fn magnification(&self) -> f64 {
        self.abcd.determinant() / self.abcd[(1, 1)]
    }
    /// Ratio of the refractive indices `n1/n2`.
    #[must_use]
    pub fn n1n2(&self) -> f64 {
        self.abcd[(1, 1)] * self.magnification()
    }
    /// Optical power `-C/M`.
    #[must_use]
    pub fn power(&self) -> f64 {
        -self.abcd[(1, 0)] / self.magnification()
    }
    /// Effective focal length `1/(power * M)`.
    ///
    /// This value is infinite if the power is zero. Callers treat an infinite focal length as "no lens".
    #[must_use]
    pub fn f_eff(&self) -> f64 {
        1.0 / (self.power() * self.magnification())
    }
    /// Transfer a ray `(y, u)` through this matrix.
    #[must_use]
    pub fn apply(&self, ray: &Vector2<f64>) -> Vector2<f64> {
        self.abcd * ray
    }
}
impl Mul for AbcdMatrix {
    type Output = Self;
    /// Matrix product `self * rhs`. The direction flags are taken from `rhs`.
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            abcd: self.abcd * rhs.abcd,
            cin: rhs.cin,
            cout: rhs.cout,
        }
    }
}
impl Mul for &AbcdMatrix {
    type Output = AbcdMatrix;
    fn mul(self, rhs: Self) -> Self::Output {
        *self * *rhs
    }
}
fn sign(value: f64) -> i32 {
    if value.is_sign_negative() {
        -1
    } else {
        1
    }
}
#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    fn sample() -> AbcdMatrix {
        AbcdMatrix::from_matrix(Matrix2::new(1.0, 2.0, 3.0, 4.0))
    }
    #[test]
    fn default() {
        let abcd = AbcdMatrix::default();
        assert_eq!(abcd.matrix(), Matrix2::identity());
        assert_eq!(abcd.cin(), 1);
        assert_eq!(abcd.cout(), 1);
        assert_eq!(abcd.thickness(), 0.0);
        assert_eq!(abcd.magnification(), 1.0);
        assert!(abcd.f_eff().is_infinite());
    }
    #[test]
    fn new_wrong_params() {
        assert!(AbcdMatrix::new(1.0, 0.0, 0.0, 1.0, 1.0).is_err());
        assert!(AbcdMatrix::new(1.0, 0.0, 1.0, 0.0, 1.0).is_err());
        assert_eq!(
            AbcdMatrix::new(1.0, 0.0, 1.0, 1.0, 0.0).unwrap_err(),
            PopError::InvalidParameter("refractive index and magnification shall not be zero".into())
        );
    }
    #[test]
    fn translation() {
        let abcd = AbcdMatrix::new(2.5, 0.0, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(abcd.matrix(), Matrix2::new(1.0, 2.5, 0.0, 1.0));
        assert_eq!(abcd.thickness(), 2.5);
        assert_eq!(abcd, AbcdMatrix::translation(2.5));
    }
    #[test]
    fn thin_lens() {
        let abcd = AbcdMatrix::new(0.0, 0.5, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(abcd.matrix(), Matrix2::new(1.0, 0.0, -0.5, 1.0));
        assert_eq!(abcd.power(), 0.5);
        assert_eq!(abcd.f_eff(), 2.0);
        assert_eq!(abcd.n1n2(), 1.0);
    }
    #[test]
    fn dioptre() {
        let abcd = AbcdMatrix::new(2.695, 1.0 / 31.85, 1.0, 1.5, 1.0).unwrap();
        assert_relative_eq!(abcd.thickness(), 2.695, epsilon = 1e-12);
        assert_relative_eq!(abcd.magnification(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(abcd.n1n2(), 1.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(abcd.power(), (1.0 - 1.0 / 1.5) / 31.85, epsilon = 1e-12);
        assert_eq!(abcd.cin(), 1);
        assert_eq!(abcd.cout(), 1);
    }
    #[test]
    fn mirror() {
        let abcd = AbcdMatrix::new(-1.0, 0.5, 1.0, -1.0, 1.0).unwrap();
        assert_eq!(abcd.cin(), 1);
        assert_eq!(abcd.cout(), -1);
        assert_relative_eq!(abcd.n1n2(), -1.0);
        assert_relative_eq!(abcd.power(), 1.0);
        // a concave mirror of radius 2 focusses at 1 in -z direction
        assert_relative_eq!(f64::from(abcd.cout()) / abcd.power(), -1.0);
        assert_relative_eq!(f64::from(abcd.cout()) * abcd.thickness(), 1.0);
    }
    #[test]
    fn magnification() {
        let abcd = AbcdMatrix::new(0.0, 0.0, 1.0, 1.0, 2.0).unwrap();
        assert_eq!(abcd.matrix(), Matrix2::new(2.0, 0.0, 0.0, 0.5));
        assert_eq!(abcd.magnification(), 2.0);
        assert_eq!(abcd.n1n2(), 1.0);
    }
    #[test]
    fn derived_properties() {
        let abcd = sample();
        assert_eq!(abcd.thickness(), 2.0 / 4.0);
        assert_eq!(abcd.magnification(), (1.0 * 4.0 - 2.0 * 3.0) / 4.0);
        assert_eq!(abcd.n1n2(), 4.0 * abcd.magnification());
        assert_eq!(abcd.power(), -3.0 / abcd.magnification());
        assert_eq!(
            abcd.f_eff(),
            1.0 / (abcd.power() * abcd.magnification())
        );
    }
    #[test]
    fn with_direction() {
        let abcd = sample().with_direction(-1, 1);
        assert_eq!(abcd.cin(), -1);
        assert_eq!(abcd.cout(), 1);
    }
    #[test]
    fn mul() {
        let a = sample().with_direction(1, -1);
        let b = AbcdMatrix::from_matrix(Matrix2::new(5.0, 6.0, 7.0, 8.0)).with_direction(-1, -1);
        let c = a * b;
        assert_eq!(c.matrix(), Matrix2::new(19.0, 22.0, 43.0, 50.0));
        assert_eq!(c.cin(), -1);
        assert_eq!(c.cout(), -1);
        assert_eq!(&a * &b, c);
    }
    #[test]
    fn mul_associative() {
        let a = AbcdMatrix::new(0.3, 1.2, 1.0, 1.5, 1.0).unwrap();
        let b = AbcdMatrix::new(-0.7, 0.4, 1.5, -1.5, 2.0).unwrap();
        let c = AbcdMatrix::new(1.1, -2.0, -1.5, -1.0, 0.5).unwrap();
        let left = (a * b) * c;
        let right = a * (b * c);
        assert_relative_eq!(left.matrix(), right.matrix(), epsilon = 1e-12);
        assert_eq!(left.cin(), right.cin());
        assert_eq!(left.cout(), right.cout());
    }
    #[test]
    fn apply() {
        let abcd = AbcdMatrix::new(1.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        let ray = abcd.apply(&Vector2::new(1.0, 0.0));
        // parallel ray through a f=1 lens crosses the axis after one focal length
        assert_relative_eq!(ray, Vector2::new(0.0, -1.0));
    }
}
