#![warn(missing_docs)]
//! Module for handling optical (2D) apertures
//!
//! An [`Aperture`] describes an elliptical, circular or rectangular region of the transverse plane. It acts either
//! as a transparent opening ([`ApertureKind::Aperture`]) or as an opaque obscuration ([`ApertureKind::Obscuration`]).
//! ```rust
//! use poptics::aperture::{Aperture, ApertureKind};
//!
//! let ap = Aperture::circular(1.0, 1.0, 1.0).unwrap();
//! assert_eq!(ap.apodize(1.0, 1.0), 1.0);
//! assert_eq!(ap.apodize(0.0, 0.0), 0.0);
//! let obscuration = ap.with_kind(ApertureKind::Obscuration);
//! assert_eq!(obscuration.apodize(1.0, 1.0), 0.0);
//! ```
//! On a sampled grid, [`transmission_map`](Aperture::transmission_map()) computes the area fraction of every pixel
//! covered by the aperture. Pixels crossed by the aperture boundary are supersampled.
use itertools::iproduct;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    error::{PopError, PopResult},
    utils::usize_to_f64,
};

/// Number of sub-samples per pixel and axis for pixels on the aperture boundary.
const SUBPIXELS: usize = 32;
/// Margin (in units of the pixel pitch) around the boundary inside which pixels are supersampled.
const BOUNDARY_MARGIN: f64 = 0.75;

/// The transmission type of an [`Aperture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApertureKind {
    /// the inner part of the shape is transparent
    #[default]
    Aperture,
    /// the inner part of the shape is opaque
    Obscuration,
}
/// Geometric shape of an [`Aperture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApertureShape {
    /// ellipse given by its two semi-axes
    #[default]
    Elliptical,
    /// circle given by its radius
    Circular,
    /// rectangle given by its full width and height
    Rectangular,
}
impl ApertureShape {
    /// Parse a shape name (case insensitive).
    ///
    /// # Errors
    ///
    /// This function will return an error if the name does not denote a known shape.
    pub fn from_name(name: &str) -> PopResult<Self> {
        name.parse::<Self>()
            .map_err(|_| PopError::UnsupportedShape(format!("aperture shape '{name}' not defined")))
    }
}
/// An elliptical, circular or rectangular aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aperture {
    shape: ApertureShape,
    kind: ApertureKind,
    hx: f64,
    hy: f64,
    xc: f64,
    yc: f64,
    tilt: f64,
}
fn check_dimension(value: f64, name: &str) -> PopResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PopError::InvalidParameter(format!(
            "{name} must be positive and finite"
        )))
    }
}
impl Aperture {
    /// Create an elliptical aperture with semi-axes `hx` and `hy` centered at `(xc, yc)` and rotated by `tilt` degrees.
    ///
    /// # Errors
    ///
    /// This function will return an error if a semi-axis is not positive and finite.
    pub fn elliptical(hx: f64, hy: f64, xc: f64, yc: f64, tilt: f64) -> PopResult<Self> {
        Ok(Self {
            shape: ApertureShape::Elliptical,
            kind: ApertureKind::default(),
            hx: check_dimension(hx, "semi-axis")?,
            hy: check_dimension(hy, "semi-axis")?,
            xc,
            yc,
            tilt,
        })
    }
    /// Create a circular aperture with radius `r` centered at `(xc, yc)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the radius is not positive and finite.
    pub fn circular(r: f64, xc: f64, yc: f64) -> PopResult<Self> {
        let r = check_dimension(r, "radius")?;
        Ok(Self {
            shape: ApertureShape::Circular,
            kind: ApertureKind::default(),
            hx: r,
            hy: r,
            xc,
            yc,
            tilt: 0.0,
        })
    }
    /// Create a rectangular aperture with full `width` and `height` centered at `(xc, yc)` and rotated by `tilt`
    /// degrees.
    ///
    /// # Errors
    ///
    /// This function will return an error if width or height is not positive and finite.
    pub fn rectangular(width: f64, height: f64, xc: f64, yc: f64, tilt: f64) -> PopResult<Self> {
        Ok(Self {
            shape: ApertureShape::Rectangular,
            kind: ApertureKind::default(),
            hx: check_dimension(width, "width")?,
            hy: check_dimension(height, "height")?,
            xc,
            yc,
            tilt,
        })
    }
    /// Create an aperture from a shape name and optional dimensions.
    ///
    /// `hx` and `hy` are the semi-axes of an elliptical aperture or the full width and height of a rectangular one.
    /// A circular aperture takes its radius from `r`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the shape name is unknown.
    ///   - a dimension required by the shape is missing.
    ///   - a dimension is not positive and finite.
    #[allow(clippy::too_many_arguments)]
    pub fn from_shape_name(
        shape: &str,
        hx: Option<f64>,
        hy: Option<f64>,
        r: Option<f64>,
        xc: f64,
        yc: f64,
        tilt: Option<f64>,
        kind: ApertureKind,
    ) -> PopResult<Self> {
        let tilt = tilt.unwrap_or(0.0);
        let aperture = match ApertureShape::from_name(shape)? {
            ApertureShape::Elliptical => {
                let (Some(hx), Some(hy)) = (hx, hy) else {
                    return Err(PopError::MissingDimension(
                        "semi major/minor axes not defined".into(),
                    ));
                };
                Self::elliptical(hx, hy, xc, yc, tilt)?
            }
            ApertureShape::Circular => {
                let Some(r) = r else {
                    return Err(PopError::MissingDimension("radius not defined".into()));
                };
                Self::circular(r, xc, yc)?
            }
            ApertureShape::Rectangular => {
                let (Some(hx), Some(hy)) = (hx, hy) else {
                    return Err(PopError::MissingDimension(
                        "width/height not defined".into(),
                    ));
                };
                Self::rectangular(hx, hy, xc, yc, tilt)?
            }
        };
        Ok(aperture.with_kind(kind))
    }
    /// Return a copy of this aperture with the given [`ApertureKind`].
    #[must_use]
    pub const fn with_kind(mut self, kind: ApertureKind) -> Self {
        self.kind = kind;
        self
    }
    /// Returns the shape of this [`Aperture`].
    #[must_use]
    pub const fn shape(&self) -> ApertureShape {
        self.shape
    }
    /// Returns the kind of this [`Aperture`].
    #[must_use]
    pub const fn kind(&self) -> ApertureKind {
        self.kind
    }
    /// Returns the center `(xc, yc)` of this [`Aperture`].
    #[must_use]
    pub const fn center(&self) -> (f64, f64) {
        (self.xc, self.yc)
    }
    /// Returns the dimensions `(hx, hy)`: semi-axes for ellipses and circles, full width and height for rectangles.
    #[must_use]
    pub const fn dimensions(&self) -> (f64, f64) {
        (self.hx, self.hy)
    }
    /// Returns the tilt angle in degrees.
    #[must_use]
    pub const fn tilt(&self) -> f64 {
        self.tilt
    }
    /// Transform `(x, y)` into the coordinate frame of the aperture (centered and rotated).
    fn local(&self, x: f64, y: f64) -> (f64, f64) {
        let (sin, cos) = self.tilt.to_radians().sin_cos();
        let (dx, dy) = (x - self.xc, y - self.yc);
        (cos.mul_add(dx, sin * dy), cos.mul_add(dy, -sin * dx))
    }
    fn contains_local(&self, u: f64, v: f64) -> bool {
        match self.shape {
            ApertureShape::Elliptical | ApertureShape::Circular => {
                (u / self.hx).powi(2) + (v / self.hy).powi(2) <= 1.0
            }
            ApertureShape::Rectangular => u.abs() <= self.hx / 2.0 && v.abs() <= self.hy / 2.0,
        }
    }
    /// Returns true if the point `(x, y)` lies inside the shape (regardless of its kind).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (u, v) = self.local(x, y);
        self.contains_local(u, v)
    }
    /// Binary transmission (`0.0` or `1.0`) at the point `(x, y)`, taking the [`ApertureKind`] into account.
    #[must_use]
    pub fn apodize(&self, x: f64, y: f64) -> f64 {
        let inside = self.contains(x, y);
        match (self.kind, inside) {
            (ApertureKind::Aperture, true) | (ApertureKind::Obscuration, false) => 1.0,
            _ => 0.0,
        }
    }
    /// Classify a pixel centered at local `(u, v)` whose half diagonal is bounded by `margin`.
    ///
    /// Returns `Some(1.0)` or `Some(0.0)` if the pixel is completely inside or outside, `None` otherwise.
    fn classify(&self, u: f64, v: f64, margin: f64) -> Option<f64> {
        match self.shape {
            ApertureShape::Elliptical | ApertureShape::Circular => {
                let q = (u / self.hx).hypot(v / self.hy);
                let band = margin / self.hx.min(self.hy);
                if q < 1.0 - band {
                    Some(1.0)
                } else if q > 1.0 + band {
                    Some(0.0)
                } else {
                    None
                }
            }
            ApertureShape::Rectangular => {
                let (half_w, half_h) = (self.hx / 2.0, self.hy / 2.0);
                if u.abs() <= half_w - margin && v.abs() <= half_h - margin {
                    Some(1.0)
                } else if u.abs() > half_w + margin || v.abs() > half_h + margin {
                    Some(0.0)
                } else {
                    None
                }
            }
        }
    }
    /// Fraction of the pixel centered at `(x, y)` with pitch `(dx, dy)` covered by the shape.
    #[must_use]
    pub fn coverage(&self, x: f64, y: f64, dx: f64, dy: f64) -> f64 {
        let (u, v) = self.local(x, y);
        let margin = BOUNDARY_MARGIN * dx.abs().max(dy.abs());
        if let Some(value) = self.classify(u, v, margin) {
            return value;
        }
        let sub = usize_to_f64(SUBPIXELS);
        let inside = iproduct!(0..SUBPIXELS, 0..SUBPIXELS)
            .filter(|(iy, ix)| {
                let sx = x + dx * ((usize_to_f64(*ix) + 0.5) / sub - 0.5);
                let sy = y + dy * ((usize_to_f64(*iy) + 0.5) / sub - 0.5);
                self.contains(sx, sy)
            })
            .count();
        usize_to_f64(inside) / (sub * sub)
    }
    /// Compute the transmission of every pixel of a grid with the given pixel center coordinates `x` (columns) and
    /// `y` (rows) and pitch `(dx, dy)`.
    ///
    /// The result is the covered area fraction for an [`ApertureKind::Aperture`] and its complement for an
    /// [`ApertureKind::Obscuration`].
    #[must_use]
    pub fn transmission_map(&self, x: &[f64], y: &[f64], dx: f64, dy: f64) -> DMatrix<f64> {
        DMatrix::from_fn(y.len(), x.len(), |row, col| {
            let covered = self.coverage(x[col], y[row], dx, dy);
            match self.kind {
                ApertureKind::Aperture => covered,
                ApertureKind::Obscuration => 1.0 - covered,
            }
        })
    }
}
