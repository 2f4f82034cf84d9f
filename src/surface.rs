#![warn(missing_docs)]
//! Optical surfaces and the prescription builder
//!
//! A prescription is given as an ordered list of [`SurfaceEntry`]s. The [`ChainBuilder`] resolves these entries into
//! [`SurfaceDescriptor`]s by tracking the refractive index between consecutive surfaces. Each descriptor carries the
//! sagittal and tangential [`AbcdMatrix`] of its surface together with all data needed by the
//! [executor](crate::run::run).
//! ```rust
//! use poptics::surface::{ChainBuilder, SurfaceEntry, SurfaceType};
//!
//! let mut builder = ChainBuilder::default();
//! builder
//!     .push(&SurfaceEntry::new("lens", SurfaceType::paraxial_lens(1.0, 1.0)))
//!     .unwrap();
//! let chain = builder.build();
//! assert_eq!(chain[&1].abcd_t.f_eff(), 1.0);
//! ```
use std::collections::BTreeMap;

use log::debug;
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::{
    abcd::AbcdMatrix,
    aperture::ApertureKind,
    coordinate_break::CoordinateBreak,
    error::{PopError, PopResult},
    wavefront::AngleOrigin,
    zernike::ZernikeOrdering,
};

const fn unity() -> f64 {
    1.0
}
const fn infinity() -> f64 {
    f64::INFINITY
}
const fn not_a_number() -> f64 {
    f64::NAN
}
fn default_ordering() -> String {
    "ansi".into()
}
fn default_origin() -> String {
    "x".into()
}
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
/// Curvature of a surface with the given radius. Non-finite or zero radii denote a flat surface.
fn curvature(radius: f64) -> f64 {
    if radius.is_finite() && radius != 0.0 {
        1.0 / radius
    } else {
        0.0
    }
}
/// Aperture data of a surface.
///
/// `xrad` and `yrad` are the semi-axes of an elliptical aperture, the full width and height of a rectangular one or
/// (`xrad` only) the radius of a circular one. A non-finite center places the aperture on the chief ray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureSpec {
    /// shape name (`elliptical`, `circular`, `rectangular`)
    pub shape: String,
    /// aperture or obscuration
    #[serde(default)]
    pub kind: ApertureKind,
    /// x semi-axis, width or radius
    pub xrad: f64,
    /// y semi-axis or height
    #[serde(default = "not_a_number")]
    pub yrad: f64,
    /// x center
    #[serde(default = "not_a_number")]
    pub xc: f64,
    /// y center
    #[serde(default = "not_a_number")]
    pub yc: f64,
}
impl ApertureSpec {
    /// Create a new [`ApertureSpec`] centered on the chief ray.
    #[must_use]
    pub fn new(shape: &str, kind: ApertureKind, xrad: f64, yrad: f64) -> Self {
        Self {
            shape: shape.into(),
            kind,
            xrad,
            yrad,
            xc: f64::NAN,
            yc: f64::NAN,
        }
    }
    /// Return a copy with the given center.
    #[must_use]
    pub fn with_center(mut self, xc: f64, yc: f64) -> Self {
        self.xc = xc;
        self.yc = yc;
        self
    }
}
/// Resolved Zernike wavefront error of a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZernikeSpec {
    /// contiguous polynomial indices starting at zero
    pub index: Vec<usize>,
    /// coefficients in meters
    pub coefficients: Vec<f64>,
    /// index ordering
    pub ordering: ZernikeOrdering,
    /// orthonormal (true) or orthogonal (false) polynomials
    pub normalize: bool,
    /// pupil radius. If not finite, the current beam radius is used.
    pub radius: f64,
    /// azimuthal offset in degrees
    pub offset: f64,
    /// reference axis of the azimuth
    pub origin: AngleOrigin,
}
/// The type specific part of a [`SurfaceEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceType {
    /// decenter and tilt of the coordinate system
    CoordinateBreak {
        /// thickness after the surface
        #[serde(default)]
        thickness: f64,
        /// decenter along x
        #[serde(default)]
        xdec: f64,
        /// decenter along y
        #[serde(default)]
        ydec: f64,
        /// tilt around x in degrees
        #[serde(default)]
        xrot: f64,
        /// tilt around y in degrees
        #[serde(default)]
        yrot: f64,
    },
    /// refracting or reflecting spherical surface
    Standard {
        /// thickness after the surface
        #[serde(default)]
        thickness: f64,
        /// radius of curvature (infinite for flat surfaces)
        #[serde(default = "infinity")]
        radius: f64,
        /// refractive index after the surface. If absent, the surface is followed by vacuum.
        #[serde(default)]
        index: Option<f64>,
        /// the surface is a mirror
        #[serde(default)]
        mirror: bool,
    },
    /// ideal thin lens
    ParaxialLens {
        /// focal length
        focal_length: f64,
        /// thickness after the lens
        #[serde(default)]
        thickness: f64,
    },
    /// wavefront error given as Zernike expansion
    Zernike {
        /// reference wavelength of the coefficients in meters
        wavelength: f64,
        /// coefficients in units of the reference wavelength
        coefficients: Vec<f64>,
        /// polynomial indices. Defaults to `0..coefficients.len()`.
        #[serde(default)]
        index: Option<Vec<usize>>,
        /// index ordering (`ansi`, `noll`, `fringe`, `standard`)
        #[serde(default = "default_ordering")]
        ordering: String,
        /// orthonormal polynomials
        #[serde(default)]
        normalize: bool,
        /// pupil radius. Defaults to the current beam radius.
        #[serde(default)]
        radius: Option<f64>,
        /// azimuthal offset in degrees
        #[serde(default)]
        offset: f64,
        /// reference axis of the azimuth (`x` or `y`)
        #[serde(default = "default_origin")]
        origin: String,
    },
    /// user defined ray transfer matrices following a thickness
    Abcd {
        /// thickness after the surface
        #[serde(default)]
        thickness: f64,
        /// sagittal matrix `[A, B, C, D]`
        sagittal: [f64; 4],
        /// tangential matrix `[A, B, C, D]`
        tangential: [f64; 4],
    },
    /// a [`SurfaceType::Standard`] surface with a rectangular aperture
    Slit {
        /// thickness after the surface
        #[serde(default)]
        thickness: f64,
        /// radius of curvature
        #[serde(default = "infinity")]
        radius: f64,
        /// refractive index after the surface
        #[serde(default)]
        index: Option<f64>,
        /// the surface is a mirror
        #[serde(default)]
        mirror: bool,
    },
    /// a [`SurfaceType::Standard`] surface with an opaque obscuration
    Obscuration {
        /// thickness after the surface
        #[serde(default)]
        thickness: f64,
        /// radius of curvature
        #[serde(default = "infinity")]
        radius: f64,
        /// refractive index after the surface
        #[serde(default)]
        index: Option<f64>,
        /// the surface is a mirror
        #[serde(default)]
        mirror: bool,
    },
}
impl SurfaceType {
    /// A flat, transparent [`SurfaceType::Standard`] surface followed by `thickness`.
    #[must_use]
    pub const fn gap(thickness: f64) -> Self {
        Self::Standard {
            thickness,
            radius: f64::INFINITY,
            index: None,
            mirror: false,
        }
    }
    /// A [`SurfaceType::ParaxialLens`] followed by `thickness`.
    #[must_use]
    pub const fn paraxial_lens(focal_length: f64, thickness: f64) -> Self {
        Self::ParaxialLens {
            focal_length,
            thickness,
        }
    }
    /// A spherical mirror with the given `radius` followed by `thickness`.
    #[must_use]
    pub const fn mirror(radius: f64, thickness: f64) -> Self {
        Self::Standard {
            thickness,
            radius,
            index: None,
            mirror: true,
        }
    }
}
/// One entry of an optical prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEntry {
    /// descriptive name
    #[serde(default)]
    pub name: String,
    /// type specific data
    #[serde(flatten)]
    pub surface: SurfaceType,
    /// optional aperture
    #[serde(default)]
    pub aperture: Option<ApertureSpec>,
    /// normalize the field to unit energy at this surface
    #[serde(default)]
    pub stop: bool,
    /// store the field at this surface in the results
    #[serde(default)]
    pub save: bool,
    /// skip this surface
    #[serde(default)]
    pub ignore: bool,
    /// optical magnification in the sagittal plane
    #[serde(default = "unity")]
    pub mx: f64,
    /// optical magnification in the tangential plane
    #[serde(default = "unity")]
    pub my: f64,
}
impl SurfaceEntry {
    /// Create a new [`SurfaceEntry`] without aperture and flags.
    #[must_use]
    pub fn new(name: &str, surface: SurfaceType) -> Self {
        Self {
            name: name.into(),
            surface,
            aperture: None,
            stop: false,
            save: false,
            ignore: false,
            mx: 1.0,
            my: 1.0,
        }
    }
    /// Add an aperture.
    #[must_use]
    pub fn with_aperture(mut self, aperture: ApertureSpec) -> Self {
        self.aperture = Some(aperture);
        self
    }
    /// Mark this surface as stop.
    #[must_use]
    pub const fn as_stop(mut self) -> Self {
        self.stop = true;
        self
    }
    /// Save the field at this surface.
    #[must_use]
    pub const fn saved(mut self) -> Self {
        self.save = true;
        self
    }
    /// Mark this surface as ignored.
    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }
    /// Set the optical magnification of both planes.
    #[must_use]
    pub const fn with_magnification(mut self, mx: f64, my: f64) -> Self {
        self.mx = mx;
        self.my = my;
        self
    }
}
/// Resolved kind of a [`SurfaceDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// coordinate break
    CoordinateBreak(CoordinateBreak),
    /// spherical surface
    Standard,
    /// thin lens with the given focal length
    ParaxialLens(f64),
    /// Zernike wavefront error
    Zernike(ZernikeSpec),
    /// user defined matrices
    Abcd,
    /// surface with rectangular aperture
    Slit,
    /// surface with obscuration
    Obscuration,
}
/// A fully resolved surface of an optical chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDescriptor {
    /// surface number (1-based position in the prescription)
    pub number: usize,
    /// descriptive name
    pub name: String,
    /// type specific data
    pub kind: SurfaceKind,
    /// sagittal ray transfer matrix
    pub abcd_s: AbcdMatrix,
    /// tangential ray transfer matrix
    pub abcd_t: AbcdMatrix,
    /// optional aperture
    pub aperture: Option<ApertureSpec>,
    /// normalize the field at this surface
    pub is_stop: bool,
    /// store the field at this surface
    pub save: bool,
    /// skip this surface
    pub ignore: bool,
}
/// Focal length `cout/power` of a matrix, infinite for zero power.
fn focal_length(abcd: &AbcdMatrix) -> f64 {
    let power = abcd.power();
    if power == 0.0 {
        f64::INFINITY
    } else {
        f64::from(abcd.cout()) / power
    }
}
impl SurfaceDescriptor {
    /// Signed focal lengths `(sagittal, tangential)` of this surface. Infinite if the surface has no power.
    #[must_use]
    pub fn focal_lengths(&self) -> (f64, f64) {
        (focal_length(&self.abcd_s), focal_length(&self.abcd_t))
    }
    /// Signed propagation distances `(sagittal, tangential)` after this surface.
    #[must_use]
    pub fn thicknesses(&self) -> (f64, f64) {
        (
            f64::from(self.abcd_s.cout()) * self.abcd_s.thickness(),
            f64::from(self.abcd_t.cout()) * self.abcd_t.thickness(),
        )
    }
    /// Returns true if the descriptor is a coordinate break.
    #[must_use]
    pub const fn is_coordinate_break(&self) -> bool {
        matches!(self.kind, SurfaceKind::CoordinateBreak(_))
    }
}
/// Builder resolving [`SurfaceEntry`]s into an optical chain.
///
/// The builder keeps track of the refractive index `n1` in front of the next surface. Light travelling in -z
/// direction (after an odd number of mirrors) is described by negative refractive indices.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    n1: f64,
    next_number: usize,
    chain: BTreeMap<usize, SurfaceDescriptor>,
}
impl Default for ChainBuilder {
    fn default() -> Self {
        Self {
            n1: 1.0,
            next_number: 1,
            chain: BTreeMap::new(),
        }
    }
}
impl ChainBuilder {
    /// Resolve a complete prescription.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the entries is invalid.
    pub fn from_entries(entries: &[SurfaceEntry]) -> PopResult<BTreeMap<usize, SurfaceDescriptor>> {
        let mut builder = Self::default();
        for entry in entries {
            builder.push(entry)?;
        }
        Ok(builder.build())
    }
    /// Refractive index in front of the next surface.
    #[must_use]
    pub const fn refractive_index(&self) -> f64 {
        self.n1
    }
    /// Resolve the given entry and append it to the chain. Returns the surface number.
    ///
    /// Ignored entries are numbered and stored but do not change the refractive index.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the Zernike ordering or origin is unknown.
    ///   - a slit or obscuration has no aperture.
    ///   - a refractive index or magnification is zero.
    pub fn push(&mut self, entry: &SurfaceEntry) -> PopResult<usize> {
        let number = self.next_number;
        self.next_number += 1;
        let n1 = self.n1;
        let mut aperture = entry.aperture.clone();
        let (kind, abcd_s, abcd_t, n2) = match &entry.surface {
            SurfaceType::CoordinateBreak {
                thickness,
                xdec,
                ydec,
                xrot,
                yrot,
            } => {
                let thickness = finite_or_zero(*thickness);
                let cb = CoordinateBreak {
                    xdec: *xdec,
                    ydec: *ydec,
                    xrot: *xrot,
                    yrot: *yrot,
                    zrot: 0.0,
                    order: 0,
                };
                (
                    SurfaceKind::CoordinateBreak(cb),
                    AbcdMatrix::new(thickness, 0.0, n1, n1, entry.mx)?,
                    AbcdMatrix::new(thickness, 0.0, n1, n1, entry.my)?,
                    n1,
                )
            }
            SurfaceType::Standard {
                thickness,
                radius,
                index,
                mirror,
            }
            | SurfaceType::Slit {
                thickness,
                radius,
                index,
                mirror,
            }
            | SurfaceType::Obscuration {
                thickness,
                radius,
                index,
                mirror,
            } => {
                let n2 = if *mirror {
                    -n1
                } else {
                    index.unwrap_or(1.0) * n1.signum()
                };
                let thickness = finite_or_zero(*thickness);
                let c = curvature(*radius);
                let kind = match entry.surface {
                    SurfaceType::Slit { .. } => {
                        let Some(spec) = aperture.as_mut() else {
                            return Err(PopError::MissingDimension(format!(
                                "slit '{}' requires an aperture",
                                entry.name
                            )));
                        };
                        spec.shape = "rectangular".into();
                        spec.kind = ApertureKind::Aperture;
                        SurfaceKind::Slit
                    }
                    SurfaceType::Obscuration { .. } => {
                        let Some(spec) = aperture.as_mut() else {
                            return Err(PopError::MissingDimension(format!(
                                "obscuration '{}' requires an aperture",
                                entry.name
                            )));
                        };
                        spec.kind = ApertureKind::Obscuration;
                        SurfaceKind::Obscuration
                    }
                    _ => SurfaceKind::Standard,
                };
                (
                    kind,
                    AbcdMatrix::new(thickness, c, n1, n2, entry.mx)?,
                    AbcdMatrix::new(thickness, c, n1, n2, entry.my)?,
                    n2,
                )
            }
            SurfaceType::ParaxialLens {
                focal_length,
                thickness,
            } => {
                let thickness = finite_or_zero(*thickness);
                let c = if focal_length.is_finite() {
                    1.0 / focal_length
                } else {
                    0.0
                };
                (
                    SurfaceKind::ParaxialLens(*focal_length),
                    AbcdMatrix::new(thickness, c, n1, n1, entry.mx)?,
                    AbcdMatrix::new(thickness, c, n1, n1, entry.my)?,
                    n1,
                )
            }
            SurfaceType::Zernike {
                wavelength,
                coefficients,
                index,
                ordering,
                normalize,
                radius,
                offset,
                origin,
            } => {
                let spec = ZernikeSpec {
                    index: index
                        .clone()
                        .unwrap_or_else(|| (0..coefficients.len()).collect()),
                    coefficients: coefficients.iter().map(|c| c * wavelength).collect(),
                    ordering: ZernikeOrdering::from_name(ordering)?,
                    normalize: *normalize,
                    radius: radius.unwrap_or(f64::NAN),
                    offset: *offset,
                    origin: AngleOrigin::from_name(origin)?,
                };
                (
                    SurfaceKind::Zernike(spec),
                    AbcdMatrix::new(0.0, 0.0, n1, n1, 1.0)?,
                    AbcdMatrix::new(0.0, 0.0, n1, n1, 1.0)?,
                    n1,
                )
            }
            SurfaceType::Abcd {
                thickness,
                sagittal,
                tangential,
            } => {
                let translation = AbcdMatrix::new(finite_or_zero(*thickness), 0.0, n1, n1, 1.0)?;
                let user = |m: &[f64; 4]| {
                    AbcdMatrix::from_matrix(translation.matrix() * Matrix2::new(m[0], m[1], m[2], m[3]))
                        .with_direction(translation.cin(), translation.cout())
                };
                (SurfaceKind::Abcd, user(sagittal), user(tangential), n1)
            }
        };
        debug!(
            "surface {number} '{}': power={:.4}, thickness={:.4}, n1={n1:.4}, n2={n2:.4}",
            entry.name,
            abcd_t.power(),
            abcd_t.thickness()
        );
        if !entry.ignore {
            self.n1 = n2;
        }
        self.chain.insert(
            number,
            SurfaceDescriptor {
                number,
                name: entry.name.clone(),
                kind,
                abcd_s,
                abcd_t,
                aperture,
                is_stop: entry.stop,
                save: entry.save,
                ignore: entry.ignore,
            },
        );
        Ok(number)
    }
    /// Finish building and return the chain ordered by surface number.
    #[must_use]
    pub fn build(self) -> BTreeMap<usize, SurfaceDescriptor> {
        self.chain
    }
}
#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn default() {
        let builder = ChainBuilder::default();
        assert_eq!(builder.refractive_index(), 1.0);
        assert!(builder.build().is_empty());
    }
    #[test]
    fn paraxial_lens() {
        let chain = ChainBuilder::from_entries(&[SurfaceEntry::new(
            "lens",
            SurfaceType::paraxial_lens(2.0, 0.5),
        )])
        .unwrap();
        let lens = &chain[&1];
        assert_eq!(lens.number, 1);
        assert_eq!(lens.name, "lens");
        assert_eq!(lens.kind, SurfaceKind::ParaxialLens(2.0));
        assert_eq!(lens.focal_lengths(), (2.0, 2.0));
        assert_eq!(lens.thicknesses(), (0.5, 0.5));
        assert!(!lens.is_coordinate_break());
    }
    #[test]
    fn mirror_flips_direction() {
        let mut builder = ChainBuilder::default();
        builder.push(&SurfaceEntry::new("M1", SurfaceType::mirror(-2.0, -1.0))).unwrap();
        assert_eq!(builder.refractive_index(), -1.0);
        builder.push(&SurfaceEntry::new("gap", SurfaceType::gap(-0.5))).unwrap();
        assert_eq!(builder.refractive_index(), -1.0);
        builder
            .push(&SurfaceEntry::new(
                "glass",
                SurfaceType::Standard {
                    thickness: -0.1,
                    radius: f64::INFINITY,
                    index: Some(1.5),
                    mirror: false,
                },
            ))
            .unwrap();
        assert_eq!(builder.refractive_index(), -1.5);
        let chain = builder.build();
        let m1 = &chain[&1];
        assert_eq!(m1.abcd_t.cin(), 1);
        assert_eq!(m1.abcd_t.cout(), -1);
        // concave mirror with R = -2 focusses at -1 in -z direction
        let (fl_s, fl_t) = m1.focal_lengths();
        assert_relative_eq!(fl_s, 1.0);
        assert_relative_eq!(fl_t, 1.0);
        assert_eq!(m1.thicknesses(), (1.0, 1.0));
        assert_eq!(chain[&2].thicknesses(), (0.5, 0.5));
        assert_eq!(chain[&2].focal_lengths().0, f64::INFINITY);
    }
    #[test]
    fn dioptre() {
        let chain = ChainBuilder::from_entries(&[SurfaceEntry::new(
            "front",
            SurfaceType::Standard {
                thickness: 0.01,
                radius: 0.1,
                index: Some(1.5),
                mirror: false,
            },
        )])
        .unwrap();
        let abcd = &chain[&1].abcd_t;
        assert_relative_eq!(abcd.n1n2(), 1.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(abcd.power(), (1.0 - 1.0 / 1.5) / 0.1, epsilon = 1e-12);
        assert_relative_eq!(abcd.thickness(), 0.01, epsilon = 1e-15);
    }
    #[test]
    fn flat_surfaces() {
        for radius in [f64::INFINITY, f64::NAN, 0.0] {
            let chain = ChainBuilder::from_entries(&[SurfaceEntry::new(
                "flat",
                SurfaceType::Standard {
                    thickness: f64::NAN,
                    radius,
                    index: None,
                    mirror: false,
                },
            )])
            .unwrap();
            assert_eq!(chain[&1].abcd_t, AbcdMatrix::default());
        }
    }
    #[test]
    fn coordinate_break() {
        let entry = SurfaceEntry::new(
            "cb",
            SurfaceType::CoordinateBreak {
                thickness: 0.2,
                xdec: 0.1,
                ydec: 0.0,
                xrot: 5.0,
                yrot: 0.0,
            },
        );
        let chain = ChainBuilder::from_entries(&[entry]).unwrap();
        let cb = &chain[&1];
        assert!(cb.is_coordinate_break());
        assert_matches!(cb.kind, SurfaceKind::CoordinateBreak(CoordinateBreak { xdec, xrot, .. }) if xdec == 0.1 && xrot == 5.0);
        assert_eq!(cb.thicknesses(), (0.2, 0.2));
    }
    #[test]
    fn zernike() {
        let entry = SurfaceEntry::new(
            "wfe",
            SurfaceType::Zernike {
                wavelength: 1.0e-6,
                coefficients: vec![0.0, 0.5, -0.25],
                index: None,
                ordering: "Noll".into(),
                normalize: true,
                radius: None,
                offset: 0.0,
                origin: "y".into(),
            },
        );
        let chain = ChainBuilder::from_entries(&[entry]).unwrap();
        let SurfaceKind::Zernike(spec) = &chain[&1].kind else {
            panic!("wrong kind");
        };
        assert_eq!(spec.index, vec![0, 1, 2]);
        assert_eq!(spec.coefficients, vec![0.0, 0.5e-6, -0.25e-6]);
        assert_eq!(spec.ordering, ZernikeOrdering::Noll);
        assert!(spec.radius.is_nan());
        assert_eq!(spec.origin, AngleOrigin::Y);
        assert_eq!(chain[&1].abcd_t, AbcdMatrix::default());
    }
    #[test]
    fn zernike_wrong_ordering() {
        let entry = SurfaceEntry::new(
            "wfe",
            SurfaceType::Zernike {
                wavelength: 1.0e-6,
                coefficients: vec![0.0],
                index: None,
                ordering: "zemax".into(),
                normalize: true,
                radius: None,
                offset: 0.0,
                origin: "x".into(),
            },
        );
        assert_matches!(
            ChainBuilder::from_entries(&[entry]),
            Err(PopError::UnsupportedOrdering(_))
        );
    }
    #[test]
    fn abcd() {
        let entry = SurfaceEntry::new(
            "telescope",
            SurfaceType::Abcd {
                thickness: 1.0,
                sagittal: [2.0, 0.0, 0.0, 0.5],
                tangential: [1.0, 0.0, -1.0, 1.0],
            },
        );
        let chain = ChainBuilder::from_entries(&[entry]).unwrap();
        let s = &chain[&1].abcd_s;
        assert_eq!(s.matrix(), Matrix2::new(2.0, 0.5, 0.0, 0.5));
        assert_eq!(s.magnification(), 2.0);
        let t = &chain[&1].abcd_t;
        assert_eq!(t.matrix(), Matrix2::new(0.0, 1.0, -1.0, 1.0));
        assert_eq!(t.cout(), 1);
    }
    #[test]
    fn slit_and_obscuration() {
        let spec = ApertureSpec::new("elliptical", ApertureKind::Obscuration, 0.1, 0.2);
        let slit = SurfaceEntry::new(
            "slit",
            SurfaceType::Slit {
                thickness: 0.0,
                radius: f64::INFINITY,
                index: None,
                mirror: false,
            },
        )
        .with_aperture(spec.clone());
        let obscuration = SurfaceEntry::new(
            "secondary",
            SurfaceType::Obscuration {
                thickness: 0.0,
                radius: f64::INFINITY,
                index: None,
                mirror: false,
            },
        )
        .with_aperture(ApertureSpec::new("circular", ApertureKind::Aperture, 0.1, f64::NAN));
        let chain = ChainBuilder::from_entries(&[slit, obscuration]).unwrap();
        let slit_aperture = chain[&1].aperture.as_ref().unwrap();
        assert_eq!(slit_aperture.shape, "rectangular");
        assert_eq!(slit_aperture.kind, ApertureKind::Aperture);
        assert_eq!(chain[&1].kind, SurfaceKind::Slit);
        let obscuration = chain[&2].aperture.as_ref().unwrap();
        assert_eq!(obscuration.shape, "circular");
        assert_eq!(obscuration.kind, ApertureKind::Obscuration);
        assert_eq!(chain[&2].kind, SurfaceKind::Obscuration);
    }
    #[test]
    fn slit_without_aperture() {
        let slit = SurfaceEntry::new(
            "slit",
            SurfaceType::Slit {
                thickness: 0.0,
                radius: f64::INFINITY,
                index: None,
                mirror: false,
            },
        );
        assert_matches!(
            ChainBuilder::from_entries(&[slit]),
            Err(PopError::MissingDimension(_))
        );
    }
    #[test]
    fn ignored_surface() {
        let entries = [
            SurfaceEntry::new("M1", SurfaceType::mirror(-2.0, -1.0)).ignored(),
            SurfaceEntry::new("lens", SurfaceType::paraxial_lens(1.0, 1.0)).saved().as_stop(),
        ];
        let mut builder = ChainBuilder::default();
        assert_eq!(builder.push(&entries[0]).unwrap(), 1);
        assert_eq!(builder.refractive_index(), 1.0);
        assert_eq!(builder.push(&entries[1]).unwrap(), 2);
        let chain = builder.build();
        assert!(chain[&1].ignore);
        assert!(chain[&2].save);
        assert!(chain[&2].is_stop);
        assert_eq!(chain[&2].abcd_t.cout(), 1);
    }
    #[test]
    fn magnification() {
        let entry = SurfaceEntry::new("relay", SurfaceType::gap(0.0)).with_magnification(2.0, 0.5);
        let chain = ChainBuilder::from_entries(&[entry]).unwrap();
        assert_eq!(chain[&1].abcd_s.magnification(), 2.0);
        assert_eq!(chain[&1].abcd_t.magnification(), 0.5);
        let entry = SurfaceEntry::new("bad", SurfaceType::gap(0.0)).with_magnification(0.0, 1.0);
        assert_matches!(
            ChainBuilder::from_entries(&[entry]),
            Err(PopError::InvalidParameter(_))
        );
    }
}
