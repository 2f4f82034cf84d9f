#![warn(missing_docs)]
//! Physical optics wavefront with a pilot Gaussian beam
//!
//! A [`Wavefront`] carries a sampled complex field together with a "pilot" Gaussian beam for each of the two
//! principal planes (sagittal `x` and tangential `y`). The pilot beam tracks waist, waist position and Rayleigh
//! distance along the optical chain and decides which of the three Fresnel propagators is used:
//!
//! - [`ptp`](Wavefront::ptp()): plane to plane, both positions within the Rayleigh range
//! - [`stw`](Wavefront::stw()): spherical to waist, from outside into the Rayleigh range
//! - [`wts`](Wavefront::wts()): waist to spherical, from inside to outside of the Rayleigh range
//!
//! Outside of the Rayleigh range the field is stored relative to a spherical reference surface centered at the beam
//! waist. This keeps the sampling of strongly converging or diverging beams manageable.
//! ```rust
//! use poptics::wavefront::{Region, Wavefront};
//!
//! let mut wfo = Wavefront::new(1.0, 3.0e-6, 64, 4).unwrap();
//! assert_eq!(wfo.region().unwrap(), Region::Inside);
//! wfo.lens(1.0).unwrap();
//! assert_eq!(wfo.region().unwrap(), Region::Outside);
//! ```
use std::f64::consts::PI;

use itertools::iproduct;
use kahan::KahanSummator;
use log::{debug, trace};
use nalgebra::DMatrix;
use num::complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    aperture::{Aperture, ApertureKind},
    error::{PopError, PopResult},
    utils::{
        centered_coordinates,
        fft::{fft2_forward, fft2_inverse, fftfreq, fftshift, ifftshift},
        usize_to_f64,
    },
    zernike::{Zernike, ZernikeOrdering},
};

/// Propagation distances below this fraction of the wavelength are ignored.
const MIN_DISTANCE_IN_WAVELENGTHS: f64 = 1.0e-3;
/// Magnifications closer to unity than this are ignored.
const UNITY_MAGNIFICATION_TOLERANCE: f64 = 1.0e-8;

/// Position of the wavefront relative to the Rayleigh range of its pilot beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Region {
    /// within `rayleigh_factor` Rayleigh distances from the waist
    #[strum(serialize = "I")]
    Inside,
    /// further away from the waist
    #[strum(serialize = "O")]
    Outside,
}
/// Reference axis of the azimuthal angle used for Zernike polynomials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AngleOrigin {
    /// counter-clockwise positive from the x axis
    #[default]
    X,
    /// clockwise positive from the y axis
    Y,
}
impl AngleOrigin {
    /// Parse an origin name (`"x"` or `"y"`).
    ///
    /// # Errors
    ///
    /// This function will return an error for any other name.
    pub fn from_name(name: &str) -> PopResult<Self> {
        name.parse::<Self>().map_err(|_| {
            PopError::InvalidParameter(format!(
                "origin '{name}' not recognised. Origin shall be either x or y"
            ))
        })
    }
}
/// Gaussian beam parameters of one principal plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotBeam {
    w0: f64,
    zw0: f64,
    zr: f64,
    z: f64,
    curvature: f64,
    fratio: f64,
}
/// Intermediate values of a lens application.
struct LensStep {
    wz: f64,
    delta_z_before: f64,
    curvature_before: f64,
}
impl PilotBeam {
    fn new(w0: f64, wavelength: f64) -> Self {
        Self {
            w0,
            zw0: 0.0,
            zr: PI * w0 * w0 / wavelength,
            z: 0.0,
            curvature: 0.0,
            fratio: f64::INFINITY,
        }
    }
    /// Beam waist radius.
    #[must_use]
    pub const fn w0(&self) -> f64 {
        self.w0
    }
    /// Position of the beam waist.
    #[must_use]
    pub const fn zw0(&self) -> f64 {
        self.zw0
    }
    /// Rayleigh distance.
    #[must_use]
    pub const fn zr(&self) -> f64 {
        self.zr
    }
    /// Current position along the propagation axis.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
    /// Curvature of the reference sphere. Zero within the Rayleigh range.
    #[must_use]
    pub const fn curvature(&self) -> f64 {
        self.curvature
    }
    /// Focal ratio of the beam.
    #[must_use]
    pub const fn fratio(&self) -> f64 {
        self.fratio
    }
    /// Beam radius `w(z)` at the current position.
    #[must_use]
    pub fn wz(&self) -> f64 {
        self.w0 * ((self.z - self.zw0) / self.zr).mul_add((self.z - self.zw0) / self.zr, 1.0).sqrt()
    }
    /// Signed distance from the current position to the beam waist.
    #[must_use]
    pub fn distance_to_focus(&self) -> f64 {
        self.zw0 - self.z
    }
    fn region_at(&self, z: f64, rayleigh_factor: f64) -> Region {
        if (z - self.zw0).abs() < rayleigh_factor * self.zr {
            Region::Inside
        } else {
            Region::Outside
        }
    }
    fn refocus(&mut self, focal_length: f64, wavelength: f64) -> LensStep {
        let wz = self.wz();
        let delta_z = self.z - self.zw0;
        let gc_obj = delta_z / delta_z.mul_add(delta_z, self.zr * self.zr);
        let gc_ima = gc_obj - 1.0 / focal_length;
        let wz2 = wz * wz;
        self.w0 = wz / (PI * wz2 * gc_ima / wavelength).mul_add(PI * wz2 * gc_ima / wavelength, 1.0).sqrt();
        self.zw0 = -gc_ima / gc_ima.mul_add(gc_ima, (wavelength / (PI * wz2)).powi(2)) + self.z;
        self.zr = PI * self.w0 * self.w0 / wavelength;
        LensStep {
            wz,
            delta_z_before: delta_z,
            curvature_before: self.curvature,
        }
    }
    /// Update the reference curvature after [`refocus`](Self::refocus) and return the coefficient of the quadratic
    /// phase to be applied to the field.
    fn lens_phase(&mut self, step: &LensStep, focal_length: f64, before: Region, after: Region) -> f64 {
        let c_obj = if before == Region::Inside || step.curvature_before == 0.0 {
            0.0
        } else {
            1.0 / step.delta_z_before
        };
        let delta_z = self.z - self.zw0;
        let c_ima = if after == Region::Inside {
            0.0
        } else {
            1.0 / delta_z
        };
        self.curvature = c_ima;
        self.fratio = delta_z.abs() / (2.0 * step.wz);
        let power = 1.0 / focal_length;
        match (before, after) {
            (Region::Inside, Region::Inside) => power,
            (Region::Inside, Region::Outside) => power + c_ima,
            (Region::Outside, Region::Inside) => power - c_obj,
            (Region::Outside, Region::Outside) => power - c_obj + c_ima,
        }
    }
    fn magnify(&mut self, magnification: f64) {
        if (magnification - 1.0).abs() < UNITY_MAGNIFICATION_TOLERANCE {
            return;
        }
        let m2 = magnification * magnification;
        let delta_z = (self.z - self.zw0) * m2;
        let wz = self.wz() * magnification;
        self.w0 *= magnification;
        self.zr *= m2;
        self.zw0 = self.z - delta_z;
        self.fratio = delta_z.abs() / (2.0 * wz);
    }
    fn change_medium(&mut self, ratio: f64) {
        let delta_z = (self.z - self.zw0) / ratio;
        self.zr /= ratio;
        self.zw0 = self.z - delta_z;
        self.fratio /= ratio;
    }
}
/// A sampled complex field on a regular grid.
///
/// Rows run along y, columns along x. The sample with index `n/2` lies on the optical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledField {
    field: DMatrix<Complex64>,
    dx: f64,
    dy: f64,
}
impl SampledField {
    fn new(grid_size: usize, pitch: f64) -> Self {
        Self {
            field: DMatrix::from_element(grid_size, grid_size, Complex64::new(1.0, 0.0)),
            dx: pitch,
            dy: pitch,
        }
    }
    /// The complex field.
    #[must_use]
    pub const fn field(&self) -> &DMatrix<Complex64> {
        &self.field
    }
    /// Pixel pitch along x.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }
    /// Pixel pitch along y.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }
    /// Pixel center coordinates along x.
    #[must_use]
    pub fn x(&self) -> Vec<f64> {
        centered_coordinates(self.field.ncols(), self.dx)
    }
    /// Pixel center coordinates along y.
    #[must_use]
    pub fn y(&self) -> Vec<f64> {
        centered_coordinates(self.field.nrows(), self.dy)
    }
    /// Bounding box `(xmin, xmax, ymin, ymax)` of the pixel centers.
    #[must_use]
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let nx = usize_to_f64(self.field.ncols() / 2);
        let ny = usize_to_f64(self.field.nrows() / 2);
        (-nx * self.dx, (nx - 1.0) * self.dx, -ny * self.dy, (ny - 1.0) * self.dy)
    }
    /// Modulus of the field.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<f64> {
        self.field.map(|c| c.norm())
    }
    /// Argument of the field in the range `(-pi, pi]`.
    #[must_use]
    pub fn phase(&self) -> DMatrix<f64> {
        self.field.map(|c| c.arg())
    }
    /// Total energy `sum(|E|^2)`.
    #[must_use]
    pub fn energy(&self) -> f64 {
        let intensities: Vec<f64> = self.field.iter().map(Complex64::norm_sqr).collect();
        intensities.iter().kahan_sum().sum()
    }
    /// Multiply each sample by `exp(i * phase(x, y))`.
    fn apply_phase<F: Fn(f64, f64) -> f64>(&mut self, phase: F) {
        let (x, y) = (self.x(), self.y());
        for (r, c) in iproduct!(0..self.field.nrows(), 0..self.field.ncols()) {
            self.field[(r, c)] *= Complex64::from_polar(1.0, phase(x[c], y[r]));
        }
    }
    /// Multiply each sample of the spectrum by `exp(i * phase(fx, fy))` where `fx` and `fy` are in unshifted FFT
    /// order.
    fn apply_spectral_phase<F: Fn(f64, f64) -> f64>(spectrum: &mut DMatrix<Complex64>, dx: f64, dy: f64, phase: F) {
        let fx = fftfreq(spectrum.ncols(), dx);
        let fy = fftfreq(spectrum.nrows(), dy);
        for (r, c) in iproduct!(0..spectrum.nrows(), 0..spectrum.ncols()) {
            spectrum[(r, c)] *= Complex64::from_polar(1.0, phase(fx[c], fy[r]));
        }
    }
}
/// A sampled complex wavefront with pilot Gaussian beams for the sagittal and the tangential plane.
#[derive(Debug, Clone)]
pub struct Wavefront {
    wavelength: f64,
    rayleigh_factor: f64,
    sagittal: PilotBeam,
    tangential: PilotBeam,
    field: SampledField,
}
impl Wavefront {
    /// Create a new planar [`Wavefront`] of unit amplitude.
    ///
    /// The pilot beam waist is half the `beam_diameter` and located at `z = 0`. The grid has `grid_size` x
    /// `grid_size` samples covering `zoom` times the beam diameter.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `grid_size` is not a power of two.
    ///   - `beam_diameter`, `wavelength` or `zoom` is not positive.
    pub fn new(beam_diameter: f64, wavelength: f64, grid_size: usize, zoom: usize) -> PopResult<Self> {
        if !grid_size.is_power_of_two() {
            return Err(PopError::InvalidParameter(format!(
                "grid size {grid_size} is not a power of two"
            )));
        }
        if zoom == 0 {
            return Err(PopError::InvalidParameter("zoom must be positive".into()));
        }
        if !(beam_diameter.is_finite() && beam_diameter > 0.0) {
            return Err(PopError::InvalidParameter(
                "beam diameter must be positive and finite".into(),
            ));
        }
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(PopError::InvalidParameter(
                "wavelength must be positive and finite".into(),
            ));
        }
        let w0 = beam_diameter / 2.0;
        let pitch = beam_diameter * usize_to_f64(zoom) / usize_to_f64(grid_size);
        Ok(Self {
            wavelength,
            rayleigh_factor: 2.0,
            sagittal: PilotBeam::new(w0, wavelength),
            tangential: PilotBeam::new(w0, wavelength),
            field: SampledField::new(grid_size, pitch),
        })
    }
    /// Current wavelength (in the current medium).
    #[must_use]
    pub const fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Number of Rayleigh distances defining the inside region around the waist.
    #[must_use]
    pub const fn rayleigh_factor(&self) -> f64 {
        self.rayleigh_factor
    }
    /// Set the number of Rayleigh distances defining the inside region around the waist.
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not positive and finite.
    pub fn set_rayleigh_factor(&mut self, rayleigh_factor: f64) -> PopResult<()> {
        if !(rayleigh_factor.is_finite() && rayleigh_factor > 0.0) {
            return Err(PopError::InvalidParameter(
                "rayleigh factor must be positive and finite".into(),
            ));
        }
        self.rayleigh_factor = rayleigh_factor;
        Ok(())
    }
    /// Pilot beam of the sagittal (x) plane.
    #[must_use]
    pub const fn sagittal(&self) -> &PilotBeam {
        &self.sagittal
    }
    /// Pilot beam of the tangential (y) plane.
    #[must_use]
    pub const fn tangential(&self) -> &PilotBeam {
        &self.tangential
    }
    /// The sampled field.
    #[must_use]
    pub const fn sampled_field(&self) -> &SampledField {
        &self.field
    }
    /// A copy of the complex field.
    #[must_use]
    pub fn field(&self) -> DMatrix<Complex64> {
        self.field.field.clone()
    }
    /// Pixel pitch along x.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.field.dx
    }
    /// Pixel pitch along y.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.field.dy
    }
    /// Bounding box `(xmin, xmax, ymin, ymax)` of the pixel centers.
    #[must_use]
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.field.extent()
    }
    /// Modulus of the field.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<f64> {
        self.field.amplitude()
    }
    /// Argument of the field.
    #[must_use]
    pub fn phase(&self) -> DMatrix<f64> {
        self.field.phase()
    }
    /// Beam radius `w(z)` in the sagittal plane.
    #[must_use]
    pub fn wz_x(&self) -> f64 {
        self.sagittal.wz()
    }
    /// Beam radius `w(z)` in the tangential plane.
    #[must_use]
    pub fn wz_y(&self) -> f64 {
        self.tangential.wz()
    }
    /// Classify the current position of both planes.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sagittal and tangential planes are not in the same region.
    pub fn region(&self) -> PopResult<Region> {
        self.region_at(self.sagittal.z, self.tangential.z)
    }
    /// Classify the given positions `z_x` (sagittal) and `z_y` (tangential).
    ///
    /// # Errors
    ///
    /// This function will return an error if the sagittal and tangential planes are not in the same region.
    pub fn region_at(&self, z_x: f64, z_y: f64) -> PopResult<Region> {
        let region_x = self.sagittal.region_at(z_x, self.rayleigh_factor);
        let region_y = self.tangential.region_at(z_y, self.rayleigh_factor);
        if region_x == region_y {
            Ok(region_x)
        } else {
            Err(PopError::Consistency(format!(
                "sagittal ({region_x}) and tangential ({region_y}) planes are not in the same state"
            )))
        }
    }
    /// Normalize the field to unit total energy.
    ///
    /// # Errors
    ///
    /// This function will return an error if the field has zero energy.
    pub fn make_stop(&mut self) -> PopResult<()> {
        let energy = self.field.energy();
        if energy <= 0.0 || !energy.is_finite() {
            return Err(PopError::InvalidParameter(
                "cannot normalize a field without energy".into(),
            ));
        }
        let norm = energy.sqrt();
        self.field.field.apply(|c| *c /= norm);
        Ok(())
    }
    /// Multiply the field with the transmission map of the given [`Aperture`].
    pub fn apply_aperture(&mut self, aperture: &Aperture) {
        let mask = aperture.transmission_map(&self.field.x(), &self.field.y(), self.field.dx, self.field.dy);
        self.field.field.zip_apply(&mask, |c, m| *c *= m);
    }
    /// Create an [`Aperture`] from a shape name and dimensions and apply it to the field.
    ///
    /// `hx` and `hy` are the semi-axes of an elliptical aperture or the full width and height of a rectangular one.
    /// A circular aperture uses the radius `r`. Returns the applied aperture.
    ///
    /// # Errors
    ///
    /// This function will return an error if the shape is unknown or a required dimension is missing.
    #[allow(clippy::too_many_arguments)]
    pub fn aperture(
        &mut self,
        shape: &str,
        hx: Option<f64>,
        hy: Option<f64>,
        r: Option<f64>,
        xc: f64,
        yc: f64,
        tilt: Option<f64>,
        kind: ApertureKind,
    ) -> PopResult<Aperture> {
        let aperture = Aperture::from_shape_name(shape, hx, hy, r, xc, yc, tilt, kind)?;
        self.apply_aperture(&aperture);
        Ok(aperture)
    }
    /// Apply a thin lens with the same focal length in both planes.
    ///
    /// # Errors
    ///
    /// This function will return an error if the focal length is zero or NaN or if the planes become inconsistent.
    pub fn lens(&mut self, focal_length: f64) -> PopResult<()> {
        self.lens_xy(focal_length, focal_length)
    }
    /// Apply a thin (possibly astigmatic) lens with focal lengths `fl_x` (sagittal) and `fl_y` (tangential).
    ///
    /// Positive focal lengths converge, negative diverge and an infinite focal length leaves the plane unaffected.
    ///
    /// # Errors
    ///
    /// This function will return an error if a focal length is zero or NaN or if the planes become inconsistent.
    pub fn lens_xy(&mut self, fl_x: f64, fl_y: f64) -> PopResult<()> {
        if fl_x == 0.0 || fl_y == 0.0 || fl_x.is_nan() || fl_y.is_nan() {
            return Err(PopError::InvalidParameter(
                "focal length must not be zero or NaN".into(),
            ));
        }
        let before = self.region()?;
        let step_x = self.sagittal.refocus(fl_x, self.wavelength);
        let step_y = self.tangential.refocus(fl_y, self.wavelength);
        let after = self.region()?;
        let kx = self.sagittal.lens_phase(&step_x, fl_x, before, after);
        let ky = self.tangential.lens_phase(&step_y, fl_y, before, after);
        trace!("lens fl_x={fl_x} fl_y={fl_y} propagator {before}{after}");
        let factor = -PI / self.wavelength;
        self.field
            .apply_phase(|x, y| factor * x.mul_add(x * kx, y * y * ky));
        Ok(())
    }
    /// Change the sampling and the pilot beams according to an optical magnification `my` (tangential) and `mx`
    /// (sagittal).
    ///
    /// # Errors
    ///
    /// This function will return an error if a magnification is not positive.
    pub fn magnification(&mut self, my: f64, mx: f64) -> PopResult<()> {
        if !(mx > 0.0 && my > 0.0) {
            return Err(PopError::InvalidParameter(
                "negative magnification not supported".into(),
            ));
        }
        self.field.dx *= mx;
        self.field.dy *= my;
        self.sagittal.magnify(mx);
        self.tangential.magnify(my);
        debug!("magnification mx={mx} my={my}");
        Ok(())
    }
    /// Update Rayleigh distances, wavelength, waist positions and focal ratios for a transition between two media
    /// with refractive index ratio `n1n2`.
    ///
    /// Only the magnitude of `n1n2` is used. Its sign encodes the direction of propagation.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n1n2` is zero or not finite.
    pub fn change_medium(&mut self, n1n2: f64) -> PopResult<()> {
        let ratio = n1n2.abs();
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(PopError::InvalidParameter(
                "refractive index ratio must be finite and non-zero".into(),
            ));
        }
        self.sagittal.change_medium(ratio);
        self.tangential.change_medium(ratio);
        self.wavelength *= ratio;
        debug!("change of medium n1/n2={n1n2}");
        Ok(())
    }
    fn below_threshold(&self, dz_x: f64, dz_y: f64) -> bool {
        let threshold = MIN_DISTANCE_IN_WAVELENGTHS * self.wavelength;
        dz_x.abs() < threshold || dz_y.abs() < threshold
    }
    /// Plane-to-plane propagation within the Rayleigh range.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is not planar.
    pub fn ptp(&mut self, dz_x: f64, dz_y: f64) -> PopResult<()> {
        if self.below_threshold(dz_x, dz_y) {
            debug!("thickness smaller than 1/1000 wavelength. Skipping ptp");
            return Ok(());
        }
        if self.sagittal.curvature != 0.0 || self.tangential.curvature != 0.0 {
            return Err(PopError::Consistency(
                "plane-to-plane propagation requires a planar wavefront".into(),
            ));
        }
        let mut spectrum = fft2_forward(&ifftshift(&self.field.field));
        let factor = -PI * self.wavelength;
        SampledField::apply_spectral_phase(&mut spectrum, self.field.dx, self.field.dy, |fx, fy| {
            factor * dz_x.mul_add(fx * fx, dz_y * fy * fy)
        });
        self.field.field = fftshift(&fft2_inverse(&spectrum));
        self.sagittal.z += dz_x;
        self.tangential.z += dz_y;
        Ok(())
    }
    /// Spherical-to-waist propagation from outside into the Rayleigh range.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is planar.
    pub fn stw(&mut self, dz_x: f64, dz_y: f64) -> PopResult<()> {
        if self.below_threshold(dz_x, dz_y) {
            debug!("thickness smaller than 1/1000 wavelength. Skipping stw");
            return Ok(());
        }
        if self.sagittal.curvature == 0.0 || self.tangential.curvature == 0.0 {
            return Err(PopError::Consistency(
                "spherical-to-waist propagation requires a curved wavefront".into(),
            ));
        }
        let shifted = ifftshift(&self.field.field);
        let mut spectrum = if dz_x >= 0.0 {
            fft2_forward(&shifted)
        } else {
            fft2_inverse(&shifted)
        };
        let factor = PI * self.wavelength;
        SampledField::apply_spectral_phase(&mut spectrum, self.field.dx, self.field.dy, |fx, fy| {
            factor * dz_x.mul_add(fx * fx, dz_y * fy * fy)
        });
        let (nrows, ncols) = spectrum.shape();
        self.sagittal.z += dz_x;
        self.tangential.z += dz_y;
        self.sagittal.curvature = 0.0;
        self.tangential.curvature = 0.0;
        self.field.dx = self.wavelength * dz_x.abs() / (usize_to_f64(ncols) * self.field.dx);
        self.field.dy = self.wavelength * dz_y.abs() / (usize_to_f64(nrows) * self.field.dy);
        self.field.field = fftshift(&spectrum);
        Ok(())
    }
    /// Waist-to-spherical propagation from inside to outside of the Rayleigh range.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is not planar.
    pub fn wts(&mut self, dz_x: f64, dz_y: f64) -> PopResult<()> {
        if self.below_threshold(dz_x, dz_y) {
            debug!("thickness smaller than 1/1000 wavelength. Skipping wts");
            return Ok(());
        }
        if self.sagittal.curvature != 0.0 || self.tangential.curvature != 0.0 {
            return Err(PopError::Consistency(
                "waist-to-spherical propagation requires a planar wavefront".into(),
            ));
        }
        let factor = PI / self.wavelength;
        self.field
            .apply_phase(|x, y| factor * (x * x / dz_x + y * y / dz_y));
        let shifted = ifftshift(&self.field.field);
        let transformed = if dz_x >= 0.0 {
            fft2_forward(&shifted)
        } else {
            fft2_inverse(&shifted)
        };
        let (nrows, ncols) = transformed.shape();
        self.sagittal.z += dz_x;
        self.tangential.z += dz_y;
        self.sagittal.curvature = 1.0 / (self.sagittal.z - self.sagittal.zw0);
        self.tangential.curvature = 1.0 / (self.tangential.z - self.tangential.zw0);
        self.field.dx = self.wavelength * dz_x.abs() / (usize_to_f64(ncols) * self.field.dx);
        self.field.dy = self.wavelength * dz_y.abs() / (usize_to_f64(nrows) * self.field.dy);
        self.field.field = fftshift(&transformed);
        Ok(())
    }
    /// Propagate the wavefront by `dz_x` (sagittal) and `dz_y` (tangential) choosing the appropriate propagators.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the two distances have different signs.
    ///   - the two planes are not in the same region before or after the propagation.
    pub fn propagate(&mut self, dz_x: f64, dz_y: f64) -> PopResult<()> {
        let threshold = MIN_DISTANCE_IN_WAVELENGTHS * self.wavelength;
        if dz_x.abs() < threshold && dz_y.abs() < threshold {
            debug!("propagation distance smaller than 1/1000 wavelength. Skipping");
            return Ok(());
        }
        if sign(dz_x) != sign(dz_y) {
            return Err(PopError::InvalidParameter(
                "sagittal and tangential propagation distances must have the same sign".into(),
            ));
        }
        let z1_x = self.sagittal.z;
        let z1_y = self.tangential.z;
        let z2_x = z1_x + dz_x;
        let z2_y = z1_y + dz_y;
        let before = self.region()?;
        let after = self.region_at(z2_x, z2_y)?;
        trace!("propagate dz_x={dz_x} dz_y={dz_y} propagator {before}{after}");
        let zw0_x = self.sagittal.zw0;
        let zw0_y = self.tangential.zw0;
        match (before, after) {
            (Region::Inside, Region::Inside) => self.ptp(dz_x, dz_y),
            (Region::Outside, Region::Inside) => {
                self.stw(zw0_x - z1_x, zw0_y - z1_y)?;
                self.ptp(z2_x - zw0_x, z2_y - zw0_y)
            }
            (Region::Inside, Region::Outside) => {
                self.ptp(zw0_x - z1_x, zw0_y - z1_y)?;
                self.wts(z2_x - zw0_x, z2_y - zw0_y)
            }
            (Region::Outside, Region::Outside) => {
                self.stw(zw0_x - z1_x, zw0_y - z1_y)?;
                self.wts(z2_x - zw0_x, z2_y - zw0_y)
            }
        }
    }
    /// Add a wavefront error given as Zernike expansion.
    ///
    /// `index` must be the contiguous sequence `0..n` and `coefficients` (in meters) must have the same length. The
    /// polynomials are evaluated over a circle of the given `radius` with an azimuthal `offset` (in degrees). Sample
    /// points outside the circle get no wavefront error. Returns the wavefront error map.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `index` is not contiguous starting from zero or is empty.
    ///   - the number of coefficients does not match the number of indices.
    ///   - `radius` is not positive.
    #[allow(clippy::too_many_arguments)]
    pub fn zernikes(
        &mut self,
        index: &[usize],
        coefficients: &[f64],
        ordering: ZernikeOrdering,
        normalize: bool,
        radius: f64,
        offset: f64,
        origin: AngleOrigin,
    ) -> PopResult<DMatrix<f64>> {
        if index.iter().enumerate().any(|(i, j)| i != *j) {
            return Err(PopError::InvalidParameter(
                "Zernike sequence must be contiguous and start at zero".into(),
            ));
        }
        if index.len() != coefficients.len() {
            return Err(PopError::InvalidParameter(format!(
                "got {} Zernike indices but {} coefficients",
                index.len(),
                coefficients.len()
            )));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PopError::InvalidParameter(
                "Zernike radius must be positive and finite".into(),
            ));
        }
        let (nrows, ncols) = self.field.field.shape();
        let (x, y) = (self.field.x(), self.field.y());
        let offset = offset.to_radians();
        // column major order
        let (rho, phi): (Vec<f64>, Vec<f64>) = iproduct!(0..ncols, 0..nrows)
            .map(|(c, r)| {
                let (xx, yy) = (x[c], y[r]);
                let phi = match origin {
                    AngleOrigin::X => yy.atan2(xx),
                    AngleOrigin::Y => xx.atan2(yy),
                };
                (xx.hypot(yy) / radius, phi + offset)
            })
            .unzip();
        let zernike = Zernike::new(index.len(), &rho, &phi, ordering, normalize)?;
        let wfe = DMatrix::from_column_slice(nrows, ncols, &zernike.combine(coefficients)?);
        let factor = 2.0 * PI / self.wavelength;
        self.field
            .field
            .zip_apply(&wfe, |c, w| *c *= Complex64::from_polar(1.0, factor * w));
        Ok(wfe)
    }
}
fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
