#![warn(missing_docs)]
//! Execution of an optical chain
//!
//! [`run`] propagates a single [`Wavefront`] through an ordered chain of [`SurfaceDescriptor`]s and returns a
//! [`SurfaceResult`] for every surface flagged as `save`.
use std::collections::BTreeMap;

use log::{debug, trace};
use nalgebra::{DMatrix, Vector2};
use serde::{Deserialize, Serialize};

use crate::{
    abcd::AbcdMatrix,
    aperture::{Aperture, ApertureShape},
    error::PopResult,
    surface::{ApertureSpec, SurfaceDescriptor, SurfaceKind},
    wavefront::{SampledField, Wavefront},
};

/// Propagation distances below this value (in meters) are skipped.
const MIN_THICKNESS: f64 = 1.0e-10;

/// Paraxial slopes of the chief ray of a field point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldSlope {
    /// slope in the tangential plane
    pub ut: f64,
    /// slope in the sagittal plane
    pub us: f64,
}
impl FieldSlope {
    /// Create a new [`FieldSlope`].
    #[must_use]
    pub const fn new(ut: f64, us: f64) -> Self {
        Self { ut, us }
    }
    /// Slopes of a field point given by its angles (in degrees) in the sagittal (`x`) and tangential (`y`) plane.
    #[must_use]
    pub fn from_degrees(x: f64, y: f64) -> Self {
        Self {
            ut: y.to_radians().tan(),
            us: x.to_radians().tan(),
        }
    }
}
/// Input parameters of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// diameter of the entrance pupil in meters
    pub pupil_diameter: f64,
    /// wavelength in meters
    pub wavelength: f64,
    /// number of samples along each axis (power of two)
    pub grid_size: usize,
    /// ratio of the grid width to the pupil diameter
    pub zoom: usize,
    /// chief ray slopes
    pub field: FieldSlope,
    /// extent of the Rayleigh range used for the inside/outside classification
    pub rayleigh_factor: f64,
}
impl RunParameters {
    /// Create new [`RunParameters`] for an on-axis field.
    #[must_use]
    pub const fn new(pupil_diameter: f64, wavelength: f64, grid_size: usize, zoom: usize) -> Self {
        Self {
            pupil_diameter,
            wavelength,
            grid_size,
            zoom,
            field: FieldSlope::new(0.0, 0.0),
            rayleigh_factor: 2.0,
        }
    }
    /// Return a copy with the given field slopes.
    #[must_use]
    pub const fn with_field(mut self, field: FieldSlope) -> Self {
        self.field = field;
        self
    }
}
/// Snapshot of the wavefront at a surface.
///
/// The field is recorded after aperture, stop and wavefront error of the surface but before its power and the
/// following thickness are applied. The ray transfer matrices are cumulative up to and including the surface.
#[derive(Debug, Clone)]
pub struct SurfaceResult {
    /// wavelength in meters
    pub wavelength: f64,
    /// sampled field
    pub field: SampledField,
    /// beam radius `(sagittal, tangential)`
    pub wz: (f64, f64),
    /// distance to the beam waist `(sagittal, tangential)`
    pub distance_to_focus: (f64, f64),
    /// focal ratio `(sagittal, tangential)`
    pub fratio: (f64, f64),
    /// aperture applied at the surface
    pub aperture: Option<Aperture>,
    /// cumulative sagittal matrix
    pub abcd_s: AbcdMatrix,
    /// cumulative tangential matrix
    pub abcd_t: AbcdMatrix,
}
impl SurfaceResult {
    fn snapshot(wfo: &Wavefront, aperture: Option<Aperture>) -> Self {
        let (s, t) = (wfo.sagittal(), wfo.tangential());
        Self {
            wavelength: wfo.wavelength(),
            field: wfo.sampled_field().clone(),
            wz: (s.wz(), t.wz()),
            distance_to_focus: (s.distance_to_focus(), t.distance_to_focus()),
            fratio: (s.fratio(), t.fratio()),
            aperture,
            abcd_s: AbcdMatrix::default(),
            abcd_t: AbcdMatrix::default(),
        }
    }
    /// Field amplitude.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<f64> {
        self.field.amplitude()
    }
    /// Field phase in radians.
    #[must_use]
    pub fn phase(&self) -> DMatrix<f64> {
        self.field.phase()
    }
    /// Sampling pitch along x.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.field.dx()
    }
    /// Sampling pitch along y.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.field.dy()
    }
    /// Bounding box `(x_min, x_max, y_min, y_max)` of the sample grid.
    #[must_use]
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.field.extent()
    }
    /// Maximum amplitude of the field.
    #[must_use]
    pub fn peak_amplitude(&self) -> f64 {
        self.amplitude().max()
    }
}
/// Apply the aperture of a surface, centered relative to the chief ray given by `vt` and `vs`.
///
/// Returns `None` if a required radius is not finite.
fn apply_aperture(
    wfo: &mut Wavefront,
    spec: &ApertureSpec,
    vt: &Vector2<f64>,
    vs: &Vector2<f64>,
) -> PopResult<Option<Aperture>> {
    let xdec = if spec.xc.is_finite() { spec.xc } else { vs[0] };
    let ydec = if spec.yc.is_finite() { spec.yc } else { vt[0] };
    // projection onto the plane perpendicular to the chief ray
    let xrad = spec.xrad * (1.0 / vs[1].mul_add(vs[1], 1.0)).sqrt();
    let yrad = spec.yrad * (1.0 / vt[1].mul_add(vt[1], 1.0)).sqrt();
    let finite = if ApertureShape::from_name(&spec.shape)? == ApertureShape::Circular {
        xrad.is_finite()
    } else {
        xrad.is_finite() && yrad.is_finite()
    };
    if !finite {
        return Ok(None);
    }
    trace!("apply {} {}", spec.shape, spec.kind);
    let aperture = wfo.aperture(
        &spec.shape,
        Some(xrad),
        Some(yrad),
        Some(xrad),
        xdec - vs[0],
        ydec - vt[0],
        None,
        spec.kind,
    )?;
    Ok(Some(aperture))
}
/// Propagate a wavefront through the given optical chain.
///
/// The chief ray starts on axis with the slopes given in `params`. For every surface (in ascending order of the
/// surface number) the following steps are performed:
///   1. coordinate break
///   2. aperture (relative to the chief ray)
///   3. stop normalization
///   4. Zernike wavefront error
///   5. snapshot of the wavefront
///   6. magnification
///   7. change of medium
///   8. lens power
///   9. propagation to the next surface
///
/// Surfaces marked as `ignore` are skipped.
///
/// # Errors
///
/// This function will return an error if
///   - the [`Wavefront`] cannot be created from `params`.
///   - any of the wavefront operations fails.
pub fn run(
    params: &RunParameters,
    chain: &BTreeMap<usize, SurfaceDescriptor>,
) -> PopResult<BTreeMap<usize, SurfaceResult>> {
    let mut results = BTreeMap::new();
    let mut vt = Vector2::new(0.0, params.field.ut);
    let mut vs = Vector2::new(0.0, params.field.us);
    let mut cumulative_t = AbcdMatrix::default();
    let mut cumulative_s = AbcdMatrix::default();
    let mut wfo = Wavefront::new(
        params.pupil_diameter,
        params.wavelength,
        params.grid_size,
        params.zoom,
    )?;
    wfo.set_rayleigh_factor(params.rayleigh_factor)?;

    for (number, surface) in chain.iter().filter(|(_, s)| !s.ignore) {
        trace!("surface {number}: {}", surface.name);
        if let SurfaceKind::CoordinateBreak(cb) = &surface.kind {
            trace!("apply coordinate break");
            (vt, vs) = cb.apply(&vt, &vs)?;
        }
        let aperture = match &surface.aperture {
            Some(spec) => apply_aperture(&mut wfo, spec, &vt, &vs)?,
            None => None,
        };
        if surface.is_stop {
            trace!("apply stop");
            wfo.make_stop()?;
        }
        if let SurfaceKind::Zernike(spec) = &surface.kind {
            let radius = if spec.radius.is_finite() {
                spec.radius
            } else {
                wfo.wz_x().max(wfo.wz_y())
            };
            trace!("apply {} Zernike terms over radius {radius:.4e}", spec.index.len());
            wfo.zernikes(
                &spec.index,
                &spec.coefficients,
                spec.ordering,
                spec.normalize,
                radius,
                spec.offset,
                spec.origin,
            )?;
        }
        let mut result = SurfaceResult::snapshot(&wfo, aperture);

        let (abcd_s, abcd_t) = (&surface.abcd_s, &surface.abcd_t);
        let (mx, my) = (abcd_s.magnification(), abcd_t.magnification());
        if mx != 1.0 || my != 1.0 {
            trace!("apply magnification");
            wfo.magnification(my, mx)?;
        }
        let n1n2 = abcd_t.n1n2();
        trace!("n1n2: {n1n2:.4}");
        if n1n2.abs() != 1.0 {
            trace!("apply medium change");
            wfo.change_medium(n1n2)?;
        }
        let (fl_x, fl_y) = surface.focal_lengths();
        if fl_x.is_finite() || fl_y.is_finite() {
            trace!("apply lens");
            wfo.lens_xy(fl_x, fl_y)?;
        }
        let (t_x, t_y) = surface.thicknesses();
        if t_x.is_finite() && t_y.is_finite() && (t_x.abs() > MIN_THICKNESS || t_y.abs() > MIN_THICKNESS) {
            trace!("apply propagation thickness: {t_y:.4}");
            wfo.propagate(t_x, t_y)?;
        }
        vt = abcd_t.apply(&vt);
        vs = abcd_s.apply(&vs);
        cumulative_t = abcd_t * &cumulative_t;
        cumulative_s = abcd_s * &cumulative_s;
        debug!(
            "surface {number}: F num: {:.2}, distance to focus: {:.6}",
            result.fratio.1,
            wfo.tangential().distance_to_focus()
        );
        if surface.save {
            trace!("save surface {number}");
            result.abcd_s = cumulative_s;
            result.abcd_t = cumulative_t;
            results.insert(*number, result);
        }
    }
    Ok(results)
}
#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aperture::ApertureKind,
        error::PopError,
        surface::{ChainBuilder, SurfaceEntry, SurfaceType},
    };
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    fn pupil() -> SurfaceEntry {
        SurfaceEntry::new("pupil", SurfaceType::gap(0.0))
            .with_aperture(ApertureSpec::new("elliptical", ApertureKind::Aperture, 0.5, 0.5))
            .as_stop()
            .saved()
    }
    fn params() -> RunParameters {
        RunParameters::new(1.0, 3.0e-6, 64, 4)
    }
    #[test]
    fn parameters() {
        let p = params().with_field(FieldSlope::new(0.1, -0.2));
        assert_eq!(p.field.ut, 0.1);
        assert_eq!(p.field.us, -0.2);
        assert_eq!(p.rayleigh_factor, 2.0);
    }
    #[test]
    fn field_from_degrees() {
        let field = FieldSlope::from_degrees(0.0, 45.0);
        assert_relative_eq!(field.ut, 1.0, epsilon = 1e-12);
        assert_eq!(field.us, 0.0);
    }
    #[test]
    fn empty_chain() {
        assert!(run(&params(), &BTreeMap::new()).unwrap().is_empty());
    }
    #[test]
    fn wrong_parameters() {
        let p = RunParameters::new(1.0, 3.0e-6, 100, 4);
        assert_matches!(
            run(&p, &BTreeMap::new()),
            Err(PopError::InvalidParameter(_))
        );
    }
    #[test]
    fn stop_normalizes() {
        let chain = ChainBuilder::from_entries(&[pupil()]).unwrap();
        let results = run(&params(), &chain).unwrap();
        let result = &results[&1];
        assert_relative_eq!(result.field.energy(), 1.0, epsilon = 1e-12);
        assert!(result.aperture.is_some());
        assert_eq!(result.wavelength, 3.0e-6);
        assert_eq!(result.dx(), 4.0 / 64.0);
        assert_eq!(result.abcd_t, AbcdMatrix::default());
    }
    #[test]
    fn focus() {
        let chain = ChainBuilder::from_entries(&[
            pupil(),
            SurfaceEntry::new("lens", SurfaceType::paraxial_lens(1.0, 1.0)),
            SurfaceEntry::new("IMAGE_PLANE", SurfaceType::gap(0.0)).saved(),
        ])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        let image = &results[&3];
        assert_relative_eq!(image.distance_to_focus.0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(image.distance_to_focus.1, 0.0, epsilon = 1e-6);
        assert_relative_eq!(image.fratio.0, 1.0, max_relative = 1e-6);
        assert_relative_eq!(image.fratio.1, 1.0, max_relative = 1e-6);
        // focal plane sampling is lambda * F * D / (N * dx)
        assert_relative_eq!(image.dx(), 3.0e-6 / 4.0, max_relative = 1e-6);
        // cumulative matrix of lens and thickness images the pupil to infinity
        let m = image.abcd_t.matrix();
        assert_relative_eq!(m[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(m[(1, 0)], -1.0, epsilon = 1e-12);
        // energy is preserved by the propagation
        assert_relative_eq!(image.field.energy(), 1.0, max_relative = 1e-9);
        let amplitude = image.amplitude();
        let (row, col) = amplitude.iamax_full();
        assert_eq!((row, col), (32, 32));
        assert_eq!(image.peak_amplitude(), amplitude[(32, 32)]);
    }
    #[test]
    fn ignored_surface() {
        let chain = ChainBuilder::from_entries(&[
            pupil(),
            SurfaceEntry::new("lens", SurfaceType::paraxial_lens(1.0, 1.0)).ignored(),
            SurfaceEntry::new("end", SurfaceType::gap(0.0)).saved(),
        ])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        assert!(results[&3].fratio.1.is_infinite());
        assert_eq!(results[&3].abcd_t, AbcdMatrix::default());
    }
    #[test]
    fn off_axis_aperture_follows_chief_ray() {
        let slope = 0.01;
        let chain = ChainBuilder::from_entries(&[
            SurfaceEntry::new("start", SurfaceType::gap(10.0)),
            SurfaceEntry::new("aperture", SurfaceType::gap(0.0))
                .with_aperture(ApertureSpec::new("circular", ApertureKind::Aperture, 0.25, f64::NAN))
                .saved(),
        ])
        .unwrap();
        let results = run(&params().with_field(FieldSlope::new(0.0, slope)), &chain).unwrap();
        let aperture = results[&2].aperture.as_ref().unwrap();
        // centered on the chief ray
        assert_eq!(aperture.center(), (0.0, 0.0));
        let (r, _) = aperture.dimensions();
        assert_relative_eq!(r, 0.25 / (1.0 + slope * slope).sqrt(), epsilon = 1e-12);
    }
    #[test]
    fn fixed_aperture_offset() {
        let chain = ChainBuilder::from_entries(&[SurfaceEntry::new("aperture", SurfaceType::gap(0.0))
            .with_aperture(
                ApertureSpec::new("rectangular", ApertureKind::Aperture, 0.5, 0.25).with_center(0.1, -0.1),
            )
            .saved()])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        let aperture = results[&1].aperture.as_ref().unwrap();
        assert_eq!(aperture.center(), (0.1, -0.1));
        assert_eq!(aperture.dimensions(), (0.5, 0.25));
    }
    #[test]
    fn aperture_without_radius_is_skipped() {
        let chain = ChainBuilder::from_entries(&[SurfaceEntry::new("aperture", SurfaceType::gap(0.0))
            .with_aperture(ApertureSpec::new("elliptical", ApertureKind::Aperture, 0.5, f64::NAN))
            .saved()])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        assert!(results[&1].aperture.is_none());
    }
    #[test]
    fn zernike_default_radius() {
        let chain = ChainBuilder::from_entries(&[
            pupil(),
            SurfaceEntry::new(
                "tilt",
                SurfaceType::Zernike {
                    wavelength: 3.0e-6,
                    coefficients: vec![0.0, 0.25],
                    index: None,
                    ordering: "ansi".into(),
                    normalize: false,
                    radius: None,
                    offset: 0.0,
                    origin: "x".into(),
                },
            )
            .saved(),
        ])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        let phase = results[&2].phase();
        // ANSI index 1 is the y tilt: a quarter wave at the pupil edge
        let edge = phase[(32 + 7, 32)];
        assert_relative_eq!(edge, 2.0 * std::f64::consts::PI * 0.25 * 7.0 / 8.0, epsilon = 1e-9);
        assert_relative_eq!(phase[(32, 32 + 7)], 0.0, epsilon = 1e-12);
    }
    #[test]
    fn mirror_focus() {
        let chain = ChainBuilder::from_entries(&[
            pupil(),
            SurfaceEntry::new("M1", SurfaceType::mirror(-2.0, -1.0)),
            SurfaceEntry::new("focus", SurfaceType::gap(0.0)).saved(),
        ])
        .unwrap();
        let results = run(&params(), &chain).unwrap();
        assert_relative_eq!(results[&3].distance_to_focus.1, 0.0, epsilon = 1e-6);
        assert_relative_eq!(results[&3].fratio.1, 1.0, max_relative = 1e-6);
    }
}
