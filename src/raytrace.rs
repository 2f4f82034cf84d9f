//! Diagnostic paraxial ray trace
use std::collections::BTreeMap;

use log::debug;
use nalgebra::Vector2;

use crate::{
    error::PopResult,
    run::FieldSlope,
    surface::{SurfaceDescriptor, SurfaceKind},
};

/// Trace a paraxial ray starting at `(x, y)` with the slopes of `field` through the given chain.
///
/// Returns one line per surface listing the ray position (in mm) and slope in the tangential and sagittal planes
/// behind the surface.
///
/// # Errors
///
/// This function will return an error if a coordinate break cannot be applied.
pub fn raytrace(
    field: &FieldSlope,
    chain: &BTreeMap<usize, SurfaceDescriptor>,
    x: f64,
    y: f64,
) -> PopResult<Vec<String>> {
    let mut vt = Vector2::new(y, field.ut);
    let mut vs = Vector2::new(x, field.us);
    let mut lines = Vec::with_capacity(chain.len());
    for (number, surface) in chain {
        if let SurfaceKind::CoordinateBreak(cb) = &surface.kind {
            (vt, vs) = cb.apply(&vt, &vs)?;
        }
        vt = surface.abcd_t.apply(&vt);
        vs = surface.abcd_s.apply(&vs);
        let line = format!(
            "S{number:02} - {:15} y:{:7.3}mm ut:{:10.3e} rad x:{:7.3}mm us:{:10.3e} rad",
            surface.name,
            1000.0 * vt[0],
            vt[1],
            1000.0 * vs[0],
            vs[1]
        );
        debug!("{line}");
        lines.push(line);
    }
    Ok(lines)
}
