#![warn(missing_docs)]
//! Coordinate break of a paraxial ray
//!
//! A coordinate break decenters and tilts the local coordinate system of the optical chain. The paraxial rays
//! of the tangential (`y`) and sagittal (`x`) plane are transformed into the new coordinate system and
//! re-intersected with its `z = 0` plane.
use nalgebra::{Rotation3, Vector2, Vector3};

use crate::error::{PopError, PopResult};

/// Decenter and tilt parameters of a coordinate break.
///
/// Angles are in degrees, decenters in meters. Non-finite values are treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct CoordinateBreak {
    /// decenter along x
    pub xdec: f64,
    /// decenter along y
    pub ydec: f64,
    /// tilt around the x axis in degrees
    pub xrot: f64,
    /// tilt around the y axis in degrees
    pub yrot: f64,
    /// tilt around the z axis in degrees
    pub zrot: f64,
    /// order of decenter and tilt. Only `0` (decenter first) is supported
    pub order: i32,
}
impl CoordinateBreak {
    /// Transform the tangential ray `vt = (y, ut)` and the sagittal ray `vs = (x, us)`.
    ///
    /// Returns the new `(vt, vs)` pair.
    ///
    /// # Errors
    ///
    /// This function will return an error if `order` is not zero.
    pub fn apply(
        &self,
        vt: &Vector2<f64>,
        vs: &Vector2<f64>,
    ) -> PopResult<(Vector2<f64>, Vector2<f64>)> {
        coordinate_break(
            vt, vs, self.xdec, self.ydec, self.xrot, self.yrot, self.zrot, self.order,
        )
    }
}
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
/// Transform a tangential ray `vt = (y, ut)` and a sagittal ray `vs = (x, us)` through a decenter followed by a
/// rotation `Rx·Ry·Rz`.
///
/// The transformed ray directions are normalized to unit z component and the positions are projected back onto the
/// `z = 0` plane of the new coordinate system.
///
/// # Errors
///
/// This function will return an error if `order` is not zero.
#[allow(clippy::too_many_arguments)]
pub fn coordinate_break(
    vt: &Vector2<f64>,
    vs: &Vector2<f64>,
    xdec: f64,
    ydec: f64,
    xrot: f64,
    yrot: f64,
    zrot: f64,
    order: i32,
) -> PopResult<(Vector2<f64>, Vector2<f64>)> {
    if order != 0 {
        return Err(PopError::UnsupportedOrder(format!(
            "coordinate break order {order} not implemented"
        )));
    }
    let xdec = finite_or_zero(xdec);
    let ydec = finite_or_zero(ydec);
    let xrot = finite_or_zero(xrot).to_radians();
    let yrot = finite_or_zero(yrot).to_radians();
    let zrot = finite_or_zero(zrot).to_radians();

    let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), xrot)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), yrot)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), zrot);
    let inverse = rotation.inverse();

    let r0 = Vector3::new(vs[0] - xdec, vt[0] - ydec, 0.0);
    let n0 = Vector3::new(vs[1], vt[1], 1.0);

    let n1 = inverse * n0;
    let n1 = n1 / n1.z;
    let r1 = inverse * r0;
    let r1 = r1 - n1 * r1.z;

    Ok((Vector2::new(r1.y, n1.y), Vector2::new(r1.x, n1.x)))
}
#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn identity() {
        let vt = Vector2::new(0.1, 0.01);
        let vs = Vector2::new(-0.2, 0.02);
        let (t, s) = coordinate_break(&vt, &vs, 0.0, 0.0, 0.0, 0.0, 0.0, 0).unwrap();
        assert_relative_eq!(t, vt);
        assert_relative_eq!(s, vs);
    }
    #[test]
    fn non_finite_is_zero() {
        let vt = Vector2::new(0.1, 0.01);
        let vs = Vector2::new(-0.2, 0.02);
        let (t, s) =
            coordinate_break(&vt, &vs, f64::NAN, f64::INFINITY, f64::NAN, f64::NEG_INFINITY, f64::NAN, 0)
                .unwrap();
        assert_relative_eq!(t, vt);
        assert_relative_eq!(s, vs);
    }
    #[test]
    fn pure_decenter() {
        let vt = Vector2::new(0.0, 0.0);
        let vs = Vector2::new(0.0, 0.01);
        let (t, s) = coordinate_break(&vt, &vs, 0.5, -0.25, 0.0, 0.0, 0.0, 0).unwrap();
        assert_relative_eq!(t, Vector2::new(0.25, 0.0));
        assert_relative_eq!(s, Vector2::new(-0.5, 0.01));
    }
    #[test]
    fn tilt_x() {
        // an on-axis ray seen from a coordinate system tilted by 10 degrees around x
        let vt = Vector2::new(0.0, 0.0);
        let vs = Vector2::new(0.0, 0.0);
        let (t, s) = coordinate_break(&vt, &vs, 0.0, 0.0, 10.0, 0.0, 0.0, 0).unwrap();
        assert_relative_eq!(t[0], 0.0);
        assert_relative_eq!(t[1].abs(), 10.0_f64.to_radians().tan(), epsilon = 1e-12);
        assert_relative_eq!(s, Vector2::new(0.0, 0.0));
    }
    #[test]
    fn tilt_compensates_slope() {
        let slope = 5.0_f64.to_radians().tan();
        let vt = Vector2::new(0.0, slope);
        let vs = Vector2::new(0.0, 0.0);
        let (t_plus, _) = coordinate_break(&vt, &vs, 0.0, 0.0, 5.0, 0.0, 0.0, 0).unwrap();
        let (t_minus, _) = coordinate_break(&vt, &vs, 0.0, 0.0, -5.0, 0.0, 0.0, 0).unwrap();
        // one of the two tilts aligns the new axis with the ray
        let aligned = t_plus[1].abs().min(t_minus[1].abs());
        assert_relative_eq!(aligned, 0.0, epsilon = 1e-12);
    }
    #[test]
    fn z_rotation_swaps_planes() {
        let vt = Vector2::new(0.0, 0.0);
        let vs = Vector2::new(0.1, 0.0);
        let (t, s) = coordinate_break(&vt, &vs, 0.0, 0.0, 0.0, 0.0, 90.0, 0).unwrap();
        assert_relative_eq!(t[0].abs(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(s[0], 0.0, epsilon = 1e-12);
    }
    #[test]
    fn unsupported_order() {
        let v = Vector2::new(0.0, 0.0);
        assert_matches!(
            coordinate_break(&v, &v, 0.0, 0.0, 0.0, 0.0, 0.0, 1),
            Err(PopError::UnsupportedOrder(_))
        );
    }
    #[test]
    fn struct_apply() {
        let cb = CoordinateBreak {
            ydec: 0.1,
            ..Default::default()
        };
        let (t, s) = cb
            .apply(&Vector2::new(0.0, 0.0), &Vector2::new(0.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, Vector2::new(-0.1, 0.0));
        assert_relative_eq!(s, Vector2::new(0.0, 0.0));
    }
}
