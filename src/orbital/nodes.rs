use nalgebra::Vector3;

use super::anomaly::{time_to_true_anomaly, wrap_degrees};
use super::elements::{plane_normal, OrbitState};
use crate::error::{GuidanceError, Result};

// Below this |n_a x n_b| the planes count as coincident (~0.0006 deg).
const COINCIDENT_PLANES: f64 = 1e-5;

/// Geocentric latitude and longitude of a direction, degrees.
/// Longitude is wrapped into `[0, 360)`.
pub fn lat_lon_of_vector(v: &Vector3<f64>) -> (f64, f64) {
    let lat = v.z.atan2((v.x * v.x + v.y * v.y).sqrt()).to_degrees();
    let lon = wrap_degrees(v.y.atan2(v.x).to_degrees());
    (lat, lon)
}

/// True anomaly on `a` of its ascending node relative to the plane of `b`.
///
/// The line of nodes is `n_b x n_a`. Its latitude/longitude are turned back
/// into an argument of latitude on `a`, then into a true anomaly with `a`'s
/// argument of periapsis.
pub fn find_relative_node(a: &OrbitState, b: &OrbitState) -> Result<f64> {
    a.validate()?;
    b.validate()?;

    let node = plane_normal(b.inclination, b.lan).cross(&plane_normal(a.inclination, a.lan));
    if node.norm() < COINCIDENT_PLANES {
        return Err(GuidanceError::DegenerateGeometry { what: "orbit planes coincide" });
    }

    let (lat, lon) = lat_lon_of_vector(&node);
    let alpha = (lon - a.lan).to_radians();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_inc, cos_inc) = a.inclination.to_radians().sin_cos();

    // Direction in a's node frame: (cos u, sin u cos i, sin u sin i).
    let cos_u = cos_lat * alpha.cos();
    let sin_u = cos_lat * alpha.sin() * cos_inc + sin_lat * sin_inc;
    let arg_latitude = sin_u.atan2(cos_u).to_degrees();

    Ok(wrap_degrees(arg_latitude - a.arg_periapsis))
}

/// The node opposite `ascending`.
pub fn descending_node(ascending: f64) -> Result<f64> {
    if !ascending.is_finite() {
        return Err(GuidanceError::invalid_orbit("non-finite node anomaly"));
    }
    Ok(wrap_degrees(ascending - 180.0))
}

/// Seconds until `a` crosses the plane of `b` heading north relative to it.
pub fn time_to_relative_an(a: &OrbitState, b: &OrbitState) -> Result<f64> {
    time_to_true_anomaly(a, find_relative_node(a, b)?)
}

/// Seconds until `a` crosses the plane of `b` heading south relative to it.
pub fn time_to_relative_dn(a: &OrbitState, b: &OrbitState) -> Result<f64> {
    time_to_true_anomaly(a, descending_node(find_relative_node(a, b)?)?)
}

/// Seconds until the ascending node on the reference plane.
pub fn time_to_reference_an(orbit: &OrbitState) -> Result<f64> {
    time_to_true_anomaly(orbit, wrap_degrees(360.0 - orbit.arg_periapsis))
}

/// Seconds until the descending node on the reference plane.
pub fn time_to_reference_dn(orbit: &OrbitState) -> Result<f64> {
    time_to_true_anomaly(orbit, wrap_degrees(180.0 - orbit.arg_periapsis))
}

/// Unsigned angle between the two orbit planes, degrees.
pub fn relative_plane_angle(a: &OrbitState, b: &OrbitState) -> f64 {
    a.normal().angle(&b.normal()).to_degrees()
}
