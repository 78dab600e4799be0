//! Anomaly conversions and time-to-event along a closed orbit.
//!
//! Every angle that gets combined with another goes through [`wrap_degrees`];
//! nothing in the crate wraps angles by hand.

use std::f64::consts::{PI, TAU};

use super::elements::OrbitState;
use crate::error::{GuidanceError, Result};

const NOW_TOLERANCE: f64 = 1e-12;

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(x: f64) -> f64 {
    let wrapped = x.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest-path form of an angle in degrees, in `(-180, 180]`.
pub fn signed_degrees(x: f64) -> f64 {
    let wrapped = wrap_degrees(x);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

fn check_eccentricity(e: f64) -> Result<()> {
    if e.is_finite() && (0.0..1.0).contains(&e) {
        Ok(())
    } else {
        Err(GuidanceError::invalid_orbit(format!("eccentricity {e} outside [0, 1)")))
    }
}

/// Eccentric anomaly (radians, `[0, 2π)`) at a true anomaly given in degrees.
///
/// Closed-form half-angle relation. Apoapsis maps to exactly π, and the
/// second half of the orbit is the reflection of the first.
pub fn eccentric_anomaly_from_true(e: f64, true_anomaly: f64) -> Result<f64> {
    check_eccentricity(e)?;
    if !true_anomaly.is_finite() {
        return Err(GuidanceError::invalid_orbit("non-finite true anomaly"));
    }

    let nu = wrap_degrees(true_anomaly);
    if nu == 180.0 {
        return Ok(PI);
    }
    if nu > 180.0 {
        return Ok(TAU - half_orbit_eccentric(e, 360.0 - nu));
    }
    Ok(half_orbit_eccentric(e, nu))
}

// nu in [0, 180): the result lands in [0, π).
fn half_orbit_eccentric(e: f64, nu_deg: f64) -> f64 {
    let half = nu_deg.to_radians() / 2.0;
    2.0 * ((1.0 - e).sqrt() * half.sin()).atan2((1.0 + e).sqrt() * half.cos())
}

/// Kepler's equation, `M = E - e sin E`.
pub fn mean_anomaly_from_eccentric(e: f64, eccentric_anomaly: f64) -> f64 {
    eccentric_anomaly - e * eccentric_anomaly.sin()
}

/// Time since periapsis at which the orbit reaches mean anomaly `mean` (radians).
pub fn time_from_mean(period: f64, mean: f64) -> f64 {
    mean * period / TAU
}

/// Seconds from now until `orbit` next reaches mean anomaly `mean`, in `[0, period)`.
///
/// "Now" is `period - time_to_periapsis` after the last periapsis; an event
/// earlier in the current revolution wraps into the next one.
pub fn time_to_mean_anomaly(orbit: &OrbitState, mean: f64) -> Result<f64> {
    orbit.validate()?;
    if !mean.is_finite() {
        return Err(GuidanceError::invalid_orbit("non-finite mean anomaly"));
    }
    let period = orbit.period;
    let target = time_from_mean(period, mean.rem_euclid(TAU));
    let now = period - orbit.time_to_periapsis;

    let remaining = (target - now).rem_euclid(period);
    // An event happening right now must not read as a full revolution away.
    if period - remaining <= NOW_TOLERANCE * period {
        return Ok(0.0);
    }
    Ok(remaining)
}

/// Seconds from now until `orbit` next reaches `true_anomaly` degrees, in `[0, period)`.
pub fn time_to_true_anomaly(orbit: &OrbitState, true_anomaly: f64) -> Result<f64> {
    orbit.validate()?;
    let ecc_anom = eccentric_anomaly_from_true(orbit.eccentricity, true_anomaly)?;
    let mean = mean_anomaly_from_eccentric(orbit.eccentricity, ecc_anom);
    time_to_mean_anomaly(orbit, mean)
}

/// Map a true anomaly on `from` to the true anomaly on `to` that points in the
/// same inertial direction (same argument of longitude).
///
/// Both orbits should share a reference body.
pub fn translate_anomaly(from: &OrbitState, to: &OrbitState, anomaly: f64) -> Result<f64> {
    let longitude = anomaly + from.arg_periapsis + from.lan - to.arg_periapsis - to.lan;
    if !longitude.is_finite() {
        return Err(GuidanceError::invalid_orbit("non-finite anomaly or plane orientation"));
    }
    Ok(wrap_degrees(longitude))
}
