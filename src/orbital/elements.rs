use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use super::anomaly::{eccentric_anomaly_from_true, mean_anomaly_from_eccentric, wrap_degrees};
use crate::error::{GuidanceError, Result};
use crate::vehicle::BodyId;

const SMALL: f64 = 1e-10;

/// Immutable two-body orbit snapshot as refreshed by the host every tick.
///
/// Angles are in degrees, except `mean_anomaly` which is in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub semi_major_axis: f64,   // m
    pub eccentricity: f64,      // [0, 1)
    pub inclination: f64,       // deg
    pub arg_periapsis: f64,     // deg
    pub lan: f64,               // deg, longitude of ascending node
    pub period: f64,            // s
    pub time_to_periapsis: f64, // s
    pub true_anomaly: f64,      // deg
    pub mean_anomaly: f64,      // rad
    pub reference_body: BodyId,
}

impl OrbitState {
    /// Build a snapshot from classical elements, deriving period, mean anomaly
    /// and time to periapsis. `mu` is the body's gravitational parameter.
    #[allow(clippy::too_many_arguments)]
    pub fn from_elements(
        reference_body: BodyId,
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        lan: f64,
        arg_periapsis: f64,
        true_anomaly: f64,
        mu: f64,
    ) -> Result<Self> {
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(GuidanceError::invalid_orbit(format!(
                "eccentricity {eccentricity} outside [0, 1)"
            )));
        }
        if !(semi_major_axis > 0.0 && mu > 0.0) {
            return Err(GuidanceError::invalid_orbit("non-positive semi-major axis or mu"));
        }
        let period = TAU * (semi_major_axis.powi(3) / mu).sqrt();
        let true_anomaly = wrap_degrees(true_anomaly);
        let ecc_anom = eccentric_anomaly_from_true(eccentricity, true_anomaly)?;
        let mean_anomaly = mean_anomaly_from_eccentric(eccentricity, ecc_anom);
        let since_pe = mean_anomaly * period / TAU;

        let orbit = OrbitState {
            semi_major_axis,
            eccentricity,
            inclination,
            arg_periapsis: wrap_degrees(arg_periapsis),
            lan: wrap_degrees(lan),
            period,
            time_to_periapsis: (period - since_pe).rem_euclid(period),
            true_anomaly,
            mean_anomaly,
            reference_body,
        };
        orbit.validate()?;
        Ok(orbit)
    }

    /// Circular orbit of radius `radius`, phased at `true_anomaly` degrees past the node.
    pub fn circular(
        reference_body: BodyId,
        radius: f64,
        inclination: f64,
        lan: f64,
        true_anomaly: f64,
        mu: f64,
    ) -> Result<Self> {
        Self::from_elements(reference_body, radius, 0.0, inclination, lan, 0.0, true_anomaly, mu)
    }

    /// Reject orbits the anomaly math cannot handle.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            self.semi_major_axis,
            self.eccentricity,
            self.inclination,
            self.arg_periapsis,
            self.lan,
            self.period,
            self.time_to_periapsis,
            self.true_anomaly,
            self.mean_anomaly,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(GuidanceError::invalid_orbit("non-finite orbital element"));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(GuidanceError::invalid_orbit(format!(
                "eccentricity {} outside [0, 1)",
                self.eccentricity
            )));
        }
        if self.period <= 0.0 {
            return Err(GuidanceError::invalid_orbit("non-positive period"));
        }
        Ok(())
    }

    /// Mean motion, rad/s.
    pub fn mean_motion(&self) -> f64 {
        TAU / self.period
    }

    /// Unit orbit normal (angular momentum direction) in the reference frame.
    pub fn normal(&self) -> Vector3<f64> {
        plane_normal(self.inclination, self.lan)
    }

    /// Position and velocity in the body-centred inertial frame at the
    /// current true anomaly.
    pub fn state_vector(&self, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        let nu = self.true_anomaly.to_radians();
        let p = self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity); // semi-latus rectum
        let r_pqw = p / (1.0 + self.eccentricity * nu.cos());

        // Perifocal frame (PQW)
        let r_pqw_vec = Vector3::new(r_pqw * nu.cos(), r_pqw * nu.sin(), 0.0);
        let sqrt_mu_p = (mu / p).sqrt();
        let v_pqw_vec = Vector3::new(
            -sqrt_mu_p * nu.sin(),
            sqrt_mu_p * (self.eccentricity + nu.cos()),
            0.0,
        );

        let (sin_raan, cos_raan) = self.lan.to_radians().sin_cos();
        let (sin_argp, cos_argp) = self.arg_periapsis.to_radians().sin_cos();
        let (sin_inc, cos_inc) = self.inclination.to_radians().sin_cos();

        let rot = |v: &Vector3<f64>| -> Vector3<f64> {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y,
                (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y,
            )
        };

        (rot(&r_pqw_vec), rot(&v_pqw_vec))
    }

    /// Recover a snapshot from a body-centred state vector.
    ///
    /// Circular orbits measure true anomaly from the ascending node, and
    /// equatorial ones measure longitudes from the reference direction.
    pub fn from_state_vector(
        reference_body: BodyId,
        pos: &Vector3<f64>,
        vel: &Vector3<f64>,
        mu: f64,
    ) -> Result<Self> {
        let r = pos.norm();
        let v = vel.norm();
        if r < SMALL {
            return Err(GuidanceError::DegenerateGeometry { what: "zero position vector" });
        }

        let h = pos.cross(vel);
        let h_mag = h.norm();
        if h_mag < SMALL {
            return Err(GuidanceError::invalid_orbit("radial trajectory has no orbit plane"));
        }

        // Node vector
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();
        if ecc >= 1.0 {
            return Err(GuidanceError::invalid_orbit(format!("eccentricity {ecc} is not elliptic")));
        }

        let energy = 0.5 * v * v - mu / r;
        let sma = -mu / (2.0 * energy);

        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();
        let equatorial = n_mag < SMALL * h_mag;
        let circular = ecc < SMALL;

        let raan = if equatorial { 0.0 } else { n.y.atan2(n.x) };

        let argp = match (circular, equatorial) {
            (true, _) => 0.0,
            (false, true) => e_vec.y.atan2(e_vec.x),
            (false, false) => angle_in_plane(&n, &e_vec, &h),
        };

        let true_anom = match (circular, equatorial) {
            (false, _) => angle_in_plane(&e_vec, pos, &h),
            (true, false) => angle_in_plane(&n, pos, &h),
            (true, true) => pos.y.atan2(pos.x),
        };

        Self::from_elements(
            reference_body,
            sma,
            ecc,
            inc.to_degrees(),
            raan.to_degrees(),
            argp.to_degrees(),
            true_anom.to_degrees(),
            mu,
        )
    }

    /// Advance the snapshot `dt` seconds along the unperturbed Keplerian orbit.
    pub fn propagate(&self, dt: f64) -> Result<Self> {
        self.validate()?;
        let mean = (self.mean_anomaly + self.mean_motion() * dt).rem_euclid(TAU);
        let ecc_anom = solve_kepler(mean, self.eccentricity);
        let e = self.eccentricity;
        let nu = 2.0
            * ((1.0 + e).sqrt() * (ecc_anom / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (ecc_anom / 2.0).cos());
        let since_pe = mean / self.mean_motion();

        Ok(OrbitState {
            true_anomaly: wrap_degrees(nu.to_degrees()),
            mean_anomaly: mean,
            time_to_periapsis: (self.period - since_pe).rem_euclid(self.period),
            ..*self
        })
    }
}

/// Unit normal of a plane given its inclination and ascending node, degrees.
pub fn plane_normal(inclination: f64, lan: f64) -> Vector3<f64> {
    let (sin_i, cos_i) = inclination.to_radians().sin_cos();
    let (sin_l, cos_l) = lan.to_radians().sin_cos();
    Vector3::new(sin_i * sin_l, -sin_i * cos_l, cos_i)
}

/// Signed angle from `from` to `to` about `axis`, in [-PI, PI].
fn angle_in_plane(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let cross = from.cross(to);
    let sin = cross.dot(&axis.normalize());
    sin.atan2(from.dot(to))
}

/// Newton iteration on Kepler's equation, only used to move the host's
/// vehicles forward; the guidance math itself never iterates.
fn solve_kepler(mean: f64, e: f64) -> f64 {
    let mut ecc_anom = if e > 0.8 { PI } else { mean };
    for _ in 0..50 {
        let f = ecc_anom - e * ecc_anom.sin() - mean;
        let step = f / (1.0 - e * ecc_anom.cos());
        ecc_anom -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    ecc_anom
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const MU: f64 = 3.5316e12; // Kerbin-sized body
    const BODY: BodyId = BodyId(1);

    #[test]
    fn circular_orbit_period() {
        let orbit = OrbitState::circular(BODY, 700_000.0, 0.0, 0.0, 0.0, MU).unwrap();
        let expected = TAU * (700_000.0_f64.powi(3) / MU).sqrt();
        assert_abs_diff_eq!(orbit.period, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(orbit.mean_anomaly, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn hyperbolic_orbit_rejected() {
        let err = OrbitState::from_elements(BODY, 700_000.0, 1.2, 0.0, 0.0, 0.0, 0.0, MU).unwrap_err();
        assert!(matches!(err, GuidanceError::InvalidOrbit { .. }));
    }

    #[test]
    fn nan_element_fails_validation() {
        let mut orbit = OrbitState::circular(BODY, 700_000.0, 10.0, 0.0, 0.0, MU).unwrap();
        orbit.lan = f64::NAN;
        assert!(orbit.validate().is_err());
    }

    #[test]
    fn state_vector_roundtrip_inclined() {
        let orbit =
            OrbitState::from_elements(BODY, 800_000.0, 0.1, 28.0, 40.0, 15.0, 120.0, MU).unwrap();
        let (pos, vel) = orbit.state_vector(MU);
        let recovered = OrbitState::from_state_vector(BODY, &pos, &vel, MU).unwrap();
        assert_abs_diff_eq!(recovered.semi_major_axis, orbit.semi_major_axis, epsilon = 1e-3);
        assert_abs_diff_eq!(recovered.eccentricity, orbit.eccentricity, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.inclination, orbit.inclination, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.lan, orbit.lan, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.arg_periapsis, orbit.arg_periapsis, epsilon = 1e-7);
        assert_abs_diff_eq!(recovered.true_anomaly, orbit.true_anomaly, epsilon = 1e-7);
    }

    #[test]
    fn circular_state_vector_keeps_phase() {
        let orbit = OrbitState::circular(BODY, 700_000.0, 5.0, 30.0, 75.0, MU).unwrap();
        let (pos, vel) = orbit.state_vector(MU);
        let recovered = OrbitState::from_state_vector(BODY, &pos, &vel, MU).unwrap();
        assert_abs_diff_eq!(recovered.true_anomaly, 75.0, epsilon = 1e-6);
    }

    #[test]
    fn propagate_full_period_returns_home() {
        let orbit =
            OrbitState::from_elements(BODY, 900_000.0, 0.2, 10.0, 0.0, 30.0, 45.0, MU).unwrap();
        let later = orbit.propagate(orbit.period).unwrap();
        assert_abs_diff_eq!(later.true_anomaly, orbit.true_anomaly, epsilon = 1e-6);
        let half = orbit.propagate(orbit.period / 2.0).unwrap();
        assert_abs_diff_eq!(
            half.time_to_periapsis,
            (orbit.time_to_periapsis + orbit.period / 2.0).rem_euclid(orbit.period),
            epsilon = 1e-6
        );
    }

    #[test]
    fn normal_of_equatorial_plane_is_up() {
        let n = plane_normal(0.0, 123.0);
        assert_abs_diff_eq!(n.z, 1.0, epsilon = 1e-12);
    }
}
