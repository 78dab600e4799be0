use log::debug;

use crate::error::Result;
use crate::orbital::{descending_node, find_relative_node, time_to_true_anomaly, OrbitState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Ascending,
    Descending,
}

/// Node timing of the ship's orbit against the target's plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneAlignment {
    pub time_to_an: f64, // s
    pub time_to_dn: f64, // s
    /// `target.inclination - ship.inclination`, degrees. The sign picks the
    /// burn direction.
    pub relative_inclination: f64,
}

impl PlaneAlignment {
    pub fn compute(ship: &OrbitState, target: &OrbitState) -> Result<Self> {
        let an = find_relative_node(ship, target)?;
        Ok(PlaneAlignment {
            time_to_an: time_to_true_anomaly(ship, an)?,
            time_to_dn: time_to_true_anomaly(ship, descending_node(an)?)?,
            relative_inclination: relative_inclination(ship, target),
        })
    }

    /// The node reached first and the time until it. The descending node
    /// wins a tie.
    pub fn sooner_node(&self) -> (NodeKind, f64) {
        if self.time_to_an < self.time_to_dn {
            (NodeKind::Ascending, self.time_to_an)
        } else {
            (NodeKind::Descending, self.time_to_dn)
        }
    }
}

/// Signed inclination difference, degrees.
pub fn relative_inclination(ship: &OrbitState, target: &OrbitState) -> f64 {
    target.inclination - ship.inclination
}

/// Keeps the most recent valid [`PlaneAlignment`] for display and for the
/// autopilot.
#[derive(Debug, Clone, Default)]
pub struct PlaneAligner {
    last: Option<PlaneAlignment>,
}

impl PlaneAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alignment(&self) -> Option<&PlaneAlignment> {
        self.last.as_ref()
    }

    /// Recompute; on failure the previous alignment is kept.
    pub fn update(&mut self, ship: &OrbitState, target: &OrbitState) -> Option<&PlaneAlignment> {
        match PlaneAlignment::compute(ship, target) {
            Ok(alignment) => self.last = Some(alignment),
            Err(err) => debug!("plane alignment skipped: {err}"),
        }
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::BodyId;
    use approx::assert_abs_diff_eq;

    const MU: f64 = 3.5316e12;

    fn orbit(inc: f64, lan: f64, nu: f64) -> OrbitState {
        OrbitState::circular(BodyId(1), 700_000.0, inc, lan, nu, MU).unwrap()
    }

    #[test]
    fn relative_inclination_is_signed() {
        let ship = orbit(10.0, 0.0, 0.0);
        let target = orbit(4.0, 30.0, 0.0);
        let a = PlaneAlignment::compute(&ship, &target).unwrap();
        assert_abs_diff_eq!(a.relative_inclination, -6.0, epsilon = 1e-12);
        let b = PlaneAlignment::compute(&target, &ship).unwrap();
        assert_abs_diff_eq!(b.relative_inclination, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn node_times_are_half_a_period_apart() {
        let ship = orbit(5.0, 0.0, 100.0);
        let target = orbit(0.0, 0.0, 0.0);
        let a = PlaneAlignment::compute(&ship, &target).unwrap();
        // Ship AN against the equator is at u = 0: 260 deg ahead.
        assert_abs_diff_eq!(a.time_to_an, ship.period * 260.0 / 360.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.time_to_dn, ship.period * 80.0 / 360.0, epsilon = 1e-6);
        assert_eq!(a.sooner_node().0, NodeKind::Descending);
    }

    #[test]
    fn aligner_holds_last_value_when_planes_coincide() {
        let ship = orbit(5.0, 0.0, 100.0);
        let target = orbit(0.0, 0.0, 0.0);
        let mut aligner = PlaneAligner::new();
        let good = *aligner.update(&ship, &target).unwrap();

        let same_plane = orbit(5.0, 0.0, 10.0);
        let held = *aligner.update(&ship, &same_plane).unwrap();
        assert_eq!(held, good);
    }

    #[test]
    fn aligner_starts_empty() {
        let mut aligner = PlaneAligner::new();
        let ship = orbit(5.0, 0.0, 0.0);
        assert!(aligner.update(&ship, &ship).is_none());
    }
}
