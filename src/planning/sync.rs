use std::fmt;

use log::debug;
use serde::Deserialize;

use crate::error::Result;
use crate::orbital::{time_to_true_anomaly, translate_anomaly, OrbitState};

/// Number of future revolutions searched for the closest approach.
pub const SYNC_ORBITS: usize = 4;

/// Which orbital point the ship and target should reach together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    #[default]
    TargetPeriapsis,
    TargetApoapsis,
    ShipPeriapsis,
    ShipApoapsis,
}

impl SyncMode {
    /// Cycle to the following mode, wrapping around.
    pub fn next(self) -> Self {
        match self {
            SyncMode::TargetPeriapsis => SyncMode::TargetApoapsis,
            SyncMode::TargetApoapsis => SyncMode::ShipPeriapsis,
            SyncMode::ShipPeriapsis => SyncMode::ShipApoapsis,
            SyncMode::ShipApoapsis => SyncMode::TargetPeriapsis,
        }
    }

    /// Rendezvous point as a true anomaly on the ship's orbit, degrees.
    pub fn rendezvous_anomaly(self, ship: &OrbitState, target: &OrbitState) -> Result<f64> {
        match self {
            SyncMode::ShipPeriapsis => Ok(0.0),
            SyncMode::ShipApoapsis => Ok(180.0),
            SyncMode::TargetPeriapsis => translate_anomaly(target, ship, 0.0),
            SyncMode::TargetApoapsis => translate_anomaly(target, ship, 180.0),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncMode::TargetPeriapsis => "Target Pe",
            SyncMode::TargetApoapsis => "Target Ap",
            SyncMode::ShipPeriapsis => "Ship Pe",
            SyncMode::ShipApoapsis => "Ship Ap",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Prediction table
// ---------------------------------------------------------------------------

/// Arrival times of ship and target at the rendezvous point over the next
/// [`SYNC_ORBITS`] revolutions, and the revolution where they line up best.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPrediction {
    pub rendezvous_anomaly: f64, // deg, ship frame
    pub ship_times: [f64; SYNC_ORBITS],
    pub target_times: [f64; SYNC_ORBITS],
    pub closest_orbit: usize,
    /// |ship - target| arrival gap on `closest_orbit`, s.
    pub min_delta: f64,
}

impl SyncPrediction {
    pub fn delta(&self, orbit: usize) -> f64 {
        (self.ship_times[orbit] - self.target_times[orbit]).abs()
    }
}

impl fmt::Display for SyncPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:>5}  {:>10}  {:>10}", "Orbit", "ShipToR", "TgtToR")?;
        for i in 0..SYNC_ORBITS {
            writeln!(f, "  {:>5}  {:>10.0}  {:>10.0}", i, self.ship_times[i], self.target_times[i])?;
        }
        writeln!(f, "  Closest approach on orbit {}", self.closest_orbit)?;
        write!(f, "  Min separation (s): {:.1}", self.min_delta)
    }
}

/// Compute the prediction table for one rendezvous point.
pub fn predict(ship: &OrbitState, target: &OrbitState, mode: SyncMode) -> Result<SyncPrediction> {
    let anomaly = mode.rendezvous_anomaly(ship, target)?;
    let ship_base = time_to_true_anomaly(ship, anomaly)?;
    let target_base = time_to_true_anomaly(target, translate_anomaly(ship, target, anomaly)?)?;

    let mut ship_times = [0.0; SYNC_ORBITS];
    let mut target_times = [0.0; SYNC_ORBITS];
    for i in 0..SYNC_ORBITS {
        let revs = i as f64;
        ship_times[i] = ship_base + ship.period * revs;
        target_times[i] = target_base + target.period * revs;
    }

    let mut closest_orbit = 0;
    let mut min_delta = (ship_times[0] - target_times[0]).abs();
    for i in 1..SYNC_ORBITS {
        let delta = (ship_times[i] - target_times[i]).abs();
        // Strict: ties keep the earlier revolution.
        if delta < min_delta {
            min_delta = delta;
            closest_orbit = i;
        }
    }

    Ok(SyncPrediction {
        rendezvous_anomaly: anomaly,
        ship_times,
        target_times,
        closest_orbit,
        min_delta,
    })
}

// ---------------------------------------------------------------------------
// Throttled synchronizer
// ---------------------------------------------------------------------------

/// Owns the latest [`SyncPrediction`] and refreshes it on a sim-time cadence.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    pub mode: SyncMode,
    interval: f64,
    timer: f64,
    prediction: Option<SyncPrediction>,
}

impl Synchronizer {
    pub fn new(mode: SyncMode, interval: f64) -> Self {
        // Start due, so the first update computes immediately.
        Self { mode, interval, timer: interval, prediction: None }
    }

    pub fn prediction(&self) -> Option<&SyncPrediction> {
        self.prediction.as_ref()
    }

    /// Switch rendezvous point; the next update recomputes right away.
    pub fn set_mode(&mut self, mode: SyncMode) {
        if self.mode != mode {
            self.mode = mode;
            self.timer = self.interval;
        }
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.mode.next());
    }

    /// Advance the cadence timer by `dt` and recompute once it is due.
    ///
    /// An orbit the math cannot handle leaves the previous prediction in
    /// place and retries on the next call.
    pub fn update(&mut self, ship: &OrbitState, target: &OrbitState, dt: f64) -> Option<&SyncPrediction> {
        if dt.is_finite() && dt > 0.0 {
            self.timer += dt;
        }
        if self.timer < self.interval {
            return self.prediction.as_ref();
        }

        match predict(ship, target, self.mode) {
            Ok(prediction) => {
                self.prediction = Some(prediction);
                self.timer = 0.0;
            }
            Err(err) => debug!("sync prediction skipped: {err}"),
        }
        self.prediction.as_ref()
    }

    /// Forget the table, e.g. after the target changes.
    pub fn clear(&mut self) {
        self.prediction = None;
        self.timer = self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::BodyId;
    use approx::assert_abs_diff_eq;

    fn orbit(period: f64, time_to_pe: f64) -> OrbitState {
        OrbitState {
            semi_major_axis: 700_000.0,
            eccentricity: 0.0,
            inclination: 0.0,
            arg_periapsis: 0.0,
            lan: 0.0,
            period,
            time_to_periapsis: time_to_pe,
            true_anomaly: 0.0,
            mean_anomaly: 0.0,
            reference_body: BodyId(1),
        }
    }

    #[test]
    fn identical_orbits_meet_on_first_pass() {
        let ship = orbit(2000.0, 700.0);
        let p = predict(&ship, &ship, SyncMode::ShipApoapsis).unwrap();
        assert_abs_diff_eq!(p.min_delta, 0.0, epsilon = 1e-9);
        assert_eq!(p.closest_orbit, 0);
    }

    #[test]
    fn second_pass_is_closest() {
        // Gap shrinks by 20 s a revolution: -25, -5, 15, 35.
        let ship = orbit(100.0, 30.0);
        let target = orbit(80.0, 55.0);
        let p = predict(&ship, &target, SyncMode::ShipPeriapsis).unwrap();
        assert_abs_diff_eq!(p.ship_times[0], 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.target_times[0], 55.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.target_times[3], 55.0 + 240.0, epsilon = 1e-9);
        assert_eq!(p.closest_orbit, 1);
        assert_abs_diff_eq!(p.min_delta, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn ties_go_to_earliest_orbit() {
        // Gaps: -10, +10, ... equal magnitude on orbits 0 and 1.
        let ship = orbit(100.0, 40.0);
        let target = orbit(80.0, 50.0);
        let p = predict(&ship, &target, SyncMode::ShipPeriapsis).unwrap();
        assert_abs_diff_eq!(p.delta(0), p.delta(1), epsilon = 1e-9);
        assert_eq!(p.closest_orbit, 0);
    }

    #[test]
    fn target_modes_translate_into_ship_frame() {
        let ship = orbit(100.0, 30.0);
        let mut target = orbit(100.0, 30.0);
        target.arg_periapsis = 90.0;
        assert_abs_diff_eq!(SyncMode::TargetPeriapsis.rendezvous_anomaly(&ship, &target).unwrap(), 90.0);
        assert_abs_diff_eq!(SyncMode::TargetApoapsis.rendezvous_anomaly(&ship, &target).unwrap(), 270.0);
        assert_abs_diff_eq!(SyncMode::ShipApoapsis.rendezvous_anomaly(&ship, &target).unwrap(), 180.0);
    }

    #[test]
    fn mode_cycles_through_all_four() {
        let mut mode = SyncMode::TargetPeriapsis;
        for _ in 0..4 {
            mode = mode.next();
        }
        assert_eq!(mode, SyncMode::TargetPeriapsis);
    }

    #[test]
    fn synchronizer_throttles_recomputation() {
        let ship = orbit(100.0, 30.0);
        let target = orbit(80.0, 55.0);
        let mut sync = Synchronizer::new(SyncMode::ShipPeriapsis, 0.5);
        let first = sync.update(&ship, &target, 0.02).cloned().unwrap();

        // Orbit moved on, but the cadence has not elapsed yet.
        let later = orbit(100.0, 20.0);
        let held = sync.update(&later, &target, 0.2).cloned().unwrap();
        assert_eq!(held, first);

        let fresh = sync.update(&later, &target, 0.4).cloned().unwrap();
        assert_abs_diff_eq!(fresh.ship_times[0], 20.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_orbit_keeps_previous_prediction() {
        let ship = orbit(100.0, 30.0);
        let target = orbit(80.0, 55.0);
        let mut sync = Synchronizer::new(SyncMode::ShipPeriapsis, 0.1);
        let good = sync.update(&ship, &target, 0.1).cloned().unwrap();

        let mut broken = ship;
        broken.eccentricity = 1.3;
        let kept = sync.update(&broken, &target, 0.5).cloned().unwrap();
        assert_eq!(kept, good);
    }

    #[test]
    fn changing_mode_forces_refresh() {
        let ship = orbit(100.0, 30.0);
        let target = orbit(80.0, 55.0);
        let mut sync = Synchronizer::new(SyncMode::ShipPeriapsis, 10.0);
        sync.update(&ship, &target, 0.0);
        sync.set_mode(SyncMode::ShipApoapsis);
        let p = sync.update(&ship, &target, 0.0).unwrap();
        assert_abs_diff_eq!(p.rendezvous_anomaly, 180.0);
    }

    #[test]
    fn mode_button_cycles_and_refreshes() {
        let ship = orbit(100.0, 30.0);
        let target = orbit(80.0, 55.0);
        let mut sync = Synchronizer::new(SyncMode::ShipPeriapsis, 10.0);
        sync.update(&ship, &target, 0.0);
        sync.cycle_mode();
        assert_eq!(sync.mode, SyncMode::ShipApoapsis);
        let p = sync.update(&ship, &target, 0.0).unwrap();
        assert_abs_diff_eq!(p.rendezvous_anomaly, 180.0);

        for _ in 0..3 {
            sync.cycle_mode();
        }
        assert_eq!(sync.mode, SyncMode::ShipPeriapsis);
    }

    #[test]
    fn display_lists_every_orbit() {
        let ship = orbit(100.0, 30.0);
        let p = predict(&ship, &orbit(80.0, 55.0), SyncMode::ShipPeriapsis).unwrap();
        let table = p.to_string();
        assert_eq!(table.lines().count(), SYNC_ORBITS + 3);
        assert!(table.contains("Closest approach on orbit 1"));
    }
}
