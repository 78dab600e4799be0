//! A small two-body world for demos and closed-loop tests.
//!
//! Every vehicle coasts on its Keplerian orbit around a single body at the
//! origin. The own vehicle also has a crude rigid-body attitude model:
//! attitude commands are angular accelerations, and RCS and main engine
//! change its velocity directly.

use nalgebra::{UnitQuaternion, Vector3};

use super::host::{ControlSink, FlightHost};
use super::runner::Plant;
use crate::error::Result;
use crate::gnc::ControlState;
use crate::orbital::OrbitState;
use crate::vehicle::{VehicleId, VehicleState};

/// Place a vehicle on `orbit` at its current anomaly.
pub fn vehicle_on_orbit(
    id: VehicleId,
    name: &str,
    orbit: OrbitState,
    mu: f64,
    attitude: UnitQuaternion<f64>,
) -> Result<VehicleState> {
    orbit.validate()?;
    let (position, velocity) = orbit.state_vector(mu);
    Ok(VehicleState {
        id,
        name: name.to_string(),
        orbit,
        position,
        velocity,
        attitude,
        landed: false,
    })
}

/// Actuator authority of the own vehicle at full deflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantConfig {
    pub angular_accel: f64, // rad/s^2
    pub rcs_accel: f64,     // m/s^2
    pub engine_accel: f64,  // m/s^2
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self { angular_accel: 1.0, rcs_accel: 0.5, engine_accel: 5.0 }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub mu: f64,
    pub plant: PlantConfig,
    pub pilot: ControlState,
    // Own vehicle is always slot 0.
    vehicles: Vec<VehicleState>,
    angular_velocity: Vector3<f64>, // rad/s, body frame
    controls: ControlState,
    time: f64,
}

impl Scenario {
    pub fn new(mu: f64, own: VehicleState, others: Vec<VehicleState>) -> Self {
        let mut vehicles = Vec::with_capacity(others.len() + 1);
        vehicles.push(own);
        vehicles.extend(others);
        Self {
            mu,
            plant: PlantConfig::default(),
            pilot: ControlState::neutral(),
            vehicles,
            angular_velocity: Vector3::zeros(),
            controls: ControlState::neutral(),
            time: 0.0,
        }
    }

    pub fn own_mut(&mut self) -> &mut VehicleState {
        &mut self.vehicles[0]
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleState> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    /// Last command the guidance submitted.
    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    /// Take a vehicle out of the world, as when it lands or is destroyed.
    /// The own vehicle cannot be removed.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<VehicleState> {
        let index = self.vehicles.iter().skip(1).position(|v| v.id == id)? + 1;
        Some(self.vehicles.remove(index))
    }

    /// Reverse the order of the other vehicles, as a host list refresh might.
    pub fn reorder(&mut self) {
        self.vehicles[1..].reverse();
    }

    /// Integrate the own vehicle's attitude and apply its thrust.
    fn actuate(&mut self, dt: f64) -> Result<()> {
        let c = self.controls.clamped();
        let plant = self.plant;
        let own = &mut self.vehicles[0];

        // Pitch about +X, roll about +Y; positive yaw turns the nose right,
        // which is a negative rotation about +Z.
        let alpha = Vector3::new(c.pitch, c.roll, -c.yaw) * plant.angular_accel;
        self.angular_velocity += alpha * dt;
        own.attitude *= UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);

        let accel = c.translation * plant.rcs_accel + Vector3::y() * c.throttle * plant.engine_accel;
        let dv = own.attitude * accel * dt;
        if dv.norm_squared() > 0.0 {
            own.velocity += dv;
            own.orbit = OrbitState::from_state_vector(own.orbit.reference_body, &own.position, &own.velocity, self.mu)?;
        }
        Ok(())
    }

    pub fn step(&mut self, dt: f64) -> Result<()> {
        self.actuate(dt)?;
        for v in &mut self.vehicles {
            v.orbit = v.orbit.propagate(dt)?;
            let (position, velocity) = v.orbit.state_vector(self.mu);
            v.position = position;
            v.velocity = velocity;
        }
        self.time += dt;
        Ok(())
    }
}

impl FlightHost for Scenario {
    fn own_vehicle(&self) -> &VehicleState {
        &self.vehicles[0]
    }

    fn vehicles(&self) -> &[VehicleState] {
        &self.vehicles
    }

    fn body_position(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn elapsed_sim_time(&self) -> f64 {
        self.time
    }

    fn pilot_input(&self) -> ControlState {
        self.pilot
    }
}

impl ControlSink for Scenario {
    fn submit(&mut self, controls: &ControlState) {
        self.controls = controls.clamped();
    }
}

impl Plant for Scenario {
    fn advance(&mut self, dt: f64) -> Result<()> {
        self.step(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuidanceConfig;
    use crate::gnc::{heading, ControlGoal, KinematicSnapshot, OrientationMode, Sense, TranslationMode};
    use crate::sim::event::EventKind;
    use crate::sim::runner::{simulate_with, Guidance, SimConfig};
    use crate::vehicle::BodyId;
    use approx::assert_abs_diff_eq;

    const MU: f64 = 3.5316e12;
    const RADIUS: f64 = 700_000.0;

    fn orbit(inc: f64, nu: f64) -> OrbitState {
        OrbitState::circular(BodyId(1), RADIUS, inc, 0.0, nu, MU).unwrap()
    }

    fn world(ship: OrbitState, target: OrbitState) -> Scenario {
        let own = vehicle_on_orbit(VehicleId(1), "Chaser", ship, MU, UnitQuaternion::identity()).unwrap();
        let other = vehicle_on_orbit(VehicleId(2), "Station", target, MU, UnitQuaternion::identity()).unwrap();
        Scenario::new(MU, own, vec![other])
    }

    /// Attitude that holds `goal` exactly right now.
    fn pointing(world: &Scenario, goal: ControlGoal) -> UnitQuaternion<f64> {
        let snapshot = KinematicSnapshot::new(world.own_vehicle(), world.vehicle(VehicleId(2)), Vector3::zeros());
        heading(goal, &snapshot).unwrap().unwrap().rotation()
    }

    #[test]
    fn vehicles_follow_their_orbits() {
        let mut world = world(orbit(0.0, 0.0), orbit(0.0, 90.0));
        let period = world.own_vehicle().orbit.period;
        for _ in 0..100 {
            world.step(period / 400.0).unwrap();
        }
        // A quarter of a revolution later.
        let own = world.own_vehicle();
        assert_abs_diff_eq!(own.orbit.true_anomaly, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(own.position.norm(), RADIUS, epsilon = 1e-3);
    }

    #[test]
    fn yaw_command_turns_nose_right() {
        let mut world = world(orbit(0.0, 0.0), orbit(0.0, 90.0));
        world.submit(&ControlState { yaw: 1.0, ..ControlState::neutral() });
        world.step(0.1).unwrap();
        assert!(world.angular_velocity().z < 0.0);
        let nose = world.own_vehicle().forward();
        assert!(nose.x > 0.0, "nose swung toward +X: {nose}");
    }

    #[test]
    fn main_engine_raises_orbit() {
        let mut world = world(orbit(0.0, 0.0), orbit(0.0, 90.0));
        let prograde = pointing(&world, ControlGoal::Prograde);
        world.own_mut().attitude = prograde;
        let before = world.own_vehicle().orbit.semi_major_axis;
        world.submit(&ControlState { throttle: 1.0, ..ControlState::neutral() });
        world.step(1.0).unwrap();
        assert!(world.own_vehicle().orbit.semi_major_axis > before + 1000.0);
    }

    #[test]
    fn removing_own_vehicle_is_refused() {
        let mut world = world(orbit(0.0, 0.0), orbit(0.0, 90.0));
        assert!(world.remove_vehicle(VehicleId(1)).is_none());
        assert!(world.remove_vehicle(VehicleId(2)).is_some());
        assert_eq!(world.vehicles().len(), 1);
    }

    #[test]
    fn closed_loop_attitude_settles() {
        let mut world = world(orbit(5.0, 100.0), orbit(3.0, 90.0));
        let prograde = pointing(&world, ControlGoal::Prograde);
        // Start 30 deg off in yaw.
        world.own_mut().attitude = prograde * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 30f64.to_radians());

        let mut guidance = Guidance::new(&GuidanceConfig::default());
        guidance.autopilot.engage(ControlGoal::Prograde);
        let config = SimConfig { dt: 0.02, max_time: 30.0, planning_interval: 0.5 };
        let out = simulate_with(&mut world, &mut guidance, &config).unwrap();

        let first = out.trace[1].autopilot.attitude_error_deg;
        let last = out.trace.last().unwrap().autopilot.attitude_error_deg;
        assert!(first > 20.0, "initial error {first}");
        assert!(last < 1.0, "final error {last}");
    }

    #[test]
    fn auto_align_matches_planes() {
        // Ascending node 20 deg ahead, about 110 s away.
        let mut world = world(orbit(5.0, 340.0), orbit(3.0, 90.0));
        world.own_mut().attitude = pointing(&world, ControlGoal::Prograde);

        let mut guidance = Guidance::new(&GuidanceConfig::default());
        guidance.select_target(&world, VehicleId(2)).unwrap();
        guidance.autopilot.toggle_auto_align();
        let config = SimConfig { dt: 0.02, max_time: 220.0, planning_interval: 0.5 };
        let out = simulate_with(&mut world, &mut guidance, &config).unwrap();

        assert!(out
            .events
            .iter()
            .any(|e| e.kind == EventKind::GoalChanged { from: ControlGoal::Off, to: ControlGoal::OrbitNormal(Sense::Away) }));
        assert!(out.events.iter().any(|e| matches!(e.kind, EventKind::AlignBurnStarted { .. })));
        assert!(out.events.iter().any(|e| matches!(e.kind, EventKind::AlignComplete { .. })));
        assert_eq!(guidance.autopilot.orientation(), OrientationMode::Idle);

        let ship = world.own_vehicle().orbit.inclination;
        let target = world.vehicle(VehicleId(2)).unwrap().orbit.inclination;
        assert!((ship - target).abs() < 0.05, "ship {ship} target {target}");
    }

    #[test]
    fn kill_velocity_stops_drift() {
        let mut world = world(orbit(0.0, 0.01), orbit(0.0, 0.0));
        // Roughly 120 m ahead, drifting away at 1 m/s along a skewed axis.
        let own = world.own_mut();
        own.velocity += Vector3::new(0.6, 0.0, -0.8);
        own.orbit = OrbitState::from_state_vector(BodyId(1), &own.position, &own.velocity, MU).unwrap();
        own.attitude = UnitQuaternion::from_euler_angles(0.4, -0.3, 1.2);

        let mut guidance = Guidance::new(&GuidanceConfig::default());
        guidance.select_target(&world, VehicleId(2)).unwrap();
        guidance.autopilot.toggle_translation(TranslationMode::KillVelocity);
        let config = SimConfig { dt: 0.02, max_time: 10.0, planning_interval: 0.5 };
        let out = simulate_with(&mut world, &mut guidance, &config).unwrap();

        assert!(out.events.iter().any(|e| e.kind == EventKind::VelocityKilled));
        assert_eq!(guidance.autopilot.translation_mode(), TranslationMode::Idle);
        let (_, speed) = out.trace.last().unwrap().range.unwrap();
        assert!(speed < 0.15, "relative speed {speed}");
    }

    #[test]
    fn reordered_host_list_keeps_the_same_target() {
        let own = vehicle_on_orbit(VehicleId(1), "Chaser", orbit(5.0, 100.0), MU, UnitQuaternion::identity()).unwrap();
        let others = vec![
            vehicle_on_orbit(VehicleId(2), "Station", orbit(3.0, 90.0), MU, UnitQuaternion::identity()).unwrap(),
            vehicle_on_orbit(VehicleId(3), "Debris", orbit(5.0, 101.0), MU, UnitQuaternion::identity()).unwrap(),
        ];
        let mut world = Scenario::new(MU, own, others);
        let mut guidance = Guidance::new(&GuidanceConfig::default());
        guidance.select_target(&world, VehicleId(2)).unwrap();
        guidance.autopilot.engage(ControlGoal::Target(Sense::Toward));

        let config = SimConfig { dt: 0.02, max_time: 1.0, planning_interval: 0.5 };
        simulate_with(&mut world, &mut guidance, &config).unwrap();
        world.reorder();
        let out = simulate_with(&mut world, &mut guidance, &config).unwrap();

        assert!(out.events.iter().any(|e| e.kind == EventKind::TargetReacquired { id: VehicleId(2), index: 2 }));
        assert_eq!(guidance.autopilot.target(), Some(VehicleId(2)));
        assert_eq!(guidance.autopilot.orientation(), OrientationMode::Manual(ControlGoal::Target(Sense::Toward)));
        // Range is still measured to the station, not whatever sits in its old slot.
        let station = world.vehicle(VehicleId(2)).unwrap();
        let (range, _) = out.trace.last().unwrap().range.unwrap();
        assert!((range - world.own_vehicle().distance_to(station)).abs() < 1e3);
    }

    #[test]
    fn losing_the_target_mid_flight_goes_neutral() {
        let mut world = world(orbit(5.0, 100.0), orbit(3.0, 90.0));
        let mut guidance = Guidance::new(&GuidanceConfig::default());
        guidance.select_target(&world, VehicleId(2)).unwrap();
        guidance.autopilot.engage(ControlGoal::Target(Sense::Toward));

        let config = SimConfig { dt: 0.02, max_time: 1.0, planning_interval: 0.5 };
        simulate_with(&mut world, &mut guidance, &config).unwrap();
        world.remove_vehicle(VehicleId(2));
        let out = simulate_with(&mut world, &mut guidance, &config).unwrap();

        assert_eq!(out.trace[0].controls, ControlState::neutral());
        assert_eq!(guidance.autopilot.orientation(), OrientationMode::Idle);
        assert!(out.events.iter().any(|e| e.kind == EventKind::TargetLost { id: VehicleId(2) }));
        assert!(guidance.status().sync.is_none());
    }
}
