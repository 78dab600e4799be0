use nalgebra::{UnitQuaternion, Vector3};

use super::command::ControlState;
use super::heading::Heading;
use super::pid::Pid;
use crate::config::AttitudeConfig;
use crate::orbital::signed_degrees;

// ---------------------------------------------------------------------------
// Attitude error
// ---------------------------------------------------------------------------

/// Rotation still needed to get from `current` to `desired`, as normalised
/// (pitch, yaw, roll) in (-1, 1]. Pitch is about body X, yaw about body Z,
/// roll about body Y (the nose).
pub fn attitude_error(current: &UnitQuaternion<f64>, desired: &UnitQuaternion<f64>) -> Vector3<f64> {
    let delta = current.inverse() * desired;
    let (about_x, about_y, about_z) = delta.euler_angles();
    let normalise = |rad: f64| signed_degrees(rad.to_degrees()) / 180.0;
    Vector3::new(normalise(about_x), normalise(about_z), normalise(about_y))
}

// ---------------------------------------------------------------------------
// Three-axis PID attitude loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AttitudeController {
    pub pitch_pid: Pid,
    pub yaw_pid: Pid,
    pub roll_pid: Pid,
    enabled: bool,
    heading: Option<Heading>,
    error: Vector3<f64>,
}

impl AttitudeController {
    pub fn new(config: &AttitudeConfig) -> Self {
        let pid = || Pid::new(config.kp, config.ki, config.kd).with_integral_limit(config.integral_limit);
        Self {
            pitch_pid: pid(),
            yaw_pid: pid(),
            roll_pid: pid(),
            enabled: false,
            heading: None,
            error: Vector3::zeros(),
        }
    }

    /// Start steering from a clean slate.
    pub fn enable(&mut self) {
        self.reset();
        self.heading = None;
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.reset();
        self.heading = None;
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset(&mut self) {
        self.pitch_pid.reset();
        self.yaw_pid.reset();
        self.roll_pid.reset();
        self.error = Vector3::zeros();
    }

    /// Replace the heading being held.
    pub fn set_heading(&mut self, heading: Heading) {
        self.heading = Some(heading);
    }

    pub fn heading(&self) -> Option<&Heading> {
        self.heading.as_ref()
    }

    /// Last normalised (pitch, yaw, roll) error.
    pub fn error(&self) -> Vector3<f64> {
        self.error
    }

    /// Magnitude of the last error, degrees.
    pub fn error_degrees(&self) -> f64 {
        self.error.norm() * 180.0
    }

    /// Per-axis actuator outputs for the held heading, each clamped to
    /// [-1, 1]. `None` while disabled or before any heading is known.
    pub fn update(&mut self, attitude: &UnitQuaternion<f64>, dt: f64) -> Option<Vector3<f64>> {
        if !self.enabled {
            return None;
        }
        let desired = self.heading?.rotation();
        self.error = attitude_error(attitude, &desired);

        let out = Vector3::new(
            self.pitch_pid.update(self.error.x, dt),
            self.yaw_pid.update(self.error.y, dt),
            self.roll_pid.update(self.error.z, dt),
        );
        Some(out.map(|v| v.clamp(-1.0, 1.0)))
    }

    /// Run one step and mix the result into `controls` on top of the pilot's
    /// input. Positive yaw output turns the nose left, so it is subtracted.
    pub fn drive(&mut self, attitude: &UnitQuaternion<f64>, controls: &mut ControlState, dt: f64) {
        if let Some(out) = self.update(attitude, dt) {
            controls.pitch += out.x;
            controls.yaw -= out.y;
            controls.roll += out.z;
            *controls = controls.clamped();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p_only(kp: f64) -> AttitudeController {
        AttitudeController::new(&AttitudeConfig { kp, ki: 0.0, kd: 0.0, integral_limit: 1.0 })
    }

    fn hold(ctrl: &mut AttitudeController, desired: UnitQuaternion<f64>) {
        let forward = desired * Vector3::y();
        let up = desired * Vector3::z();
        ctrl.set_heading(Heading::new(forward, up).unwrap());
    }

    #[test]
    fn no_error_when_aligned() {
        let q = UnitQuaternion::from_euler_angles(0.4, -1.0, 2.5);
        assert_abs_diff_eq!(attitude_error(&q, &q), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn error_axes_are_pitch_yaw_roll() {
        let id = UnitQuaternion::identity();
        let deg = 30f64.to_radians();
        let pitch = attitude_error(&id, &UnitQuaternion::from_axis_angle(&Vector3::x_axis(), deg));
        assert_abs_diff_eq!(pitch, Vector3::new(30.0 / 180.0, 0.0, 0.0), epsilon = 1e-12);
        let yaw = attitude_error(&id, &UnitQuaternion::from_axis_angle(&Vector3::z_axis(), deg));
        assert_abs_diff_eq!(yaw, Vector3::new(0.0, 30.0 / 180.0, 0.0), epsilon = 1e-12);
        let roll = attitude_error(&id, &UnitQuaternion::from_axis_angle(&Vector3::y_axis(), deg));
        assert_abs_diff_eq!(roll, Vector3::new(0.0, 0.0, 30.0 / 180.0), epsilon = 1e-12);
    }

    #[test]
    fn proportional_output_and_clamp() {
        let mut ctrl = p_only(2.0);
        ctrl.enable();
        hold(&mut ctrl, UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 45f64.to_radians()));
        let out = ctrl.update(&UnitQuaternion::identity(), 0.02).unwrap();
        assert_abs_diff_eq!(out.x, 2.0 * 0.25, epsilon = 1e-12);

        let mut stiff = p_only(20.0);
        stiff.enable();
        hold(&mut stiff, UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 45f64.to_radians()));
        let out = stiff.update(&UnitQuaternion::identity(), 0.02).unwrap();
        assert_eq!(out.x, 1.0);
    }

    #[test]
    fn yaw_output_is_subtracted_from_pilot_input() {
        let mut ctrl = p_only(1.0);
        ctrl.enable();
        // Goal is 18 deg to the left of the nose.
        hold(&mut ctrl, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 18f64.to_radians()));
        let mut controls = ControlState::neutral();
        ctrl.drive(&UnitQuaternion::identity(), &mut controls, 0.02);
        assert_abs_diff_eq!(controls.yaw, -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(controls.pitch, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn combined_command_is_clamped() {
        let mut ctrl = p_only(20.0);
        ctrl.enable();
        hold(&mut ctrl, UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5));
        let mut controls = ControlState { pitch: 0.8, ..ControlState::neutral() };
        ctrl.drive(&UnitQuaternion::identity(), &mut controls, 0.02);
        assert_eq!(controls.pitch, 1.0);
    }

    #[test]
    fn disabled_controller_leaves_controls_alone() {
        let mut ctrl = p_only(1.0);
        hold(&mut ctrl, UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5));
        let mut controls = ControlState { pitch: 0.3, ..ControlState::neutral() };
        ctrl.drive(&UnitQuaternion::identity(), &mut controls, 0.02);
        assert_eq!(controls.pitch, 0.3);
    }

    #[test]
    fn re_enabling_starts_from_zero_memory() {
        let config = AttitudeConfig { kp: 1.0, ki: 1.0, kd: 1.0, integral_limit: 1.0 };
        let desired = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let current = UnitQuaternion::identity();

        let mut fresh = AttitudeController::new(&config);
        fresh.enable();
        hold(&mut fresh, desired);
        let expected = fresh.update(&current, 0.1).unwrap();

        let mut used = AttitudeController::new(&config);
        used.enable();
        hold(&mut used, desired);
        for _ in 0..20 {
            used.update(&UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.2), 0.1);
        }
        used.disable();
        assert_eq!(used.pitch_pid.integral(), 0.0);
        assert!(used.heading().is_none());

        used.enable();
        hold(&mut used, desired);
        let got = used.update(&current, 0.1).unwrap();
        assert_abs_diff_eq!(got, expected, epsilon = 1e-12);
    }

    #[test]
    fn error_degrees_reports_magnitude() {
        let mut ctrl = p_only(1.0);
        ctrl.enable();
        hold(&mut ctrl, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 4f64.to_radians()));
        ctrl.update(&UnitQuaternion::identity(), 0.02);
        assert_abs_diff_eq!(ctrl.error_degrees(), 4.0, epsilon = 1e-9);
    }
}
