use nalgebra::Vector3;

use crate::config::TranslationConfig;
use crate::vehicle::VehicleState;

/// Translation behaviour; at most one runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    #[default]
    Idle,
    KillVelocity,
    Homing,
}

/// Result of one translation evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranslationStep {
    /// Body-frame (right, forward, up) command, each in [-1, 1].
    Command(Vector3<f64>),
    /// Relative velocity fell below the kill threshold. The command of the
    /// final evaluation is still applied.
    Disarmed(Vector3<f64>),
}

impl TranslationStep {
    pub fn command(&self) -> Vector3<f64> {
        match *self {
            TranslationStep::Command(c) | TranslationStep::Disarmed(c) => c,
        }
    }
}

/// Closing speed used by homing for a given distance to the goal, m/s.
pub fn homing_speed(distance: f64) -> f64 {
    if distance > 150.0 {
        3.0
    } else if distance > 50.0 {
        1.0
    } else if distance > 10.0 {
        0.5
    } else if distance > 2.0 {
        0.3
    } else {
        0.1
    }
}

/// Drives the ship's RCS against relative velocity and position.
///
/// Relative velocity is ship minus target and relative position is ship
/// minus goal, both in the ship's body frame.
#[derive(Debug, Clone)]
pub struct TranslationController {
    pub gain: f64,
    pub kill_threshold: f64,
    pub deadband: f64,
    pub home_offset: Vector3<f64>,
}

impl TranslationController {
    pub fn new(config: &TranslationConfig) -> Self {
        Self {
            gain: config.gain,
            kill_threshold: config.kill_threshold,
            deadband: config.deadband,
            home_offset: config.home_offset(),
        }
    }

    fn saturate(v: Vector3<f64>) -> Vector3<f64> {
        v.map(|c| c.clamp(-1.0, 1.0))
    }

    /// Null the body-frame relative velocity `rel_vel`.
    pub fn kill_velocity(&self, rel_vel: &Vector3<f64>) -> TranslationStep {
        let command = Self::saturate(-rel_vel * self.gain);
        if rel_vel.norm() < self.kill_threshold {
            TranslationStep::Disarmed(command)
        } else {
            TranslationStep::Command(command)
        }
    }

    /// Fly toward the goal with a distance-scheduled closing speed.
    /// `rel_pos` and `rel_vel` are body-frame ship-minus-goal and
    /// ship-minus-target.
    pub fn home(&self, rel_pos: &Vector3<f64>, rel_vel: &Vector3<f64>) -> Vector3<f64> {
        let speed = homing_speed(rel_pos.norm());
        let desired = rel_pos.map(|p| if p.abs() < self.deadband { 0.0 } else { -p.signum() * speed });
        Self::saturate((desired - rel_vel) * self.gain)
    }

    /// Homing goal in world coordinates.
    pub fn goal(&self, target: &VehicleState) -> Vector3<f64> {
        target.body_point(&self.home_offset)
    }

    /// Evaluate `mode` for the ship against the target. `Idle` yields no
    /// command.
    pub fn step(&self, mode: TranslationMode, ship: &VehicleState, target: &VehicleState) -> Option<TranslationStep> {
        let rel_vel = ship.to_body(&(ship.velocity - target.velocity));
        match mode {
            TranslationMode::Idle => None,
            TranslationMode::KillVelocity => Some(self.kill_velocity(&rel_vel)),
            TranslationMode::Homing => {
                let rel_pos = ship.to_body(&(ship.position - self.goal(target)));
                Some(TranslationStep::Command(self.home(&rel_pos, &rel_vel)))
            }
        }
    }
}
