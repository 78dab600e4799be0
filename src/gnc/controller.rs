use nalgebra::Vector3;

use super::command::ControlState;
use crate::vehicle::VehicleState;

/// What a controller sees of the world on one control tick.
#[derive(Debug, Clone, Copy)]
pub struct ControlContext<'a> {
    pub own: &'a VehicleState,
    pub vehicles: &'a [VehicleState],
    /// World position of the body the ship orbits.
    pub body_position: Vector3<f64>,
    /// Host sim time, s.
    pub time: f64,
}

/// Trait for flight controllers.
///
/// Implement this to plug a custom controller into the guidance runner.
pub trait Controller {
    /// Adjust `controls` (already holding the pilot's input) for this tick.
    fn drive(&mut self, ctx: &ControlContext<'_>, controls: &mut ControlState, dt: f64);

    /// Reset controller internal state (e.g., PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}
