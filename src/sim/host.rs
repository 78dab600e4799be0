use nalgebra::Vector3;

use crate::gnc::ControlState;
use crate::vehicle::VehicleState;

/// Live view of the flight the guidance core runs inside.
///
/// Everything is re-read every tick; nothing returned here is cached by
/// the core across ticks except the target's id.
pub trait FlightHost {
    /// The vehicle being flown.
    fn own_vehicle(&self) -> &VehicleState;

    /// Every vehicle the host knows about, own vehicle included. The order
    /// may change between ticks.
    fn vehicles(&self) -> &[VehicleState];

    /// World position of the body the own vehicle orbits.
    fn body_position(&self) -> Vector3<f64>;

    /// Monotonic simulation time, s. Follows time warp, not the wall clock.
    fn elapsed_sim_time(&self) -> f64;

    /// Pilot input for this tick, before any autopilot contribution.
    fn pilot_input(&self) -> ControlState {
        ControlState::neutral()
    }
}

/// Receives the final actuator command once per control tick.
pub trait ControlSink {
    fn submit(&mut self, controls: &ControlState);
}

impl ControlSink for Vec<ControlState> {
    fn submit(&mut self, controls: &ControlState) {
        self.push(*controls);
    }
}
