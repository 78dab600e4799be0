use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Actuator command handed to the host each control tick
// ---------------------------------------------------------------------------

/// Normalised actuator values. `translation` is in the body frame
/// (right, forward, up); positive values thrust along the positive axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub pitch: f64,                // [-1, 1], + = nose up
    pub yaw: f64,                  // [-1, 1], + = nose right
    pub roll: f64,                 // [-1, 1], + = about the nose axis
    pub translation: Vector3<f64>, // each [-1, 1]
    pub throttle: f64,             // [0, 1]
}

impl ControlState {
    pub fn neutral() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            translation: Vector3::zeros(),
            throttle: 0.0,
        }
    }

    /// Copy with every channel limited to its legal range. NaN becomes 0.
    pub fn clamped(&self) -> Self {
        let unit = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            pitch: unit(self.pitch),
            yaw: unit(self.yaw),
            roll: unit(self.roll),
            translation: self.translation.map(unit),
            throttle: if self.throttle.is_nan() { 0.0 } else { self.throttle.clamp(0.0, 1.0) },
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::neutral()
    }
}
