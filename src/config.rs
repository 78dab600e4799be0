//! Tunable guidance parameters, loadable from a TOML file.
//!
//! Every field has a default, so a file only needs the values it overrides:
//!
//! ```toml
//! [attitude]
//! kp = 12.0
//!
//! [sync]
//! mode = "ship-apoapsis"
//! ```

use std::path::Path;

use nalgebra::Vector3;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::planning::SyncMode;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub attitude: AttitudeConfig,
    pub translation: TranslationConfig,
    pub sync: SyncConfig,
    pub align: AlignConfig,
}

/// PID gains for the attitude loop. Errors are normalised to (-1, 1].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Anti-windup bound on each axis' integral.
    pub integral_limit: f64,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            kp: 20.0,
            ki: 0.0,
            kd: 40.0,
            integral_limit: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Command per unit of velocity error.
    pub gain: f64,
    /// Kill-velocity disarms below this relative speed, m/s.
    pub kill_threshold: f64,
    /// Homing ignores position errors smaller than this on an axis, m.
    pub deadband: f64,
    /// Homing goal in the target's body frame (right, forward, up), m.
    pub home_offset: [f64; 3],
}

impl TranslationConfig {
    pub fn home_offset(&self) -> Vector3<f64> {
        Vector3::from(self.home_offset)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            gain: 8.0,
            kill_threshold: 0.1,
            deadband: 0.01,
            home_offset: [0.0, 2.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Simulated seconds between closest-approach recomputations.
    pub interval: f64,
    pub mode: SyncMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: 0.1,
            mode: SyncMode::default(),
        }
    }
}

/// AutoAlign burn logic thresholds. Inclinations in degrees.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Start burning once the node is closer than this, s.
    pub burn_lead_time: f64,
    /// Only burn while pointing within this many degrees of the goal.
    pub max_attitude_error_deg: f64,
    /// Do not burn for a smaller relative inclination.
    pub min_relative_inclination: f64,
    /// Below this relative inclination burn at `fine_throttle`.
    pub fine_burn_threshold: f64,
    /// AutoAlign finishes once the relative inclination drops below this.
    pub complete_threshold: f64,
    pub full_throttle: f64,
    pub fine_throttle: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            burn_lead_time: 10.0,
            max_attitude_error_deg: 5.0,
            min_relative_inclination: 0.01,
            fine_burn_threshold: 0.1,
            complete_threshold: 0.02,
            full_throttle: 1.0,
            fine_throttle: 0.25,
        }
    }
}

impl GuidanceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GuidanceConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let a = &self.attitude;
        if [a.kp, a.ki, a.kd].iter().any(|g| !g.is_finite() || *g < 0.0) {
            return invalid("attitude gains must be finite and non-negative");
        }
        if !(a.integral_limit > 0.0) {
            return invalid("attitude.integral_limit must be positive");
        }

        let t = &self.translation;
        if !(t.gain > 0.0) {
            return invalid("translation.gain must be positive");
        }
        if t.kill_threshold < 0.0 || t.deadband < 0.0 {
            return invalid("translation thresholds must be non-negative");
        }
        if t.home_offset.iter().any(|c| !c.is_finite()) {
            return invalid("translation.home_offset must be finite");
        }

        if !(self.sync.interval > 0.0) {
            return invalid("sync.interval must be positive");
        }

        let al = &self.align;
        if al.burn_lead_time < 0.0
            || al.max_attitude_error_deg <= 0.0
            || al.min_relative_inclination < 0.0
            || al.fine_burn_threshold < 0.0
            || al.complete_threshold < 0.0
        {
            return invalid("align thresholds must be non-negative");
        }
        if !(0.0..=1.0).contains(&al.full_throttle) || !(0.0..=1.0).contains(&al.fine_throttle) {
            return invalid("align throttles must lie in [0, 1]");
        }
        Ok(())
    }
}
