use thiserror::Error;

use crate::vehicle::VehicleId;

pub type Result<T> = std::result::Result<T, GuidanceError>;

/// Locally recoverable guidance failures. None of these should ever take the
/// host session down: callers skip the tick and keep their last output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuidanceError {
    /// Eccentricity outside [0, 1) or a non-finite orbital element.
    #[error("orbit not applicable: {reason}")]
    InvalidOrbit { reason: String },

    /// The selected target no longer resolves to a vehicle.
    #[error("target {id} no longer exists")]
    StaleTarget { id: VehicleId },

    /// A zero-length vector or coincident planes where a direction is required.
    #[error("degenerate geometry: {what}")]
    DegenerateGeometry { what: &'static str },
}

impl GuidanceError {
    pub(crate) fn invalid_orbit(reason: impl Into<String>) -> Self {
        GuidanceError::InvalidOrbit { reason: reason.into() }
    }
}

/// Errors that can occur while loading a guidance configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
