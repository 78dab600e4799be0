pub mod state;
pub mod target;

pub use state::{BodyId, VehicleId, VehicleState};
pub use target::{candidate_targets, TargetSelection};
