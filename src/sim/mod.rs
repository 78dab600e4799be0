pub mod event;
pub mod host;
pub mod runner;
pub mod scenario;

pub use event::{AutopilotEvent, EventKind};
pub use host::{ControlSink, FlightHost};
pub use runner::{drive_controller, simulate_with, Guidance, GuidanceStatus, Plant, SimConfig, SimOutput, TraceSample};
pub use scenario::{vehicle_on_orbit, PlantConfig, Scenario};
