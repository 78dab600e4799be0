pub mod attitude;
pub mod autopilot;
pub mod command;
pub mod controller;
pub mod heading;
pub mod pid;
pub mod translation;

pub use attitude::{attitude_error, AttitudeController};
pub use autopilot::{align_goal, Autopilot, AutopilotState, OrientationMode};
pub use command::ControlState;
pub use controller::{ControlContext, Controller};
pub use heading::{heading, ControlGoal, Heading, KinematicSnapshot, Sense, TargetKinematics};
pub use pid::Pid;
pub use translation::{homing_speed, TranslationController, TranslationMode, TranslationStep};
