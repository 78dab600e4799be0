use std::fmt;

use crate::gnc::{ControlGoal, TranslationMode};
use crate::vehicle::VehicleId;

// ---------------------------------------------------------------------------
// Autopilot events
// ---------------------------------------------------------------------------

/// Kinds of autopilot events.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    GoalChanged { from: ControlGoal, to: ControlGoal },
    TranslationChanged { from: TranslationMode, to: TranslationMode },
    AlignBurnStarted { relative_inclination: f64 },
    AlignComplete { relative_inclination: f64 },
    VelocityKilled,
    TargetLost { id: VehicleId },
    TargetReacquired { id: VehicleId, index: usize },
}

/// A discrete event raised by the autopilot during a control tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotEvent {
    /// Host sim time of the tick, s.
    pub time: f64,
    pub kind: EventKind,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::GoalChanged { from, to } => write!(f, "goal {from} -> {to}"),
            EventKind::TranslationChanged { from, to } => write!(f, "translation {from:?} -> {to:?}"),
            EventKind::AlignBurnStarted { relative_inclination } => {
                write!(f, "plane burn started (rel. inc {relative_inclination:.3} deg)")
            }
            EventKind::AlignComplete { relative_inclination } => {
                write!(f, "planes aligned (rel. inc {relative_inclination:.3} deg)")
            }
            EventKind::VelocityKilled => f.write_str("relative velocity killed"),
            EventKind::TargetLost { id } => write!(f, "target {id} lost"),
            EventKind::TargetReacquired { id, index } => write!(f, "target {id} moved to slot {index}"),
        }
    }
}
