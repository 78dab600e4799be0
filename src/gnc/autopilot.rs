//! Autopilot coordinator: the orientation and translation state machines.
//!
//! Orientation (`Idle`, `Manual`, `AutoAlign`) and translation (`Idle`,
//! `KillVelocity`, `Homing`) run independently. Every transition goes
//! through [`Autopilot::set_orientation`] or [`Autopilot::set_translation`],
//! which own the entry and exit actions:
//!
//! * leaving an orientation mode disables the attitude loop and clears its
//!   PID memory; entering one enables it from zero;
//! * dropping to `Idle` applies neutral controls on the next control tick.

use std::mem;

use log::{debug, info, warn};
use nalgebra::Vector3;

use super::attitude::AttitudeController;
use super::command::ControlState;
use super::controller::{ControlContext, Controller};
use super::heading::{heading, ControlGoal, KinematicSnapshot, Sense};
use super::translation::{TranslationController, TranslationMode, TranslationStep};
use crate::config::{AlignConfig, GuidanceConfig};
use crate::error::{GuidanceError, Result};
use crate::planning::{relative_inclination, NodeKind, PlaneAligner, PlaneAlignment};
use crate::sim::event::{AutopilotEvent, EventKind};
use crate::vehicle::{TargetSelection, VehicleId, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationMode {
    #[default]
    Idle,
    /// Hold a pilot-chosen goal.
    Manual(ControlGoal),
    /// Point at the relative node and burn until the planes match.
    AutoAlign { burn_triggered: bool },
}

/// Normal or anti-normal, whichever tilts the ship's plane toward the
/// target's at the node reached first.
pub fn align_goal(relative_inclination: f64, node: NodeKind) -> ControlGoal {
    let sense = match (relative_inclination < 0.0, node) {
        (true, NodeKind::Ascending) => Sense::Away,
        (true, NodeKind::Descending) => Sense::Toward,
        (false, NodeKind::Ascending) => Sense::Toward,
        (false, NodeKind::Descending) => Sense::Away,
    };
    ControlGoal::OrbitNormal(sense)
}

/// Combined autopilot state, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotState {
    pub orientation: OrientationMode,
    pub translation: TranslationMode,
    pub goal: ControlGoal,
    pub target: Option<VehicleId>,
    pub attitude_error_deg: f64,
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    align: AlignConfig,
    attitude: AttitudeController,
    translation: TranslationController,
    aligner: PlaneAligner,
    orientation: OrientationMode,
    translation_mode: TranslationMode,
    goal: ControlGoal,
    target: Option<TargetSelection>,
    neutral_pending: bool,
    translation_reset_pending: bool,
    events: Vec<AutopilotEvent>,
    time: f64,
}

impl Autopilot {
    pub fn new(config: &GuidanceConfig) -> Self {
        Self {
            align: config.align.clone(),
            attitude: AttitudeController::new(&config.attitude),
            translation: TranslationController::new(&config.translation),
            aligner: PlaneAligner::new(),
            orientation: OrientationMode::Idle,
            translation_mode: TranslationMode::Idle,
            goal: ControlGoal::Off,
            target: None,
            neutral_pending: false,
            translation_reset_pending: false,
            events: Vec::new(),
            time: 0.0,
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn orientation(&self) -> OrientationMode {
        self.orientation
    }

    pub fn translation_mode(&self) -> TranslationMode {
        self.translation_mode
    }

    pub fn goal(&self) -> ControlGoal {
        self.goal
    }

    pub fn target(&self) -> Option<VehicleId> {
        self.target.map(|t| t.id())
    }

    pub fn attitude(&self) -> &AttitudeController {
        &self.attitude
    }

    /// Node timing as last seen by AutoAlign.
    pub fn alignment(&self) -> Option<&PlaneAlignment> {
        self.aligner.alignment()
    }

    pub fn state(&self) -> AutopilotState {
        AutopilotState {
            orientation: self.orientation,
            translation: self.translation_mode,
            goal: self.goal,
            target: self.target(),
            attitude_error_deg: self.attitude.error_degrees(),
        }
    }

    /// Take the events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<AutopilotEvent> {
        mem::take(&mut self.events)
    }

    // -- Target selection --------------------------------------------------

    pub fn select_target(&mut self, vehicles: &[VehicleState], id: VehicleId) -> Result<()> {
        let selection = TargetSelection::select(vehicles, id)?;
        if self.target() != Some(id) {
            self.aligner.clear();
            info!("target {id} selected");
        }
        self.target = Some(selection);
        Ok(())
    }

    /// Drop the target, and with it every mode that needs one.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.aligner.clear();
        if self.orientation_needs_target() {
            self.set_orientation(OrientationMode::Idle);
        }
        self.set_translation(TranslationMode::Idle);
    }

    // -- Transitions -------------------------------------------------------

    /// The single place orientation modes change.
    pub fn set_orientation(&mut self, mode: OrientationMode) {
        let mode = match mode {
            OrientationMode::Manual(ControlGoal::Off) => OrientationMode::Idle,
            OrientationMode::AutoAlign { .. } => OrientationMode::AutoAlign { burn_triggered: false },
            other => other,
        };
        if mode == self.orientation {
            return;
        }
        let previous = mem::replace(&mut self.orientation, mode);

        // Exit.
        if previous != OrientationMode::Idle {
            self.attitude.disable();
        }

        // Entry.
        let goal = match mode {
            OrientationMode::Idle => {
                self.neutral_pending = true;
                ControlGoal::Off
            }
            OrientationMode::Manual(goal) => {
                self.attitude.enable();
                goal
            }
            OrientationMode::AutoAlign { .. } => {
                self.attitude.enable();
                self.aligner.clear();
                ControlGoal::Off
            }
        };
        info!("orientation {previous:?} -> {mode:?}");
        self.set_goal(goal);
    }

    /// The single place translation modes change.
    pub fn set_translation(&mut self, mode: TranslationMode) {
        if mode == self.translation_mode {
            return;
        }
        let previous = mem::replace(&mut self.translation_mode, mode);
        if mode == TranslationMode::Idle {
            self.translation_reset_pending = true;
        }
        info!("translation {previous:?} -> {mode:?}");
        self.push(EventKind::TranslationChanged { from: previous, to: mode });
    }

    /// Hold `goal` manually; `Off` disengages orientation control.
    pub fn engage(&mut self, goal: ControlGoal) {
        self.set_orientation(OrientationMode::Manual(goal));
    }

    pub fn toggle_auto_align(&mut self) {
        match self.orientation {
            OrientationMode::AutoAlign { .. } => self.set_orientation(OrientationMode::Idle),
            _ => self.set_orientation(OrientationMode::AutoAlign { burn_triggered: false }),
        }
    }

    /// Switch `mode` on, or off again if it is already running.
    pub fn toggle_translation(&mut self, mode: TranslationMode) {
        if self.translation_mode == mode {
            self.set_translation(TranslationMode::Idle);
        } else {
            self.set_translation(mode);
        }
    }

    pub fn disengage(&mut self) {
        self.set_orientation(OrientationMode::Idle);
        self.set_translation(TranslationMode::Idle);
    }

    fn set_goal(&mut self, goal: ControlGoal) {
        if goal != self.goal {
            let from = mem::replace(&mut self.goal, goal);
            self.push(EventKind::GoalChanged { from, to: goal });
        }
    }

    fn push(&mut self, kind: EventKind) {
        self.events.push(AutopilotEvent { time: self.time, kind });
    }

    fn is_active(&self) -> bool {
        self.orientation != OrientationMode::Idle || self.translation_mode != TranslationMode::Idle
    }

    fn orientation_needs_target(&self) -> bool {
        match self.orientation {
            OrientationMode::Idle => false,
            OrientationMode::Manual(goal) => goal.needs_target(),
            OrientationMode::AutoAlign { .. } => true,
        }
    }

    fn needs_target(&self) -> bool {
        self.orientation_needs_target() || self.translation_mode != TranslationMode::Idle
    }

    // -- Control tick ------------------------------------------------------

    /// Revalidate the selection against this tick's vehicle list.
    fn resolve_target<'a>(&mut self, vehicles: &'a [VehicleState]) -> Result<Option<&'a VehicleState>> {
        let Some(selection) = self.target.as_mut() else {
            return Ok(None);
        };
        let cached = selection.index();
        let target = selection.resolve(vehicles)?;
        let (id, index) = (selection.id(), selection.index());
        if index != cached {
            debug!("target {id} moved from slot {cached} to {index}");
            self.push(EventKind::TargetReacquired { id, index });
        }
        Ok(Some(target))
    }

    /// Drop everything and wait for a new target selection.
    fn fail_safe(&mut self, err: &GuidanceError) {
        warn!("autopilot disengaged: {err}");
        if let GuidanceError::StaleTarget { id } = *err {
            self.push(EventKind::TargetLost { id });
        }
        self.target = None;
        self.aligner.clear();
        self.disengage();
    }

    fn steer(&mut self, goal: ControlGoal, snapshot: &KinematicSnapshot, own: &VehicleState, controls: &mut ControlState, dt: f64) {
        match heading(goal, snapshot) {
            Ok(Some(h)) => self.attitude.set_heading(h),
            Ok(None) => {}
            Err(err) => debug!("holding previous heading: {err}"),
        }
        self.attitude.drive(&own.attitude, controls, dt);
    }

    fn auto_align(
        &mut self,
        burn_triggered: bool,
        own: &VehicleState,
        target: &VehicleState,
        snapshot: &KinematicSnapshot,
        controls: &mut ControlState,
        dt: f64,
    ) {
        let rel_inc = relative_inclination(&own.orbit, &target.orbit);
        if rel_inc.abs() < self.align.complete_threshold {
            controls.throttle = 0.0;
            info!("planes aligned, relative inclination {rel_inc:.4} deg");
            self.push(EventKind::AlignComplete { relative_inclination: rel_inc });
            self.set_orientation(OrientationMode::Idle);
            return;
        }

        // Node timing needs two distinct planes.
        let Some(alignment) = self.aligner.update(&own.orbit, &target.orbit).copied() else {
            controls.throttle = 0.0;
            return;
        };
        let (node, time_to_node) = alignment.sooner_node();

        // The goal stays put once the burn has started.
        if !burn_triggered {
            self.set_goal(align_goal(rel_inc, node));
        }
        let goal = self.goal;
        self.steer(goal, snapshot, own, controls, dt);

        let cfg = &self.align;
        let burn = (time_to_node < cfg.burn_lead_time || burn_triggered)
            && self.attitude.error_degrees() < cfg.max_attitude_error_deg
            && rel_inc.abs() > cfg.min_relative_inclination;
        controls.throttle = match burn {
            true if rel_inc.abs() > cfg.fine_burn_threshold => cfg.full_throttle,
            true => cfg.fine_throttle,
            false => 0.0,
        };

        if burn && !burn_triggered {
            self.orientation = OrientationMode::AutoAlign { burn_triggered: true };
            info!("plane change burn at {node:?} node, relative inclination {rel_inc:.3} deg");
            self.push(EventKind::AlignBurnStarted { relative_inclination: rel_inc });
        }
    }

    fn translate(&mut self, own: &VehicleState, target: &VehicleState, controls: &mut ControlState) {
        match self.translation.step(self.translation_mode, own, target) {
            None => {}
            Some(TranslationStep::Command(cmd)) => controls.translation = cmd,
            Some(TranslationStep::Disarmed(cmd)) => {
                controls.translation = cmd;
                info!("relative velocity killed");
                self.push(EventKind::VelocityKilled);
                self.set_translation(TranslationMode::Idle);
            }
        }
    }

    /// One control tick. `controls` arrives holding the pilot's input and
    /// leaves clamped.
    pub fn update(&mut self, ctx: &ControlContext<'_>, controls: &mut ControlState, dt: f64) {
        self.time = ctx.time;
        if mem::take(&mut self.neutral_pending) {
            *controls = ControlState::neutral();
        }
        if mem::take(&mut self.translation_reset_pending) {
            controls.translation = Vector3::zeros();
        }

        let was_active = self.is_active();
        let target = match self.resolve_target(ctx.vehicles) {
            Ok(Some(t)) => Some(t),
            Ok(None) if self.needs_target() => {
                self.fail_safe(&GuidanceError::DegenerateGeometry { what: "no target selected" });
                None
            }
            Ok(None) => None,
            Err(err) => {
                self.fail_safe(&err);
                None
            }
        };
        if !self.is_active() {
            if was_active {
                // Neutralised here, so the fail-safe's pending reset is spent.
                *controls = ControlState::neutral();
                self.neutral_pending = false;
                self.translation_reset_pending = false;
            }
            return;
        }

        let snapshot = KinematicSnapshot::new(ctx.own, target, ctx.body_position);
        match (self.orientation, target) {
            (OrientationMode::Manual(goal), _) => self.steer(goal, &snapshot, ctx.own, controls, dt),
            (OrientationMode::AutoAlign { burn_triggered }, Some(t)) => {
                self.auto_align(burn_triggered, ctx.own, t, &snapshot, controls, dt)
            }
            _ => {}
        }
        if let Some(t) = target {
            self.translate(ctx.own, t, controls);
        }
        *controls = controls.clamped();
    }
}

impl Controller for Autopilot {
    fn drive(&mut self, ctx: &ControlContext<'_>, controls: &mut ControlState, dt: f64) {
        self.update(ctx, controls, dt);
    }

    fn reset(&mut self) {
        self.disengage();
        self.attitude.reset();
    }

    fn name(&self) -> &str {
        "Autopilot"
    }
}
