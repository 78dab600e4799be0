use log::debug;

use super::event::AutopilotEvent;
use super::host::{ControlSink, FlightHost};
use crate::config::GuidanceConfig;
use crate::error::Result;
use crate::gnc::{Autopilot, AutopilotState, ControlContext, ControlState, Controller};
use crate::planning::{PlaneAligner, PlaneAlignment, SyncPrediction, Synchronizer};
use crate::vehicle::{VehicleId, VehicleState};

// ---------------------------------------------------------------------------
// Tick driver
// ---------------------------------------------------------------------------

/// Seconds since `last`, and remember `now`. The first call yields 0.
fn elapsed(last: &mut Option<f64>, now: f64) -> f64 {
    let dt = last.map_or(0.0, |t| (now - t).max(0.0));
    *last = Some(now);
    dt
}

/// Run one controller step on top of the pilot's input.
pub fn drive_controller(controller: &mut dyn Controller, host: &dyn FlightHost, dt: f64) -> ControlState {
    let ctx = ControlContext {
        own: host.own_vehicle(),
        vehicles: host.vehicles(),
        body_position: host.body_position(),
        time: host.elapsed_sim_time(),
    };
    let mut controls = host.pilot_input();
    controller.drive(&ctx, &mut controls, dt);
    controls.clamped()
}

/// Display values the host shows alongside its own UI.
#[derive(Debug, Clone)]
pub struct GuidanceStatus<'a> {
    pub autopilot: AutopilotState,
    pub sync: Option<&'a SyncPrediction>,
    pub alignment: Option<&'a PlaneAlignment>,
}

/// The guidance core as the host sees it: a planning tick and a control
/// tick, both driven by sim time.
#[derive(Debug, Clone)]
pub struct Guidance {
    pub autopilot: Autopilot,
    pub synchronizer: Synchronizer,
    aligner: PlaneAligner,
    last_planning: Option<f64>,
    last_control: Option<f64>,
}

impl Guidance {
    pub fn new(config: &GuidanceConfig) -> Self {
        Self {
            autopilot: Autopilot::new(config),
            synchronizer: Synchronizer::new(config.sync.mode, config.sync.interval),
            aligner: PlaneAligner::new(),
            last_planning: None,
            last_control: None,
        }
    }

    /// Pick a new target; display tables restart from scratch.
    pub fn select_target(&mut self, host: &dyn FlightHost, id: VehicleId) -> Result<()> {
        self.autopilot.select_target(host.vehicles(), id)?;
        self.synchronizer.clear();
        self.aligner.clear();
        Ok(())
    }

    fn planning_target<'a>(&self, host: &'a dyn FlightHost) -> Option<&'a VehicleState> {
        let id = self.autopilot.target()?;
        host.vehicles().iter().find(|v| v.id == id)
    }

    /// Low-rate tick: refresh the sync table and node timing.
    pub fn planning_tick(&mut self, host: &dyn FlightHost) {
        let dt = elapsed(&mut self.last_planning, host.elapsed_sim_time());
        let Some(target) = self.planning_target(host) else {
            self.synchronizer.clear();
            self.aligner.clear();
            return;
        };
        let ship = host.own_vehicle();
        self.synchronizer.update(&ship.orbit, &target.orbit, dt);
        self.aligner.update(&ship.orbit, &target.orbit);
    }

    /// High-rate tick: compute this tick's actuator command.
    pub fn compute_controls(&mut self, host: &dyn FlightHost) -> ControlState {
        let dt = elapsed(&mut self.last_control, host.elapsed_sim_time());
        drive_controller(&mut self.autopilot, host, dt)
    }

    /// High-rate tick: compute and hand the command to `sink`.
    pub fn control_tick(&mut self, host: &dyn FlightHost, sink: &mut dyn ControlSink) {
        let controls = self.compute_controls(host);
        sink.submit(&controls);
    }

    pub fn status(&self) -> GuidanceStatus<'_> {
        GuidanceStatus {
            autopilot: self.autopilot.state(),
            sync: self.synchronizer.prediction(),
            alignment: self.aligner.alignment(),
        }
    }
}

// ---------------------------------------------------------------------------
// Closed-loop simulation
// ---------------------------------------------------------------------------

/// A world that can be stepped forward: host and actuator sink in one.
pub trait Plant: FlightHost + ControlSink {
    fn advance(&mut self, dt: f64) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Control tick, s.
    pub dt: f64,
    pub max_time: f64,
    /// Planning tick, s; rounded to a whole number of control ticks.
    pub planning_interval: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { dt: 0.02, max_time: 60.0, planning_interval: 0.5 }
    }
}

/// One control tick of a simulated run.
#[derive(Debug, Clone)]
pub struct TraceSample {
    pub time: f64,
    pub controls: ControlState,
    pub autopilot: AutopilotState,
    pub relative_inclination: Option<f64>,
    /// Distance and relative speed to the target, if one is selected.
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct SimOutput {
    pub trace: Vec<TraceSample>,
    pub events: Vec<AutopilotEvent>,
}

/// Fly `guidance` inside `plant` for `config.max_time` seconds.
pub fn simulate_with<P: Plant>(plant: &mut P, guidance: &mut Guidance, config: &SimConfig) -> Result<SimOutput> {
    let steps = (config.max_time / config.dt).round() as usize;
    let plan_every = ((config.planning_interval / config.dt).round() as usize).max(1);
    let mut out = SimOutput { trace: Vec::with_capacity(steps.min(200_000)), events: Vec::new() };

    for step in 0..steps {
        if step % plan_every == 0 {
            guidance.planning_tick(&*plant);
        }
        let controls = guidance.compute_controls(&*plant);
        plant.submit(&controls);

        let ship = plant.own_vehicle();
        let range = guidance
            .planning_target(&*plant)
            .map(|t| (ship.distance_to(t), (ship.velocity - t.velocity).norm()));
        out.trace.push(TraceSample {
            time: plant.elapsed_sim_time(),
            controls,
            autopilot: guidance.autopilot.state(),
            relative_inclination: guidance.status().alignment.map(|a| a.relative_inclination),
            range,
        });
        out.events.extend(guidance.autopilot.drain_events());

        plant.advance(config.dt)?;
    }
    debug!("simulated {steps} ticks, {} events", out.events.len());
    Ok(out)
}
