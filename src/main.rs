use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use nalgebra::{UnitQuaternion, Vector3};

use rendezvous_gnc::gnc::{heading, ControlGoal, KinematicSnapshot, OrientationMode, TranslationMode};
use rendezvous_gnc::orbital::OrbitState;
use rendezvous_gnc::sim::{simulate_with, vehicle_on_orbit, FlightHost, Guidance, Scenario, SimConfig, SimOutput};
use rendezvous_gnc::vehicle::{candidate_targets, BodyId, VehicleId};
use rendezvous_gnc::GuidanceConfig;

const MU: f64 = 3.5316e12; // m^3/s^2, Kerbin
const BODY: BodyId = BodyId(1);
const CHASER: VehicleId = VehicleId(1);
const STATION: VehicleId = VehicleId(2);
const RULE: &str = "──────────────────────────────────────────────────────────────────";

#[derive(Parser, Debug)]
#[command(author, version, about = "Rendezvous guidance demo: plane change and velocity kill")]
struct Cli {
    /// Guidance tuning file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Length of the AutoAlign run, s
    #[arg(long, default_value_t = 180.0)]
    align_time: f64,

    /// Length of the velocity-kill run, s
    #[arg(long, default_value_t = 12.0)]
    kill_time: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GuidanceConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GuidanceConfig::default(),
    };

    println!();
    println!("====================================================================");
    println!("  RENDEZVOUS GUIDANCE DEMO");
    println!("====================================================================");

    plane_change(&config, cli.align_time)?;
    velocity_kill(&config, cli.kill_time)?;

    println!("====================================================================");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Part 1: sync table, node timing and an AutoAlign plane change
// ---------------------------------------------------------------------------

fn plane_change(config: &GuidanceConfig, align_time: f64) -> anyhow::Result<()> {
    let ship = OrbitState::circular(BODY, 700_000.0, 5.0, 0.0, 340.0, MU)?;
    let station = OrbitState::from_elements(BODY, 720_000.0, 0.01, 3.0, 0.0, 30.0, 60.0, MU)?;
    let own = vehicle_on_orbit(CHASER, "Chaser", ship, MU, UnitQuaternion::identity())?;
    let other = vehicle_on_orbit(STATION, "Station", station, MU, UnitQuaternion::identity())?;
    let mut world = Scenario::new(MU, own, vec![other]);

    // Start pointing prograde.
    let snapshot = KinematicSnapshot::new(world.own_vehicle(), None, world.body_position());
    if let Some(h) = heading(ControlGoal::Prograde, &snapshot)? {
        world.own_mut().attitude = h.rotation();
    }

    println!();
    println!("  Vehicles");
    println!("  {RULE}");
    println!("  {:>4}  {:<10}  {:>10}  {:>7}  {:>7}  {:>8}", "id", "name", "sma (km)", "ecc", "inc", "period");
    for v in world.vehicles() {
        println!(
            "  {:>4}  {:<10}  {:>10.1}  {:>7.4}  {:>7.2}  {:>8.0}",
            v.id.to_string(),
            v.name,
            v.orbit.semi_major_axis / 1000.0,
            v.orbit.eccentricity,
            v.orbit.inclination,
            v.orbit.period
        );
    }
    let targets = candidate_targets(world.own_vehicle(), world.vehicles());
    if let Some(nearest) = targets.first() {
        println!("  Nearest target: {} ({:.1} km)", nearest.name, world.own_vehicle().distance_to(nearest) / 1000.0);
    }

    let mut guidance = Guidance::new(config);
    guidance.select_target(&world, STATION)?;
    guidance.planning_tick(&world);

    // One table per rendezvous point; four presses of the mode button come
    // back to the configured one.
    for _ in 0..4 {
        println!();
        println!("  Closest Approach ({})", guidance.synchronizer.mode);
        println!("  {RULE}");
        if let Some(sync) = guidance.status().sync {
            println!("{sync}");
        }
        guidance.synchronizer.cycle_mode();
        guidance.planning_tick(&world);
    }

    let status = guidance.status();
    println!();
    println!("  Relative Nodes");
    println!("  {RULE}");
    if let Some(a) = status.alignment {
        println!("  Time to AN:    {:>8.1} s     Time to DN:   {:>8.1} s", a.time_to_an, a.time_to_dn);
        println!("  Rel. inclination: {:>6.3} deg", a.relative_inclination);
    }

    guidance.autopilot.toggle_auto_align();
    let sim = SimConfig { dt: 0.02, max_time: align_time, planning_interval: 0.5 };
    let out = simulate_with(&mut world, &mut guidance, &sim)?;

    print_events(&out);

    println!("  AutoAlign Trace");
    println!("  {RULE}");
    println!(
        "  {:>7}  {:>10}  {:>9}  {:>9}  {:>8}  {:>9}",
        "t (s)", "goal", "err (deg)", "throttle", "rel inc", "mode"
    );
    println!("  {}", "─".repeat(62));
    let every = (out.trace.len() / 30).max(1);
    for (i, s) in out.trace.iter().enumerate() {
        if i % every != 0 && i != out.trace.len() - 1 {
            continue;
        }
        let mode = match s.autopilot.orientation {
            OrientationMode::Idle => "IDLE",
            OrientationMode::Manual(_) => "MANUAL",
            OrientationMode::AutoAlign { burn_triggered: false } => "ALIGN",
            OrientationMode::AutoAlign { burn_triggered: true } => "BURN",
        };
        println!(
            "  {:>7.2}  {:>10}  {:>9.2}  {:>9.2}  {:>8.3}  {:>9}",
            s.time,
            s.autopilot.goal.to_string(),
            s.autopilot.attitude_error_deg,
            s.controls.throttle,
            s.relative_inclination.unwrap_or(f64::NAN),
            mode
        );
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Part 2: killing relative velocity next to the station
// ---------------------------------------------------------------------------

fn velocity_kill(config: &GuidanceConfig, kill_time: f64) -> anyhow::Result<()> {
    let station = OrbitState::circular(BODY, 700_000.0, 0.0, 0.0, 0.0, MU)?;
    let ship = OrbitState::circular(BODY, 700_000.0, 0.0, 0.0, 0.01, MU)?;
    let mut own = vehicle_on_orbit(CHASER, "Chaser", ship, MU, UnitQuaternion::from_euler_angles(0.4, -0.3, 1.2))?;
    own.velocity += Vector3::new(1.2, 0.0, -0.9);
    own.orbit = OrbitState::from_state_vector(BODY, &own.position, &own.velocity, MU)?;
    let other = vehicle_on_orbit(STATION, "Station", station, MU, UnitQuaternion::identity())?;
    let mut world = Scenario::new(MU, own, vec![other]);

    let mut guidance = Guidance::new(config);
    guidance.select_target(&world, STATION)?;
    guidance.autopilot.toggle_translation(TranslationMode::KillVelocity);
    let sim = SimConfig { dt: 0.02, max_time: kill_time, planning_interval: 0.5 };
    let out = simulate_with(&mut world, &mut guidance, &sim)?;

    println!("  Velocity Kill");
    println!("  {RULE}");
    println!(
        "  {:>7}  {:>9}  {:>10}  {:>7}  {:>7}  {:>7}",
        "t (s)", "range (m)", "rel v(m/s)", "right", "fwd", "up"
    );
    println!("  {}", "─".repeat(56));
    let every = (out.trace.len() / 20).max(1);
    for (i, s) in out.trace.iter().enumerate() {
        if i % every != 0 && i != out.trace.len() - 1 {
            continue;
        }
        let (range, speed) = s.range.unwrap_or((f64::NAN, f64::NAN));
        let t = s.controls.translation;
        println!(
            "  {:>7.2}  {:>9.1}  {:>10.3}  {:>7.2}  {:>7.2}  {:>7.2}",
            s.time, range, speed, t.x, t.y, t.z
        );
    }
    print_events(&out);
    Ok(())
}

fn print_events(out: &SimOutput) {
    println!();
    println!("  Autopilot Events");
    println!("  {RULE}");
    for e in &out.events {
        println!("  t={:>7.2}s   {}", e.time, e.kind);
    }
    println!();
}
