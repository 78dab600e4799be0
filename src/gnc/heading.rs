use std::fmt;

use nalgebra::{Matrix3, Rotation3, Unit, UnitQuaternion, Vector3};

use crate::error::{GuidanceError, Result};
use crate::vehicle::VehicleState;

// Shorter vectors carry no usable direction.
const MIN_LENGTH: f64 = 1e-6;

/// Whether a goal points along its reference vector or against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Toward,
    Away,
}

impl Sense {
    fn sign(self) -> f64 {
        match self {
            Sense::Toward => 1.0,
            Sense::Away => -1.0,
        }
    }
}

/// Orientation goal for the attitude loop. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlGoal {
    #[default]
    Off,
    /// Along the ship's velocity relative to the target.
    RelativeVelocity(Sense),
    /// Along the line of sight to the target.
    Target(Sense),
    /// Along the orbit's angular momentum (`Away` = anti-normal).
    OrbitNormal(Sense),
    /// Parallel to the target's own nose.
    MatchTarget(Sense),
    Prograde,
    Retrograde,
}

impl ControlGoal {
    /// Whether the goal needs a live target to build its heading.
    pub fn needs_target(self) -> bool {
        matches!(
            self,
            ControlGoal::RelativeVelocity(_) | ControlGoal::Target(_) | ControlGoal::MatchTarget(_)
        )
    }
}

impl fmt::Display for ControlGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caption = match self {
            ControlGoal::Off => "Off",
            ControlGoal::RelativeVelocity(Sense::Toward) => "RVel+",
            ControlGoal::RelativeVelocity(Sense::Away) => "RVel-",
            ControlGoal::Target(Sense::Toward) => "TGT+",
            ControlGoal::Target(Sense::Away) => "TGT-",
            ControlGoal::OrbitNormal(Sense::Toward) => "NML+",
            ControlGoal::OrbitNormal(Sense::Away) => "NML-",
            ControlGoal::MatchTarget(Sense::Toward) => "Match+",
            ControlGoal::MatchTarget(Sense::Away) => "Match-",
            ControlGoal::Prograde => "Prograde",
            ControlGoal::Retrograde => "Retrograde",
        };
        f.write_str(caption)
    }
}

// ---------------------------------------------------------------------------
// Kinematic snapshot
// ---------------------------------------------------------------------------

/// World-frame kinematics the heading constructions read from.
#[derive(Debug, Clone)]
pub struct KinematicSnapshot {
    pub ship_position: Vector3<f64>,
    pub ship_velocity: Vector3<f64>,
    pub body_position: Vector3<f64>,
    pub target: Option<TargetKinematics>,
}

#[derive(Debug, Clone)]
pub struct TargetKinematics {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
}

impl KinematicSnapshot {
    pub fn new(ship: &VehicleState, target: Option<&VehicleState>, body_position: Vector3<f64>) -> Self {
        Self {
            ship_position: ship.position,
            ship_velocity: ship.velocity,
            body_position,
            target: target.map(|t| TargetKinematics {
                position: t.position,
                velocity: t.velocity,
                attitude: t.attitude,
            }),
        }
    }

    /// Away from the body's centre.
    pub fn radial_up(&self) -> Vector3<f64> {
        self.ship_position - self.body_position
    }

    /// Orbital angular momentum direction.
    pub fn orbit_normal(&self) -> Vector3<f64> {
        self.radial_up().cross(&self.ship_velocity)
    }

    /// Ship velocity relative to the target.
    pub fn relative_velocity(&self) -> Option<Vector3<f64>> {
        self.target.as_ref().map(|t| self.ship_velocity - t.velocity)
    }

    /// Line of sight from ship to target.
    pub fn target_vector(&self) -> Option<Vector3<f64>> {
        self.target.as_ref().map(|t| t.position - self.ship_position)
    }

    fn target(&self) -> Result<&TargetKinematics> {
        self.target.as_ref().ok_or_else(no_target)
    }
}

fn no_target() -> GuidanceError {
    GuidanceError::DegenerateGeometry { what: "goal needs a target" }
}

// ---------------------------------------------------------------------------
// Heading
// ---------------------------------------------------------------------------

/// Desired forward/up pair; `up` is kept orthogonal to `forward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    pub forward: Unit<Vector3<f64>>,
    pub up: Unit<Vector3<f64>>,
}

impl Heading {
    pub fn new(forward: Vector3<f64>, up: Vector3<f64>) -> Result<Self> {
        if forward.iter().chain(up.iter()).any(|c| !c.is_finite()) {
            return Err(GuidanceError::DegenerateGeometry { what: "non-finite heading vector" });
        }
        let f = Unit::try_new(forward, MIN_LENGTH)
            .ok_or(GuidanceError::DegenerateGeometry { what: "zero-length forward vector" })?
            .into_inner();
        let u = Unit::try_new(up, MIN_LENGTH)
            .ok_or(GuidanceError::DegenerateGeometry { what: "zero-length up vector" })?
            .into_inner();
        let ortho = u - f * f.dot(&u);
        let up = Unit::try_new(ortho, MIN_LENGTH)
            .ok_or(GuidanceError::DegenerateGeometry { what: "up parallel to forward" })?;
        Ok(Self { forward: Unit::new_unchecked(f), up })
    }

    /// Body-to-world rotation that puts the nose on `forward` and the top on `up`.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let right = self.forward.into_inner().cross(&self.up.into_inner());
        let m = Matrix3::from_columns(&[right, self.forward.into_inner(), self.up.into_inner()]);
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
    }
}

/// Heading with `up` derived from the ship's velocity, falling back to
/// radial up when the two are parallel.
fn heading_with_velocity_up(forward: Vector3<f64>, snap: &KinematicSnapshot) -> Result<Heading> {
    let up = forward.cross(&snap.ship_velocity);
    Heading::new(forward, up).or_else(|_| Heading::new(forward, snap.radial_up()))
}

/// Map a goal and the current kinematics to the heading it asks for.
/// `Off` asks for nothing.
pub fn heading(goal: ControlGoal, snap: &KinematicSnapshot) -> Result<Option<Heading>> {
    let heading = match goal {
        ControlGoal::Off => return Ok(None),
        ControlGoal::RelativeVelocity(sense) => {
            let rel = snap.relative_velocity().ok_or_else(no_target)?;
            heading_with_velocity_up(rel * sense.sign(), snap)?
        }
        ControlGoal::Target(sense) => {
            let los = snap.target_vector().ok_or_else(no_target)?;
            heading_with_velocity_up(los * sense.sign(), snap)?
        }
        ControlGoal::OrbitNormal(sense) => {
            Heading::new(snap.orbit_normal() * sense.sign(), snap.radial_up())?
        }
        ControlGoal::MatchTarget(sense) => {
            let t = snap.target()?;
            Heading::new(t.attitude * Vector3::y() * sense.sign(), t.attitude * Vector3::z())?
        }
        ControlGoal::Prograde => Heading::new(snap.ship_velocity, snap.radial_up())?,
        ControlGoal::Retrograde => Heading::new(-snap.ship_velocity, snap.radial_up())?,
    };
    Ok(Some(heading))
}
