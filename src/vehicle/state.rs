use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::orbital::OrbitState;

/// Stable identity of a vehicle, independent of its position in any list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the body an orbit is referenced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub u32);

// ---------------------------------------------------------------------------
// Vehicle snapshot
// ---------------------------------------------------------------------------

/// One vehicle as reported by the host for the current tick.
///
/// Body frame: +X right, +Y forward (nose), +Z up. `attitude` rotates body
/// vectors into the world frame.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub id: VehicleId,
    pub name: String,
    pub orbit: OrbitState,
    pub position: Vector3<f64>, // m, world
    pub velocity: Vector3<f64>, // m/s, world
    pub attitude: UnitQuaternion<f64>,
    pub landed: bool,
}

impl VehicleState {
    pub fn right(&self) -> Vector3<f64> {
        self.attitude * Vector3::x()
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.attitude * Vector3::y()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.attitude * Vector3::z()
    }

    /// Express a world-frame direction in this vehicle's body frame.
    pub fn to_body(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.attitude.inverse_transform_vector(world)
    }

    /// World-frame point at `offset` in this vehicle's body frame.
    pub fn body_point(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.attitude * offset
    }

    pub fn distance_to(&self, other: &VehicleState) -> f64 {
        (other.position - self.position).norm()
    }
}
