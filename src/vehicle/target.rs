use super::state::{VehicleId, VehicleState};
use crate::error::{GuidanceError, Result};

/// The chosen target: a stable id plus the index it was last seen at.
///
/// The host's vehicle list can be reordered or shrink at any time, so the
/// cached index is only a hint and is checked on every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSelection {
    id: VehicleId,
    index: usize,
}

impl TargetSelection {
    /// Select `id` from `vehicles`, recording where it currently sits.
    pub fn select(vehicles: &[VehicleState], id: VehicleId) -> Result<Self> {
        vehicles
            .iter()
            .position(|v| v.id == id)
            .map(|index| Self { id, index })
            .ok_or(GuidanceError::StaleTarget { id })
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Confirm the cached index still holds the target, searching the whole
    /// list if it moved. Returns the current index.
    pub fn revalidate(&mut self, vehicles: &[VehicleState]) -> Result<usize> {
        if vehicles.get(self.index).is_some_and(|v| v.id == self.id) {
            return Ok(self.index);
        }
        let index = vehicles
            .iter()
            .position(|v| v.id == self.id)
            .ok_or(GuidanceError::StaleTarget { id: self.id })?;
        self.index = index;
        Ok(index)
    }

    /// Revalidate and borrow the target's state.
    pub fn resolve<'a>(&mut self, vehicles: &'a [VehicleState]) -> Result<&'a VehicleState> {
        let index = self.revalidate(vehicles)?;
        Ok(&vehicles[index])
    }
}

/// Vehicles worth offering as targets, nearest first: not ourselves, not
/// landed, and orbiting the same body.
pub fn candidate_targets<'a>(own: &VehicleState, vehicles: &'a [VehicleState]) -> Vec<&'a VehicleState> {
    let mut candidates: Vec<&VehicleState> = vehicles
        .iter()
        .filter(|v| v.id != own.id)
        .filter(|v| !v.landed)
        .filter(|v| v.orbit.reference_body == own.orbit.reference_body)
        .collect();
    candidates.sort_by(|a, b| own.distance_to(a).total_cmp(&own.distance_to(b)));
    candidates
}
