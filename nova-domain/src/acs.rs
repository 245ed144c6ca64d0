use crate::catalog::Objective;
use crate::coordinates::CoordinateKind;
use crate::error::ValidationError;
use crate::fleet::Fleet;
use crate::ids::{AcsFleetId, BodyId, FleetId, UniverseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A synchronized group of independently owned fleets converging on one
/// target at the same instant. Component order is join order, which also
/// fixes the firing order when the engagement resolves.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AcsFleet {
    pub id: AcsFleetId,
    pub universe: UniverseId,
    pub objective: Objective,
    pub target: BodyId,
    pub target_kind: CoordinateKind,
    pub components: Vec<FleetId>,
    pub arrival_time: DateTime<Utc>,
}

impl AcsFleet {
    /// Seeds a new operation from its first fleet.
    pub fn from_seed(fleet: &Fleet) -> Result<AcsFleet, ValidationError> {
        if fleet.acs.is_some() {
            return Err(ValidationError::AlreadyInAcs);
        }
        let target = fleet.target.ok_or(ValidationError::TargetBodyRequired(fleet.objective))?;

        Ok(AcsFleet {
            id: AcsFleetId::new(),
            universe: fleet.universe,
            objective: fleet.objective,
            target,
            target_kind: fleet.target_coords.kind,
            components: vec![fleet.id],
            arrival_time: fleet.arrival_time,
        })
    }

    /// Parity checks for a candidate component: same universe, objective,
    /// target body and target kind, not already grouped, no cargo on board.
    pub fn check_parity(&self, fleet: &Fleet) -> Result<(), ValidationError> {
        if fleet.acs.is_some() {
            return Err(ValidationError::AlreadyInAcs);
        }
        if fleet.universe != self.universe {
            return Err(ValidationError::AcsComponentMismatch("universe"));
        }
        if fleet.objective != self.objective {
            return Err(ValidationError::AcsComponentMismatch("objective"));
        }
        if fleet.target != Some(self.target) {
            return Err(ValidationError::AcsComponentMismatch("target"));
        }
        if fleet.target_coords.kind != self.target_kind {
            return Err(ValidationError::AcsComponentMismatch("target kind"));
        }
        if !fleet.cargo.is_empty() {
            return Err(ValidationError::AcsCargoForbidden);
        }
        Ok(())
    }

    pub fn contains(&self, fleet: FleetId) -> bool {
        self.components.contains(&fleet)
    }
}
