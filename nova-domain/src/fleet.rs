use crate::catalog::{Objective, ResourceKind, ShipKind};
use crate::coordinates::{Coordinate, CoordinateKind};
use crate::error::ValidationError;
use crate::ids::{AcsFleetId, BodyId, FleetId, PlayerId, UniverseId};
use crate::serialize_as_sorted_map;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ShipInFleet {
    pub kind: ShipKind,
    pub count: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ResourceAmount {
    pub resource: ResourceKind,
    pub amount: f64,
}

/// A dispatched group of ships in transit. Timing invariants:
/// `arrival_time = created_at + flight_time` and
/// `return_time = arrival_time + flight_time + deployment`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Fleet {
    pub id: FleetId,
    pub universe: UniverseId,
    pub player: PlayerId,
    pub objective: Objective,
    pub source: BodyId,
    pub source_kind: CoordinateKind,
    pub target_coords: Coordinate,
    /// Absent for objectives that do not need an existing destination
    /// (colonization, harvesting, expedition).
    pub target: Option<BodyId>,
    /// Fraction of the fleet's maximum speed, in (0, 1].
    pub speed: f64,
    pub created_at: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Loiter time at the target, seconds. Nonzero only for objectives that
    /// allow holding position (expedition, ACS defend).
    pub deployment_seconds: i64,
    pub return_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub ships: HashMap<ShipKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub cargo: HashMap<ResourceKind, f64>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub consumption: HashMap<ResourceKind, f64>,
    pub returning: bool,
    pub deployed: bool,
    pub acs: Option<AcsFleetId>,
}

impl Fleet {
    /// Collapses a ship manifest into per-kind counts; duplicate entries sum.
    pub fn aggregate_ships(manifest: &[ShipInFleet]) -> HashMap<ShipKind, u32> {
        let mut ships: HashMap<ShipKind, u32> = HashMap::new();
        for entry in manifest {
            if entry.count > 0 {
                *ships.entry(entry.kind).or_insert(0) += entry.count;
            }
        }
        ships
    }

    /// Collapses a cargo manifest into per-resource amounts; duplicates sum.
    pub fn aggregate_cargo(manifest: &[ResourceAmount]) -> HashMap<ResourceKind, f64> {
        let mut cargo: HashMap<ResourceKind, f64> = HashMap::new();
        for entry in manifest {
            if entry.amount > 0.0 {
                *cargo.entry(entry.resource).or_insert(0.0) += entry.amount;
            }
        }
        cargo
    }

    pub fn flight_time(&self) -> Duration {
        self.arrival_time - self.created_at
    }

    pub fn ship_count(&self, kind: ShipKind) -> u32 {
        self.ships.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_ships(&self) -> u32 {
        self.ships.values().sum()
    }

    pub fn total_cargo(&self) -> f64 {
        self.cargo.values().sum()
    }

    pub fn total_consumption(&self) -> f64 {
        self.consumption.values().sum()
    }

    /// A fleet is due when the wall clock has passed the next leg boundary:
    /// the arrival for an outbound fleet, the return for one heading home.
    /// A holding fleet's return time already contains the hold, so the
    /// `returning` flag wins over `deployed`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.returning {
            now >= self.return_time
        } else if self.deployed {
            false
        } else {
            now >= self.arrival_time
        }
    }

    /// Basic shape checks shared by every objective; the objective-specific
    /// rules live in the core validator.
    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if !(self.speed > 0.0 && self.speed <= 1.0) {
            return Err(ValidationError::InvalidSpeed(self.speed));
        }
        if self.ships.is_empty() || self.total_ships() == 0 {
            return Err(ValidationError::EmptyFleet);
        }
        if let Some((resource, _)) = self.cargo.iter().find(|(_, amount)| **amount <= 0.0) {
            return Err(ValidationError::NonPositiveCargo(*resource));
        }
        Ok(())
    }

    pub fn remove_ships(&mut self, kind: ShipKind, count: u32) {
        let remaining = self.ship_count(kind).saturating_sub(count);
        if remaining == 0 {
            self.ships.remove(&kind);
        } else {
            self.ships.insert(kind, remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> Fleet {
        let created_at = Utc::now();
        Fleet {
            id: FleetId::new(),
            universe: UniverseId::new(),
            player: PlayerId::new(),
            objective: Objective::Transport,
            source: BodyId::new(),
            source_kind: CoordinateKind::World,
            target_coords: Coordinate::new(0, 0, 9, CoordinateKind::World),
            target: Some(BodyId::new()),
            speed: 1.0,
            created_at,
            arrival_time: created_at + Duration::seconds(600),
            deployment_seconds: 0,
            return_time: created_at + Duration::seconds(1_200),
            ships: HashMap::from([(ShipKind::SmallCargo, 5)]),
            cargo: HashMap::from([(ResourceKind::Metal, 1_000.0)]),
            consumption: HashMap::from([(ResourceKind::Deuterium, 12.0)]),
            returning: false,
            deployed: false,
            acs: None,
        }
    }

    #[test]
    fn duplicate_manifest_entries_sum() {
        let ships = Fleet::aggregate_ships(&[
            ShipInFleet {
                kind: ShipKind::SmallCargo,
                count: 3,
            },
            ShipInFleet {
                kind: ShipKind::Recycler,
                count: 1,
            },
            ShipInFleet {
                kind: ShipKind::SmallCargo,
                count: 2,
            },
        ]);
        assert_eq!(ships.get(&ShipKind::SmallCargo), Some(&5));
        assert_eq!(ships.get(&ShipKind::Recycler), Some(&1));

        let cargo = Fleet::aggregate_cargo(&[
            ResourceAmount {
                resource: ResourceKind::Metal,
                amount: 100.0,
            },
            ResourceAmount {
                resource: ResourceKind::Metal,
                amount: 50.0,
            },
        ]);
        assert_eq!(cargo.get(&ResourceKind::Metal), Some(&150.0));
    }

    #[test]
    fn marshalling_round_trips_all_observable_fields() {
        let original = fleet();
        let raw = serde_json::to_string(&original).unwrap();
        let back: Fleet = serde_json::from_str(&raw).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn due_follows_the_active_leg() {
        let mut f = fleet();
        assert!(!f.is_due(f.created_at));
        assert!(f.is_due(f.arrival_time));

        f.returning = true;
        assert!(!f.is_due(f.arrival_time));
        assert!(f.is_due(f.return_time));

        f.deployed = true;
        assert!(!f.is_due(f.return_time));
    }

    #[test]
    fn shape_validation_catches_the_obvious() {
        let mut f = fleet();
        f.speed = 1.2;
        assert!(matches!(f.validate_shape(), Err(ValidationError::InvalidSpeed(_))));

        let mut f = fleet();
        f.ships.clear();
        assert_eq!(f.validate_shape(), Err(ValidationError::EmptyFleet));

        let mut f = fleet();
        f.cargo.insert(ResourceKind::Crystal, 0.0);
        assert_eq!(f.validate_shape(), Err(ValidationError::NonPositiveCargo(ResourceKind::Crystal)));
    }
}
