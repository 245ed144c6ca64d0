use crate::catalog::{BuildingKind, DefenseKind, ResourceKind, ShipKind, TechnologyKind};
use crate::coordinates::{Coordinate, CoordinateKind};
use crate::error::ValidationError;
use crate::ids::{BodyId, PlayerId, UniverseId};
use crate::serialize_as_sorted_map;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stock, cap and hourly production of one resource on a body.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSlot {
    pub stock: f64,
    pub storage_capacity: f64,
    pub production: f64,
}

/// In-memory snapshot of a planet or moon, loaded once per mission while the
/// body's lock is held. The owner's researched technology levels are copied
/// in so fleet logic never reaches back to the player row.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CelestialBody {
    pub id: BodyId,
    pub universe: UniverseId,
    pub player: PlayerId,
    pub coordinate: Coordinate,
    pub name: String,
    pub diameter: u32,
    pub min_temperature: i32,
    pub max_temperature: i32,
    pub fields: u32,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub resources: HashMap<ResourceKind, ResourceSlot>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub buildings: HashMap<BuildingKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub ships: HashMap<ShipKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub defenses: HashMap<DefenseKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub technologies: HashMap<TechnologyKind, u32>,
}

impl CelestialBody {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_temperature - self.min_temperature != 50 {
            return Err(ValidationError::InvalidTemperatureBand);
        }

        let built: u32 = self.buildings.values().sum();
        if built > self.fields {
            return Err(ValidationError::FieldsExceeded { built, fields: self.fields });
        }

        if self.resources.values().any(|slot| slot.stock < 0.0) {
            return Err(ValidationError::NegativeStock);
        }

        Ok(())
    }

    pub fn is_moon(&self) -> bool {
        self.coordinate.kind == CoordinateKind::Moon
    }

    pub fn technology(&self, kind: TechnologyKind) -> u32 {
        self.technologies.get(&kind).copied().unwrap_or(0)
    }

    pub fn ship_count(&self, kind: ShipKind) -> u32 {
        self.ships.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_ships(&self) -> u32 {
        self.ships.values().sum()
    }

    pub fn stock(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).map(|slot| slot.stock).unwrap_or(0.0)
    }

    /// Withdraws `amount` of `kind`; the caller must have checked the stock.
    pub fn remove_resource(&mut self, kind: ResourceKind, amount: f64) -> Result<(), ValidationError> {
        let slot = self.resources.entry(kind).or_default();
        if slot.stock < amount {
            return Err(ValidationError::InsufficientResources {
                resource: kind,
                available: slot.stock,
                needed: amount,
            });
        }
        slot.stock -= amount;
        Ok(())
    }

    /// Deposits `amount` of `kind`, clipped at the storage cap.
    pub fn add_resource(&mut self, kind: ResourceKind, amount: f64) {
        let slot = self.resources.entry(kind).or_default();
        slot.stock += amount;
        if slot.storage_capacity > 0.0 {
            slot.stock = slot.stock.min(slot.storage_capacity);
        }
    }

    pub fn remove_ships(&mut self, kind: ShipKind, count: u32) -> Result<(), ValidationError> {
        let available = self.ship_count(kind);
        if available < count {
            return Err(ValidationError::InsufficientShips {
                ship: kind,
                available,
                needed: count,
            });
        }
        if available == count {
            self.ships.remove(&kind);
        } else {
            self.ships.insert(kind, available - count);
        }
        Ok(())
    }

    pub fn add_ships(&mut self, kind: ShipKind, count: u32) {
        if count > 0 {
            *self.ships.entry(kind).or_insert(0) += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BodyId, PlayerId, UniverseId};

    fn body() -> CelestialBody {
        CelestialBody {
            id: BodyId::new(),
            universe: UniverseId::new(),
            player: PlayerId::new(),
            coordinate: Coordinate::new(0, 0, 7, CoordinateKind::World),
            name: "homeworld".to_string(),
            diameter: 12_800,
            min_temperature: -10,
            max_temperature: 40,
            fields: 163,
            resources: HashMap::from([(
                ResourceKind::Metal,
                ResourceSlot {
                    stock: 1_000.0,
                    storage_capacity: 10_000.0,
                    production: 30.0,
                },
            )]),
            buildings: HashMap::from([(BuildingKind::MetalMine, 12), (BuildingKind::Shipyard, 4)]),
            ships: HashMap::from([(ShipKind::SmallCargo, 3)]),
            defenses: HashMap::new(),
            technologies: HashMap::from([(TechnologyKind::CombustionDrive, 6)]),
        }
    }

    #[test]
    fn validate_accepts_a_regular_body() {
        assert!(body().validate().is_ok());
    }

    #[test]
    fn validate_rejects_overbuilt_bodies() {
        let mut overbuilt = body();
        overbuilt.fields = 10;
        assert!(matches!(overbuilt.validate(), Err(ValidationError::FieldsExceeded { built: 16, fields: 10 })));
    }

    #[test]
    fn validate_rejects_a_broken_temperature_band() {
        let mut odd = body();
        odd.min_temperature = -50;
        assert_eq!(odd.validate(), Err(ValidationError::InvalidTemperatureBand));
    }

    #[test]
    fn resource_withdrawal_checks_the_stock() {
        let mut b = body();
        assert!(b.remove_resource(ResourceKind::Metal, 400.0).is_ok());
        assert_eq!(b.stock(ResourceKind::Metal), 600.0);
        assert!(b.remove_resource(ResourceKind::Metal, 601.0).is_err());
    }

    #[test]
    fn deposits_are_clipped_at_the_storage_cap() {
        let mut b = body();
        b.add_resource(ResourceKind::Metal, 50_000.0);
        assert_eq!(b.stock(ResourceKind::Metal), 10_000.0);
    }

    #[test]
    fn removing_the_last_ships_clears_the_entry() {
        let mut b = body();
        assert!(b.remove_ships(ShipKind::SmallCargo, 4).is_err());
        assert!(b.remove_ships(ShipKind::SmallCargo, 3).is_ok());
        assert!(!b.ships.contains_key(&ShipKind::SmallCargo));
    }
}
