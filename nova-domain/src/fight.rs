use crate::catalog::{DefenseKind, ResourceKind, ShipKind};
use crate::ids::{BodyId, FleetId};
use crate::serialize_as_sorted_map;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A ship group as it enters combat, with the owner's technology multipliers
/// already folded into the stats.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ShipInFight {
    pub fleet: FleetId,
    pub kind: ShipKind,
    pub count: u32,
    pub cargo_capacity: f64,
    pub shield: f64,
    pub weapon: f64,
    pub hull: f64,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub rapid_fire_ships: HashMap<ShipKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub rapid_fire_defenses: HashMap<DefenseKind, u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DefenseInFight {
    pub body: BodyId,
    pub kind: DefenseKind,
    pub count: u32,
    pub shield: f64,
    pub weapon: f64,
    pub hull: f64,
}

/// One attacking wave: the ships of a single fleet. The position in
/// `Attacker::units` fixes the firing order (ACS join order).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FleetUnits {
    pub fleet: FleetId,
    pub ships: Vec<ShipInFight>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Attacker {
    pub units: Vec<FleetUnits>,
}

impl Attacker {
    pub fn total_ships(&self) -> u32 {
        self.units.iter().flat_map(|wave| wave.ships.iter()).map(|group| group.count).sum()
    }
}

/// Everything standing on the target: the body's own ships, reinforcements
/// parked there by ACS-defend fleets, and the stationary defenses.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Defender {
    pub indigenous: Vec<ShipInFight>,
    pub reinforcements: Vec<ShipInFight>,
    pub defenses: Vec<DefenseInFight>,
}

impl Defender {
    pub fn total_units(&self) -> u32 {
        let ships: u32 = self.indigenous.iter().chain(self.reinforcements.iter()).map(|group| group.count).sum();
        let defenses: u32 = self.defenses.iter().map(|group| group.count).sum();
        ships + defenses
    }
}

/// Outcome from the defender's point of view: `Victory` means the attacker
/// was wiped out, `Loss` means the defender was.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FightOutcome {
    Victory,
    Draw,
    Loss,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct MoonCreation {
    pub diameter: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FightResult {
    pub outcome: FightOutcome,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub debris: HashMap<ResourceKind, f64>,
    pub moon: Option<MoonCreation>,
    pub date: DateTime<Utc>,
}

impl FightResult {
    pub fn total_debris(&self) -> f64 {
        self.debris.values().sum()
    }
}
