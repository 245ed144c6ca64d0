use crate::catalog::{BuildingKind, DefenseKind, ResourceKind, ShipKind, TechnologyKind};
use crate::fight::{FightOutcome, MoonCreation};
use crate::ids::{BodyId, FleetId, PlayerId, ReportId, UniverseId};
use crate::serialize_as_sorted_map;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How much an espionage run reveals. Higher tiers include every section of
/// the tiers below them; materials are always visible.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
pub enum InfoTier {
    Materials,
    Fleets,
    Defense,
    Buildings,
    Research,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EspionageReport {
    pub id: ReportId,
    pub universe: UniverseId,
    pub spy: PlayerId,
    pub target_player: PlayerId,
    pub target: BodyId,
    pub date: DateTime<Utc>,
    pub tier: InfoTier,
    pub counter_espionage: f64,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub materials: HashMap<ResourceKind, f64>,
    pub fleets: Option<HashMap<ShipKind, u32>>,
    pub defenses: Option<HashMap<DefenseKind, u32>>,
    pub buildings: Option<HashMap<BuildingKind, u32>>,
    pub technologies: Option<HashMap<TechnologyKind, u32>>,
}

/// One participant's view of a resolved fight, attacker and defender alike.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FightReport {
    pub id: ReportId,
    pub universe: UniverseId,
    pub player: PlayerId,
    pub fleet: Option<FleetId>,
    pub body: BodyId,
    pub date: DateTime<Utc>,
    pub outcome: FightOutcome,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub debris: HashMap<ResourceKind, f64>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub pillage: HashMap<ResourceKind, f64>,
    pub moon: Option<MoonCreation>,
}

/// Payload of the single planet-side aftermath write of a fight. Carries
/// the per-participant reports so they commit with the mutations.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PlanetFightAftermath {
    pub body: BodyId,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub ships_remaining: HashMap<ShipKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub defenses_remaining: HashMap<DefenseKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub pillage: HashMap<ResourceKind, f64>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub debris: HashMap<ResourceKind, f64>,
    pub moon: Option<MoonCreation>,
    pub date: DateTime<Utc>,
    pub reports: Vec<FightReport>,
}

/// Outcome of a destroy mission, persisted by the `fleet_destroy` script.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DestroyOutcome {
    pub fleet: FleetId,
    pub moon: BodyId,
    pub moon_destroyed: bool,
    pub deathstars_destroyed: bool,
    pub date: DateTime<Utc>,
}

/// Per-attacker-fleet aftermath write: surviving ships and the cargo now on
/// board (original load plus the fleet's pillage share).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FleetFightAftermath {
    pub fleet: FleetId,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub ships_remaining: HashMap<ShipKind, u32>,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub cargo: HashMap<ResourceKind, f64>,
    pub destroyed: bool,
}
