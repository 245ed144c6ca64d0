use crate::missions::MissionEnv;
use chrono::{Duration, Utc};
use nova_domain::{
    BodyId, BuildingKind, CelestialBody, Coordinate, CoordinateKind, DebrisField, DebrisFieldId, Fleet, FleetId, Objective, PlayerId, ResourceKind,
    ResourceSlot, ShipKind, TechnologyKind, Universe,
};
use nova_store::bmc::{InMemoryBmc, SharedState};
use std::collections::HashMap;
use std::sync::Arc;

pub fn default_technologies() -> HashMap<TechnologyKind, u32> {
    HashMap::from([
        (TechnologyKind::CombustionDrive, 6),
        (TechnologyKind::ImpulseDrive, 4),
        (TechnologyKind::HyperspaceDrive, 3),
        (TechnologyKind::EspionageTechnology, 4),
        (TechnologyKind::WeaponsTechnology, 3),
        (TechnologyKind::ShieldingTechnology, 3),
        (TechnologyKind::ArmourTechnology, 3),
        (TechnologyKind::Astrophysics, 3),
    ])
}

fn rich_resources() -> HashMap<ResourceKind, ResourceSlot> {
    HashMap::from([
        (
            ResourceKind::Metal,
            ResourceSlot {
                stock: 1_000_000.0,
                storage_capacity: 2_000_000.0,
                production: 120.0,
            },
        ),
        (
            ResourceKind::Crystal,
            ResourceSlot {
                stock: 500_000.0,
                storage_capacity: 2_000_000.0,
                production: 60.0,
            },
        ),
        (
            ResourceKind::Deuterium,
            ResourceSlot {
                stock: 100_000.0,
                storage_capacity: 1_000_000.0,
                production: 30.0,
            },
        ),
    ])
}

/// A well-stocked world with a hangar full of every hull, so validation
/// tests never trip over missing prerequisites unless they mean to.
pub fn world(universe: &Universe, galaxy: u16, system: u16, position: u16) -> CelestialBody {
    CelestialBody {
        id: BodyId::new(),
        universe: universe.id,
        player: PlayerId::new(),
        coordinate: Coordinate::new(galaxy, system, position, CoordinateKind::World),
        name: format!("world-{galaxy}-{system}-{position}"),
        diameter: 12_800,
        min_temperature: -10,
        max_temperature: 40,
        fields: 190,
        resources: rich_resources(),
        buildings: HashMap::from([(BuildingKind::MetalMine, 14), (BuildingKind::Shipyard, 6)]),
        ships: HashMap::from([
            (ShipKind::SmallCargo, 50),
            (ShipKind::LargeCargo, 20),
            (ShipKind::LightFighter, 100),
            (ShipKind::Cruiser, 20),
            (ShipKind::Battleship, 10),
            (ShipKind::Recycler, 10),
            (ShipKind::ColonyShip, 2),
            (ShipKind::EspionageProbe, 10),
            (ShipKind::Deathstar, 5),
        ]),
        defenses: HashMap::new(),
        technologies: default_technologies(),
    }
}

pub fn moon(universe: &Universe, galaxy: u16, system: u16, position: u16, diameter: u32) -> CelestialBody {
    let mut body = world(universe, galaxy, system, position);
    body.coordinate = Coordinate::new(galaxy, system, position, CoordinateKind::Moon);
    body.name = format!("moon-{galaxy}-{system}-{position}");
    body.diameter = diameter;
    body.fields = 1;
    body.buildings = HashMap::from([(BuildingKind::LunarBase, 1)]);
    body.ships = HashMap::new();
    body
}

pub fn debris_at(universe: &Universe, galaxy: u16, system: u16, position: u16, resources: &[(ResourceKind, f64)]) -> DebrisField {
    DebrisField {
        id: DebrisFieldId::new(),
        universe: universe.id,
        coordinate: Coordinate::new(galaxy, system, position, CoordinateKind::Debris),
        resources: resources.iter().copied().collect(),
        created_at: Utc::now(),
    }
}

/// A plain fleet between two existing bodies, full throttle, ten minutes
/// out, consumption already "computed". Adjust fields as the test needs.
pub fn fleet_between(source: &CelestialBody, target: &CelestialBody, objective: Objective, ships: &[(ShipKind, u32)]) -> Fleet {
    let created_at = Utc::now();
    Fleet {
        id: FleetId::new(),
        universe: source.universe,
        player: source.player,
        objective,
        source: source.id,
        source_kind: source.coordinate.kind,
        target_coords: target.coordinate,
        target: Some(target.id),
        speed: 1.0,
        created_at,
        arrival_time: created_at + Duration::seconds(600),
        deployment_seconds: 0,
        return_time: created_at + Duration::seconds(1_200),
        ships: ships.iter().copied().collect(),
        cargo: HashMap::new(),
        consumption: HashMap::from([(ResourceKind::Deuterium, 10.0)]),
        returning: false,
        deployed: false,
        acs: None,
    }
}

/// An in-memory environment seeded with the given universe, bodies and
/// fleets. Technology snapshots are registered per owning player.
pub async fn env_with_state(universe: &Universe, bodies: &[CelestialBody], fleets: &[Fleet]) -> (MissionEnv, SharedState) {
    let bmc = InMemoryBmc::new();
    let state = bmc.state();

    {
        let mut guard = state.write().await;
        guard.universes.insert(universe.id, universe.clone());
        for body in bodies {
            guard.bodies.insert(body.id, body.clone());
            guard.technologies.insert(body.player, body.technologies.clone());
        }
        for fleet in fleets {
            guard.fleets.insert(fleet.id, fleet.clone());
        }
    }

    (MissionEnv::new(Arc::new(bmc)), state)
}
