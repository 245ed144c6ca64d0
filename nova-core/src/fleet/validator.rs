use itertools::Itertools;
use nova_domain::{Catalog, CelestialBody, CoordinateKind, DebrisField, Fleet, Objective, ResourceKind, Universe, ValidationError};

/// The closed objective/target table: which coordinate kinds an objective
/// may aim at, whether an existing body is required there, whether the
/// operation is hostile and whether a cargo hold may be loaded.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveRules {
    pub target_kinds: &'static [CoordinateKind],
    pub requires_target: bool,
    pub hostile: bool,
    pub allows_cargo: bool,
}

const WORLD_OR_MOON: &[CoordinateKind] = &[CoordinateKind::World, CoordinateKind::Moon];
const WORLD_ONLY: &[CoordinateKind] = &[CoordinateKind::World];
const MOON_ONLY: &[CoordinateKind] = &[CoordinateKind::Moon];
const DEBRIS_ONLY: &[CoordinateKind] = &[CoordinateKind::Debris];

pub fn rules_for(objective: Objective) -> ObjectiveRules {
    match objective {
        Objective::Deployment => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: false,
            allows_cargo: true,
        },
        Objective::Transport => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: false,
            allows_cargo: true,
        },
        Objective::Colonization => ObjectiveRules {
            target_kinds: WORLD_ONLY,
            requires_target: false,
            hostile: false,
            allows_cargo: true,
        },
        Objective::Expedition => ObjectiveRules {
            target_kinds: WORLD_ONLY,
            requires_target: false,
            hostile: false,
            allows_cargo: true,
        },
        Objective::AcsDefend => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: false,
            allows_cargo: false,
        },
        Objective::AcsAttack => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: true,
            // Cargo is legal until the fleet actually joins an operation;
            // the joined case is rejected below.
            allows_cargo: true,
        },
        Objective::Harvesting => ObjectiveRules {
            target_kinds: DEBRIS_ONLY,
            requires_target: false,
            hostile: false,
            allows_cargo: false,
        },
        Objective::Attacking => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: true,
            allows_cargo: true,
        },
        Objective::Espionage => ObjectiveRules {
            target_kinds: WORLD_OR_MOON,
            requires_target: true,
            hostile: true,
            allows_cargo: false,
        },
        Objective::Destroy => ObjectiveRules {
            target_kinds: MOON_ONLY,
            requires_target: true,
            hostile: true,
            allows_cargo: true,
        },
    }
}

/// Full fleet validation against its source body, the optional
/// target body and the optional debris field at the target slot. Pure: the
/// fleet is never mutated; fuel is computed beforehand and carried in
/// `fleet.consumption`.
pub fn validate(
    fleet: &Fleet,
    source: &CelestialBody,
    target: Option<&CelestialBody>,
    debris: Option<&DebrisField>,
    universe: &Universe,
    catalog: &Catalog,
) -> Result<(), ValidationError> {
    fleet.validate_shape()?;
    fleet.target_coords.validate(universe)?;

    if fleet.target_coords == source.coordinate {
        return Err(ValidationError::TargetIsSource);
    }

    let rules = rules_for(fleet.objective);

    if !rules.target_kinds.contains(&fleet.target_coords.kind) {
        return Err(ValidationError::IllegalTargetKind {
            objective: fleet.objective,
            kind: fleet.target_coords.kind,
        });
    }

    if rules.requires_target && (fleet.target.is_none() || target.is_none()) {
        return Err(ValidationError::TargetBodyRequired(fleet.objective));
    }

    if !rules.allows_cargo && !fleet.cargo.is_empty() {
        return Err(ValidationError::CargoForbidden(fleet.objective));
    }

    if fleet.acs.is_some() && !fleet.cargo.is_empty() {
        return Err(ValidationError::AcsCargoForbidden);
    }

    if rules.hostile {
        if let Some(target_body) = target {
            if target_body.player == source.player {
                return Err(ValidationError::HostileSelfTarget(fleet.objective));
            }
        }
    }

    if fleet.objective == Objective::Harvesting && debris.is_none() {
        return Err(ValidationError::NoDebrisFieldAtTarget(fleet.target_coords));
    }

    if fleet.objective == Objective::Colonization && fleet.target_coords.same_slot(&source.coordinate) {
        return Err(ValidationError::ColonizationOfSource);
    }

    // At least one ship on board must be able to carry out the objective.
    let descriptor = catalog
        .objective(&fleet.objective)
        .ok_or(ValidationError::NoCapableShip(fleet.objective))?;
    let capable = fleet.ships.keys().any(|kind| descriptor.allowed_ships.contains(kind));
    if !capable {
        return Err(ValidationError::NoCapableShip(fleet.objective));
    }

    let capacity = total_capacity(fleet, catalog)?;

    let cargo_total: f64 = fleet.cargo.values().sum();
    if cargo_total > capacity {
        return Err(ValidationError::CargoExceedsCapacity {
            cargo: cargo_total,
            capacity,
        });
    }
    for resource in fleet.cargo.keys().sorted() {
        let movable = catalog.resource(resource).map(|descriptor| descriptor.movable).unwrap_or(false);
        if !movable {
            return Err(ValidationError::ResourceNotMovable(*resource));
        }
    }

    // Fuel checks against the same total capacity, independently of cargo.
    let fuel_total: f64 = fleet.consumption.values().sum();
    if fuel_total > capacity {
        return Err(ValidationError::FuelExceedsCapacity {
            fuel: fuel_total,
            capacity,
        });
    }

    // The source must actually hold the ships, the cargo and the fuel.
    for (kind, count) in fleet.ships.iter().sorted_by_key(|(kind, _)| **kind) {
        let available = source.ship_count(*kind);
        if available < *count {
            return Err(ValidationError::InsufficientShips {
                ship: *kind,
                available,
                needed: *count,
            });
        }
    }

    let mut needed: std::collections::HashMap<ResourceKind, f64> = fleet.cargo.clone();
    for (resource, amount) in &fleet.consumption {
        *needed.entry(*resource).or_insert(0.0) += amount;
    }
    for (resource, amount) in needed.iter().sorted_by_key(|(resource, _)| **resource) {
        let available = source.stock(*resource);
        if available < *amount {
            return Err(ValidationError::InsufficientResources {
                resource: *resource,
                available,
                needed: *amount,
            });
        }
    }

    Ok(())
}

pub fn total_capacity(fleet: &Fleet, catalog: &Catalog) -> Result<f64, ValidationError> {
    let mut capacity = 0.0;
    for (kind, count) in &fleet.ships {
        let descriptor = catalog
            .ship(kind)
            .ok_or(ValidationError::ShipCannotFly(*kind))?;
        capacity += descriptor.cargo_capacity * *count as f64;
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_objects::{fleet_between, world};
    use nova_domain::{Coordinate, ResourceKind, ShipKind, Universe};
    use std::collections::HashMap;

    fn setup() -> (Universe, CelestialBody, CelestialBody) {
        let universe = Universe::for_tests(3, 100, 15);
        let source = world(&universe, 0, 10, 4);
        let target = world(&universe, 0, 10, 8);
        (universe, source, target)
    }

    #[test]
    fn transport_between_worlds_passes() {
        let (universe, source, target) = setup();
        let fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 2)]);

        assert!(validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()).is_ok());
    }

    #[test]
    fn harvesting_must_aim_at_debris() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::Harvesting, &[(ShipKind::Recycler, 1)]);
        fleet.target = None;

        // World-kind coordinate is refused outright.
        assert!(matches!(
            validate(&fleet, &source, None, None, &universe, Catalog::standard()),
            Err(ValidationError::IllegalTargetKind { .. })
        ));

        // Debris-kind coordinate without an actual field is refused too.
        fleet.target_coords = fleet.target_coords.with_kind(CoordinateKind::Debris);
        assert!(matches!(
            validate(&fleet, &source, None, None, &universe, Catalog::standard()),
            Err(ValidationError::NoDebrisFieldAtTarget(_))
        ));
    }

    #[test]
    fn destroy_only_targets_moons() {
        let (universe, source, target) = setup();
        let fleet = fleet_between(&source, &target, Objective::Destroy, &[(ShipKind::Deathstar, 1)]);

        assert!(matches!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::IllegalTargetKind { .. })
        ));
    }

    #[test]
    fn hostile_objectives_reject_own_bodies() {
        let (universe, source, mut target) = setup();
        target.player = source.player;
        let fleet = fleet_between(&source, &target, Objective::Attacking, &[(ShipKind::Cruiser, 5)]);

        assert_eq!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::HostileSelfTarget(Objective::Attacking))
        );
    }

    #[test]
    fn espionage_cannot_carry_cargo() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::Espionage, &[(ShipKind::EspionageProbe, 3)]);
        fleet.cargo.insert(ResourceKind::Metal, 10.0);

        assert_eq!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::CargoForbidden(Objective::Espionage))
        );
    }

    #[test]
    fn a_fleet_without_a_capable_ship_is_rejected() {
        let (universe, source, target) = setup();
        let fleet = fleet_between(&source, &target, Objective::Espionage, &[(ShipKind::LightFighter, 10)]);

        assert_eq!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::NoCapableShip(Objective::Espionage))
        );
    }

    #[test]
    fn cargo_must_fit_the_holds() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 1)]);
        fleet.cargo = HashMap::from([(ResourceKind::Metal, 6_000.0)]);

        assert!(matches!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::CargoExceedsCapacity { .. })
        ));
    }

    #[test]
    fn energy_cannot_be_loaded() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::LargeCargo, 1)]);
        fleet.cargo = HashMap::from([(ResourceKind::Energy, 100.0)]);

        assert_eq!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::ResourceNotMovable(ResourceKind::Energy))
        );
    }

    #[test]
    fn the_source_must_hold_ships_cargo_and_fuel() {
        let (universe, mut source, target) = setup();
        source.ships = HashMap::from([(ShipKind::SmallCargo, 1)]);
        let fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 2)]);

        assert!(matches!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::InsufficientShips { .. })
        ));

        source.ships = HashMap::from([(ShipKind::SmallCargo, 2)]);
        source.resources.get_mut(&ResourceKind::Deuterium).unwrap().stock = 0.0;
        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 2)]);
        fleet.consumption = HashMap::from([(ResourceKind::Deuterium, 25.0)]);

        assert!(matches!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::InsufficientResources { .. })
        ));
    }

    #[test]
    fn a_grouped_fleet_cannot_carry_cargo() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::AcsAttack, &[(ShipKind::Battleship, 2)]);
        fleet.acs = Some(nova_domain::AcsFleetId::new());
        fleet.cargo.insert(ResourceKind::Metal, 5.0);

        assert_eq!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::AcsCargoForbidden)
        );
    }

    #[test]
    fn out_of_bounds_targets_are_malformed() {
        let (universe, source, target) = setup();
        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 1)]);
        fleet.target_coords = Coordinate::new(7, 10, 8, CoordinateKind::World);

        assert!(matches!(
            validate(&fleet, &source, Some(&target), None, &universe, Catalog::standard()),
            Err(ValidationError::CoordinateOutOfBounds(_))
        ));
    }
}
