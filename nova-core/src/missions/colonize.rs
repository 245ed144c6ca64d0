use crate::error::MissionError;
use crate::missions::{FollowUp, MissionEnv};
use crate::rng::MissionRng;
use nova_domain::{
    BodyId, Catalog, CelestialBody, Coordinate, Fleet, PlayerId, ResourceSlot, ShipKind, TechnologyKind, Universe,
};
use std::collections::HashMap;
use tracing::{event, Level};

/// How many worlds a player may hold, astrophysics included.
pub fn colony_quota(astrophysics_level: u32) -> u32 {
    1 + astrophysics_level.div_ceil(2)
}

/// Colonization: quota check, race-to-claim on the target slot, then a
/// procedurally generated planet. A bare colony ship dissolves into its new
/// home; any escort turns around.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let universe = env.universe_of(&fleet).await?;

    let technologies = env
        .bmc
        .player_bmc()
        .get_technologies(&env.ctx, fleet.player)
        .await
        .map_err(MissionError::from_store)?;
    let astrophysics = technologies.get(&TechnologyKind::Astrophysics).copied().unwrap_or(0);

    let held = env
        .bmc
        .planet_bmc()
        .count_worlds_of_player(&env.ctx, fleet.player)
        .await
        .map_err(MissionError::from_store)?;

    if held >= colony_quota(astrophysics) {
        event!(Level::INFO, fleet = %fleet.id, held, "colonization denied by quota");
        return fail(fleet, env).await;
    }

    let occupied = env
        .bmc
        .planet_bmc()
        .get_body_at(&env.ctx, fleet.universe, &fleet.target_coords)
        .await
        .map_err(MissionError::from_store)?;
    if occupied.is_some() {
        event!(Level::INFO, fleet = %fleet.id, target = %fleet.target_coords, "colonization target already claimed");
        return fail(fleet, env).await;
    }

    let mut planet = generate_planet(&universe, fleet.player, fleet.target_coords, env.catalog);

    // The colony ship is spent; its cargo seeds the new colony's stocks.
    for (resource, amount) in fleet.cargo.drain() {
        planet.add_resource(resource, amount);
    }
    fleet.remove_ships(ShipKind::ColonyShip, 1);

    let dissolved = fleet.ships.is_empty();
    let fleet_after = if dissolved {
        None
    } else {
        fleet.returning = true;
        Some(&fleet)
    };

    event!(Level::INFO, fleet = %fleet.id, planet = %planet.id, dissolved, "colony founded");

    env.bmc
        .fleet_bmc()
        .record_colonization_success(&env.ctx, fleet.id, fleet_after, &planet)
        .await
        .map_err(MissionError::from_store)?;

    Ok(if dissolved { FollowUp::Dissolved } else { FollowUp::ReturnToBase })
}

async fn fail(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    fleet.returning = true;
    env.bmc
        .fleet_bmc()
        .record_colonization_failed(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;
    Ok(FollowUp::ReturnToBase)
}

/// Field counts by orbital position: generous in the habitable middle,
/// cramped at both rims. Jitter and temperature come from a PRNG seeded by
/// the coordinate, so racing colonizations of one slot agree on the world
/// they find.
const BASE_FIELDS: [u32; 15] = [96, 104, 112, 120, 135, 150, 163, 150, 135, 120, 112, 104, 96, 90, 85];

pub fn generate_planet(universe: &Universe, player: PlayerId, coordinate: Coordinate, catalog: &Catalog) -> CelestialBody {
    let mut rng = MissionRng::from_coordinate(&coordinate);

    let position = (coordinate.position as usize).min(BASE_FIELDS.len() - 1);
    let fields = (BASE_FIELDS[position] as i64 + rng.between(-12, 25)).max(48) as u32;
    let diameter = ((fields as f64).sqrt() * 1_000.0).round() as u32;

    // Hot near the star, frozen at the rim; a 50 degree day/night band.
    let position_ratio = coordinate.position as f64 / universe.solar_system_size.max(1) as f64;
    let max_temperature = (120.0 - 200.0 * position_ratio).round() as i32 + rng.between(-10, 10) as i32;
    let min_temperature = max_temperature - 50;

    let resources: HashMap<_, _> = catalog
        .resources()
        .map(|descriptor| {
            (
                descriptor.kind,
                ResourceSlot {
                    stock: descriptor.base_amount,
                    storage_capacity: descriptor.base_storage,
                    production: descriptor.base_production,
                },
            )
        })
        .collect();

    CelestialBody {
        id: BodyId::new(),
        universe: universe.id,
        player,
        coordinate,
        name: "colony".to_string(),
        diameter,
        min_temperature,
        max_temperature,
        fields,
        resources,
        buildings: HashMap::new(),
        ships: HashMap::new(),
        defenses: HashMap::new(),
        technologies: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{Objective, Universe};

    fn colonization_fleet(universe: &Universe, source: &CelestialBody, ships: &[(ShipKind, u32)]) -> Fleet {
        let slot = world(universe, 0, 7, 11);
        let mut fleet = fleet_between(source, &slot, Objective::Colonization, ships);
        fleet.target = None;
        fleet
    }

    #[test]
    fn quota_grows_every_other_astrophysics_level() {
        assert_eq!(colony_quota(0), 1);
        assert_eq!(colony_quota(1), 2);
        assert_eq!(colony_quota(2), 2);
        assert_eq!(colony_quota(3), 3);
        assert_eq!(colony_quota(6), 4);
    }

    #[test]
    fn generated_planets_are_valid_and_reproducible() {
        let universe = Universe::for_tests(3, 100, 15);
        let player = PlayerId::new();
        let coordinate = Coordinate::new(1, 42, 7, nova_domain::CoordinateKind::World);

        let first = generate_planet(&universe, player, coordinate, Catalog::standard());
        let second = generate_planet(&universe, player, coordinate, Catalog::standard());

        assert!(first.validate().is_ok());
        assert_eq!(first.fields, second.fields);
        assert_eq!(first.diameter, second.diameter);
        assert_eq!(first.max_temperature, second.max_temperature);
    }

    #[tokio::test]
    async fn a_bare_colony_ship_dissolves_into_the_new_world() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 7, 4);
        let fleet = colonization_fleet(&universe, &source, &[(ShipKind::ColonyShip, 1)]);

        let (env, state) = env_with_state(&universe, &[source], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::Dissolved);

        let guard = state.read().await;
        assert!(!guard.fleets.contains_key(&fleet.id));
        let colony = guard
            .bodies
            .values()
            .find(|body| body.coordinate == fleet.target_coords)
            .expect("colony created");
        assert_eq!(colony.player, fleet.player);
    }

    #[tokio::test]
    async fn an_escorted_colony_ship_sends_the_escort_home() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 7, 4);
        let fleet = colonization_fleet(&universe, &source, &[(ShipKind::ColonyShip, 1), (ShipKind::LightFighter, 5)]);

        let (env, state) = env_with_state(&universe, &[source], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::ReturnToBase);

        let guard = state.read().await;
        let after = guard.fleets.get(&fleet.id).unwrap();
        assert!(after.returning);
        assert_eq!(after.ship_count(ShipKind::ColonyShip), 0);
        assert_eq!(after.ship_count(ShipKind::LightFighter), 5);
    }

    #[tokio::test]
    async fn an_occupied_slot_turns_the_mission_around() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 7, 4);
        let squatter = world(&universe, 0, 7, 11);
        let fleet = colonization_fleet(&universe, &source, &[(ShipKind::ColonyShip, 1)]);

        let (env, state) = env_with_state(&universe, &[source, squatter.clone()], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::ReturnToBase);

        let guard = state.read().await;
        let after = guard.fleets.get(&fleet.id).unwrap();
        assert!(after.returning);
        assert_eq!(after.ship_count(ShipKind::ColonyShip), 1);
        // The squatter keeps the slot.
        assert_eq!(guard.bodies.get(&squatter.id).unwrap().player, squatter.player);
    }

    #[tokio::test]
    async fn the_quota_denies_over_colonization() {
        let universe = Universe::for_tests(1, 50, 15);
        let mut source = world(&universe, 0, 7, 4);
        // Astrophysics 0 allows a single world, which the source already is.
        source.technologies.insert(TechnologyKind::Astrophysics, 0);
        let fleet = colonization_fleet(&universe, &source, &[(ShipKind::ColonyShip, 1)]);

        let (env, state) = env_with_state(&universe, &[source], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::ReturnToBase);
        let guard = state.read().await;
        assert!(guard.fleets.get(&fleet.id).unwrap().returning);
        assert_eq!(guard.bodies.len(), 1);
    }
}
