use crate::error::MissionError;
use crate::fleet::validator::validate;
use crate::flight::{consumption, flight_duration, max_fleet_speed};
use crate::missions::MissionEnv;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use nova_domain::{
    BodyId, Coordinate, Fleet, FleetId, Objective, PlayerId, ResourceAmount, ShipInFleet, UniverseId, ValidationError,
};
use tracing::{event, Level};

/// A player's ask: which ships to send where, and why. Duplicate manifest
/// entries are summed on assembly.
#[derive(Debug, Clone)]
pub struct FleetRequest {
    pub universe: UniverseId,
    pub player: PlayerId,
    pub objective: Objective,
    pub source: BodyId,
    pub target_coords: Coordinate,
    pub speed: f64,
    pub deployment_seconds: i64,
    pub ships: Vec<ShipInFleet>,
    pub cargo: Vec<ResourceAmount>,
}

/// Builds, validates and persists a fleet: timing and fuel are computed
/// from the request, the source body pays ships, cargo and fuel, and the
/// whole thing lands in the store atomically.
pub async fn build_fleet(request: FleetRequest, env: &MissionEnv, now: DateTime<Utc>) -> Result<Fleet, MissionError> {
    let universe = env
        .bmc
        .universe_bmc()
        .get_universe(&env.ctx, request.universe)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("universe {}", request.universe)))?;

    let source = env.body(request.source).await?;
    if source.player != request.player {
        return Err(MissionError::NotFound(format!("body {} of player {}", request.source, request.player)));
    }

    if !(request.speed > 0.0 && request.speed <= 1.0) {
        return Err(MissionError::Validation(ValidationError::InvalidSpeed(request.speed)));
    }

    let target = env
        .bmc
        .planet_bmc()
        .get_body_at(&env.ctx, request.universe, &request.target_coords)
        .await
        .map_err(MissionError::from_store)?;
    let debris = if request.objective == Objective::Harvesting {
        env.bmc
            .debris_bmc()
            .get_debris_at(&env.ctx, request.universe, &request.target_coords)
            .await
            .map_err(MissionError::from_store)?
    } else {
        None
    };

    let ships = Fleet::aggregate_ships(&request.ships);
    let cargo = Fleet::aggregate_cargo(&request.cargo);
    let technologies = source.technologies.clone();

    // Loitering is only meaningful for objectives that hold position.
    let deployment_seconds = match request.objective {
        Objective::Expedition | Objective::AcsDefend => request.deployment_seconds.max(0),
        _ => 0,
    };

    if ships.is_empty() {
        return Err(MissionError::Validation(ValidationError::EmptyFleet));
    }
    let max_speed = max_fleet_speed(&ships, &technologies, env.catalog)?;
    let distance = source.coordinate.distance_to(&request.target_coords);
    let flight_time = flight_duration(distance, max_speed, request.speed, &universe);
    let fuel = consumption(
        &ships,
        &technologies,
        distance,
        max_speed,
        request.speed,
        deployment_seconds,
        &universe,
        env.catalog,
    )?;

    let arrival_time = now + flight_time;
    let fleet = Fleet {
        id: FleetId::new(),
        universe: request.universe,
        player: request.player,
        objective: request.objective,
        source: request.source,
        source_kind: source.coordinate.kind,
        target_coords: request.target_coords,
        target: target.as_ref().map(|body| body.id),
        speed: request.speed,
        created_at: now,
        arrival_time,
        deployment_seconds,
        return_time: arrival_time + flight_time + Duration::seconds(deployment_seconds),
        ships,
        cargo,
        consumption: fuel,
        returning: false,
        deployed: false,
        acs: None,
    };

    validate(&fleet, &source, target.as_ref(), debris.as_ref(), &universe, env.catalog)?;

    // The source pays up front: hulls leave the hangar, cargo and fuel
    // leave the stores.
    let mut source_after = source;
    for (kind, count) in &fleet.ships {
        source_after.remove_ships(*kind, *count)?;
    }
    for (resource, amount) in &fleet.cargo {
        source_after.remove_resource(*resource, *amount)?;
    }
    for (resource, amount) in &fleet.consumption {
        source_after.remove_resource(*resource, *amount)?;
    }

    env.bmc
        .fleet_bmc()
        .create_fleet(&env.ctx, &fleet, &source_after)
        .await
        .map_err(MissionError::from_store)?;

    counter!("nova_fleets_created_total", "objective" => fleet.objective.to_string()).increment(1);
    event!(
        Level::INFO,
        fleet = %fleet.id,
        objective = %fleet.objective,
        flight = %crate::format_flight_time(flight_time),
        arrival = %fleet.arrival_time,
        "fleet dispatched"
    );

    Ok(fleet)
}

/// Recall: the owner pulls the fleet back before it resolves. The return
/// time collapses to now and the scheduler short-circuits the mission; a
/// fleet that is already resolving or homebound refuses the recall.
pub async fn recall_fleet(fleet_id: FleetId, env: &MissionEnv, now: DateTime<Utc>) -> Result<Fleet, MissionError> {
    let mut fleet = env
        .bmc
        .fleet_bmc()
        .get_fleet(&env.ctx, fleet_id)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("fleet {fleet_id}")))?;

    if fleet.returning {
        return Err(MissionError::RecallRefused);
    }

    if let Some(acs_id) = fleet.acs.take() {
        if let Some(mut acs) = env
            .bmc
            .acs_bmc()
            .get_acs(&env.ctx, acs_id)
            .await
            .map_err(MissionError::from_store)?
        {
            acs.components.retain(|component| *component != fleet.id);
            if acs.components.is_empty() {
                env.bmc.acs_bmc().close_acs(&env.ctx, acs_id).await.map_err(MissionError::from_store)?;
            } else {
                env.bmc.acs_bmc().save_acs(&env.ctx, &acs).await.map_err(MissionError::from_store)?;
            }
        }
    }

    fleet.returning = true;
    fleet.deployed = false;
    fleet.return_time = now;

    env.bmc
        .fleet_bmc()
        .save_fleet(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;

    event!(Level::INFO, fleet = %fleet.id, "fleet recalled");
    Ok(fleet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{ResourceKind, ShipKind, Universe};

    fn request(universe: &Universe, source: &nova_domain::CelestialBody, target: &nova_domain::CelestialBody) -> FleetRequest {
        FleetRequest {
            universe: universe.id,
            player: source.player,
            objective: Objective::Transport,
            source: source.id,
            target_coords: target.coordinate,
            speed: 1.0,
            deployment_seconds: 0,
            ships: vec![
                ShipInFleet {
                    kind: ShipKind::SmallCargo,
                    count: 2,
                },
                ShipInFleet {
                    kind: ShipKind::SmallCargo,
                    count: 1,
                },
            ],
            cargo: vec![ResourceAmount {
                resource: ResourceKind::Metal,
                amount: 4_000.0,
            }],
        }
    }

    #[tokio::test]
    async fn dispatch_pays_ships_cargo_and_fuel_from_the_source() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 9, 3);
        let target = world(&universe, 0, 9, 9);
        let (env, state) = env_with_state(&universe, &[source.clone(), target.clone()], &[]).await;

        let now = Utc::now();
        let fleet = build_fleet(request(&universe, &source, &target), &env, now).await.unwrap();

        // Duplicate manifest entries summed.
        assert_eq!(fleet.ship_count(ShipKind::SmallCargo), 3);
        // Timing invariants hold to the stored precision.
        assert_eq!(fleet.arrival_time, fleet.created_at + fleet.flight_time());
        assert_eq!(fleet.return_time, fleet.arrival_time + fleet.flight_time());

        let fuel = fleet.consumption[&ResourceKind::Deuterium];
        assert!(fuel > 0.0);

        let guard = state.read().await;
        let source_after = guard.bodies.get(&source.id).unwrap();
        assert_eq!(source_after.ship_count(ShipKind::SmallCargo), source.ship_count(ShipKind::SmallCargo) - 3);
        assert_eq!(source_after.stock(ResourceKind::Metal), source.stock(ResourceKind::Metal) - 4_000.0);
        assert!((source_after.stock(ResourceKind::Deuterium) - (source.stock(ResourceKind::Deuterium) - fuel)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn a_throttled_fleet_takes_longer() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 9, 3);
        let target = world(&universe, 0, 9, 9);
        let (env, _state) = env_with_state(&universe, &[source.clone(), target.clone()], &[]).await;

        let now = Utc::now();
        let full = build_fleet(request(&universe, &source, &target), &env, now).await.unwrap();
        let mut slow_request = request(&universe, &source, &target);
        slow_request.speed = 0.5;
        let slow = build_fleet(slow_request, &env, now).await.unwrap();

        assert!(slow.flight_time() > full.flight_time());
        assert!(slow.consumption[&ResourceKind::Deuterium] < full.consumption[&ResourceKind::Deuterium]);
    }

    #[tokio::test]
    async fn deployment_time_is_dropped_for_plain_objectives() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 9, 3);
        let target = world(&universe, 0, 9, 9);
        let (env, _state) = env_with_state(&universe, &[source.clone(), target.clone()], &[]).await;

        let mut req = request(&universe, &source, &target);
        req.deployment_seconds = 3_600;
        let fleet = build_fleet(req, &env, Utc::now()).await.unwrap();

        assert_eq!(fleet.deployment_seconds, 0);
        assert_eq!(fleet.return_time, fleet.arrival_time + fleet.flight_time());
    }

    #[tokio::test]
    async fn recall_collapses_the_return_time() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 9, 3);
        let target = world(&universe, 0, 9, 9);

        let fleet = fleet_between(&source, &target, Objective::Attacking, &[(ShipKind::Cruiser, 5)]);
        let (env, _state) = env_with_state(&universe, &[source, target], &[fleet.clone()]).await;

        let now = Utc::now();
        let recalled = recall_fleet(fleet.id, &env, now).await.unwrap();
        assert!(recalled.returning);
        assert_eq!(recalled.return_time, now);

        // A second recall is refused.
        assert!(matches!(recall_fleet(fleet.id, &env, now).await, Err(MissionError::RecallRefused)));
    }
}
