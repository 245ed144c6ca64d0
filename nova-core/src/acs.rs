use crate::error::MissionError;
use crate::flight::{consumption, flight_duration, max_fleet_speed};
use crate::missions::MissionEnv;
use chrono::{DateTime, Duration, Utc};
use nova_domain::{AcsFleet, AcsFleetId, Fleet, FleetId, ValidationError};
use tracing::{event, Level};

/// A joining fleet may stretch the operation's arrival by at most 30%.
const MAX_DELAY_RATIO: f64 = 1.3;

/// Opens a joint operation around a seed fleet.
pub async fn create_acs(seed_fleet_id: FleetId, env: &MissionEnv) -> Result<AcsFleet, MissionError> {
    let mut seed = env
        .bmc
        .fleet_bmc()
        .get_fleet(&env.ctx, seed_fleet_id)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("fleet {seed_fleet_id}")))?;

    let acs = AcsFleet::from_seed(&seed)?;

    seed.acs = Some(acs.id);
    env.bmc
        .fleet_bmc()
        .save_fleet(&env.ctx, &seed)
        .await
        .map_err(MissionError::from_store)?;
    env.bmc
        .acs_bmc()
        .save_acs(&env.ctx, &acs)
        .await
        .map_err(MissionError::from_store)?;

    event!(Level::INFO, acs = %acs.id, seed = %seed.id, "joint operation opened");
    Ok(acs)
}

/// Joins a fleet into an operation, reconciling arrival times.
///
/// With Δ the ratio of the joiner's and the operation's arrival (measured
/// from now): above 1.3 the join is refused; between 1 and 1.3 the whole
/// operation waits for the newcomer; below 1 the newcomer throttles down to
/// arrive exactly together, its fuel recomputed for the slower burn.
pub async fn join_acs(acs_id: AcsFleetId, fleet_id: FleetId, env: &MissionEnv, now: DateTime<Utc>) -> Result<AcsFleet, MissionError> {
    let mut acs = env
        .bmc
        .acs_bmc()
        .get_acs(&env.ctx, acs_id)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("ACS operation {acs_id}")))?;

    let mut fleet = env
        .bmc
        .fleet_bmc()
        .get_fleet(&env.ctx, fleet_id)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("fleet {fleet_id}")))?;

    acs.check_parity(&fleet)?;
    if acs.contains(fleet.id) {
        return Err(MissionError::Duplicate(format!("fleet {fleet_id} in ACS {acs_id}")));
    }

    let current = (acs.arrival_time - now).num_milliseconds() as f64;
    let candidate = (fleet.arrival_time - now).num_milliseconds() as f64;
    if current <= 0.0 {
        return Err(MissionError::NotFound(format!("ACS operation {acs_id} already arrived")));
    }
    let delay_ratio = candidate / current;

    if delay_ratio > MAX_DELAY_RATIO {
        return Err(MissionError::Validation(ValidationError::AcsDelayTooLarge { delay_ratio }));
    }

    if delay_ratio >= 1.0 {
        // The operation waits: every component's arrival shifts to the
        // newcomer's, flight times preserved by moving their departure.
        acs.arrival_time = fleet.arrival_time;
        let components = env
            .bmc
            .fleet_bmc()
            .fleets_of_acs(&env.ctx, acs_id)
            .await
            .map_err(MissionError::from_store)?;
        for mut component in components {
            retime_to(&mut component, acs.arrival_time);
            env.bmc
                .fleet_bmc()
                .save_fleet(&env.ctx, &component)
                .await
                .map_err(MissionError::from_store)?;
        }
    } else {
        // The newcomer is early: throttle it down so it arrives exactly
        // with the group, then pin the arrival to absorb rounding drift.
        slow_to_match(&mut fleet, &acs, env, delay_ratio).await?;
    }

    fleet.acs = Some(acs.id);
    retime_to(&mut fleet, acs.arrival_time);
    env.bmc
        .fleet_bmc()
        .save_fleet(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;

    acs.components.push(fleet.id);
    env.bmc
        .acs_bmc()
        .save_acs(&env.ctx, &acs)
        .await
        .map_err(MissionError::from_store)?;

    event!(Level::INFO, acs = %acs.id, fleet = %fleet.id, delay_ratio, "fleet joined operation");
    Ok(acs)
}

/// Forces a fleet's arrival to the instant given, shifting its departure so
/// `arrival = created + flight` keeps holding exactly.
fn retime_to(fleet: &mut Fleet, arrival_time: DateTime<Utc>) {
    let flight_time = fleet.flight_time();
    fleet.arrival_time = arrival_time;
    fleet.created_at = arrival_time - flight_time;
    fleet.return_time = arrival_time + flight_time + Duration::seconds(fleet.deployment_seconds);
}

async fn slow_to_match(fleet: &mut Fleet, acs: &AcsFleet, env: &MissionEnv, delay_ratio: f64) -> Result<(), MissionError> {
    let universe = env.universe_of(fleet).await?;
    let source = env.body(fleet.source).await?;
    let technologies = source.technologies;

    fleet.speed *= delay_ratio;

    let max_speed = max_fleet_speed(&fleet.ships, &technologies, env.catalog)?;
    let distance = source.coordinate.distance_to(&fleet.target_coords);
    let flight_time = flight_duration(distance, max_speed, fleet.speed, &universe);
    fleet.consumption = consumption(
        &fleet.ships,
        &technologies,
        distance,
        max_speed,
        fleet.speed,
        fleet.deployment_seconds,
        &universe,
        env.catalog,
    )?;

    // The recomputed flight lands near the group's arrival; floating point
    // drift is absorbed by forcing the arrival outright.
    fleet.created_at = acs.arrival_time - flight_time;
    fleet.arrival_time = acs.arrival_time;
    fleet.return_time = acs.arrival_time + flight_time + Duration::seconds(fleet.deployment_seconds);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{Objective, ResourceKind, ShipKind, Universe};

    struct Setup {
        env: MissionEnv,
        acs: AcsFleet,
        now: DateTime<Utc>,
        target: nova_domain::CelestialBody,
        universe: Universe,
    }

    async fn setup(seed_minutes: i64) -> Setup {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 10, 3);
        let target = world(&universe, 0, 10, 9);

        let now = Utc::now();
        let mut seed = fleet_between(&source, &target, Objective::AcsAttack, &[(ShipKind::Cruiser, 10)]);
        seed.created_at = now;
        seed.arrival_time = now + Duration::minutes(seed_minutes);
        seed.return_time = now + Duration::minutes(2 * seed_minutes);

        let (env, _state) = env_with_state(&universe, &[source, target.clone()], &[seed.clone()]).await;
        let acs = create_acs(seed.id, &env).await.unwrap();

        Setup {
            env,
            acs,
            now,
            target,
            universe,
        }
    }

    async fn candidate(setup: &Setup, arrival_minutes: i64) -> Fleet {
        let source = world(&setup.universe, 0, 10, 5);
        let mut fleet = fleet_between(&source, &setup.target, Objective::AcsAttack, &[(ShipKind::Battleship, 4)]);
        fleet.created_at = setup.now;
        fleet.arrival_time = setup.now + Duration::minutes(arrival_minutes);
        fleet.return_time = setup.now + Duration::minutes(2 * arrival_minutes);
        fleet.consumption = std::collections::HashMap::from([(ResourceKind::Deuterium, 1_000.0)]);

        setup.env.bmc.planet_bmc().save_body(&setup.env.ctx, &source).await.unwrap();
        setup.env.bmc.fleet_bmc().save_fleet(&setup.env.ctx, &fleet).await.unwrap();
        fleet
    }

    #[tokio::test]
    async fn a_join_delaying_beyond_thirty_percent_is_rejected() {
        let setup = setup(60).await;
        let late = candidate(&setup, 85).await;

        let err = join_acs(setup.acs.id, late.id, &setup.env, setup.now).await.unwrap_err();
        assert!(matches!(err, MissionError::Validation(ValidationError::AcsDelayTooLarge { .. })));
    }

    #[tokio::test]
    async fn a_slightly_late_join_shifts_the_whole_operation() {
        let setup = setup(60).await;
        let late = candidate(&setup, 70).await;

        let acs = join_acs(setup.acs.id, late.id, &setup.env, setup.now).await.unwrap();
        assert_eq!(acs.arrival_time, late.arrival_time);

        // Every component, seed included, now shares the arrival and keeps
        // its timing invariant.
        let components = setup.env.bmc.fleet_bmc().fleets_of_acs(&setup.env.ctx, acs.id).await.unwrap();
        assert_eq!(components.len(), 2);
        for component in components {
            assert_eq!(component.arrival_time, acs.arrival_time);
            assert_eq!(component.arrival_time, component.created_at + component.flight_time());
        }
    }

    #[tokio::test]
    async fn an_early_join_is_slowed_to_match() {
        let setup = setup(60).await;
        let early = candidate(&setup, 45).await;
        let original_fuel: f64 = early.consumption.values().sum();

        let acs = join_acs(setup.acs.id, early.id, &setup.env, setup.now).await.unwrap();
        assert_eq!(acs.arrival_time, setup.acs.arrival_time);

        let joined = setup.env.bmc.fleet_bmc().get_fleet(&setup.env.ctx, early.id).await.unwrap().unwrap();
        assert_eq!(joined.arrival_time, acs.arrival_time);
        assert!((joined.speed - 0.75).abs() < 1e-9);
        assert!(joined.consumption.values().sum::<f64>() < original_fuel);
        assert_eq!(joined.arrival_time, joined.created_at + joined.flight_time());
    }

    #[tokio::test]
    async fn parity_and_duplicates_are_enforced() {
        let setup = setup(60).await;
        let mut stray = candidate(&setup, 62).await;
        stray.objective = Objective::Attacking;
        setup.env.bmc.fleet_bmc().save_fleet(&setup.env.ctx, &stray).await.unwrap();

        let err = join_acs(setup.acs.id, stray.id, &setup.env, setup.now).await.unwrap_err();
        assert!(matches!(err, MissionError::Validation(ValidationError::AcsComponentMismatch("objective"))));

        let seed_id = setup.acs.components[0];
        let err = join_acs(setup.acs.id, seed_id, &setup.env, setup.now).await.unwrap_err();
        assert!(matches!(err, MissionError::Validation(ValidationError::AlreadyInAcs)));
    }
}
