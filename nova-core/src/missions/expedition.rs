use crate::error::MissionError;
use crate::missions::{FollowUp, MissionEnv};
use nova_domain::Fleet;
use tracing::{event, Level};

/// Expedition: the fleet loiters at an empty slot for its deployment time
/// and heads home. The return time was fixed at creation to include the
/// hold, so flipping the leg here is all that is left to do.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    fleet.returning = true;

    event!(Level::INFO, fleet = %fleet.id, hold_seconds = fleet.deployment_seconds, "expedition loitering");

    env.bmc
        .fleet_bmc()
        .save_fleet(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::ReturnToBase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use chrono::Duration;
    use nova_domain::{Objective, ShipKind, Universe};

    #[tokio::test]
    async fn the_hold_is_already_priced_into_the_return_time() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 5, 3);
        let slot = world(&universe, 0, 5, 14);

        let mut fleet = fleet_between(&source, &slot, Objective::Expedition, &[(ShipKind::Battleship, 1)]);
        fleet.target = None;
        fleet.deployment_seconds = 3_600;
        fleet.return_time = fleet.arrival_time + fleet.flight_time() + Duration::seconds(3_600);

        let (env, state) = env_with_state(&universe, &[source], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::ReturnToBase);

        let guard = state.read().await;
        let after = guard.fleets.get(&fleet.id).unwrap();
        assert!(after.returning);
        assert_eq!(after.return_time, fleet.return_time);
    }
}
