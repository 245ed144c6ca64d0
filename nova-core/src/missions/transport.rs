use crate::error::MissionError;
use crate::missions::{FollowUp, MissionEnv};
use nova_domain::Fleet;
use tracing::{event, Level};

/// Transport: unload the holds at the destination and head home.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let target_id = fleet.target.ok_or_else(|| MissionError::NotFound("transport target".to_string()))?;
    let mut target = env.body(target_id).await?;

    let unloaded: f64 = fleet.cargo.values().sum();
    for (resource, amount) in fleet.cargo.drain() {
        target.add_resource(resource, amount);
    }
    fleet.returning = true;

    event!(Level::INFO, fleet = %fleet.id, target = %target.id, unloaded, "transport delivered");

    env.bmc
        .fleet_bmc()
        .record_transport(&env.ctx, &fleet, &target)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::ReturnToBase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{Objective, ResourceKind, ShipKind, Universe};
    use std::collections::HashMap;

    #[tokio::test]
    async fn delivery_moves_the_cargo_and_turns_the_fleet_around() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 1, 4);
        let target = world(&universe, 0, 1, 10);

        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::LargeCargo, 2)]);
        fleet.cargo = HashMap::from([(ResourceKind::Metal, 30_000.0), (ResourceKind::Deuterium, 5_000.0)]);

        let (env, state) = env_with_state(&universe, &[source, target.clone()], &[fleet.clone()]).await;

        assert_eq!(simulate(fleet.clone(), &env).await.unwrap(), FollowUp::ReturnToBase);

        let guard = state.read().await;
        let fleet_after = guard.fleets.get(&fleet.id).unwrap();
        assert!(fleet_after.returning);
        assert!(fleet_after.cargo.is_empty());

        let target_after = guard.bodies.get(&target.id).unwrap();
        assert_eq!(target_after.stock(ResourceKind::Metal), target.stock(ResourceKind::Metal) + 30_000.0);
        assert_eq!(target_after.stock(ResourceKind::Deuterium), target.stock(ResourceKind::Deuterium) + 5_000.0);
    }
}
