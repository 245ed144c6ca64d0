use crate::error::MissionError;
use crate::missions::shares::fair_share;
use crate::missions::{FollowUp, MissionEnv};
use nova_domain::{Fleet, ShipKind};
use tracing::{event, Level};

/// Harvesting: recyclers scoop a debris field, fairly across its resource
/// types, bounded by the recycler capacity that ordinary cargo has not
/// already eaten into.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let mut debris = env
        .bmc
        .debris_bmc()
        .get_debris_at(&env.ctx, fleet.universe, &fleet.target_coords)
        .await
        .map_err(MissionError::from_store)?
        .ok_or_else(|| MissionError::NotFound(format!("debris field at {}", fleet.target_coords)))?;

    let recycler_cargo = env
        .catalog
        .ship(&ShipKind::Recycler)
        .map(|descriptor| descriptor.cargo_capacity)
        .unwrap_or(0.0);
    let recycler_capacity = fleet.ship_count(ShipKind::Recycler) as f64 * recycler_cargo;

    let total_cargo = crate::fleet::total_capacity(&fleet, env.catalog)?;
    let conventional_space = total_cargo - recycler_capacity;
    let used_cargo = fleet.total_cargo();

    // Ordinary cargo eats conventional space first; only the overflow cuts
    // into what the recyclers can scoop.
    let available = recycler_capacity.min(recycler_capacity + conventional_space - used_cargo).max(0.0);

    let collected = fair_share(available, &debris.resources);

    debris.collect(&collected);
    for (resource, amount) in &collected {
        *fleet.cargo.entry(*resource).or_insert(0.0) += amount;
    }
    fleet.returning = true;

    event!(Level::INFO, fleet = %fleet.id, collected = collected.values().sum::<f64>(), "harvest complete");

    env.bmc
        .fleet_bmc()
        .record_harvest(&env.ctx, &fleet, &debris, &collected)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::ReturnToBase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{debris_at, env_with_state, fleet_between, world};
    use nova_domain::{CoordinateKind, Objective, ResourceKind, Universe};
    use std::collections::HashMap;

    async fn run_harvest(
        debris_resources: &[(ResourceKind, f64)],
        recyclers: u32,
        preloaded: &[(ResourceKind, f64)],
    ) -> (HashMap<ResourceKind, f64>, HashMap<ResourceKind, f64>) {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 4, 6);
        let target_slot = world(&universe, 0, 4, 9);
        let debris = debris_at(&universe, 0, 4, 9, debris_resources);

        let mut fleet = fleet_between(&source, &target_slot, Objective::Harvesting, &[(nova_domain::ShipKind::Recycler, recyclers)]);
        fleet.target = None;
        fleet.target_coords = fleet.target_coords.with_kind(CoordinateKind::Debris);
        fleet.cargo = preloaded.iter().copied().collect();

        let (env, state) = env_with_state(&universe, &[source], &[fleet.clone()]).await;
        state.write().await.debris_fields.insert(debris.id, debris.clone());

        let follow_up = simulate(fleet.clone(), &env).await.unwrap();
        assert_eq!(follow_up, FollowUp::ReturnToBase);

        let guard = state.read().await;
        let fleet_after = guard.fleets.get(&fleet.id).unwrap();
        let debris_after = guard.debris_fields.get(&debris.id).unwrap();
        assert!(fleet_after.returning);

        (fleet_after.cargo.clone(), debris_after.resources.clone())
    }

    #[tokio::test]
    async fn two_empty_recyclers_clear_a_small_field() {
        let (cargo, field) = run_harvest(&[(ResourceKind::Metal, 500.0), (ResourceKind::Crystal, 500.0)], 2, &[]).await;

        assert_eq!(cargo[&ResourceKind::Metal], 500.0);
        assert_eq!(cargo[&ResourceKind::Crystal], 500.0);
        assert!(field.values().all(|amount| *amount == 0.0));
    }

    #[tokio::test]
    async fn preloaded_cargo_caps_the_scoop() {
        // One 20k recycler already hauling 15k metal leaves 5k of space:
        // an even 2.5k/2.5k split, with the same amounts left behind.
        let (cargo, field) = run_harvest(
            &[(ResourceKind::Metal, 5_000.0), (ResourceKind::Crystal, 5_000.0)],
            1,
            &[(ResourceKind::Metal, 15_000.0)],
        )
        .await;

        assert!((cargo[&ResourceKind::Metal] - 17_500.0).abs() < 1e-6);
        assert!((cargo[&ResourceKind::Crystal] - 2_500.0).abs() < 1e-6);
        assert!((field[&ResourceKind::Metal] - 2_500.0).abs() < 1e-6);
        assert!((field[&ResourceKind::Crystal] - 2_500.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn harvest_conserves_the_field_total() {
        let before = 1_234.0 + 987.0 + 455.0;
        let (cargo, field) = run_harvest(
            &[
                (ResourceKind::Metal, 1_234.0),
                (ResourceKind::Crystal, 987.0),
                (ResourceKind::Deuterium, 455.0),
            ],
            1,
            &[],
        )
        .await;

        let collected: f64 = cargo.values().sum();
        let left: f64 = field.values().sum();
        assert!((collected + left - before).abs() < 1e-6);
    }
}
