use crate::error::MissionError;
use crate::missions::attack::execute_fight;
use crate::missions::{FollowUp, MissionEnv};
use crate::rng::MissionRng;
use nova_domain::{DestroyOutcome, Fleet, ShipKind};
use tracing::{event, Level};

/// Chance the moon shatters, from its diameter and the deathstar pack.
/// Written as percentages in the lineage; normalized to [0, 1] here.
pub fn moon_destruction_chance(diameter: u32, deathstars: u32) -> f64 {
    (((100.0 - (diameter as f64).sqrt()) * (deathstars as f64).sqrt()) / 100.0).clamp(0.0, 1.0)
}

/// Chance the deathstars themselves break up on the attempt.
pub fn deathstar_destruction_chance(diameter: u32) -> f64 {
    ((0.5 * (diameter as f64).sqrt()) / 100.0).clamp(0.0, 1.0)
}

/// Destroy: fight through the moon's garrison first; any deathstars still
/// flying then take their shot at cracking the moon, and the moon takes its
/// shot back. Both rolls come from the same coordinate-seeded PRNG, so a
/// replay agrees with the original.
pub async fn resolve(fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let target_id = fleet.target.ok_or_else(|| MissionError::NotFound("destroy target".to_string()))?;
    let moon = env.body(target_id).await?;
    if !moon.is_moon() {
        return Err(MissionError::Validation(nova_domain::ValidationError::DestroyRequiresMoon));
    }

    let fleet_id = fleet.id;
    let arrival = fleet.arrival_time;
    let execution = execute_fight(vec![fleet], None, env).await?;

    let Some(mut fleet_after) = execution.fleets_after.get(&fleet_id).cloned().flatten() else {
        // The garrison won outright; the fight aftermath already said so.
        return Ok(FollowUp::Dissolved);
    };

    let deathstars = fleet_after.ship_count(ShipKind::Deathstar);
    if deathstars == 0 {
        return Ok(execution.follow_up);
    }

    // Reload the moon: the fight aftermath may have trimmed its garrison.
    let moon_after = env.body(target_id).await?;

    let moon_chance = moon_destruction_chance(moon_after.diameter, deathstars);
    let deathstar_chance = deathstar_destruction_chance(moon_after.diameter);

    let mut rng = MissionRng::from_coordinate(&moon_after.coordinate);
    let moon_destroyed = rng.roll() < moon_chance;
    let deathstars_destroyed = rng.roll() < deathstar_chance;

    if deathstars_destroyed {
        fleet_after.remove_ships(ShipKind::Deathstar, deathstars);
    }
    let fleet_gone = fleet_after.ships.is_empty();

    let outcome = DestroyOutcome {
        fleet: fleet_id,
        moon: moon_after.id,
        moon_destroyed,
        deathstars_destroyed,
        date: arrival,
    };

    event!(
        Level::INFO,
        fleet = %fleet_id,
        moon = %moon_after.id,
        moon_chance,
        deathstar_chance,
        moon_destroyed,
        deathstars_destroyed,
        "destruction rolls resolved"
    );

    env.bmc
        .fleet_bmc()
        .record_destroy(
            &env.ctx,
            &outcome,
            (!fleet_gone).then_some(&fleet_after),
            (!moon_destroyed).then_some(&moon_after),
        )
        .await
        .map_err(MissionError::from_store)?;

    Ok(if fleet_gone { FollowUp::Dissolved } else { FollowUp::ReturnToBase })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{env_with_state, fleet_between, moon, world};
    use nova_domain::{Objective, Universe};
    use std::collections::HashMap;

    #[test]
    fn the_reference_scenario_probabilities() {
        // Diameter 8000, five deathstars.
        let moon_chance = moon_destruction_chance(8_000, 5);
        let rip_chance = deathstar_destruction_chance(8_000);

        assert!((moon_chance - ((100.0 - 8_000f64.sqrt()) * 5f64.sqrt()) / 100.0).abs() < 1e-12);
        assert!((rip_chance - 0.5 * 8_000f64.sqrt() / 100.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&moon_chance));
        assert!((0.0..=1.0).contains(&rip_chance));
    }

    #[test]
    fn huge_moons_cannot_be_cracked_and_huge_packs_clamp_to_one() {
        assert_eq!(moon_destruction_chance(12_000, 4), 0.0);
        assert_eq!(moon_destruction_chance(100, 10_000), 1.0);
    }

    async fn run_destroy(diameter: u32, deathstars: u32) -> (bool, bool) {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 8, 3);
        let mut target = moon(&universe, 0, 8, 9, diameter);
        target.defenses = HashMap::new();
        target.ships = HashMap::new();

        let fleet = fleet_between(&source, &target, Objective::Destroy, &[(ShipKind::Deathstar, deathstars)]);
        let (env, state) = env_with_state(&universe, &[source, target.clone()], &[fleet.clone()]).await;

        simulate(fleet.clone(), &env).await.unwrap();

        let guard = state.read().await;
        let moon_survived = guard.bodies.contains_key(&target.id);
        let fleet_survived = guard.fleets.contains_key(&fleet.id);
        (moon_survived, fleet_survived)
    }

    #[tokio::test]
    async fn identical_seeds_give_identical_destruction_outcomes() {
        let first = run_destroy(8_000, 5).await;
        let second = run_destroy(8_000, 5).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn an_uncrackable_moon_survives_and_the_fleet_returns() {
        // sqrt(12000) > 100: the moon roll is a guaranteed miss; whether the
        // deathstars rip apart is up to the seeded roll, so only assert the
        // moon.
        let (moon_survived, _) = run_destroy(12_000, 3).await;
        assert!(moon_survived);
    }
}
