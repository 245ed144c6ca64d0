use crate::aftermath::{write_fight_aftermath, FightAftermath};
use crate::combat::{assemble_attacker, assemble_defender, resolve_fight, EngineResult};
use crate::error::MissionError;
use crate::fleet::total_capacity;
use crate::missions::shares::fair_share_across;
use crate::missions::{FollowUp, MissionEnv};
use crate::rng::MissionRng;
use itertools::Itertools;
use nova_domain::{
    AcsFleet, BodyId, BuildingKind, CelestialBody, DebrisField, DebrisFieldId, FightOutcome, FightReport, FightResult, Fleet, FleetFightAftermath, FleetId,
    MoonCreation, PlanetFightAftermath, PlayerId, ReportId, ResourceKind, TechnologyKind, Universe,
};
use std::collections::HashMap;
use tracing::{event, Level};

/// Share of a defender's movable stock the winning side may carry off.
const PILLAGE_RATIO: f64 = 0.5;

/// One percent of moon chance per this much debris, capped at twenty.
const DEBRIS_PER_MOON_PERCENT: f64 = 100_000.0;
const MOON_CHANCE_CAP: f64 = 0.2;

/// Attack (single fleet or joint operation): run the engine, split the
/// pillage, drop the debris, maybe raise a moon, persist the lot.
pub async fn resolve(fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let (fleets, acs) = match fleet.acs {
        Some(acs_id) => {
            let acs = env
                .bmc
                .acs_bmc()
                .get_acs(&env.ctx, acs_id)
                .await
                .map_err(MissionError::from_store)?
                .ok_or_else(|| MissionError::NotFound(format!("ACS operation {acs_id}")))?;
            let components = env
                .bmc
                .fleet_bmc()
                .fleets_of_acs(&env.ctx, acs_id)
                .await
                .map_err(MissionError::from_store)?;
            (components, Some(acs))
        }
        None => (vec![fleet], None),
    };

    let execution = execute_fight(fleets, acs, env).await?;
    Ok(execution.follow_up)
}

pub(crate) struct FightExecution {
    pub outcome: FightOutcome,
    pub fleets_after: HashMap<FleetId, Option<Fleet>>,
    pub follow_up: FollowUp,
}

/// The shared fight pipeline, also entered from counter-espionage and from
/// destroy missions. Attacker fleets arrive in join order and that order is
/// preserved through firing and aftermath writes.
pub(crate) async fn execute_fight(mut fleets: Vec<Fleet>, acs: Option<AcsFleet>, env: &MissionEnv) -> Result<FightExecution, MissionError> {
    let lead = fleets
        .first()
        .cloned()
        .ok_or_else(|| MissionError::NotFound("attacking fleets".to_string()))?;
    let universe = env.universe_of(&lead).await?;
    let target_id = lead
        .target
        .ok_or_else(|| MissionError::NotFound("attack target".to_string()))?;
    let mut target = env.body(target_id).await?;

    let reinforcements = env
        .bmc
        .fleet_bmc()
        .defending_fleets_at(&env.ctx, target_id)
        .await
        .map_err(MissionError::from_store)?;

    let technologies = load_technologies(&fleets, &reinforcements, env).await?;

    let attacker = assemble_attacker(&fleets, &technologies, env.catalog)?;
    let defender = assemble_defender(&target, &reinforcements, &technologies, env.catalog)?;

    let mut rng = MissionRng::for_fight(&target.coordinate, lead.arrival_time);
    let engine = resolve_fight(&attacker, &defender, &universe, env.catalog, &mut rng);

    // Fold the engine's survivors back into the snapshots.
    target.ships = engine.defender.surviving_ships.get(&None).cloned().unwrap_or_default();
    target.defenses = engine.defender.surviving_defenses.clone();

    for fleet in &mut fleets {
        fleet.ships = engine.attacker.surviving_ships.get(&Some(fleet.id)).cloned().unwrap_or_default();
        fleet.returning = true;
    }
    let mut reinforcements = reinforcements;
    for fleet in &mut reinforcements {
        fleet.ships = engine.defender.surviving_ships.get(&Some(fleet.id)).cloned().unwrap_or_default();
    }

    // Pillage on a defender loss, split across the surviving waves by
    // their free cargo space.
    let mut pillage: HashMap<ResourceKind, f64> = HashMap::new();
    if engine.outcome == FightOutcome::Loss {
        let pool: HashMap<ResourceKind, f64> = target
            .resources
            .iter()
            .filter(|(kind, _)| kind.movable())
            .map(|(kind, slot)| (*kind, slot.stock * PILLAGE_RATIO))
            .collect();

        let capacities = fleets
            .iter()
            .map(|fleet| {
                let capacity = total_capacity(fleet, env.catalog).unwrap_or(0.0);
                (capacity - fleet.total_cargo()).max(0.0)
            })
            .collect_vec();

        let allocations = fair_share_across(&pool, &capacities);
        for (fleet, allocation) in fleets.iter_mut().zip(&allocations) {
            for (resource, amount) in allocation {
                *fleet.cargo.entry(*resource).or_insert(0.0) += amount;
                *pillage.entry(*resource).or_insert(0.0) += amount;
            }
        }
        for (resource, amount) in &pillage {
            target.remove_resource(*resource, *amount)?;
        }
    }

    // Debris accumulates into the slot's existing field, or opens one.
    let debris_after = merge_debris(&engine, &target, &universe, env).await?;

    let moon = roll_moon(&engine, &target, env, &mut rng).await?;
    let moon_body = moon.map(|creation| generate_moon(&universe, &target, creation.diameter));

    let fight_result = FightResult {
        outcome: engine.outcome,
        debris: engine.debris.clone(),
        moon,
        date: lead.arrival_time,
    };

    let reports = build_reports(&fleets, &reinforcements, &target, &fight_result, &pillage);

    let planet = PlanetFightAftermath {
        body: target.id,
        ships_remaining: target.ships.clone(),
        defenses_remaining: target.defenses.clone(),
        pillage: pillage.clone(),
        debris: engine.debris.clone(),
        moon,
        date: fight_result.date,
        reports,
    };

    let attacker_fleets = fleets
        .iter()
        .map(|fleet| {
            let destroyed = fleet.ships.is_empty();
            let aftermath = FleetFightAftermath {
                fleet: fleet.id,
                ships_remaining: fleet.ships.clone(),
                cargo: fleet.cargo.clone(),
                destroyed,
            };
            (aftermath, (!destroyed).then(|| fleet.clone()))
        })
        .collect_vec();

    let reinforcement_fleets = reinforcements
        .iter()
        .map(|fleet| {
            let destroyed = fleet.ships.is_empty();
            let aftermath = FleetFightAftermath {
                fleet: fleet.id,
                ships_remaining: fleet.ships.clone(),
                cargo: fleet.cargo.clone(),
                destroyed,
            };
            (aftermath, (!destroyed).then(|| fleet.clone()))
        })
        .collect_vec();

    let aftermath = FightAftermath {
        planet,
        target_after: target,
        debris_after,
        moon_body,
        attacker_fleets,
        reinforcements: reinforcement_fleets,
        acs: acs.map(|acs| acs.id),
    };

    write_fight_aftermath(env, &aftermath).await?;

    let fleets_after: HashMap<FleetId, Option<Fleet>> = fleets
        .iter()
        .map(|fleet| (fleet.id, (!fleet.ships.is_empty()).then(|| fleet.clone())))
        .collect();

    let any_survivor = fleets.iter().any(|fleet| !fleet.ships.is_empty());
    let follow_up = if any_survivor { FollowUp::ReturnToBase } else { FollowUp::Dissolved };

    event!(Level::INFO, outcome = %fight_result.outcome, survivors = any_survivor, "engagement resolved");

    Ok(FightExecution {
        outcome: engine.outcome,
        fleets_after,
        follow_up,
    })
}

async fn load_technologies(
    fleets: &[Fleet],
    reinforcements: &[Fleet],
    env: &MissionEnv,
) -> Result<HashMap<PlayerId, HashMap<TechnologyKind, u32>>, MissionError> {
    let mut technologies = HashMap::new();
    for player in fleets.iter().chain(reinforcements.iter()).map(|fleet| fleet.player).unique() {
        let levels = env
            .bmc
            .player_bmc()
            .get_technologies(&env.ctx, player)
            .await
            .map_err(MissionError::from_store)?;
        technologies.insert(player, levels);
    }
    Ok(technologies)
}

async fn merge_debris(engine: &EngineResult, target: &CelestialBody, universe: &Universe, env: &MissionEnv) -> Result<Option<DebrisField>, MissionError> {
    if engine.debris.is_empty() {
        return Ok(None);
    }

    let slot = target.coordinate.with_kind(nova_domain::CoordinateKind::Debris);
    let existing = env
        .bmc
        .debris_bmc()
        .get_debris_at(&env.ctx, universe.id, &slot)
        .await
        .map_err(MissionError::from_store)?;

    let mut field = existing.unwrap_or_else(|| DebrisField {
        id: DebrisFieldId::new(),
        universe: universe.id,
        coordinate: slot,
        resources: HashMap::new(),
        created_at: chrono::Utc::now(),
    });
    field.deposit(&engine.debris);
    Ok(Some(field))
}

/// A defender wipe over a world can condense the debris into a fresh moon,
/// one percent of chance per hundred thousand units of ruins, capped.
async fn roll_moon(engine: &EngineResult, target: &CelestialBody, env: &MissionEnv, rng: &mut MissionRng) -> Result<Option<MoonCreation>, MissionError> {
    if engine.outcome != FightOutcome::Loss || target.coordinate.kind != nova_domain::CoordinateKind::World {
        return Ok(None);
    }

    let moon_slot = target.coordinate.with_kind(nova_domain::CoordinateKind::Moon);
    let already_there = env
        .bmc
        .planet_bmc()
        .get_body_at(&env.ctx, target.universe, &moon_slot)
        .await
        .map_err(MissionError::from_store)?;
    if already_there.is_some() {
        return Ok(None);
    }

    let total_debris: f64 = engine.debris.values().sum();
    let chance = (total_debris / DEBRIS_PER_MOON_PERCENT * 0.01).min(MOON_CHANCE_CAP);
    if rng.roll() >= chance {
        return Ok(None);
    }

    let diameter = (((chance * 100.0).sqrt() * 1_000.0).round() as i64 + rng.between(-500, 500)).max(1_000) as u32;
    Ok(Some(MoonCreation { diameter }))
}

fn generate_moon(universe: &Universe, planet: &CelestialBody, diameter: u32) -> CelestialBody {
    CelestialBody {
        id: BodyId::new(),
        universe: universe.id,
        player: planet.player,
        coordinate: planet.coordinate.with_kind(nova_domain::CoordinateKind::Moon),
        name: "moon".to_string(),
        diameter,
        min_temperature: planet.min_temperature,
        max_temperature: planet.max_temperature,
        fields: 1,
        resources: HashMap::new(),
        buildings: HashMap::from([(BuildingKind::LunarBase, 0)]),
        ships: HashMap::new(),
        defenses: HashMap::new(),
        technologies: planet.technologies.clone(),
    }
}

fn build_reports(
    fleets: &[Fleet],
    reinforcements: &[Fleet],
    target: &CelestialBody,
    fight_result: &FightResult,
    pillage: &HashMap<ResourceKind, f64>,
) -> Vec<FightReport> {
    let mut reports = Vec::new();

    for fleet in fleets {
        reports.push(FightReport {
            id: ReportId::new(),
            universe: fleet.universe,
            player: fleet.player,
            fleet: Some(fleet.id),
            body: target.id,
            date: fight_result.date,
            outcome: fight_result.outcome,
            debris: fight_result.debris.clone(),
            pillage: pillage.clone(),
            moon: fight_result.moon,
        });
    }
    for fleet in reinforcements {
        reports.push(FightReport {
            id: ReportId::new(),
            universe: fleet.universe,
            player: fleet.player,
            fleet: Some(fleet.id),
            body: target.id,
            date: fight_result.date,
            outcome: fight_result.outcome,
            debris: fight_result.debris.clone(),
            pillage: pillage.clone(),
            moon: fight_result.moon,
        });
    }
    reports.push(FightReport {
        id: ReportId::new(),
        universe: target.universe,
        player: target.player,
        fleet: None,
        body: target.id,
        date: fight_result.date,
        outcome: fight_result.outcome,
        debris: fight_result.debris.clone(),
        pillage: pillage.clone(),
        moon: fight_result.moon,
    });

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::simulate;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{Catalog, Objective, ShipKind, Universe};

    #[tokio::test]
    async fn a_crushing_raid_pillages_and_heads_home() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 1, 3);
        let mut target = world(&universe, 0, 1, 9);
        target.ships = HashMap::from([(ShipKind::LightFighter, 2)]);

        let mut fleet = fleet_between(&source, &target, Objective::Attacking, &[(ShipKind::Battleship, 30), (ShipKind::LargeCargo, 10)]);
        fleet.cargo = HashMap::new();

        let (env, state) = env_with_state(&universe, &[source, target.clone()], &[fleet.clone()]).await;

        let follow_up = simulate(fleet.clone(), &env).await.unwrap();
        assert_eq!(follow_up, FollowUp::ReturnToBase);

        let guard = state.read().await;
        let fleet_after = guard.fleets.get(&fleet.id).unwrap();
        assert!(fleet_after.returning);
        assert!(!fleet_after.cargo.is_empty(), "the raid should pillage");

        let target_after = guard.bodies.get(&target.id).unwrap();
        assert!(target_after.ships.is_empty());
        // Half the stock is gone, bounded by the cargo space.
        assert!(target_after.stock(ResourceKind::Metal) < target.stock(ResourceKind::Metal));
        assert!(!guard.fight_reports.is_empty());
    }

    #[tokio::test]
    async fn pillage_is_bounded_by_free_cargo_space() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 2, 3);
        let mut target = world(&universe, 0, 2, 9);
        target.ships = HashMap::new();
        target.defenses = HashMap::new();

        // A single small cargo: 5000 capacity against a far richer stock.
        let fleet = fleet_between(&source, &target, Objective::Attacking, &[(ShipKind::SmallCargo, 1), (ShipKind::Battleship, 1)]);
        let (env, state) = env_with_state(&universe, &[source, target.clone()], &[fleet.clone()]).await;

        simulate(fleet.clone(), &env).await.unwrap();

        let guard = state.read().await;
        let fleet_after = guard.fleets.get(&fleet.id).unwrap();
        let carried: f64 = fleet_after.cargo.values().sum();
        let capacity = crate::fleet::total_capacity(fleet_after, Catalog::standard()).unwrap();
        assert!(carried <= capacity + 1e-6);
        assert!(carried > 0.0);
    }

    #[tokio::test]
    async fn a_joint_raid_splits_the_pillage_across_waves() {
        let universe = Universe::for_tests(1, 50, 15);
        let source_a = world(&universe, 0, 4, 2);
        let source_b = world(&universe, 0, 4, 3);
        let mut target = world(&universe, 0, 4, 9);
        target.ships = HashMap::new();
        target.defenses = HashMap::new();

        let mut first = fleet_between(&source_a, &target, Objective::AcsAttack, &[(ShipKind::LargeCargo, 2), (ShipKind::Battleship, 5)]);
        let mut second = fleet_between(&source_b, &target, Objective::AcsAttack, &[(ShipKind::SmallCargo, 2), (ShipKind::Battleship, 5)]);
        second.arrival_time = first.arrival_time;

        let mut acs = nova_domain::AcsFleet::from_seed(&first).unwrap();
        acs.components.push(second.id);
        first.acs = Some(acs.id);
        second.acs = Some(acs.id);

        let (env, state) = env_with_state(&universe, &[source_a, source_b, target.clone()], &[first.clone(), second.clone()]).await;
        state.write().await.acs_fleets.insert(acs.id, acs.clone());

        let follow_up = simulate(first.clone(), &env).await.unwrap();
        assert_eq!(follow_up, FollowUp::ReturnToBase);

        let guard = state.read().await;
        let first_after = guard.fleets.get(&first.id).unwrap();
        let second_after = guard.fleets.get(&second.id).unwrap();

        // Both waves fill their free cargo space exactly: the target's
        // stock dwarfs the combined holds.
        let capacity_first = crate::fleet::total_capacity(first_after, Catalog::standard()).unwrap();
        let capacity_second = crate::fleet::total_capacity(second_after, Catalog::standard()).unwrap();
        let carried_first: f64 = first_after.cargo.values().sum();
        let carried_second: f64 = second_after.cargo.values().sum();
        assert!((carried_first - capacity_first).abs() < 1e-6);
        assert!((carried_second - capacity_second).abs() < 1e-6);

        // The target lost exactly what the waves carry.
        let target_after = guard.bodies.get(&target.id).unwrap();
        let removed = target.stock(ResourceKind::Metal) - target_after.stock(ResourceKind::Metal)
            + target.stock(ResourceKind::Crystal) - target_after.stock(ResourceKind::Crystal)
            + target.stock(ResourceKind::Deuterium) - target_after.stock(ResourceKind::Deuterium);
        assert!((removed - carried_first - carried_second).abs() < 1e-6);

        // The operation record is closed.
        assert!(!guard.acs_fleets.contains_key(&acs.id));
    }

    #[tokio::test]
    async fn destroyed_ships_leave_a_debris_field() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 3, 3);
        let mut target = world(&universe, 0, 3, 9);
        target.ships = HashMap::from([(ShipKind::LightFighter, 50)]);

        let fleet = fleet_between(&source, &target, Objective::Attacking, &[(ShipKind::Battleship, 40)]);
        let (env, state) = env_with_state(&universe, &[source, target.clone()], &[fleet.clone()]).await;

        simulate(fleet.clone(), &env).await.unwrap();

        let guard = state.read().await;
        let field = guard
            .debris_fields
            .values()
            .find(|field| field.coordinate.same_slot(&target.coordinate))
            .expect("debris field created");
        assert!(field.total() > 0.0);
    }
}
