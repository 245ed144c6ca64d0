use crate::error::MissionError;
use crate::missions::attack::execute_fight;
use crate::missions::{FollowUp, MissionEnv};
use crate::rng::MissionRng;
use nova_domain::{EspionageReport, Fleet, InfoTier, ReportId, ShipKind, TechnologyKind};
use tracing::{event, Level};

/// How deep a spy run sees, from the probe count and the espionage tech
/// edge. Thresholds are monotone: more probes never reveal less.
pub fn info_tier(probe_ships: u32, spy_level: u32, target_level: u32) -> InfoTier {
    let delta = spy_level as i64 - target_level as i64;
    let probes = probe_ships as i64 + 1;
    let indicator = probes + delta * delta.abs();

    match indicator {
        i if i >= 7 => InfoTier::Research,
        i if i >= 5 => InfoTier::Buildings,
        i if i >= 3 => InfoTier::Defense,
        i if i >= 2 => InfoTier::Fleets,
        _ => InfoTier::Materials,
    }
}

/// Chance the defender notices the probes and scrambles its forces.
pub fn counter_espionage_probability(probe_ships: u32, spy_level: u32, target_level: u32, target_ships: u32) -> f64 {
    let probes = probe_ships as f64 + 1.0;
    let edge = 2f64.powi(target_level as i32 - spy_level as i32);
    (edge * target_ships as f64 * probes * 0.0025).clamp(0.0, 1.0)
}

/// Espionage: always file a report at the computed tier, then roll for
/// detection; a detected probe fleet fights the defenders it came to watch.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let target_id = fleet.target.ok_or_else(|| MissionError::NotFound("espionage target".to_string()))?;
    let target = env.body(target_id).await?;

    let technologies = env
        .bmc
        .player_bmc()
        .get_technologies(&env.ctx, fleet.player)
        .await
        .map_err(MissionError::from_store)?;
    let spy_level = technologies.get(&TechnologyKind::EspionageTechnology).copied().unwrap_or(0);
    let target_level = target.technology(TechnologyKind::EspionageTechnology);

    let probe_ships = fleet.ship_count(ShipKind::EspionageProbe);
    let tier = info_tier(probe_ships, spy_level, target_level);
    let detection = counter_espionage_probability(probe_ships, spy_level, target_level, target.total_ships());

    let report = EspionageReport {
        id: ReportId::new(),
        universe: fleet.universe,
        spy: fleet.player,
        target_player: target.player,
        target: target.id,
        date: fleet.arrival_time,
        tier,
        counter_espionage: detection,
        materials: target.resources.iter().map(|(kind, slot)| (*kind, slot.stock)).collect(),
        fleets: (tier >= InfoTier::Fleets).then(|| target.ships.clone()),
        defenses: (tier >= InfoTier::Defense).then(|| target.defenses.clone()),
        buildings: (tier >= InfoTier::Buildings).then(|| target.buildings.clone()),
        technologies: (tier >= InfoTier::Research).then(|| target.technologies.clone()),
    };

    env.bmc
        .report_bmc()
        .create_espionage_report(&env.ctx, &report)
        .await
        .map_err(MissionError::from_store)?;

    let mut rng = MissionRng::from_arrival_time(fleet.arrival_time);
    let detected = rng.roll() <= detection;

    event!(Level::INFO, fleet = %fleet.id, %tier, detection, detected, "espionage run filed");

    if detected {
        let execution = execute_fight(vec![fleet], None, env).await?;
        return Ok(execution.follow_up);
    }

    fleet.returning = true;
    env.bmc
        .fleet_bmc()
        .save_fleet(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::ReturnToBase)
}
