use crate::error::MissionError;
use crate::missions::MissionEnv;
use nova_domain::{AcsFleetId, CelestialBody, DebrisField, Fleet, FleetFightAftermath, PlanetFightAftermath};
use tracing::{event, Level};

/// Everything a resolved fight needs persisted, assembled in memory before
/// a single store call is made.
#[derive(Debug, Clone)]
pub struct FightAftermath {
    pub planet: PlanetFightAftermath,
    pub target_after: CelestialBody,
    pub debris_after: Option<DebrisField>,
    pub moon_body: Option<CelestialBody>,
    /// Attacker fleets in join order; `None` marks a wiped-out fleet.
    pub attacker_fleets: Vec<(FleetFightAftermath, Option<Fleet>)>,
    pub reinforcements: Vec<(FleetFightAftermath, Option<Fleet>)>,
    pub acs: Option<AcsFleetId>,
}

/// The write sequence of a fight: exactly one planet-side write
/// (carrying debris, moon and reports), then one fleet write per attacker
/// wave in join order, then the reinforcements, then the ACS closure.
pub async fn write_fight_aftermath(env: &MissionEnv, aftermath: &FightAftermath) -> Result<(), MissionError> {
    env.bmc
        .planet_bmc()
        .apply_fight_aftermath(
            &env.ctx,
            &aftermath.planet,
            &aftermath.target_after,
            aftermath.debris_after.as_ref(),
            aftermath.moon_body.as_ref(),
        )
        .await
        .map_err(MissionError::from_store)?;

    for (fleet_aftermath, fleet_after) in aftermath.attacker_fleets.iter().chain(aftermath.reinforcements.iter()) {
        env.bmc
            .fleet_bmc()
            .record_fight_aftermath(&env.ctx, fleet_aftermath, fleet_after.as_ref())
            .await
            .map_err(MissionError::from_store)?;
    }

    if let Some(acs) = aftermath.acs {
        env.bmc
            .acs_bmc()
            .close_acs(&env.ctx, acs)
            .await
            .map_err(MissionError::from_store)?;
    }

    event!(
        Level::INFO,
        target = %aftermath.target_after.id,
        fleets = aftermath.attacker_fleets.len(),
        debris = aftermath.debris_after.is_some(),
        moon = aftermath.moon_body.is_some(),
        "fight aftermath committed"
    );

    Ok(())
}
