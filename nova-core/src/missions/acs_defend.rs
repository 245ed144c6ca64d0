use crate::error::MissionError;
use crate::missions::{FollowUp, MissionEnv};
use nova_domain::Fleet;
use tracing::{event, Level};

/// ACS defend: the fleet parks at the allied body for its deployment time.
/// While it holds, `defending_fleets_at` folds its ships into the defender
/// block of any fight at the body; the return leg fires once the hold (plus
/// the flight home) elapses.
pub async fn resolve(mut fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    fleet.deployed = true;
    fleet.returning = true;

    event!(Level::INFO, fleet = %fleet.id, target = ?fleet.target, hold_seconds = fleet.deployment_seconds, "reinforcements in position");

    env.bmc
        .fleet_bmc()
        .record_acs_defend(&env.ctx, &fleet)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::Holding)
}
