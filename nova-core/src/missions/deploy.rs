use crate::error::MissionError;
use crate::missions::{FollowUp, MissionEnv};
use nova_domain::Fleet;
use tracing::{event, Level};

/// Deployment: the fleet relocates. Ships and cargo merge into the target
/// body and the fleet record disappears; there is no return leg.
pub async fn resolve(fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let target_id = fleet.target.ok_or_else(|| MissionError::NotFound("deployment target".to_string()))?;
    let mut target = env.body(target_id).await?;

    for (kind, count) in &fleet.ships {
        target.add_ships(*kind, *count);
    }
    for (resource, amount) in &fleet.cargo {
        target.add_resource(*resource, *amount);
    }

    event!(Level::INFO, fleet = %fleet.id, target = %target.id, "fleet deployed");

    env.bmc
        .fleet_bmc()
        .record_deployment(&env.ctx, &fleet, &target)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::Dissolved)
}
