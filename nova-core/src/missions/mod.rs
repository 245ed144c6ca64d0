use crate::error::MissionError;
use anyhow::Result;
use metrics::counter;
use nova_domain::{Catalog, CelestialBody, Fleet, Objective, Universe};
use nova_store::bmc::Bmc;
use nova_store::Ctx;
use std::sync::Arc;
use tracing::{event, Level};

pub mod acs_defend;
pub mod attack;
pub mod colonize;
pub mod deploy;
pub mod destroy;
pub mod espionage;
pub mod expedition;
pub mod harvest;
pub mod shares;
pub mod transport;

/// Shared handles every resolver needs: the store seam, the immutable
/// catalog and the calling context.
#[derive(Clone)]
pub struct MissionEnv {
    pub bmc: Arc<dyn Bmc>,
    pub catalog: &'static Catalog,
    pub ctx: Ctx,
}

impl MissionEnv {
    pub fn new(bmc: Arc<dyn Bmc>) -> Self {
        Self {
            bmc,
            catalog: Catalog::standard(),
            ctx: Ctx::Scheduler,
        }
    }

    pub async fn universe_of(&self, fleet: &Fleet) -> Result<Universe, MissionError> {
        self.bmc
            .universe_bmc()
            .get_universe(&self.ctx, fleet.universe)
            .await
            .map_err(MissionError::from_store)?
            .ok_or_else(|| MissionError::NotFound(format!("universe {}", fleet.universe)))
    }

    pub async fn body(&self, id: nova_domain::BodyId) -> Result<CelestialBody, MissionError> {
        self.bmc
            .planet_bmc()
            .get_body(&self.ctx, id)
            .await
            .map_err(MissionError::from_store)?
            .ok_or_else(|| MissionError::NotFound(format!("body {id}")))
    }
}

/// What the scheduler does once the mission resolves: nothing until the
/// return leg completes, nothing ever again, or keep the fleet holding at
/// the target. Maps onto the follow-up script of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    ReturnToBase,
    Holding,
    Dissolved,
}

impl FollowUp {
    pub fn script_name(&self) -> &'static str {
        match self {
            FollowUp::ReturnToBase => "fleet_return_to_base",
            FollowUp::Holding => "fleet_acs_defend",
            FollowUp::Dissolved => "",
        }
    }
}

/// Resolves one due mission end-to-end. The caller holds every lock the
/// mission needs; all pure computation in here runs without suspension, the
/// only awaits are store calls.
pub async fn simulate(fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let objective = fleet.objective;
    event!(Level::INFO, fleet = %fleet.id, %objective, returning = fleet.returning, "resolving mission");

    let follow_up = if fleet.returning {
        resolve_return(fleet, env).await?
    } else {
        match objective {
            Objective::Deployment => deploy::resolve(fleet, env).await?,
            Objective::Transport => transport::resolve(fleet, env).await?,
            Objective::Colonization => colonize::resolve(fleet, env).await?,
            Objective::Expedition => expedition::resolve(fleet, env).await?,
            Objective::AcsDefend => acs_defend::resolve(fleet, env).await?,
            Objective::AcsAttack | Objective::Attacking => attack::resolve(fleet, env).await?,
            Objective::Harvesting => harvest::resolve(fleet, env).await?,
            Objective::Espionage => espionage::resolve(fleet, env).await?,
            Objective::Destroy => destroy::resolve(fleet, env).await?,
        }
    };

    counter!("nova_missions_resolved_total", "objective" => objective.to_string()).increment(1);
    Ok(follow_up)
}

/// The return leg completed: ships and whatever sits in the holds merge back
/// into the source body and the fleet dissolves.
async fn resolve_return(fleet: Fleet, env: &MissionEnv) -> Result<FollowUp, MissionError> {
    let mut source = env.body(fleet.source).await?;

    for (kind, count) in &fleet.ships {
        source.add_ships(*kind, *count);
    }
    for (resource, amount) in &fleet.cargo {
        source.add_resource(*resource, *amount);
    }

    env.bmc
        .fleet_bmc()
        .record_return_to_base(&env.ctx, &fleet, &source)
        .await
        .map_err(MissionError::from_store)?;

    Ok(FollowUp::Dissolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_objects::{env_with_state, fleet_between, world};
    use nova_domain::{ResourceKind, ShipKind, Universe};
    use std::collections::HashMap;

    #[tokio::test]
    async fn a_returning_fleet_merges_back_into_its_source() {
        let universe = Universe::for_tests(1, 50, 15);
        let source = world(&universe, 0, 3, 5);
        let target = world(&universe, 0, 3, 9);

        let mut fleet = fleet_between(&source, &target, Objective::Transport, &[(ShipKind::SmallCargo, 4)]);
        fleet.returning = true;
        fleet.cargo = HashMap::from([(ResourceKind::Metal, 321.0)]);

        let (env, state) = env_with_state(&universe, &[source.clone(), target], &[fleet.clone()]).await;

        let follow_up = simulate(fleet.clone(), &env).await.unwrap();
        assert_eq!(follow_up, FollowUp::Dissolved);

        let guard = state.read().await;
        assert!(!guard.fleets.contains_key(&fleet.id));
        let home = guard.bodies.get(&source.id).unwrap();
        assert_eq!(home.ship_count(ShipKind::SmallCargo), source.ship_count(ShipKind::SmallCargo) + 4);
        assert_eq!(home.stock(ResourceKind::Metal), source.stock(ResourceKind::Metal) + 321.0);
    }
}
