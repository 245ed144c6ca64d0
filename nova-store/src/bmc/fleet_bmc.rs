use crate::bmc::SharedState;
use crate::proxy::{decode_data, InsertRequest, QueryDescriptor, QueryFilter, Script};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use mockall::automock;
use nova_domain::{AcsFleetId, BodyId, CelestialBody, DebrisField, DestroyOutcome, Fleet, FleetFightAftermath, FleetId, Objective, ResourceKind};
use std::collections::HashMap;
use std::fmt::Debug;

/// Fleet reads plus the scripted per-mission writes. Every `record_*` call
/// takes the already-mutated snapshots and persists them as final state; the
/// SQL functions behind the scripts SET, they never re-apply deltas.
#[automock]
#[async_trait]
pub trait FleetBmcTrait: Send + Sync + Debug {
    async fn get_fleet(&self, ctx: &Ctx, id: FleetId) -> Result<Option<Fleet>>;
    /// Fleets whose active leg boundary has passed: outbound fleets past
    /// their arrival, returning ones past their return time.
    async fn due_fleets(&self, ctx: &Ctx, now: DateTime<Utc>) -> Result<Vec<Fleet>>;
    async fn fleets_of_acs(&self, ctx: &Ctx, acs: AcsFleetId) -> Result<Vec<Fleet>>;
    /// Reinforcement fleets holding position at a body (ACS defend).
    async fn defending_fleets_at(&self, ctx: &Ctx, body: BodyId) -> Result<Vec<Fleet>>;
    /// Persists a freshly validated fleet together with its fuel/cargo
    /// deducted source body, atomically.
    async fn create_fleet(&self, ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()>;
    async fn save_fleet(&self, ctx: &Ctx, fleet: &Fleet) -> Result<()>;
    async fn record_return_to_base(&self, ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()>;
    async fn record_deployment(&self, ctx: &Ctx, fleet: &Fleet, target_after: &CelestialBody) -> Result<()>;
    async fn record_transport(&self, ctx: &Ctx, fleet_after: &Fleet, target_after: &CelestialBody) -> Result<()>;
    async fn record_harvest(&self, ctx: &Ctx, fleet_after: &Fleet, debris_after: &DebrisField, collected: &HashMap<ResourceKind, f64>) -> Result<()>;
    /// `fleet_after` is `None` when the fleet dissolved into the colony.
    async fn record_colonization_success<'a>(&self, ctx: &Ctx, fleet: FleetId, fleet_after: Option<&'a Fleet>, new_planet: &CelestialBody) -> Result<()>;
    async fn record_colonization_failed(&self, ctx: &Ctx, fleet_after: &Fleet) -> Result<()>;
    /// `moon_after` is `None` when the moon was annihilated, `fleet_after`
    /// is `None` when every deathstar was.
    async fn record_destroy<'a>(&self, ctx: &Ctx, outcome: &DestroyOutcome, fleet_after: Option<&'a Fleet>, moon_after: Option<&'a CelestialBody>) -> Result<()>;
    async fn record_acs_defend(&self, ctx: &Ctx, fleet_after: &Fleet) -> Result<()>;
    async fn record_fight_aftermath<'a>(&self, ctx: &Ctx, aftermath: &FleetFightAftermath, fleet_after: Option<&'a Fleet>) -> Result<()>;
}

#[derive(Debug)]
pub struct DbFleetBmc {
    pub proxy: DbProxy,
}

impl DbFleetBmc {
    async fn fetch_fleets(&self, table: String, filters: Vec<QueryFilter>, ordering: Option<String>) -> Result<Vec<Fleet>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table,
                filters,
                ordering,
            })
            .await?;

        rows.iter().map(decode_data).collect()
    }
}

#[async_trait]
impl FleetBmcTrait for DbFleetBmc {
    async fn get_fleet(&self, _ctx: &Ctx, id: FleetId) -> Result<Option<Fleet>> {
        let fleets = self
            .fetch_fleets(
                "fleets".to_string(),
                vec![QueryFilter {
                    key: "id".to_string(),
                    values: vec![id.to_string()],
                }],
                None,
            )
            .await?;

        Ok(fleets.into_iter().next())
    }

    async fn due_fleets(&self, _ctx: &Ctx, now: DateTime<Utc>) -> Result<Vec<Fleet>> {
        // The time comparison cannot be expressed as an equality filter, so
        // it rides along in the free-form table clause the proxy accepts.
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let table = format!(
            "fleets WHERE ((returning AND return_time <= '{stamp}') OR (NOT returning AND NOT deployed AND arrival_time <= '{stamp}'))"
        );

        self.fetch_fleets(table, vec![], Some("arrival_time".to_string())).await
    }

    async fn fleets_of_acs(&self, _ctx: &Ctx, acs: AcsFleetId) -> Result<Vec<Fleet>> {
        self.fetch_fleets(
            "fleets JOIN fleets_acs_components ON fleets.id = fleets_acs_components.fleet".to_string(),
            vec![QueryFilter {
                key: "fleets_acs_components.acs".to_string(),
                values: vec![acs.to_string()],
            }],
            Some("fleets_acs_components.joined_at".to_string()),
        )
        .await
    }

    async fn defending_fleets_at(&self, _ctx: &Ctx, body: BodyId) -> Result<Vec<Fleet>> {
        self.fetch_fleets(
            "fleets".to_string(),
            vec![
                QueryFilter {
                    key: "target".to_string(),
                    values: vec![body.to_string()],
                },
                QueryFilter {
                    key: "objective".to_string(),
                    values: vec![Objective::AcsDefend.to_string()],
                },
                QueryFilter {
                    key: "deployed".to_string(),
                    values: vec!["true".to_string()],
                },
            ],
            None,
        )
        .await
    }

    async fn create_fleet(&self, _ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::CreateFleet,
                vec![serde_json::to_value(fleet)?, serde_json::to_value(source_after)?],
            ))
            .await
    }

    async fn save_fleet(&self, _ctx: &Ctx, fleet: &Fleet) -> Result<()> {
        // create_fleet upserts on id; a bare save simply omits the source.
        self.proxy
            .insert(&InsertRequest::new(Script::CreateFleet, vec![serde_json::to_value(fleet)?, serde_json::Value::Null]))
            .await
    }

    async fn record_return_to_base(&self, _ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetReturnToBase,
                vec![serde_json::to_value(fleet.id)?, serde_json::to_value(source_after)?],
            ))
            .await
    }

    async fn record_deployment(&self, _ctx: &Ctx, fleet: &Fleet, target_after: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetDeployment,
                vec![serde_json::to_value(fleet.id)?, serde_json::to_value(target_after)?],
            ))
            .await
    }

    async fn record_transport(&self, _ctx: &Ctx, fleet_after: &Fleet, target_after: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetTransport,
                vec![serde_json::to_value(fleet_after)?, serde_json::to_value(target_after)?],
            ))
            .await
    }

    async fn record_harvest(&self, _ctx: &Ctx, fleet_after: &Fleet, debris_after: &DebrisField, collected: &HashMap<ResourceKind, f64>) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::FleetHarvesting, vec![serde_json::to_value(fleet_after)?]))
            .await?;

        let collected_sorted = collected
            .iter()
            .sorted_by_key(|(kind, _)| **kind)
            .map(|(kind, amount)| serde_json::json!({ "resource": kind, "amount": amount }))
            .collect_vec();

        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetHarvestingSuccess,
                vec![
                    serde_json::to_value(fleet_after.id)?,
                    serde_json::to_value(debris_after.id)?,
                    serde_json::Value::Array(collected_sorted),
                ],
            ))
            .await
    }

    async fn record_colonization_success<'a>(&self, _ctx: &Ctx, fleet: FleetId, fleet_after: Option<&'a Fleet>, new_planet: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetColonizationSuccess,
                vec![
                    serde_json::to_value(fleet)?,
                    serde_json::to_value(fleet_after)?,
                    serde_json::to_value(new_planet)?,
                ],
            ))
            .await
    }

    async fn record_colonization_failed(&self, _ctx: &Ctx, fleet_after: &Fleet) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::FleetColonizationFailed, vec![serde_json::to_value(fleet_after)?]))
            .await
    }

    async fn record_destroy<'a>(&self, _ctx: &Ctx, outcome: &DestroyOutcome, fleet_after: Option<&'a Fleet>, moon_after: Option<&'a CelestialBody>) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetDestroy,
                vec![
                    serde_json::to_value(outcome)?,
                    serde_json::to_value(fleet_after)?,
                    serde_json::to_value(moon_after)?,
                ],
            ))
            .await
    }

    async fn record_acs_defend(&self, _ctx: &Ctx, fleet_after: &Fleet) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::FleetAcsDefend, vec![serde_json::to_value(fleet_after)?]))
            .await
    }

    async fn record_fight_aftermath<'a>(&self, _ctx: &Ctx, aftermath: &FleetFightAftermath, fleet_after: Option<&'a Fleet>) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::FleetFightAftermath,
                vec![serde_json::to_value(aftermath)?, serde_json::to_value(fleet_after)?],
            ))
            .await
    }
}

#[derive(Debug)]
pub struct InMemoryFleetBmc {
    state: SharedState,
}

impl InMemoryFleetBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl FleetBmcTrait for InMemoryFleetBmc {
    async fn get_fleet(&self, _ctx: &Ctx, id: FleetId) -> Result<Option<Fleet>> {
        Ok(self.state.read().await.fleets.get(&id).cloned())
    }

    async fn due_fleets(&self, _ctx: &Ctx, now: DateTime<Utc>) -> Result<Vec<Fleet>> {
        Ok(self
            .state
            .read()
            .await
            .fleets
            .values()
            .filter(|fleet| fleet.is_due(now))
            .sorted_by_key(|fleet| fleet.arrival_time)
            .cloned()
            .collect_vec())
    }

    async fn fleets_of_acs(&self, _ctx: &Ctx, acs: AcsFleetId) -> Result<Vec<Fleet>> {
        let guard = self.state.read().await;
        let Some(acs_fleet) = guard.acs_fleets.get(&acs) else {
            return Ok(vec![]);
        };

        // Join order is the component order on the ACS record.
        Ok(acs_fleet
            .components
            .iter()
            .filter_map(|id| guard.fleets.get(id))
            .cloned()
            .collect_vec())
    }

    async fn defending_fleets_at(&self, _ctx: &Ctx, body: BodyId) -> Result<Vec<Fleet>> {
        Ok(self
            .state
            .read()
            .await
            .fleets
            .values()
            .filter(|fleet| fleet.deployed && fleet.objective == Objective::AcsDefend && fleet.target == Some(body))
            .cloned()
            .collect_vec())
    }

    async fn create_fleet(&self, _ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.insert(fleet.id, fleet.clone());
        guard.bodies.insert(source_after.id, source_after.clone());
        Ok(())
    }

    async fn save_fleet(&self, _ctx: &Ctx, fleet: &Fleet) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.insert(fleet.id, fleet.clone());
        Ok(())
    }

    async fn record_return_to_base(&self, _ctx: &Ctx, fleet: &Fleet, source_after: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.remove(&fleet.id);
        guard.bodies.insert(source_after.id, source_after.clone());
        Ok(())
    }

    async fn record_deployment(&self, _ctx: &Ctx, fleet: &Fleet, target_after: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.remove(&fleet.id);
        guard.bodies.insert(target_after.id, target_after.clone());
        Ok(())
    }

    async fn record_transport(&self, _ctx: &Ctx, fleet_after: &Fleet, target_after: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.insert(fleet_after.id, fleet_after.clone());
        guard.bodies.insert(target_after.id, target_after.clone());
        Ok(())
    }

    async fn record_harvest(&self, _ctx: &Ctx, fleet_after: &Fleet, debris_after: &DebrisField, _collected: &HashMap<ResourceKind, f64>) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.fleets.insert(fleet_after.id, fleet_after.clone());
        guard.debris_fields.insert(debris_after.id, debris_after.clone());
        Ok(())
    }

    async fn record_colonization_success<'a>(&self, _ctx: &Ctx, fleet: FleetId, fleet_after: Option<&'a Fleet>, new_planet: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.bodies.insert(new_planet.id, new_planet.clone());
        match fleet_after {
            Some(updated) => {
                guard.fleets.insert(updated.id, updated.clone());
            }
            None => {
                guard.fleets.remove(&fleet);
            }
        }
        Ok(())
    }

    async fn record_colonization_failed(&self, _ctx: &Ctx, fleet_after: &Fleet) -> Result<()> {
        self.save_fleet(_ctx, fleet_after).await
    }

    async fn record_destroy<'a>(&self, _ctx: &Ctx, outcome: &DestroyOutcome, fleet_after: Option<&'a Fleet>, moon_after: Option<&'a CelestialBody>) -> Result<()> {
        let mut guard = self.state.write().await;
        match moon_after {
            Some(moon) => {
                guard.bodies.insert(moon.id, moon.clone());
            }
            None => {
                guard.bodies.remove(&outcome.moon);
            }
        }
        match fleet_after {
            Some(fleet) => {
                guard.fleets.insert(fleet.id, fleet.clone());
            }
            None => {
                guard.fleets.remove(&outcome.fleet);
            }
        }
        Ok(())
    }

    async fn record_acs_defend(&self, _ctx: &Ctx, fleet_after: &Fleet) -> Result<()> {
        self.save_fleet(_ctx, fleet_after).await
    }

    async fn record_fight_aftermath<'a>(&self, _ctx: &Ctx, aftermath: &FleetFightAftermath, fleet_after: Option<&'a Fleet>) -> Result<()> {
        let mut guard = self.state.write().await;
        match fleet_after {
            Some(fleet) => {
                guard.fleets.insert(fleet.id, fleet.clone());
            }
            None => {
                guard.fleets.remove(&aftermath.fleet);
            }
        }
        Ok(())
    }
}
