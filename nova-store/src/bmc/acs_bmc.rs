use crate::bmc::SharedState;
use crate::proxy::{decode_data, InsertRequest, QueryDescriptor, QueryFilter, Script};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use nova_domain::{AcsFleet, AcsFleetId};
use std::fmt::Debug;

#[automock]
#[async_trait]
pub trait AcsBmcTrait: Send + Sync + Debug {
    async fn get_acs(&self, ctx: &Ctx, id: AcsFleetId) -> Result<Option<AcsFleet>>;
    /// Upserts the operation record; the script also aligns the component
    /// fleets' arrival times with the operation's.
    async fn save_acs(&self, ctx: &Ctx, acs: &AcsFleet) -> Result<()>;
    /// Closes the record once the joint engagement has resolved.
    async fn close_acs(&self, ctx: &Ctx, id: AcsFleetId) -> Result<()>;
}

#[derive(Debug)]
pub struct DbAcsBmc {
    pub proxy: DbProxy,
}

#[async_trait]
impl AcsBmcTrait for DbAcsBmc {
    async fn get_acs(&self, _ctx: &Ctx, id: AcsFleetId) -> Result<Option<AcsFleet>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "fleets_acs".to_string(),
                filters: vec![QueryFilter {
                    key: "id".to_string(),
                    values: vec![id.to_string()],
                }],
                ordering: None,
            })
            .await?;

        rows.first().map(decode_data).transpose()
    }

    async fn save_acs(&self, _ctx: &Ctx, acs: &AcsFleet) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::CreateAcsFleet, vec![serde_json::to_value(acs)?]))
            .await
    }

    async fn close_acs(&self, _ctx: &Ctx, id: AcsFleetId) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::AcsFleetFightAftermath, vec![serde_json::to_value(id)?]))
            .await
    }
}

#[derive(Debug)]
pub struct InMemoryAcsBmc {
    state: SharedState,
}

impl InMemoryAcsBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl AcsBmcTrait for InMemoryAcsBmc {
    async fn get_acs(&self, _ctx: &Ctx, id: AcsFleetId) -> Result<Option<AcsFleet>> {
        Ok(self.state.read().await.acs_fleets.get(&id).cloned())
    }

    async fn save_acs(&self, _ctx: &Ctx, acs: &AcsFleet) -> Result<()> {
        let mut guard = self.state.write().await;
        for component in &acs.components {
            if let Some(fleet) = guard.fleets.get_mut(component) {
                fleet.arrival_time = acs.arrival_time;
                fleet.acs = Some(acs.id);
            }
        }
        guard.acs_fleets.insert(acs.id, acs.clone());
        Ok(())
    }

    async fn close_acs(&self, _ctx: &Ctx, id: AcsFleetId) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.acs_fleets.remove(&id);
        Ok(())
    }
}
