use crate::bmc::SharedState;
use crate::proxy::{decode_data, InsertRequest, QueryDescriptor, QueryFilter, Script};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use nova_domain::{Universe, UniverseId};
use std::fmt::Debug;

#[automock]
#[async_trait]
pub trait UniverseBmcTrait: Send + Sync + Debug {
    async fn get_universe(&self, ctx: &Ctx, id: UniverseId) -> Result<Option<Universe>>;
    async fn create_universe(&self, ctx: &Ctx, universe: &Universe) -> Result<()>;
}

#[derive(Debug)]
pub struct DbUniverseBmc {
    pub proxy: DbProxy,
}

#[async_trait]
impl UniverseBmcTrait for DbUniverseBmc {
    async fn get_universe(&self, _ctx: &Ctx, id: UniverseId) -> Result<Option<Universe>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "universes".to_string(),
                filters: vec![QueryFilter {
                    key: "id".to_string(),
                    values: vec![id.to_string()],
                }],
                ordering: None,
            })
            .await?;

        rows.first().map(decode_data).transpose()
    }

    async fn create_universe(&self, _ctx: &Ctx, universe: &Universe) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::CreateUniverse, vec![serde_json::to_value(universe)?]))
            .await
    }
}

#[derive(Debug)]
pub struct InMemoryUniverseBmc {
    state: SharedState,
}

impl InMemoryUniverseBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl UniverseBmcTrait for InMemoryUniverseBmc {
    async fn get_universe(&self, _ctx: &Ctx, id: UniverseId) -> Result<Option<Universe>> {
        Ok(self.state.read().await.universes.get(&id).cloned())
    }

    async fn create_universe(&self, _ctx: &Ctx, universe: &Universe) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.universes.insert(universe.id, universe.clone());
        Ok(())
    }
}
