use crate::bmc::SharedState;
use crate::proxy::{decode_data, QueryDescriptor, QueryFilter};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use nova_domain::{Coordinate, DebrisField, DebrisFieldId, UniverseId};
use std::fmt::Debug;

/// Debris fields are only ever read here: fights create and extend them via
/// the planet aftermath script, harvesting drains them via the harvest
/// scripts.
#[automock]
#[async_trait]
pub trait DebrisBmcTrait: Send + Sync + Debug {
    async fn get_debris(&self, ctx: &Ctx, id: DebrisFieldId) -> Result<Option<DebrisField>>;
    async fn get_debris_at(&self, ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<DebrisField>>;
}

#[derive(Debug)]
pub struct DbDebrisBmc {
    pub proxy: DbProxy,
}

impl DbDebrisBmc {
    async fn fetch_one(&self, filters: Vec<QueryFilter>) -> Result<Option<DebrisField>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "debris_fields".to_string(),
                filters,
                ordering: None,
            })
            .await?;

        rows.first().map(decode_data).transpose()
    }
}

#[async_trait]
impl DebrisBmcTrait for DbDebrisBmc {
    async fn get_debris(&self, _ctx: &Ctx, id: DebrisFieldId) -> Result<Option<DebrisField>> {
        self.fetch_one(vec![QueryFilter {
            key: "id".to_string(),
            values: vec![id.to_string()],
        }])
        .await
    }

    async fn get_debris_at(&self, _ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<DebrisField>> {
        self.fetch_one(vec![
            QueryFilter {
                key: "universe".to_string(),
                values: vec![universe.to_string()],
            },
            QueryFilter {
                key: "galaxy".to_string(),
                values: vec![coordinate.galaxy.to_string()],
            },
            QueryFilter {
                key: "solar_system".to_string(),
                values: vec![coordinate.system.to_string()],
            },
            QueryFilter {
                key: "position".to_string(),
                values: vec![coordinate.position.to_string()],
            },
        ])
        .await
    }
}

#[derive(Debug)]
pub struct InMemoryDebrisBmc {
    state: SharedState,
}

impl InMemoryDebrisBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl DebrisBmcTrait for InMemoryDebrisBmc {
    async fn get_debris(&self, _ctx: &Ctx, id: DebrisFieldId) -> Result<Option<DebrisField>> {
        Ok(self.state.read().await.debris_fields.get(&id).cloned())
    }

    async fn get_debris_at(&self, _ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<DebrisField>> {
        Ok(self
            .state
            .read()
            .await
            .debris_fields
            .values()
            .find(|field| field.universe == universe && field.coordinate.same_slot(coordinate))
            .cloned())
    }
}
