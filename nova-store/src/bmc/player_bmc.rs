use crate::bmc::SharedState;
use crate::proxy::{decode_data, QueryDescriptor, QueryFilter};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use nova_domain::{PlayerId, TechnologyKind};
use std::collections::HashMap;
use std::fmt::Debug;

/// Research levels are written by the (out-of-scope) construction queues;
/// fleet logic only ever reads them.
#[automock]
#[async_trait]
pub trait PlayerBmcTrait: Send + Sync + Debug {
    async fn get_technologies(&self, ctx: &Ctx, player: PlayerId) -> Result<HashMap<TechnologyKind, u32>>;
}

#[derive(Debug)]
pub struct DbPlayerBmc {
    pub proxy: DbProxy,
}

#[async_trait]
impl PlayerBmcTrait for DbPlayerBmc {
    async fn get_technologies(&self, _ctx: &Ctx, player: PlayerId) -> Result<HashMap<TechnologyKind, u32>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "players_technologies".to_string(),
                filters: vec![QueryFilter {
                    key: "player".to_string(),
                    values: vec![player.to_string()],
                }],
                ordering: None,
            })
            .await?;

        Ok(rows.first().map(decode_data).transpose()?.unwrap_or_default())
    }
}

#[derive(Debug)]
pub struct InMemoryPlayerBmc {
    state: SharedState,
}

impl InMemoryPlayerBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl PlayerBmcTrait for InMemoryPlayerBmc {
    async fn get_technologies(&self, _ctx: &Ctx, player: PlayerId) -> Result<HashMap<TechnologyKind, u32>> {
        Ok(self.state.read().await.technologies.get(&player).cloned().unwrap_or_default())
    }
}
