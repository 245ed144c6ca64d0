use crate::bmc::SharedState;
use crate::proxy::{decode_data, InsertRequest, QueryDescriptor, QueryFilter, Script};
use crate::{Ctx, DbProxy, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use nova_domain::{BodyId, CelestialBody, Coordinate, CoordinateKind, DebrisField, PlanetFightAftermath, PlayerId, UniverseId};
use sqlx::Row;
use std::fmt::Debug;

#[automock]
#[async_trait]
pub trait PlanetBmcTrait: Send + Sync + Debug {
    async fn get_body(&self, ctx: &Ctx, id: BodyId) -> Result<Option<CelestialBody>>;
    /// Occupancy probe for a coordinate slot; colonization races resolve on
    /// this read under the target's lock.
    async fn get_body_at(&self, ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<CelestialBody>>;
    async fn create_planet(&self, ctx: &Ctx, body: &CelestialBody) -> Result<()>;
    async fn save_body(&self, ctx: &Ctx, body: &CelestialBody) -> Result<()>;
    async fn count_worlds_of_player(&self, ctx: &Ctx, player: PlayerId) -> Result<u32>;
    /// The single planet-side write of a fight: remaining ships/defenses,
    /// pillage removed, debris produced, optional moon, reports.
    async fn apply_fight_aftermath<'a>(
        &self,
        ctx: &Ctx,
        aftermath: &PlanetFightAftermath,
        body_after: &CelestialBody,
        debris_after: Option<&'a DebrisField>,
        new_moon: Option<&'a CelestialBody>,
    ) -> Result<()>;
}

#[derive(Debug)]
pub struct DbPlanetBmc {
    pub proxy: DbProxy,
}

impl DbPlanetBmc {
    async fn fetch_one(&self, filters: Vec<QueryFilter>) -> Result<Option<CelestialBody>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "planets".to_string(),
                filters,
                ordering: None,
            })
            .await?;

        rows.first().map(decode_data).transpose()
    }
}

#[async_trait]
impl PlanetBmcTrait for DbPlanetBmc {
    async fn get_body(&self, _ctx: &Ctx, id: BodyId) -> Result<Option<CelestialBody>> {
        self.fetch_one(vec![QueryFilter {
            key: "id".to_string(),
            values: vec![id.to_string()],
        }])
        .await
    }

    async fn get_body_at(&self, _ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<CelestialBody>> {
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
            QueryFilter {
                key: "kind".to_string(),
                values: vec![coordinate.kind.to_string()],
            },
        ])
        .await
    }

    async fn create_planet(&self, _ctx: &Ctx, body: &CelestialBody) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::CreatePlanet, vec![serde_json::to_value(body)?]))
            .await
    }

    async fn save_body(&self, ctx: &Ctx, body: &CelestialBody) -> Result<()> {
        // The create_planet script upserts on id, so a save is the same call.
        self.create_planet(ctx, body).await
    }

    async fn count_worlds_of_player(&self, _ctx: &Ctx, player: PlayerId) -> Result<u32> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["count(*) as data".to_string()],
                table: "planets".to_string(),
                filters: vec![
                    QueryFilter {
                        key: "player".to_string(),
                        values: vec![player.to_string()],
                    },
                    QueryFilter {
                        key: "kind".to_string(),
                        values: vec![CoordinateKind::World.to_string()],
                    },
                ],
                ordering: None,
            })
            .await?;

        let count: i64 = rows
            .first()
            .ok_or_else(|| StoreError::ScanMismatch("count query returned no row".to_string()))?
            .try_get("data")
            .map_err(StoreError::from_sqlx)?;

        Ok(count as u32)
    }

    async fn apply_fight_aftermath<'a>(
        &self,
        _ctx: &Ctx,
        aftermath: &PlanetFightAftermath,
        body_after: &CelestialBody,
        debris_after: Option<&'a DebrisField>,
        new_moon: Option<&'a CelestialBody>,
    ) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(
                Script::PlanetFightAftermath,
                vec![
                    serde_json::to_value(aftermath)?,
                    serde_json::to_value(body_after)?,
                    serde_json::to_value(debris_after)?,
                    serde_json::to_value(new_moon)?,
                ],
            ))
            .await
    }
}

#[derive(Debug)]
pub struct InMemoryPlanetBmc {
    state: SharedState,
}

impl InMemoryPlanetBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl PlanetBmcTrait for InMemoryPlanetBmc {
    async fn get_body(&self, _ctx: &Ctx, id: BodyId) -> Result<Option<CelestialBody>> {
        Ok(self.state.read().await.bodies.get(&id).cloned())
    }

    async fn get_body_at(&self, _ctx: &Ctx, universe: UniverseId, coordinate: &Coordinate) -> Result<Option<CelestialBody>> {
        Ok(self
            .state
            .read()
            .await
            .bodies
            .values()
            .find(|body| body.universe == universe && body.coordinate == *coordinate)
            .cloned())
    }

    async fn create_planet(&self, _ctx: &Ctx, body: &CelestialBody) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.bodies.insert(body.id, body.clone());
        Ok(())
    }

    async fn save_body(&self, ctx: &Ctx, body: &CelestialBody) -> Result<()> {
        self.create_planet(ctx, body).await
    }

    async fn count_worlds_of_player(&self, _ctx: &Ctx, player: PlayerId) -> Result<u32> {
        Ok(self
            .state
            .read()
            .await
            .bodies
            .values()
            .filter(|body| body.player == player && body.coordinate.kind == CoordinateKind::World)
            .count() as u32)
    }

    async fn apply_fight_aftermath<'a>(
        &self,
        _ctx: &Ctx,
        aftermath: &PlanetFightAftermath,
        body_after: &CelestialBody,
        debris_after: Option<&'a DebrisField>,
        new_moon: Option<&'a CelestialBody>,
    ) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.bodies.insert(body_after.id, body_after.clone());
        if let Some(debris) = debris_after {
            guard.debris_fields.insert(debris.id, debris.clone());
        }
        if let Some(moon) = new_moon {
            guard.bodies.insert(moon.id, moon.clone());
        }
        guard.fight_reports.extend(aftermath.reports.iter().cloned());
        Ok(())
    }
}
