use crate::bmc::SharedState;
use crate::proxy::{decode_data, InsertRequest, QueryDescriptor, QueryFilter, Script};
use crate::{Ctx, DbProxy};
use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;
use mockall::automock;
use nova_domain::{EspionageReport, FightReport, PlayerId};
use std::fmt::Debug;

#[automock]
#[async_trait]
pub trait ReportBmcTrait: Send + Sync + Debug {
    async fn create_espionage_report(&self, ctx: &Ctx, report: &EspionageReport) -> Result<()>;
    async fn espionage_reports_for(&self, ctx: &Ctx, player: PlayerId) -> Result<Vec<EspionageReport>>;
    async fn fight_reports_for(&self, ctx: &Ctx, player: PlayerId) -> Result<Vec<FightReport>>;
}

#[derive(Debug)]
pub struct DbReportBmc {
    pub proxy: DbProxy,
}

#[async_trait]
impl ReportBmcTrait for DbReportBmc {
    async fn create_espionage_report(&self, _ctx: &Ctx, report: &EspionageReport) -> Result<()> {
        self.proxy
            .insert(&InsertRequest::new(Script::EspionageReport, vec![serde_json::to_value(report)?]))
            .await
    }

    async fn espionage_reports_for(&self, _ctx: &Ctx, player: PlayerId) -> Result<Vec<EspionageReport>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "messages_players".to_string(),
                filters: vec![
                    QueryFilter {
                        key: "player".to_string(),
                        values: vec![player.to_string()],
                    },
                    QueryFilter {
                        key: "kind".to_string(),
                        values: vec!["espionage".to_string()],
                    },
                ],
                ordering: Some("created_at".to_string()),
            })
            .await?;

        rows.iter().map(decode_data).collect()
    }

    async fn fight_reports_for(&self, _ctx: &Ctx, player: PlayerId) -> Result<Vec<FightReport>> {
        let rows = self
            .proxy
            .fetch(&QueryDescriptor {
                props: vec!["data".to_string()],
                table: "messages_players".to_string(),
                filters: vec![
                    QueryFilter {
                        key: "player".to_string(),
                        values: vec![player.to_string()],
                    },
                    QueryFilter {
                        key: "kind".to_string(),
                        values: vec!["fight".to_string()],
                    },
                ],
                ordering: Some("created_at".to_string()),
            })
            .await?;

        rows.iter().map(decode_data).collect()
    }
}

#[derive(Debug)]
pub struct InMemoryReportBmc {
    state: SharedState,
}

impl InMemoryReportBmc {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ReportBmcTrait for InMemoryReportBmc {
    async fn create_espionage_report(&self, _ctx: &Ctx, report: &EspionageReport) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.espionage_reports.push(report.clone());
        Ok(())
    }

    async fn espionage_reports_for(&self, _ctx: &Ctx, player: PlayerId) -> Result<Vec<EspionageReport>> {
        Ok(self
            .state
            .read()
            .await
            .espionage_reports
            .iter()
            .filter(|report| report.spy == player)
            .cloned()
            .collect_vec())
    }

    async fn fight_reports_for(&self, _ctx: &Ctx, player: PlayerId) -> Result<Vec<FightReport>> {
        Ok(self
            .state
            .read()
            .await
            .fight_reports
            .iter()
            .filter(|report| report.player == player)
            .cloned()
            .collect_vec())
    }
}
