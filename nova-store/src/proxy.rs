use crate::db_model_manager::DbModelManager;
use crate::error::StoreError;
use anyhow::{Context, Result};
use itertools::Itertools;
use serde_json::Value;
use sqlx::postgres::PgRow;
use tracing::{event, Level};

/// The named mutation scripts the core depends on. Every write goes through
/// one of these; the SQL function behind each name owns the transactional
/// bookkeeping so a mission's aftermath is atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    FleetReturnToBase,
    FleetDeployment,
    FleetTransport,
    FleetHarvesting,
    FleetHarvestingSuccess,
    FleetColonizationSuccess,
    FleetColonizationFailed,
    FleetDestroy,
    FleetAcsDefend,
    FleetFightAftermath,
    PlanetFightAftermath,
    AcsFleetFightAftermath,
    EspionageReport,
    CreateFleet,
    CreateAcsFleet,
    CreatePlanet,
    CreateUniverse,
}

impl Script {
    pub fn name(&self) -> &'static str {
        match self {
            Script::FleetReturnToBase => "fleet_return_to_base",
            Script::FleetDeployment => "fleet_deployment",
            Script::FleetTransport => "fleet_transport",
            Script::FleetHarvesting => "fleet_harvesting",
            Script::FleetHarvestingSuccess => "fleet_harvesting_success",
            Script::FleetColonizationSuccess => "fleet_colonization_success",
            Script::FleetColonizationFailed => "fleet_colonization_failed",
            Script::FleetDestroy => "fleet_destroy",
            Script::FleetAcsDefend => "fleet_acs_defend",
            Script::FleetFightAftermath => "fleet_fight_aftermath",
            Script::PlanetFightAftermath => "planet_fight_aftermath",
            Script::AcsFleetFightAftermath => "acs_fleet_fight_aftermath",
            Script::EspionageReport => "espionage_report",
            Script::CreateFleet => "create_fleet",
            Script::CreateAcsFleet => "create_acs_fleet",
            Script::CreatePlanet => "create_planet",
            Script::CreateUniverse => "create_universe",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub key: String,
    pub values: Vec<String>,
}

/// A declarative read: which columns, from which table (free-form join
/// clauses accepted), filtered by AND-combined key/values.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub props: Vec<String>,
    pub table: String,
    pub filters: Vec<QueryFilter>,
    pub ordering: Option<String>,
}

impl QueryDescriptor {
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.props.iter().join(", "), self.table);

        if !self.filters.is_empty() {
            let clauses = self
                .filters
                .iter()
                .enumerate()
                .map(|(index, filter)| format!("{}::text = ANY(${})", filter.key, index + 1))
                .join(" AND ");
            sql.push_str(&format!(" WHERE {}", clauses));
        }

        if let Some(ordering) = &self.ordering {
            sql.push_str(&format!(" ORDER BY {}", ordering));
        }

        sql
    }
}

/// A scripted write: the stable script name plus an ordered, heterogeneous
/// argument list, shipped to the SQL function as one jsonb array.
#[derive(Debug, Clone)]
pub struct InsertRequest {
    pub script: Script,
    pub args: Vec<Value>,
    pub verbose: bool,
}

impl InsertRequest {
    pub fn new(script: Script, args: Vec<Value>) -> Self {
        Self {
            script,
            args,
            verbose: false,
        }
    }
}

/// The opaque database proxy of the core: reads through `fetch`, writes
/// through `insert`. No other statement shape ever reaches the pool.
#[derive(Debug, Clone)]
pub struct DbProxy {
    mm: DbModelManager,
}

impl DbProxy {
    pub fn new(mm: DbModelManager) -> Self {
        Self { mm }
    }

    pub async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Vec<PgRow>> {
        let sql = descriptor.to_sql();

        let mut query = sqlx::query(&sql);
        for filter in &descriptor.filters {
            query = query.bind(filter.values.clone());
        }

        let rows = query
            .fetch_all(self.mm.pool())
            .await
            .map_err(StoreError::from_sqlx)
            .with_context(|| format!("fetch failed: {sql}"))?;

        Ok(rows)
    }

    pub async fn insert(&self, request: &InsertRequest) -> Result<()> {
        if request.verbose {
            event!(Level::DEBUG, script = request.script.name(), args = ?request.args, "executing script");
        }

        let sql = format!("SELECT {}($1::jsonb)", request.script.name());
        sqlx::query(&sql)
            .bind(Value::Array(request.args.clone()))
            .execute(self.mm.pool())
            .await
            .map_err(StoreError::from_sqlx)
            .with_context(|| format!("script {} failed", request.script.name()))?;

        Ok(())
    }
}

/// Decodes the `data` jsonb column of a row into a domain entity. A decode
/// failure is a scan mismatch, retryable by the scheduler.
pub fn decode_data<T: serde::de::DeserializeOwned>(row: &PgRow) -> Result<T> {
    use sqlx::Row;

    let value: Value = row.try_get("data").map_err(StoreError::from_sqlx)?;
    serde_json::from_value(value).map_err(|err| StoreError::ScanMismatch(err.to_string()).into())
}
