use crate::bmc::acs_bmc::{AcsBmcTrait, DbAcsBmc, InMemoryAcsBmc};
use crate::bmc::debris_bmc::{DbDebrisBmc, DebrisBmcTrait, InMemoryDebrisBmc};
use crate::bmc::fleet_bmc::{DbFleetBmc, FleetBmcTrait, InMemoryFleetBmc};
use crate::bmc::planet_bmc::{DbPlanetBmc, InMemoryPlanetBmc, PlanetBmcTrait};
use crate::bmc::player_bmc::{DbPlayerBmc, InMemoryPlayerBmc, PlayerBmcTrait};
use crate::bmc::report_bmc::{DbReportBmc, InMemoryReportBmc, ReportBmcTrait};
use crate::bmc::universe_bmc::{DbUniverseBmc, InMemoryUniverseBmc, UniverseBmcTrait};
use crate::{DbModelManager, DbProxy};
use mockall::automock;
use nova_domain::{
    AcsFleet, AcsFleetId, BodyId, CelestialBody, DebrisField, DebrisFieldId, EspionageReport, FightReport, Fleet, FleetId, PlayerId, TechnologyKind, Universe,
    UniverseId,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod acs_bmc;
pub mod debris_bmc;
pub mod fleet_bmc;
pub mod planet_bmc;
pub mod player_bmc;
pub mod report_bmc;
pub mod universe_bmc;

#[automock]
pub trait Bmc: Send + Sync + Debug {
    fn universe_bmc(&self) -> Arc<dyn UniverseBmcTrait>;
    fn planet_bmc(&self) -> Arc<dyn PlanetBmcTrait>;
    fn player_bmc(&self) -> Arc<dyn PlayerBmcTrait>;
    fn fleet_bmc(&self) -> Arc<dyn FleetBmcTrait>;
    fn acs_bmc(&self) -> Arc<dyn AcsBmcTrait>;
    fn debris_bmc(&self) -> Arc<dyn DebrisBmcTrait>;
    fn report_bmc(&self) -> Arc<dyn ReportBmcTrait>;
}

#[derive(Debug, Clone)]
pub struct DbBmc {
    pub db_model_manager: DbModelManager,
    universe_bmc: Arc<DbUniverseBmc>,
    planet_bmc: Arc<DbPlanetBmc>,
    player_bmc: Arc<DbPlayerBmc>,
    fleet_bmc: Arc<DbFleetBmc>,
    acs_bmc: Arc<DbAcsBmc>,
    debris_bmc: Arc<DbDebrisBmc>,
    report_bmc: Arc<DbReportBmc>,
}

impl DbBmc {
    pub fn new(mm: DbModelManager) -> Self {
        let proxy = DbProxy::new(mm.clone());
        Self {
            db_model_manager: mm,
            universe_bmc: Arc::new(DbUniverseBmc { proxy: proxy.clone() }),
            planet_bmc: Arc::new(DbPlanetBmc { proxy: proxy.clone() }),
            player_bmc: Arc::new(DbPlayerBmc { proxy: proxy.clone() }),
            fleet_bmc: Arc::new(DbFleetBmc { proxy: proxy.clone() }),
            acs_bmc: Arc::new(DbAcsBmc { proxy: proxy.clone() }),
            debris_bmc: Arc::new(DbDebrisBmc { proxy: proxy.clone() }),
            report_bmc: Arc::new(DbReportBmc { proxy }),
        }
    }
}

impl Bmc for DbBmc {
    fn universe_bmc(&self) -> Arc<dyn UniverseBmcTrait> {
        self.universe_bmc.clone() as Arc<dyn UniverseBmcTrait>
    }

    fn planet_bmc(&self) -> Arc<dyn PlanetBmcTrait> {
        self.planet_bmc.clone() as Arc<dyn PlanetBmcTrait>
    }

    fn player_bmc(&self) -> Arc<dyn PlayerBmcTrait> {
        self.player_bmc.clone() as Arc<dyn PlayerBmcTrait>
    }

    fn fleet_bmc(&self) -> Arc<dyn FleetBmcTrait> {
        self.fleet_bmc.clone() as Arc<dyn FleetBmcTrait>
    }

    fn acs_bmc(&self) -> Arc<dyn AcsBmcTrait> {
        self.acs_bmc.clone() as Arc<dyn AcsBmcTrait>
    }

    fn debris_bmc(&self) -> Arc<dyn DebrisBmcTrait> {
        self.debris_bmc.clone() as Arc<dyn DebrisBmcTrait>
    }

    fn report_bmc(&self) -> Arc<dyn ReportBmcTrait> {
        self.report_bmc.clone() as Arc<dyn ReportBmcTrait>
    }
}

/// Backing state of the in-memory store. The scripted writes mutate several
/// aggregates at once, so all maps live behind one lock to keep each script
/// application atomic, mirroring the SQL functions' transactions.
#[derive(Debug, Default)]
pub struct InMemoryState {
    pub universes: HashMap<UniverseId, Universe>,
    pub bodies: HashMap<BodyId, CelestialBody>,
    pub fleets: HashMap<FleetId, Fleet>,
    pub acs_fleets: HashMap<AcsFleetId, AcsFleet>,
    pub debris_fields: HashMap<DebrisFieldId, DebrisField>,
    pub technologies: HashMap<PlayerId, HashMap<TechnologyKind, u32>>,
    pub espionage_reports: Vec<EspionageReport>,
    pub fight_reports: Vec<FightReport>,
}

pub type SharedState = Arc<RwLock<InMemoryState>>;

#[derive(Debug)]
pub struct InMemoryBmc {
    state: SharedState,
    universe_bmc: Arc<InMemoryUniverseBmc>,
    planet_bmc: Arc<InMemoryPlanetBmc>,
    player_bmc: Arc<InMemoryPlayerBmc>,
    fleet_bmc: Arc<InMemoryFleetBmc>,
    acs_bmc: Arc<InMemoryAcsBmc>,
    debris_bmc: Arc<InMemoryDebrisBmc>,
    report_bmc: Arc<InMemoryReportBmc>,
}

impl Default for InMemoryBmc {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBmc {
    pub fn new() -> Self {
        Self::with_state(Arc::new(RwLock::new(InMemoryState::default())))
    }

    pub fn with_state(state: SharedState) -> Self {
        Self {
            state: Arc::clone(&state),
            universe_bmc: Arc::new(InMemoryUniverseBmc::new(Arc::clone(&state))),
            planet_bmc: Arc::new(InMemoryPlanetBmc::new(Arc::clone(&state))),
            player_bmc: Arc::new(InMemoryPlayerBmc::new(Arc::clone(&state))),
            fleet_bmc: Arc::new(InMemoryFleetBmc::new(Arc::clone(&state))),
            acs_bmc: Arc::new(InMemoryAcsBmc::new(Arc::clone(&state))),
            debris_bmc: Arc::new(InMemoryDebrisBmc::new(Arc::clone(&state))),
            report_bmc: Arc::new(InMemoryReportBmc::new(state)),
        }
    }

    /// Direct handle on the backing maps, for seeding test fixtures.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }
}

impl Bmc for InMemoryBmc {
    fn universe_bmc(&self) -> Arc<dyn UniverseBmcTrait> {
        Arc::clone(&self.universe_bmc) as Arc<dyn UniverseBmcTrait>
    }

    fn planet_bmc(&self) -> Arc<dyn PlanetBmcTrait> {
        Arc::clone(&self.planet_bmc) as Arc<dyn PlanetBmcTrait>
    }

    fn player_bmc(&self) -> Arc<dyn PlayerBmcTrait> {
        Arc::clone(&self.player_bmc) as Arc<dyn PlayerBmcTrait>
    }

    fn fleet_bmc(&self) -> Arc<dyn FleetBmcTrait> {
        Arc::clone(&self.fleet_bmc) as Arc<dyn FleetBmcTrait>
    }

    fn acs_bmc(&self) -> Arc<dyn AcsBmcTrait> {
        Arc::clone(&self.acs_bmc) as Arc<dyn AcsBmcTrait>
    }

    fn debris_bmc(&self) -> Arc<dyn DebrisBmcTrait> {
        Arc::clone(&self.debris_bmc) as Arc<dyn DebrisBmcTrait>
    }

    fn report_bmc(&self) -> Arc<dyn ReportBmcTrait> {
        Arc::clone(&self.report_bmc) as Arc<dyn ReportBmcTrait>
    }
}
