use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum ResourceKind {
    Metal,
    Crystal,
    Deuterium,
    Energy,
}

impl ResourceKind {
    /// Movable resources can be loaded into a fleet's cargo bay; energy
    /// exists only as a planetary balance.
    pub fn movable(&self) -> bool {
        !matches!(self, ResourceKind::Energy)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum ShipKind {
    SmallCargo,
    LargeCargo,
    LightFighter,
    HeavyFighter,
    Cruiser,
    Battleship,
    ColonyShip,
    Recycler,
    EspionageProbe,
    Bomber,
    SolarSatellite,
    Destroyer,
    Deathstar,
    Battlecruiser,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum DefenseKind {
    RocketLauncher,
    LightLaser,
    HeavyLaser,
    GaussCannon,
    IonCannon,
    PlasmaTurret,
    SmallShieldDome,
    LargeShieldDome,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum BuildingKind {
    MetalMine,
    CrystalMine,
    DeuteriumSynthesizer,
    SolarPlant,
    FusionReactor,
    RoboticsFactory,
    NaniteFactory,
    Shipyard,
    MetalStorage,
    CrystalStorage,
    DeuteriumTank,
    ResearchLab,
    Terraformer,
    AllianceDepot,
    MissileSilo,
    LunarBase,
    SensorPhalanx,
    JumpGate,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum TechnologyKind {
    EnergyTechnology,
    LaserTechnology,
    IonTechnology,
    HyperspaceTechnology,
    PlasmaTechnology,
    CombustionDrive,
    ImpulseDrive,
    HyperspaceDrive,
    EspionageTechnology,
    ComputerTechnology,
    Astrophysics,
    WeaponsTechnology,
    ShieldingTechnology,
    ArmourTechnology,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum Objective {
    Deployment,
    Transport,
    Colonization,
    Expedition,
    AcsDefend,
    AcsAttack,
    Harvesting,
    Attacking,
    Espionage,
    Destroy,
}

/// One engine option of a ship hull. A variant applies once the player has
/// researched `technology` to at least `min_level`; the resulting speed is
/// `base_speed * (1 + level * increase_factor)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropulsionVariant {
    pub technology: TechnologyKind,
    pub min_level: u32,
    pub base_speed: f64,
    pub increase_factor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipDescriptor {
    pub kind: ShipKind,
    pub name: &'static str,
    pub cargo_capacity: f64,
    /// Deuterium burned per flight, before distance/speed scaling.
    pub fuel_consumption: f64,
    /// Deuterium burned per hour while holding position at the target.
    pub deployment_consumption: f64,
    pub weapon: f64,
    pub shield: f64,
    pub hull: f64,
    pub cost: HashMap<ResourceKind, f64>,
    pub propulsion: Vec<PropulsionVariant>,
    pub rapid_fire_ships: HashMap<ShipKind, u32>,
    pub rapid_fire_defenses: HashMap<DefenseKind, u32>,
}

impl ShipDescriptor {
    /// The engine the player's research actually unlocks; the fastest
    /// applicable variant wins.
    pub fn speed_for(&self, technologies: &HashMap<TechnologyKind, u32>) -> f64 {
        self.propulsion
            .iter()
            .filter_map(|variant| {
                let level = technologies.get(&variant.technology).copied().unwrap_or(0);
                (level >= variant.min_level).then(|| variant.base_speed * (1.0 + level as f64 * variant.increase_factor))
            })
            .fold(0.0, f64::max)
    }

    pub fn can_fly(&self) -> bool {
        !self.propulsion.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefenseDescriptor {
    pub kind: DefenseKind,
    pub name: &'static str,
    pub weapon: f64,
    pub shield: f64,
    pub hull: f64,
    pub cost: HashMap<ResourceKind, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveDescriptor {
    pub objective: Objective,
    pub name: &'static str,
    /// A directed objective needs an existing body at the target.
    pub directed: bool,
    pub hostile: bool,
    pub allowed_ships: Vec<ShipKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: &'static str,
    pub movable: bool,
    /// Stock a freshly created body starts with.
    pub base_amount: f64,
    pub base_storage: f64,
    pub base_production: f64,
}

/// Read-only lookup tables for everything static: ships, defenses,
/// objectives and resources. Built once and shared via `Arc`; mission logic
/// never mutates it.
#[derive(Debug, Clone)]
pub struct Catalog {
    ships: HashMap<ShipKind, ShipDescriptor>,
    defenses: HashMap<DefenseKind, DefenseDescriptor>,
    objectives: HashMap<Objective, ObjectiveDescriptor>,
    resources: HashMap<ResourceKind, ResourceDescriptor>,
}

impl Catalog {
    pub fn standard() -> &'static Catalog {
        &STANDARD_CATALOG
    }

    pub fn ship(&self, kind: &ShipKind) -> Option<&ShipDescriptor> {
        self.ships.get(kind)
    }

    pub fn defense(&self, kind: &DefenseKind) -> Option<&DefenseDescriptor> {
        self.defenses.get(kind)
    }

    pub fn objective(&self, objective: &Objective) -> Option<&ObjectiveDescriptor> {
        self.objectives.get(objective)
    }

    pub fn resource(&self, kind: &ResourceKind) -> Option<&ResourceDescriptor> {
        self.resources.get(kind)
    }

    pub fn ship_by_name(&self, name: &str) -> Option<&ShipDescriptor> {
        ShipKind::from_str(name).ok().and_then(|kind| self.ships.get(&kind))
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    pub fn movable_resources(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.resources.values().filter(|r| r.movable).map(|r| r.kind)
    }
}

fn cost(metal: f64, crystal: f64, deuterium: f64) -> HashMap<ResourceKind, f64> {
    let mut out = HashMap::new();
    if metal > 0.0 {
        out.insert(ResourceKind::Metal, metal);
    }
    if crystal > 0.0 {
        out.insert(ResourceKind::Crystal, crystal);
    }
    if deuterium > 0.0 {
        out.insert(ResourceKind::Deuterium, deuterium);
    }
    out
}

fn combustion(base_speed: f64) -> Vec<PropulsionVariant> {
    vec![PropulsionVariant {
        technology: TechnologyKind::CombustionDrive,
        min_level: 0,
        base_speed,
        increase_factor: 0.1,
    }]
}

fn impulse(base_speed: f64) -> Vec<PropulsionVariant> {
    vec![PropulsionVariant {
        technology: TechnologyKind::ImpulseDrive,
        min_level: 0,
        base_speed,
        increase_factor: 0.2,
    }]
}

fn hyperspace(base_speed: f64) -> Vec<PropulsionVariant> {
    vec![PropulsionVariant {
        technology: TechnologyKind::HyperspaceDrive,
        min_level: 0,
        base_speed,
        increase_factor: 0.3,
    }]
}

fn ship(
    kind: ShipKind,
    name: &'static str,
    cargo_capacity: f64,
    fuel_consumption: f64,
    weapon: f64,
    shield: f64,
    costs: HashMap<ResourceKind, f64>,
    propulsion: Vec<PropulsionVariant>,
) -> ShipDescriptor {
    // Hull follows the structural cost, the classic tenth of metal+crystal.
    let hull = (costs.get(&ResourceKind::Metal).copied().unwrap_or(0.0) + costs.get(&ResourceKind::Crystal).copied().unwrap_or(0.0)) / 10.0;

    ShipDescriptor {
        kind,
        name,
        cargo_capacity,
        fuel_consumption,
        deployment_consumption: fuel_consumption / 10.0,
        weapon,
        shield,
        hull,
        cost: costs,
        propulsion,
        rapid_fire_ships: HashMap::new(),
        rapid_fire_defenses: HashMap::new(),
    }
}

fn defense(kind: DefenseKind, name: &'static str, weapon: f64, shield: f64, costs: HashMap<ResourceKind, f64>) -> DefenseDescriptor {
    let hull = (costs.get(&ResourceKind::Metal).copied().unwrap_or(0.0) + costs.get(&ResourceKind::Crystal).copied().unwrap_or(0.0)) / 10.0;

    DefenseDescriptor {
        kind,
        name,
        weapon,
        shield,
        hull,
        cost: costs,
    }
}

fn standard_ships() -> HashMap<ShipKind, ShipDescriptor> {
    use ShipKind::*;

    let mut ships = vec![
        ship(SmallCargo, "small cargo ship", 5_000.0, 10.0, 5.0, 10.0, cost(2_000.0, 2_000.0, 0.0), combustion(5_000.0)),
        ship(LargeCargo, "large cargo ship", 25_000.0, 50.0, 5.0, 25.0, cost(6_000.0, 6_000.0, 0.0), combustion(7_500.0)),
        ship(LightFighter, "light fighter", 50.0, 20.0, 50.0, 10.0, cost(3_000.0, 1_000.0, 0.0), combustion(12_500.0)),
        ship(HeavyFighter, "heavy fighter", 100.0, 75.0, 150.0, 25.0, cost(6_000.0, 4_000.0, 0.0), impulse(10_000.0)),
        ship(Cruiser, "cruiser", 800.0, 300.0, 400.0, 50.0, cost(20_000.0, 7_000.0, 2_000.0), impulse(15_000.0)),
        ship(Battleship, "battleship", 1_500.0, 500.0, 1_000.0, 200.0, cost(45_000.0, 15_000.0, 0.0), hyperspace(10_000.0)),
        ship(ColonyShip, "colony ship", 7_500.0, 1_000.0, 50.0, 100.0, cost(10_000.0, 20_000.0, 10_000.0), impulse(2_500.0)),
        ship(Recycler, "recycler", 20_000.0, 300.0, 1.0, 10.0, cost(10_000.0, 6_000.0, 2_000.0), combustion(2_000.0)),
        ship(EspionageProbe, "espionage probe", 5.0, 1.0, 0.01, 0.01, cost(0.0, 1_000.0, 0.0), combustion(100_000_000.0)),
        ship(Bomber, "bomber", 500.0, 1_000.0, 1_000.0, 500.0, cost(50_000.0, 25_000.0, 15_000.0), impulse(4_000.0)),
        ship(SolarSatellite, "solar satellite", 0.0, 0.0, 1.0, 1.0, cost(0.0, 2_000.0, 500.0), vec![]),
        ship(Destroyer, "destroyer", 2_000.0, 1_000.0, 2_000.0, 500.0, cost(60_000.0, 50_000.0, 15_000.0), hyperspace(5_000.0)),
        ship(Deathstar, "deathstar", 1_000_000.0, 1.0, 200_000.0, 50_000.0, cost(5_000_000.0, 4_000_000.0, 1_000_000.0), hyperspace(100.0)),
        ship(Battlecruiser, "battlecruiser", 750.0, 250.0, 700.0, 400.0, cost(30_000.0, 40_000.0, 15_000.0), hyperspace(10_000.0)),
    ]
    .into_iter()
    .map(|descriptor| (descriptor.kind, descriptor))
    .collect::<HashMap<_, _>>();

    // Engine refits unlocked by higher drive research.
    if let Some(small_cargo) = ships.get_mut(&SmallCargo) {
        small_cargo.propulsion.push(PropulsionVariant {
            technology: TechnologyKind::ImpulseDrive,
            min_level: 5,
            base_speed: 10_000.0,
            increase_factor: 0.2,
        });
    }
    if let Some(recycler) = ships.get_mut(&Recycler) {
        recycler.propulsion.push(PropulsionVariant {
            technology: TechnologyKind::HyperspaceDrive,
            min_level: 15,
            base_speed: 6_000.0,
            increase_factor: 0.3,
        });
    }
    if let Some(bomber) = ships.get_mut(&Bomber) {
        bomber.propulsion.push(PropulsionVariant {
            technology: TechnologyKind::HyperspaceDrive,
            min_level: 8,
            base_speed: 5_000.0,
            increase_factor: 0.3,
        });
    }

    let rapid_fire_ships: Vec<(ShipKind, Vec<(ShipKind, u32)>)> = vec![
        (Cruiser, vec![(LightFighter, 6), (EspionageProbe, 5), (SolarSatellite, 5)]),
        (Battleship, vec![(EspionageProbe, 5), (SolarSatellite, 5)]),
        (Bomber, vec![(EspionageProbe, 5), (SolarSatellite, 5)]),
        (Destroyer, vec![(EspionageProbe, 5), (SolarSatellite, 5), (Battlecruiser, 2)]),
        (
            Battlecruiser,
            vec![(SmallCargo, 3), (LargeCargo, 3), (HeavyFighter, 4), (Cruiser, 4), (Battleship, 7), (EspionageProbe, 5), (SolarSatellite, 5)],
        ),
        (
            Deathstar,
            vec![
                (SmallCargo, 250),
                (LargeCargo, 250),
                (LightFighter, 200),
                (HeavyFighter, 100),
                (Cruiser, 33),
                (Battleship, 30),
                (ColonyShip, 250),
                (Recycler, 250),
                (EspionageProbe, 1_250),
                (SolarSatellite, 1_250),
                (Bomber, 25),
                (Destroyer, 5),
                (Battlecruiser, 15),
            ],
        ),
    ];
    for (shooter, table) in rapid_fire_ships {
        if let Some(descriptor) = ships.get_mut(&shooter) {
            descriptor.rapid_fire_ships = table.into_iter().collect();
        }
    }

    let rapid_fire_defenses: Vec<(ShipKind, Vec<(DefenseKind, u32)>)> = vec![
        (Cruiser, vec![(DefenseKind::RocketLauncher, 10)]),
        (Bomber, vec![(DefenseKind::RocketLauncher, 20), (DefenseKind::LightLaser, 20), (DefenseKind::HeavyLaser, 10), (DefenseKind::IonCannon, 10)]),
        (Destroyer, vec![(DefenseKind::LightLaser, 10)]),
        (
            Deathstar,
            vec![
                (DefenseKind::RocketLauncher, 200),
                (DefenseKind::LightLaser, 200),
                (DefenseKind::HeavyLaser, 100),
                (DefenseKind::GaussCannon, 50),
                (DefenseKind::IonCannon, 100),
            ],
        ),
    ];
    for (shooter, table) in rapid_fire_defenses {
        if let Some(descriptor) = ships.get_mut(&shooter) {
            descriptor.rapid_fire_defenses = table.into_iter().collect();
        }
    }

    ships
}

fn standard_defenses() -> HashMap<DefenseKind, DefenseDescriptor> {
    use DefenseKind::*;

    vec![
        defense(RocketLauncher, "rocket launcher", 80.0, 20.0, cost(2_000.0, 0.0, 0.0)),
        defense(LightLaser, "light laser", 100.0, 25.0, cost(1_500.0, 500.0, 0.0)),
        defense(HeavyLaser, "heavy laser", 250.0, 100.0, cost(6_000.0, 2_000.0, 0.0)),
        defense(GaussCannon, "gauss cannon", 1_100.0, 200.0, cost(20_000.0, 15_000.0, 2_000.0)),
        defense(IonCannon, "ion cannon", 150.0, 500.0, cost(2_000.0, 6_000.0, 0.0)),
        defense(PlasmaTurret, "plasma turret", 3_000.0, 300.0, cost(50_000.0, 50_000.0, 30_000.0)),
        defense(SmallShieldDome, "small shield dome", 1.0, 2_000.0, cost(10_000.0, 10_000.0, 0.0)),
        defense(LargeShieldDome, "large shield dome", 1.0, 10_000.0, cost(50_000.0, 50_000.0, 0.0)),
    ]
    .into_iter()
    .map(|descriptor| (descriptor.kind, descriptor))
    .collect()
}

fn standard_objectives() -> HashMap<Objective, ObjectiveDescriptor> {
    use ShipKind::*;

    let all_flying: Vec<ShipKind> = ShipKind::iter().filter(|kind| *kind != SolarSatellite).collect();
    let combat_capable: Vec<ShipKind> = all_flying
        .iter()
        .copied()
        .filter(|kind| !matches!(kind, EspionageProbe | ColonyShip))
        .collect();

    vec![
        ObjectiveDescriptor {
            objective: Objective::Deployment,
            name: "deployment",
            directed: true,
            hostile: false,
            allowed_ships: all_flying.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::Transport,
            name: "transport",
            directed: true,
            hostile: false,
            allowed_ships: all_flying.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::Colonization,
            name: "colonization",
            directed: false,
            hostile: false,
            allowed_ships: vec![ColonyShip],
        },
        ObjectiveDescriptor {
            objective: Objective::Expedition,
            name: "expedition",
            directed: false,
            hostile: false,
            allowed_ships: all_flying.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::AcsDefend,
            name: "ACS defend",
            directed: true,
            hostile: false,
            allowed_ships: combat_capable.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::AcsAttack,
            name: "ACS attack",
            directed: true,
            hostile: true,
            allowed_ships: combat_capable.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::Harvesting,
            name: "harvesting",
            directed: false,
            hostile: false,
            allowed_ships: vec![Recycler],
        },
        ObjectiveDescriptor {
            objective: Objective::Attacking,
            name: "attacking",
            directed: true,
            hostile: true,
            allowed_ships: combat_capable.clone(),
        },
        ObjectiveDescriptor {
            objective: Objective::Espionage,
            name: "espionage",
            directed: true,
            hostile: true,
            allowed_ships: vec![EspionageProbe],
        },
        ObjectiveDescriptor {
            objective: Objective::Destroy,
            name: "destroy",
            directed: true,
            hostile: true,
            allowed_ships: vec![Deathstar],
        },
    ]
    .into_iter()
    .map(|descriptor| (descriptor.objective, descriptor))
    .collect()
}

fn standard_resources() -> HashMap<ResourceKind, ResourceDescriptor> {
    vec![
        ResourceDescriptor {
            kind: ResourceKind::Metal,
            name: "metal",
            movable: true,
            base_amount: 500.0,
            base_storage: 10_000.0,
            base_production: 30.0,
        },
        ResourceDescriptor {
            kind: ResourceKind::Crystal,
            name: "crystal",
            movable: true,
            base_amount: 500.0,
            base_storage: 10_000.0,
            base_production: 15.0,
        },
        ResourceDescriptor {
            kind: ResourceKind::Deuterium,
            name: "deuterium",
            movable: true,
            base_amount: 0.0,
            base_storage: 10_000.0,
            base_production: 0.0,
        },
        ResourceDescriptor {
            kind: ResourceKind::Energy,
            name: "energy",
            movable: false,
            base_amount: 0.0,
            base_storage: 0.0,
            base_production: 0.0,
        },
    ]
    .into_iter()
    .map(|descriptor| (descriptor.kind, descriptor))
    .collect()
}

lazy_static! {
    static ref STANDARD_CATALOG: Catalog = Catalog {
        ships: standard_ships(),
        defenses: standard_defenses(),
        objectives: standard_objectives(),
        resources: standard_resources(),
    };
}
