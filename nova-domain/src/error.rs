use crate::catalog::{Objective, ResourceKind, ShipKind};
use crate::coordinates::{Coordinate, CoordinateKind};
use thiserror::Error;

/// Pure model-level failures: either the input is malformed or a domain
/// precondition does not hold. Infrastructure failures live in the core
/// crate's error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("coordinate {0} lies outside the universe bounds")]
    CoordinateOutOfBounds(Coordinate),

    #[error("universe dimensions must all be at least 1")]
    InvalidUniverseDimensions,

    #[error("universe multipliers must be strictly positive")]
    InvalidUniverseMultipliers,

    #[error("fleet speed {0} is not within (0, 1]")]
    InvalidSpeed(f64),

    #[error("fleet contains no ships")]
    EmptyFleet,

    #[error("cargo amount for {0} must be strictly positive")]
    NonPositiveCargo(ResourceKind),

    #[error("fleet target equals its source")]
    TargetIsSource,

    #[error("objective {objective} cannot target a {kind} coordinate")]
    IllegalTargetKind { objective: Objective, kind: CoordinateKind },

    #[error("objective {0} requires an existing target body")]
    TargetBodyRequired(Objective),

    #[error("objective {0} does not allow carrying cargo")]
    CargoForbidden(Objective),

    #[error("a fleet joined to an ACS operation cannot carry cargo")]
    AcsCargoForbidden,

    #[error("hostile objective {0} cannot target a body of the same player")]
    HostileSelfTarget(Objective),

    #[error("no debris field exists at {0}")]
    NoDebrisFieldAtTarget(Coordinate),

    #[error("colonization cannot target the fleet's source coordinate")]
    ColonizationOfSource,

    #[error("no ship in the fleet can perform objective {0}")]
    NoCapableShip(Objective),

    #[error("{0} has no propulsion and cannot join a fleet")]
    ShipCannotFly(ShipKind),

    #[error("resource {0} cannot be moved by fleets")]
    ResourceNotMovable(ResourceKind),

    #[error("cargo ({cargo}) exceeds the fleet capacity ({capacity})")]
    CargoExceedsCapacity { cargo: f64, capacity: f64 },

    #[error("fuel ({fuel}) exceeds the fleet capacity ({capacity})")]
    FuelExceedsCapacity { fuel: f64, capacity: f64 },

    #[error("source body holds {available} of {resource}, {needed} needed")]
    InsufficientResources { resource: ResourceKind, available: f64, needed: f64 },

    #[error("source body holds {available} of {ship}, {needed} needed")]
    InsufficientShips { ship: ShipKind, available: u32, needed: u32 },

    #[error("body temperature band must span exactly 50 degrees")]
    InvalidTemperatureBand,

    #[error("built levels ({built}) exceed the body's {fields} fields")]
    FieldsExceeded { built: u32, fields: u32 },

    #[error("resource stocks cannot be negative")]
    NegativeStock,

    #[error("joining would delay the operation by {delay_ratio:.2}, above the 1.30 bound")]
    AcsDelayTooLarge { delay_ratio: f64 },

    #[error("fleet does not match the ACS operation's {0}")]
    AcsComponentMismatch(&'static str),

    #[error("fleet is already part of an ACS operation")]
    AlreadyInAcs,

    #[error("destroy missions can only target moons")]
    DestroyRequiresMoon,
}
