use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct UniverseId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct BodyId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct FleetId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct AcsFleetId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct DebrisFieldId(pub Uuid);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

macro_rules! id_impls {
    ($($t:ident),+) => {
        $(
            impl $t {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                pub fn parse(raw: &str) -> Result<Self, ValidationError> {
                    Uuid::parse_str(raw)
                        .map(Self)
                        .map_err(|_| ValidationError::InvalidIdentifier(raw.to_string()))
                }
            }

            impl Default for $t {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl Display for $t {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

id_impls!(UniverseId, PlayerId, BodyId, FleetId, AcsFleetId, DebrisFieldId, ReportId);
