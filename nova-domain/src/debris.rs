use crate::catalog::ResourceKind;
use crate::coordinates::Coordinate;
use crate::ids::{DebrisFieldId, UniverseId};
use crate::serialize_as_sorted_map;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A coordinate-tagged pool of resources left behind by destroyed ships and
/// defenses. Harvesting drains it; the record persists even when empty so
/// later fights at the same slot accumulate into it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DebrisField {
    pub id: DebrisFieldId,
    pub universe: UniverseId,
    pub coordinate: Coordinate,
    #[serde(serialize_with = "serialize_as_sorted_map")]
    pub resources: HashMap<ResourceKind, f64>,
    pub created_at: DateTime<Utc>,
}

impl DebrisField {
    pub fn amount_of(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.resources.values().sum()
    }

    /// Removes the collected amounts from the field. Amounts are clipped at
    /// what the field actually holds, so over-collection cannot go negative.
    pub fn collect(&mut self, collected: &HashMap<ResourceKind, f64>) {
        for (kind, amount) in collected {
            if let Some(remaining) = self.resources.get_mut(kind) {
                *remaining = (*remaining - amount).max(0.0);
            }
        }
    }

    pub fn deposit(&mut self, deposits: &HashMap<ResourceKind, f64>) {
        for (kind, amount) in deposits {
            if *amount > 0.0 {
                *self.resources.entry(*kind).or_insert(0.0) += amount;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::CoordinateKind;

    fn field() -> DebrisField {
        DebrisField {
            id: DebrisFieldId::new(),
            universe: UniverseId::new(),
            coordinate: Coordinate::new(1, 2, 3, CoordinateKind::Debris),
            resources: HashMap::from([(ResourceKind::Metal, 500.0), (ResourceKind::Crystal, 300.0)]),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn collect_drains_but_never_goes_negative() {
        let mut f = field();
        f.collect(&HashMap::from([(ResourceKind::Metal, 200.0), (ResourceKind::Crystal, 400.0)]));

        assert_eq!(f.amount_of(ResourceKind::Metal), 300.0);
        assert_eq!(f.amount_of(ResourceKind::Crystal), 0.0);
        assert_eq!(f.total(), 300.0);
    }

    #[test]
    fn deposits_accumulate_into_existing_and_new_entries() {
        let mut f = field();
        f.deposit(&HashMap::from([(ResourceKind::Metal, 100.0), (ResourceKind::Deuterium, 50.0)]));

        assert_eq!(f.amount_of(ResourceKind::Metal), 600.0);
        assert_eq!(f.amount_of(ResourceKind::Deuterium), 50.0);
    }
}
