pub mod acs;
pub mod body;
pub mod catalog;
pub mod coordinates;
pub mod debris;
pub mod error;
pub mod fight;
pub mod fleet;
pub mod ids;
pub mod reports;
pub mod universe;

pub use acs::*;
pub use body::*;
pub use catalog::*;
pub use coordinates::*;
pub use debris::*;
pub use error::*;
pub use fight::*;
pub use fleet::*;
pub use ids::*;
pub use reports::*;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;
pub use universe::*;

/// Custom serialization function that sorts the keys, so that marshalled
/// entities are byte-stable across runs.
pub fn serialize_as_sorted_map<K, V, S>(map: &HashMap<K, V>, serializer: S) -> anyhow::Result<S::Ok, S::Error>
where
    K: Serialize + Eq + Hash + Ord,
    V: Serialize,
    S: Serializer,
{
    use serde::ser::SerializeMap;

    let mut kv_pairs: Vec<(&K, &V)> = map.iter().collect();
    kv_pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut map_ser = serializer.serialize_map(Some(kv_pairs.len()))?;
    for (k, v) in kv_pairs {
        map_ser.serialize_entry(k, v)?;
    }
    map_ser.end()
}
