use crate::error::ValidationError;
use crate::universe::Universe;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum::{EnumIter, EnumString};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, strum::Display, EnumString, EnumIter)]
pub enum CoordinateKind {
    World,
    Moon,
    Debris,
}

/// A location in a universe: galaxy, solar system, orbital position and the
/// kind of slot occupied there. Worlds, moons and debris fields share the
/// same (galaxy, system, position) triple.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Coordinate {
    pub galaxy: u16,
    pub system: u16,
    pub position: u16,
    pub kind: CoordinateKind,
}

impl Coordinate {
    pub fn new(galaxy: u16, system: u16, position: u16, kind: CoordinateKind) -> Self {
        Self {
            galaxy,
            system,
            position,
            kind,
        }
    }

    pub fn validate(&self, universe: &Universe) -> Result<(), ValidationError> {
        let in_bounds = self.galaxy < universe.galaxies_count && self.system < universe.galaxy_size && self.position < universe.solar_system_size;

        in_bounds
            .then_some(())
            .ok_or(ValidationError::CoordinateOutOfBounds(*self))
    }

    /// Collapses the coordinate into a single integer, unique within its
    /// universe. Used as a hash key for occupancy checks.
    pub fn linearize(&self, universe: &Universe) -> u64 {
        let slot = (self.galaxy as u64 * universe.galaxy_size as u64 + self.system as u64) * universe.solar_system_size as u64 + self.position as u64;

        slot * 3 + self.kind_index()
    }

    /// Deterministic seed for coordinate-bound rolls (colony generation,
    /// destruction outcomes). Stable across platforms and runs.
    pub fn generate_seed(&self) -> u64 {
        let mut seed = 0x9e37_79b9_7f4a_7c15u64;
        for part in [self.galaxy as u64, self.system as u64, self.position as u64, self.kind_index()] {
            seed ^= part.wrapping_add(0x9e37_79b9_7f4a_7c15).wrapping_add(seed << 6).wrapping_add(seed >> 2);
            seed = seed.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        }
        seed
    }

    /// Distance between two slots, fed into the flight time and fuel
    /// formulas. Crossing galaxies dominates, then systems, then positions;
    /// two slots of the same triple (e.g. a moon and its world) are 5 apart.
    pub fn distance_to(&self, other: &Coordinate) -> u32 {
        if self.galaxy != other.galaxy {
            return 20_000 * self.galaxy.abs_diff(other.galaxy) as u32;
        }
        if self.system != other.system {
            return 2_700 + 95 * self.system.abs_diff(other.system) as u32;
        }
        if self.position != other.position {
            return 1_000 + 5 * self.position.abs_diff(other.position) as u32;
        }
        5
    }

    pub fn same_slot(&self, other: &Coordinate) -> bool {
        self.galaxy == other.galaxy && self.system == other.system && self.position == other.position
    }

    pub fn with_kind(&self, kind: CoordinateKind) -> Coordinate {
        Coordinate { kind, ..*self }
    }

    fn kind_index(&self) -> u64 {
        match self.kind {
            CoordinateKind::World => 0,
            CoordinateKind::Moon => 1,
            CoordinateKind::Debris => 2,
        }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}:{}:{}]", self.galaxy, self.system, self.position, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Universe;

    fn small_universe() -> Universe {
        Universe::for_tests(3, 10, 15)
    }

    #[test]
    fn validate_checks_each_axis_against_the_universe() {
        let universe = small_universe();

        assert!(Coordinate::new(2, 9, 14, CoordinateKind::World).validate(&universe).is_ok());
        assert!(Coordinate::new(3, 0, 0, CoordinateKind::World).validate(&universe).is_err());
        assert!(Coordinate::new(0, 10, 0, CoordinateKind::World).validate(&universe).is_err());
        assert!(Coordinate::new(0, 0, 15, CoordinateKind::World).validate(&universe).is_err());
    }

    #[test]
    fn linearize_is_unique_across_slots_and_kinds() {
        let universe = small_universe();
        let mut seen = std::collections::HashSet::new();

        for galaxy in 0..3 {
            for system in 0..10 {
                for position in 0..15 {
                    for kind in [CoordinateKind::World, CoordinateKind::Moon, CoordinateKind::Debris] {
                        let coordinate = Coordinate::new(galaxy, system, position, kind);
                        assert!(seen.insert(coordinate.linearize(&universe)), "collision at {}", coordinate);
                    }
                }
            }
        }
    }

    #[test]
    fn distance_ladder() {
        let origin = Coordinate::new(1, 5, 8, CoordinateKind::World);

        assert_eq!(origin.distance_to(&Coordinate::new(3, 5, 8, CoordinateKind::World)), 40_000);
        assert_eq!(origin.distance_to(&Coordinate::new(1, 7, 8, CoordinateKind::World)), 2_890);
        assert_eq!(origin.distance_to(&Coordinate::new(1, 5, 11, CoordinateKind::World)), 1_015);
        assert_eq!(origin.distance_to(&Coordinate::new(1, 5, 8, CoordinateKind::Moon)), 5);
    }

    #[test]
    fn seed_is_stable_and_kind_sensitive() {
        let world = Coordinate::new(1, 2, 3, CoordinateKind::World);
        let moon = world.with_kind(CoordinateKind::Moon);

        assert_eq!(world.generate_seed(), world.generate_seed());
        assert_ne!(world.generate_seed(), moon.generate_seed());
    }
}
