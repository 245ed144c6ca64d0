use crate::error::ValidationError;
use crate::ids::UniverseId;
use serde::{Deserialize, Serialize};

/// A self-contained game world. Dimensions bound every coordinate; the six
/// multipliers scale the base formulas: economy/fleet/research speeds plus
/// the debris and consumption ratios. Immutable once published.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Universe {
    pub id: UniverseId,
    pub name: String,
    pub galaxies_count: u16,
    pub galaxy_size: u16,
    pub solar_system_size: u16,
    pub economy_speed: f64,
    pub fleet_speed: f64,
    pub research_speed: f64,
    pub ships_to_ruins: f64,
    pub defenses_to_ruins: f64,
    pub consumption_ratio: f64,
}

impl Universe {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.galaxies_count == 0 || self.galaxy_size == 0 || self.solar_system_size == 0 {
            return Err(ValidationError::InvalidUniverseDimensions);
        }

        let speeds = [self.economy_speed, self.fleet_speed, self.research_speed, self.consumption_ratio];
        if speeds.iter().any(|m| *m <= 0.0) {
            return Err(ValidationError::InvalidUniverseMultipliers);
        }

        // Ruin ratios are fractions of the destroyed value; zero is a legal
        // universe setting (no debris from defenses, typically).
        let ruin_ratios = [self.ships_to_ruins, self.defenses_to_ruins];
        if ruin_ratios.iter().any(|m| !(0.0..=1.0).contains(m)) {
            return Err(ValidationError::InvalidUniverseMultipliers);
        }

        Ok(())
    }

    pub fn for_tests(galaxies_count: u16, galaxy_size: u16, solar_system_size: u16) -> Universe {
        Universe {
            id: UniverseId::new(),
            name: "test-universe".to_string(),
            galaxies_count,
            galaxy_size,
            solar_system_size,
            economy_speed: 1.0,
            fleet_speed: 1.0,
            research_speed: 1.0,
            ships_to_ruins: 0.3,
            defenses_to_ruins: 0.0,
            consumption_ratio: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_degenerate_universes() {
        let mut universe = Universe::for_tests(1, 499, 15);
        assert!(universe.validate().is_ok());

        universe.galaxy_size = 0;
        assert_eq!(universe.validate(), Err(ValidationError::InvalidUniverseDimensions));

        universe.galaxy_size = 499;
        universe.fleet_speed = 0.0;
        assert_eq!(universe.validate(), Err(ValidationError::InvalidUniverseMultipliers));
    }
}
