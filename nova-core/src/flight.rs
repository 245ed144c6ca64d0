use chrono::Duration;
use itertools::Itertools;
use nova_domain::{Catalog, ResourceKind, ShipKind, TechnologyKind, Universe, ValidationError};
use std::collections::HashMap;

/// Everything the timing and fuel bookkeeping of a flight depends on,
/// computed once at validation time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    pub distance: u32,
    pub max_speed: f64,
    pub flight_time: Duration,
    pub consumption: HashMap<ResourceKind, f64>,
}

/// The fleet moves at the pace of its slowest hull, engine refits included.
pub fn max_fleet_speed(
    ships: &HashMap<ShipKind, u32>,
    technologies: &HashMap<TechnologyKind, u32>,
    catalog: &Catalog,
) -> Result<f64, ValidationError> {
    let mut slowest = f64::INFINITY;

    for kind in ships.keys().sorted() {
        let descriptor = catalog
            .ship(kind)
            .ok_or(ValidationError::ShipCannotFly(*kind))?;
        if !descriptor.can_fly() {
            return Err(ValidationError::ShipCannotFly(*kind));
        }
        slowest = slowest.min(descriptor.speed_for(technologies));
    }

    if !slowest.is_finite() || slowest <= 0.0 {
        return Err(ValidationError::EmptyFleet);
    }
    Ok(slowest)
}

/// Raw travel seconds before the universe's fleet multiplier is applied:
/// `35000 / (speed * 10) * sqrt(d * 10 / maxSpeed) + 10`.
pub fn raw_flight_seconds(distance: u32, max_speed: f64, speed_fraction: f64) -> f64 {
    let speed_ratio = speed_fraction * 10.0;
    35_000.0 / speed_ratio * (distance as f64 * 10.0 / max_speed).sqrt() + 10.0
}

pub fn flight_duration(distance: u32, max_speed: f64, speed_fraction: f64, universe: &Universe) -> Duration {
    let seconds = raw_flight_seconds(distance, max_speed, speed_fraction) * universe.fleet_speed;
    Duration::milliseconds((seconds * 1_000.0).round() as i64)
}

/// Fuel burned by the flight, per resource. Each hull burns according to its
/// own engine speed while the whole fleet flies at the common pace; loiter
/// time at the target adds the per-hour holding consumption on top.
pub fn consumption(
    ships: &HashMap<ShipKind, u32>,
    technologies: &HashMap<TechnologyKind, u32>,
    distance: u32,
    max_speed: f64,
    speed_fraction: f64,
    deployment_seconds: i64,
    universe: &Universe,
    catalog: &Catalog,
) -> Result<HashMap<ResourceKind, f64>, ValidationError> {
    let raw_seconds = raw_flight_seconds(distance, max_speed, speed_fraction);
    let deployment_hours = deployment_seconds as f64 / 3_600.0;

    let mut flight_total = 0.0;
    let mut deployment_total = 0.0;

    for (kind, count) in ships.iter().sorted_by_key(|(kind, _)| **kind) {
        let descriptor = catalog
            .ship(kind)
            .ok_or(ValidationError::ShipCannotFly(*kind))?;
        let ship_speed = descriptor.speed_for(technologies);

        let sk = 35_000.0 * (distance as f64 * 10.0 / ship_speed).sqrt() / (raw_seconds - 10.0);
        let per_ship = descriptor.fuel_consumption * distance as f64 * (1.0 + sk / 10.0).powi(2) / 35_000.0;

        flight_total += per_ship * *count as f64;
        deployment_total += descriptor.deployment_consumption * deployment_hours * *count as f64;
    }

    let total = flight_total * universe.consumption_ratio + deployment_total;

    Ok(HashMap::from([(ResourceKind::Deuterium, total)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_domain::Catalog;

    fn technologies() -> HashMap<TechnologyKind, u32> {
        HashMap::from([
            (TechnologyKind::CombustionDrive, 0),
            (TechnologyKind::ImpulseDrive, 0),
            (TechnologyKind::HyperspaceDrive, 0),
        ])
    }

    #[test]
    fn fleet_speed_is_the_slowest_hull() {
        let catalog = Catalog::standard();
        let ships = HashMap::from([(ShipKind::LightFighter, 10), (ShipKind::Recycler, 2)]);

        let speed = max_fleet_speed(&ships, &technologies(), catalog).unwrap();
        assert_eq!(speed, 2_000.0);
    }

    #[test]
    fn grounded_hulls_are_rejected() {
        let catalog = Catalog::standard();
        let ships = HashMap::from([(ShipKind::SolarSatellite, 1)]);

        assert_eq!(
            max_fleet_speed(&ships, &technologies(), catalog),
            Err(ValidationError::ShipCannotFly(ShipKind::SolarSatellite))
        );
    }

    #[test]
    fn travel_time_follows_the_formula() {
        // d = 1015, maxSpeed = 2000, full throttle:
        // 35000/10 * sqrt(10150/2000) + 10 = 3500 * 2.2528... + 10
        let seconds = raw_flight_seconds(1_015, 2_000.0, 1.0);
        let expected = 3_500.0 * (10_150.0f64 / 2_000.0).sqrt() + 10.0;
        assert!((seconds - expected).abs() < 1e-9);
    }

    #[test]
    fn halving_the_throttle_roughly_doubles_the_travel_time() {
        let full = raw_flight_seconds(2_890, 5_000.0, 1.0);
        let half = raw_flight_seconds(2_890, 5_000.0, 0.5);
        assert!(((half - 10.0) / (full - 10.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn universe_fleet_multiplier_scales_the_duration() {
        let mut universe = Universe::for_tests(1, 499, 15);
        let base = flight_duration(1_015, 2_000.0, 1.0, &universe);

        universe.fleet_speed = 2.0;
        let scaled = flight_duration(1_015, 2_000.0, 1.0, &universe);

        assert_eq!(scaled.num_milliseconds(), base.num_milliseconds() * 2);
    }

    #[test]
    fn slower_throttle_burns_less_fuel() {
        let catalog = Catalog::standard();
        let universe = Universe::for_tests(1, 499, 15);
        let ships = HashMap::from([(ShipKind::SmallCargo, 10)]);
        let technologies = technologies();

        let max_speed = max_fleet_speed(&ships, &technologies, catalog).unwrap();
        let fast = consumption(&ships, &technologies, 2_890, max_speed, 1.0, 0, &universe, catalog).unwrap();
        let slow = consumption(&ships, &technologies, 2_890, max_speed, 0.5, 0, &universe, catalog).unwrap();

        assert!(slow[&ResourceKind::Deuterium] < fast[&ResourceKind::Deuterium]);
    }

    #[test]
    fn holding_at_the_target_adds_deployment_fuel() {
        let catalog = Catalog::standard();
        let universe = Universe::for_tests(1, 499, 15);
        let ships = HashMap::from([(ShipKind::Cruiser, 4)]);
        let technologies = technologies();

        let max_speed = max_fleet_speed(&ships, &technologies, catalog).unwrap();
        let without = consumption(&ships, &technologies, 1_015, max_speed, 1.0, 0, &universe, catalog).unwrap();
        let with = consumption(&ships, &technologies, 1_015, max_speed, 1.0, 7_200, &universe, catalog).unwrap();

        let cruiser = catalog.ship(&ShipKind::Cruiser).unwrap();
        let expected_extra = cruiser.deployment_consumption * 2.0 * 4.0;
        let actual_extra = with[&ResourceKind::Deuterium] - without[&ResourceKind::Deuterium];
        assert!((actual_extra - expected_extra).abs() < 1e-9);
    }
}
