use chrono::{DateTime, Utc};
use nova_domain::Coordinate;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Mission-local PRNG. Every random outcome of a mission (counter-espionage
/// rolls, destruction rolls, combat targeting, colony generation) comes from
/// one of these, seeded deterministically, so a mission replayed with the
/// same inputs resolves identically on every platform.
pub struct MissionRng(Pcg64);

impl MissionRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(Pcg64::seed_from_u64(seed))
    }

    pub fn from_coordinate(coordinate: &Coordinate) -> Self {
        Self::from_seed(coordinate.generate_seed())
    }

    pub fn from_arrival_time(arrival_time: DateTime<Utc>) -> Self {
        Self::from_seed(arrival_time.timestamp_millis() as u64)
    }

    /// Fights mix both sources: where the fight happens and when.
    pub fn for_fight(coordinate: &Coordinate, arrival_time: DateTime<Utc>) -> Self {
        Self::from_seed(coordinate.generate_seed() ^ (arrival_time.timestamp_millis() as u64))
    }

    /// Uniform draw in [0, 1).
    pub fn roll(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    /// Uniform draw in [0, bound).
    pub fn pick(&mut self, bound: usize) -> usize {
        self.0.gen_range(0..bound)
    }

    /// Uniform draw in [low, high].
    pub fn between(&mut self, low: i64, high: i64) -> i64 {
        self.0.gen_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_domain::CoordinateKind;

    #[test]
    fn same_seed_same_sequence() {
        let coordinate = Coordinate::new(4, 120, 9, CoordinateKind::Moon);
        let mut a = MissionRng::from_coordinate(&coordinate);
        let mut b = MissionRng::from_coordinate(&coordinate);

        for _ in 0..32 {
            assert_eq!(a.roll().to_bits(), b.roll().to_bits());
        }
    }

    #[test]
    fn different_arrival_times_diverge() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);
        let mut a = MissionRng::from_arrival_time(t0);
        let mut b = MissionRng::from_arrival_time(t1);

        let same = (0..8).all(|_| a.roll().to_bits() == b.roll().to_bits());
        assert!(!same);
    }
}
