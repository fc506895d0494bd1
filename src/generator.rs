//! Synthetic sensor reading generation
//!
//! Readings are drawn uniformly from a [`GeneratorProfile`] and rounded to a
//! fixed precision so their wire representation is reproducible. The random
//! source is a type parameter, so tests seed it and get identical readings.

use crate::events::{SensorReading, Timestamp};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Value ranges for each simulated metric
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorProfile {
    pub vibration: Range<f64>,
    pub temperature: Range<f64>,
    pub moisture: Range<f64>,
}

impl GeneratorProfile {
    /// Ranges used by the periodic trigger
    pub fn base() -> Self {
        Self {
            vibration: 0.2..0.5,
            temperature: 20.0..35.0,
            moisture: 40.0..70.0,
        }
    }

    /// Higher-variance vibration used by the local simulation
    pub fn live() -> Self {
        Self {
            vibration: 0.2..0.6,
            ..Self::base()
        }
    }
}

impl Default for GeneratorProfile {
    fn default() -> Self {
        Self::base()
    }
}

/// Produces synthetic readings from an injectable random source
pub struct ReadingGenerator<R: Rng = StdRng> {
    rng: R,
    profile: GeneratorProfile,
}

impl ReadingGenerator<StdRng> {
    /// Generator seeded from OS entropy
    pub fn from_entropy(profile: GeneratorProfile) -> Self {
        Self::new(StdRng::from_entropy(), profile)
    }

    /// Deterministic generator for tests and reproducible runs
    pub fn seeded(seed: u64, profile: GeneratorProfile) -> Self {
        Self::new(StdRng::seed_from_u64(seed), profile)
    }
}

impl<R: Rng> ReadingGenerator<R> {
    pub fn new(rng: R, profile: GeneratorProfile) -> Self {
        Self { rng, profile }
    }

    pub fn profile(&self) -> &GeneratorProfile {
        &self.profile
    }

    /// Generate one reading for `sector` stamped with the current time
    pub fn generate(&mut self, sector: &str) -> SensorReading {
        self.generate_at(sector, Utc::now())
    }

    /// Generate one reading for `sector` at a given time
    pub fn generate_at(&mut self, sector: &str, timestamp: Timestamp) -> SensorReading {
        let vibration = round_to(self.rng.gen_range(self.profile.vibration.clone()), 3);
        let temperature = round_to(self.rng.gen_range(self.profile.temperature.clone()), 2);
        let moisture = round_to(self.rng.gen_range(self.profile.moisture.clone()), 2);

        SensorReading::at(timestamp, sector, vibration, temperature, moisture)
    }

    /// Generate one reading per sector, in sector order
    pub fn generate_batch<S: AsRef<str>>(&mut self, sectors: &[S]) -> Vec<SensorReading> {
        let now = Utc::now();
        sectors
            .iter()
            .map(|sector| self.generate_at(sector.as_ref(), now))
            .collect()
    }

    /// Access the underlying random source
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn has_at_most_places(value: f64, places: i32) -> bool {
        (round_to(value, places) - value).abs() < 1e-9
    }

    // Generated values stay inside the profile (inclusive after rounding)
    // and carry the fixed wire precision.
    #[quickcheck]
    fn prop_readings_within_profile(seed: u64, live: bool) -> bool {
        let profile = if live {
            GeneratorProfile::live()
        } else {
            GeneratorProfile::base()
        };
        let mut generator = ReadingGenerator::seeded(seed, profile.clone());

        (0..25).all(|_| {
            let reading = generator.generate("Sector B");
            reading.vibration >= profile.vibration.start
                && reading.vibration <= profile.vibration.end
                && reading.temperature >= profile.temperature.start
                && reading.temperature <= profile.temperature.end
                && reading.moisture >= profile.moisture.start
                && reading.moisture <= profile.moisture.end
                && has_at_most_places(reading.vibration, 3)
                && has_at_most_places(reading.temperature, 2)
                && has_at_most_places(reading.moisture, 2)
        })
    }
}
