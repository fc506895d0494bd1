//! Per-sector reading aggregation
//!
//! This module provides the ReadingAggregator which keeps one rolling window of
//! recent readings per sector and derives smoothed metrics from it.

use crate::aggregator::RollingWindow;
use crate::events::SensorReading;
use chrono::{Duration, Utc};
use std::collections::HashMap;

/// Window size used for vibration smoothing
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Rolling windows of recent readings keyed by sector
///
/// Each sector is an independent stream. Readings are kept in arrival order
/// and the oldest reading of a sector is evicted once its window is full.
#[derive(Debug, Clone)]
pub struct ReadingAggregator {
    windows: HashMap<String, RollingWindow<SensorReading>>,
    /// Maximum number of readings kept per sector
    capacity: usize,
}

impl ReadingAggregator {
    /// Create a new ReadingAggregator
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of readings to keep per sector
    ///
    /// # Examples
    ///
    /// ```
    /// use pitwatch::aggregator::ReadingAggregator;
    ///
    /// let aggregator = ReadingAggregator::new(5);
    /// assert_eq!(aggregator.capacity(), 5);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a reading to its sector's window, returning the window
    pub fn add(&mut self, reading: SensorReading) -> &RollingWindow<SensorReading> {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(reading.sector.clone())
            .or_insert_with(|| RollingWindow::new(capacity));
        window.push(reading);
        window
    }

    /// Window for a sector, if any reading has been seen for it
    pub fn window(&self, sector: &str) -> Option<&RollingWindow<SensorReading>> {
        self.windows.get(sector)
    }

    /// Sectors with at least one reading, sorted
    pub fn sectors(&self) -> Vec<&str> {
        let mut sectors: Vec<&str> = self.windows.keys().map(String::as_str).collect();
        sectors.sort_unstable();
        sectors
    }

    /// Mean vibration over the last `n` readings of a sector
    pub fn moving_average_vibration(&self, sector: &str, n: usize) -> Option<f64> {
        self.window(sector)?.mean_of(n, |reading| reading.vibration)
    }

    /// Readings of a sector taken within the last `duration`, oldest first
    pub fn recent(&self, sector: &str, duration: Duration) -> Vec<&SensorReading> {
        let cutoff = Utc::now() - duration;
        self.window(sector)
            .map(|window| {
                window
                    .iter()
                    .filter(|reading| reading.timestamp >= cutoff)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total readings held across all sectors
    pub fn len(&self) -> usize {
        self.windows.values().map(RollingWindow::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.values().all(RollingWindow::is_empty)
    }
}

impl Default for ReadingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Generate a per-sector capacity (1-20)
    #[derive(Debug, Clone)]
    struct BufferCapacity(usize);

    impl Arbitrary for BufferCapacity {
        fn arbitrary(g: &mut Gen) -> Self {
            BufferCapacity((u8::arbitrary(g) % 20 + 1) as usize)
        }
    }

    /// Sector index picks for a stream of readings
    #[derive(Debug, Clone)]
    struct SectorPicks(Vec<usize>);

    impl Arbitrary for SectorPicks {
        fn arbitrary(g: &mut Gen) -> Self {
            let size = usize::arbitrary(g) % 100 + 1;
            SectorPicks((0..size).map(|_| usize::arbitrary(g) % 3).collect())
        }
    }

    // No sector window ever holds more than the capacity, and each keeps
    // its own most recent readings.
    #[quickcheck]
    fn prop_per_sector_capacity(capacity: BufferCapacity, picks: SectorPicks) -> bool {
        let sectors = ["Sector A", "Sector B", "Sector C"];
        let mut aggregator = ReadingAggregator::new(capacity.0);
        let now = Utc::now();

        for (i, pick) in picks.0.iter().enumerate() {
            let reading = SensorReading::at(
                now + Duration::milliseconds(i as i64),
                sectors[*pick],
                i as f64,
                25.0,
                50.0,
            );
            aggregator.add(reading);
        }

        sectors.iter().enumerate().all(|(index, sector)| {
            let expected: Vec<f64> = picks
                .0
                .iter()
                .enumerate()
                .filter(|(_, pick)| **pick == index)
                .map(|(i, _)| i as f64)
                .collect();
            let expected = &expected[expected.len().saturating_sub(capacity.0)..];

            let actual: Vec<f64> = aggregator
                .window(sector)
                .map(|w| w.iter().map(|r| r.vibration).collect())
                .unwrap_or_default();

            actual.len() <= capacity.0 && actual == expected
        })
    }
}
