use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

/// Image risk range on the persisted path, `[10, 35)`
pub const PERSISTED_IMAGE_RISK: RangeInclusive<u8> = 10..=34;

/// Image risk range on the local simulation path
pub const LOCAL_IMAGE_RISK: RangeInclusive<u8> = 15..=25;

/// Supplies the image-analysis component of a risk assessment
///
/// The vision subsystem itself lives outside this crate; the pipeline only
/// needs one value in `[0, 100]` per evaluation.
pub trait ImageRiskSource: Send {
    fn next_risk(&mut self, sector: &str) -> u8;
}

/// Uniformly distributed stand-in for the vision subsystem
#[derive(Debug)]
pub struct SyntheticImageRisk<R: Rng = StdRng> {
    rng: R,
    range: RangeInclusive<u8>,
}

impl SyntheticImageRisk<StdRng> {
    pub fn from_entropy(range: RangeInclusive<u8>) -> Self {
        Self::new(StdRng::from_entropy(), range)
    }

    pub fn seeded(seed: u64, range: RangeInclusive<u8>) -> Self {
        Self::new(StdRng::seed_from_u64(seed), range)
    }
}

impl<R: Rng> SyntheticImageRisk<R> {
    /// Values are drawn from `range`, capped at 100
    pub fn new(rng: R, range: RangeInclusive<u8>) -> Self {
        let (start, end) = range.into_inner();
        let end = end.min(100);
        let start = start.min(end);
        Self {
            rng,
            range: start..=end,
        }
    }
}

impl<R: Rng + Send> ImageRiskSource for SyntheticImageRisk<R> {
    fn next_risk(&mut self, _sector: &str) -> u8 {
        self.rng.gen_range(self.range.clone())
    }
}

/// Constant image risk, for deterministic evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedImageRisk(pub u8);

impl ImageRiskSource for FixedImageRisk {
    fn next_risk(&mut self, _sector: &str) -> u8 {
        self.0.min(100)
    }
}
