use crate::events::RiskAssessment;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default firing probability of the stochastic gate
pub const DEFAULT_GATE_PROBABILITY: f64 = 0.2;

/// Default sensor risk the stochastic gate requires before it may fire
pub const DEFAULT_GATE_SENSOR_RISK: u8 = 60;

/// Final say on whether an eligible alert is emitted
///
/// Gates model debounce without cooldown timers: they see only the
/// assessment at hand, never previous alerts.
pub trait AlertGate: Send {
    fn admit(&mut self, assessment: &RiskAssessment) -> bool;
}

/// Admits every eligible alert
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl AlertGate for OpenGate {
    fn admit(&mut self, _assessment: &RiskAssessment) -> bool {
        true
    }
}

/// Admits with a fixed probability once sensor risk is high enough
///
/// Keeps a steady high-risk stream from raising an alert on every tick.
#[derive(Debug)]
pub struct ProbabilisticGate<R: Rng = StdRng> {
    rng: R,
    /// Chance of admitting a qualifying assessment, in `[0, 1]`
    probability: f64,
    /// Sensor risk must exceed this for the gate to fire at all
    min_sensor_risk: u8,
}

impl ProbabilisticGate<StdRng> {
    pub fn from_entropy(probability: f64, min_sensor_risk: u8) -> Self {
        Self::new(StdRng::from_entropy(), probability, min_sensor_risk)
    }

    pub fn seeded(seed: u64, probability: f64, min_sensor_risk: u8) -> Self {
        Self::new(StdRng::seed_from_u64(seed), probability, min_sensor_risk)
    }
}

impl<R: Rng> ProbabilisticGate<R> {
    pub fn new(rng: R, probability: f64, min_sensor_risk: u8) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            rng,
            probability,
            min_sensor_risk,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl<R: Rng + Send> AlertGate for ProbabilisticGate<R> {
    fn admit(&mut self, assessment: &RiskAssessment) -> bool {
        if assessment.sensor_risk <= self.min_sensor_risk {
            return false;
        }
        self.rng.gen_bool(self.probability)
    }
}
