/// Alert generation and stochastic gating
pub mod alert_generator;
pub mod gate;

pub use alert_generator::{AlertCause, AlertGenerator, AlertThresholds};
pub use gate::{AlertGate, OpenGate, ProbabilisticGate};
