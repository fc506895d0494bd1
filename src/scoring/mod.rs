/// Risk scoring, image risk sources and sensor status bands
pub mod image_risk;
pub mod scorer;
pub mod status;

pub use image_risk::{
    FixedImageRisk, ImageRiskSource, SyntheticImageRisk, LOCAL_IMAGE_RISK, PERSISTED_IMAGE_RISK,
};
pub use scorer::{breakdown, score, RiskScorer, ScoringMode, SensorRiskBreakdown};
pub use status::{system_status, SensorStatus};
