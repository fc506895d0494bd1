//! Safe/caution/danger classification of individual readings
//!
//! These bands are tighter than the scoring steps: they flag a metric as it
//! drifts toward a scoring threshold, before it moves the risk score.

use crate::events::{RiskLevel, SensorReading, Severity};
use serde::{Deserialize, Serialize};

/// `<0.3 safe, <0.5 caution, else danger`
pub fn vibration_status(vibration: f64) -> Severity {
    if vibration < 0.3 {
        Severity::Safe
    } else if vibration < 0.5 {
        Severity::Caution
    } else {
        Severity::Danger
    }
}

/// `15<t<30 safe, t<35 caution, else danger`
pub fn temperature_status(temperature: f64) -> Severity {
    if temperature > 15.0 && temperature < 30.0 {
        Severity::Safe
    } else if temperature < 35.0 {
        Severity::Caution
    } else {
        Severity::Danger
    }
}

/// `<70 safe, <85 caution, else danger`
pub fn moisture_status(moisture: f64) -> Severity {
    if moisture < 70.0 {
        Severity::Safe
    } else if moisture < 85.0 {
        Severity::Caution
    } else {
        Severity::Danger
    }
}

/// Overall system indicator for a risk level
pub fn system_status(level: RiskLevel) -> Severity {
    match level {
        RiskLevel::Low => Severity::Safe,
        RiskLevel::Moderate => Severity::Caution,
        RiskLevel::High | RiskLevel::Critical => Severity::Danger,
    }
}

/// Status of each metric of one reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorStatus {
    pub vibration: Severity,
    pub temperature: Severity,
    pub moisture: Severity,
}

impl SensorStatus {
    pub fn of(reading: &SensorReading) -> Self {
        Self {
            vibration: vibration_status(reading.vibration),
            temperature: temperature_status(reading.temperature),
            moisture: moisture_status(reading.moisture),
        }
    }

    /// Most severe of the three
    pub fn worst(&self) -> Severity {
        self.vibration.max(self.temperature).max(self.moisture)
    }
}
