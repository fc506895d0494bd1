//! Core record types for the rockfall monitor
//!
//! This module defines the three row types that flow through the pipeline
//! (sensor readings, risk assessments and alerts) together with the ordered
//! enums attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Zones monitored when no sector list is configured
pub const DEFAULT_SECTORS: [&str; 3] = ["Sector A", "Sector B", "Sector C"];

/// A single environmental reading from one sector
///
/// Readings are immutable once recorded and persisted append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    pub id: Uuid,
    /// Monitored zone the reading belongs to
    pub sector: String,
    /// Unit-less vibration intensity, nominally 0.0 to 1.0
    pub vibration: f64,
    /// Rock surface temperature in degrees Celsius
    pub temperature: f64,
    /// Moisture as percent saturation
    pub moisture: f64,
    pub timestamp: Timestamp,
}

impl SensorReading {
    /// Record a new reading with a fresh id and the current time
    pub fn new(sector: impl Into<String>, vibration: f64, temperature: f64, moisture: f64) -> Self {
        Self::at(Utc::now(), sector, vibration, temperature, moisture)
    }

    /// Record a new reading at a specific time
    pub fn at(
        timestamp: Timestamp,
        sector: impl Into<String>,
        vibration: f64,
        temperature: f64,
        moisture: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sector: sector.into(),
            vibration,
            temperature,
            moisture,
            timestamp,
        }
    }
}

/// Categorical risk derived from the overall score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Step function over the overall risk score
    ///
    /// Boundaries are exclusive on the lower side: 70 is `High`, 71 is
    /// `Critical`, 30 is `Low`, 31 is `Moderate`.
    pub fn from_overall(overall_risk: u8) -> Self {
        if overall_risk > 70 {
            RiskLevel::Critical
        } else if overall_risk > 50 {
            RiskLevel::High
        } else if overall_risk > 30 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(RiskLevel::Low),
            "MODERATE" => Some(RiskLevel::Moderate),
            "HIGH" => Some(RiskLevel::High),
            "CRITICAL" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// Severity shared by alerts and sensor status indicators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Caution,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Safe => "safe",
            Severity::Caution => "caution",
            Severity::Danger => "danger",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "safe" => Some(Severity::Safe),
            "caution" => Some(Severity::Caution),
            "danger" => Some(Severity::Danger),
            _ => None,
        }
    }
}

/// Combined hazard assessment for one processed reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub id: Uuid,
    /// Score from the environmental sensors (0-100)
    pub sensor_risk: u8,
    /// Score from the image analysis source (0-100)
    pub image_risk: u8,
    /// Mean of sensor and image risk, rounded half up (0-100)
    pub overall_risk: u8,
    pub risk_level: RiskLevel,
    pub sector: String,
    pub timestamp: Timestamp,
}

impl RiskAssessment {
    /// Build an assessment from its two inputs
    ///
    /// Inputs above 100 are clamped. `overall_risk` and `risk_level` are
    /// always derived here and never supplied by the caller.
    pub fn from_scores(
        sector: impl Into<String>,
        sensor_risk: u8,
        image_risk: u8,
        timestamp: Timestamp,
    ) -> Self {
        let sensor_risk = sensor_risk.min(100);
        let image_risk = image_risk.min(100);
        let overall_risk = overall_risk(sensor_risk, image_risk);

        Self {
            id: Uuid::new_v4(),
            sensor_risk,
            image_risk,
            overall_risk,
            risk_level: RiskLevel::from_overall(overall_risk),
            sector: sector.into(),
            timestamp,
        }
    }
}

/// `round((sensor + image) / 2)` with halves rounded up
pub fn overall_risk(sensor_risk: u8, image_risk: u8) -> u8 {
    ((u16::from(sensor_risk) + u16::from(image_risk) + 1) / 2) as u8
}

/// A raised hazard alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: Severity,
    /// Human-readable cause
    pub message: String,
    pub sector: String,
    pub timestamp: Timestamp,
    /// Cleared only by an explicit external deactivation
    #[serde(rename = "is_active")]
    pub active: bool,
}

impl Alert {
    pub fn new(
        alert_type: Severity,
        message: impl Into<String>,
        sector: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            message: message.into(),
            sector: sector.into(),
            timestamp,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_overall(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_overall(71), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_overall(50), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_overall(51), RiskLevel::High);
        assert_eq!(RiskLevel::from_overall(30), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overall(31), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_overall(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_overall(100), RiskLevel::Critical);
    }

    #[test]
    fn test_overall_risk_rounds_half_up() {
        assert_eq!(overall_risk(45, 20), 33); // 32.5
        assert_eq!(overall_risk(44, 20), 32);
        assert_eq!(overall_risk(100, 100), 100);
        assert_eq!(overall_risk(5, 10), 8); // 7.5
        assert_eq!(overall_risk(0, 0), 0);
    }

    #[test]
    fn test_assessment_derives_level() {
        let assessment = RiskAssessment::from_scores("Sector A", 100, 42, Utc::now());
        assert_eq!(assessment.overall_risk, 71);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.sector, "Sector A");
    }

    #[test]
    fn test_assessment_clamps_inputs() {
        let assessment = RiskAssessment::from_scores("Sector B", 200, 150, Utc::now());
        assert_eq!(assessment.sensor_risk, 100);
        assert_eq!(assessment.image_risk, 100);
        assert_eq!(assessment.overall_risk, 100);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Safe < Severity::Caution);
        assert!(Severity::Caution < Severity::Danger);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::Moderate).unwrap(),
            "\"MODERATE\""
        );
        assert_eq!(serde_json::to_string(&Severity::Danger).unwrap(), "\"danger\"");

        for level in [
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert_eq!(RiskLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(Severity::parse("caution"), Some(Severity::Caution));
        assert_eq!(Severity::parse("bogus"), None);
    }

    #[test]
    fn test_alert_serialization_uses_row_field_names() {
        let alert = Alert::new(Severity::Caution, "Elevated", "Sector C", Utc::now());
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["type"], "caution");
        assert_eq!(json["is_active"], true);

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }
}
