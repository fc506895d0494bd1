use crate::alerts::{AlertGate, OpenGate};
use crate::events::{Alert, RiskAssessment, SensorReading, Severity};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Overall-risk thresholds for raising alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// An alert is eligible when overall risk is strictly above this
    pub alert_above: u8,
    /// Eligible alerts are `danger` when overall risk is strictly above this
    pub danger_above: u8,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            alert_above: 60,
            danger_above: 80,
        }
    }
}

/// Which reading dimension an alert message blames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertCause {
    Vibration,
    Temperature,
    Moisture,
    Elevated,
}

impl AlertCause {
    /// First matching cause in priority order: vibration, temperature, moisture
    pub fn of(reading: &SensorReading) -> Self {
        if reading.vibration > 0.6 {
            AlertCause::Vibration
        } else if reading.temperature > 30.0 || reading.temperature < 5.0 {
            AlertCause::Temperature
        } else if reading.moisture > 70.0 {
            AlertCause::Moisture
        } else {
            AlertCause::Elevated
        }
    }

    pub fn message(&self, sector: &str) -> String {
        match self {
            AlertCause::Vibration => format!(
                "High vibration levels detected in {} - Potential rockfall risk",
                sector
            ),
            AlertCause::Temperature => format!(
                "Extreme temperature readings in {} - Monitor for structural changes",
                sector
            ),
            AlertCause::Moisture => format!(
                "High moisture levels in {} - Rock stability may be compromised",
                sector
            ),
            AlertCause::Elevated => format!("Elevated risk conditions detected in {}", sector),
        }
    }
}

/// Decides whether an assessment raises an alert
///
/// Alerts are emitted active and are never superseded here; clearing them is
/// left to an external caller of the store.
pub struct AlertGenerator {
    thresholds: AlertThresholds,
    gate: Box<dyn AlertGate>,
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::new(AlertThresholds::default(), Box::new(OpenGate))
    }
}

impl AlertGenerator {
    pub fn new(thresholds: AlertThresholds, gate: Box<dyn AlertGate>) -> Self {
        Self { thresholds, gate }
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    pub fn is_eligible(&self, assessment: &RiskAssessment) -> bool {
        assessment.overall_risk > self.thresholds.alert_above
    }

    pub fn severity_for(&self, overall_risk: u8) -> Severity {
        if overall_risk > self.thresholds.danger_above {
            Severity::Danger
        } else {
            Severity::Caution
        }
    }

    /// Evaluate one reading and its assessment
    ///
    /// # Returns
    ///
    /// A new active alert, or `None` when the assessment is below threshold
    /// or the gate suppressed it
    pub fn evaluate(
        &mut self,
        reading: &SensorReading,
        assessment: &RiskAssessment,
    ) -> Option<Alert> {
        if !self.is_eligible(assessment) {
            return None;
        }

        if !self.gate.admit(assessment) {
            debug!(
                "Alert for {} suppressed by gate (overall risk {})",
                assessment.sector, assessment.overall_risk
            );
            return None;
        }

        let alert_type = self.severity_for(assessment.overall_risk);
        let cause = AlertCause::of(reading);
        let alert = Alert::new(
            alert_type,
            cause.message(&assessment.sector),
            assessment.sector.clone(),
            assessment.timestamp,
        );

        warn!(
            "Raised {} alert for {}: {}",
            alert_type.as_str(),
            alert.sector,
            alert.message
        );
        Some(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::ProbabilisticGate;
    use chrono::Utc;

    fn reading(vibration: f64, temperature: f64, moisture: f64) -> SensorReading {
        SensorReading::new("Sector A", vibration, temperature, moisture)
    }

    fn assess(reading: &SensorReading, sensor_risk: u8, image_risk: u8) -> RiskAssessment {
        RiskAssessment::from_scores(
            reading.sector.clone(),
            sensor_risk,
            image_risk,
            reading.timestamp,
        )
    }

    #[test]
    fn test_overall_61_raises_caution() {
        let mut generator = AlertGenerator::default();
        let r = reading(0.8, 38.0, 85.0);
        let assessment = assess(&r, 100, 22);
        assert_eq!(assessment.overall_risk, 61);

        let alert = generator.evaluate(&r, &assessment).unwrap();
        assert_eq!(alert.alert_type, Severity::Caution);
        assert!(alert.active);
        assert_eq!(alert.sector, "Sector A");
        assert_eq!(alert.timestamp, assessment.timestamp);
    }

    #[test]
    fn test_overall_85_raises_danger() {
        let mut generator = AlertGenerator::default();
        let r = reading(0.8, 38.0, 85.0);
        let assessment = assess(&r, 100, 70);
        assert_eq!(assessment.overall_risk, 85);

        let alert = generator.evaluate(&r, &assessment).unwrap();
        assert_eq!(alert.alert_type, Severity::Danger);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut generator = AlertGenerator::default();
        let r = reading(0.8, 38.0, 85.0);

        let at_sixty = assess(&r, 100, 20);
        assert_eq!(at_sixty.overall_risk, 60);
        assert!(generator.evaluate(&r, &at_sixty).is_none());

        let at_eighty = assess(&r, 100, 60);
        assert_eq!(at_eighty.overall_risk, 80);
        assert_eq!(
            generator.evaluate(&r, &at_eighty).unwrap().alert_type,
            Severity::Caution
        );
    }

    #[test]
    fn test_cause_priority() {
        assert_eq!(AlertCause::of(&reading(0.65, 40.0, 90.0)), AlertCause::Vibration);
        assert_eq!(AlertCause::of(&reading(0.6, 40.0, 90.0)), AlertCause::Temperature);
        assert_eq!(AlertCause::of(&reading(0.6, 4.0, 90.0)), AlertCause::Temperature);
        assert_eq!(AlertCause::of(&reading(0.6, 30.0, 90.0)), AlertCause::Moisture);
        assert_eq!(AlertCause::of(&reading(0.6, 5.0, 70.0)), AlertCause::Elevated);
    }

    #[test]
    fn test_messages_name_the_sector() {
        assert_eq!(
            AlertCause::Vibration.message("Sector B"),
            "High vibration levels detected in Sector B - Potential rockfall risk"
        );
        assert_eq!(
            AlertCause::Elevated.message("Sector C"),
            "Elevated risk conditions detected in Sector C"
        );
    }

    #[test]
    fn test_closed_gate_suppresses_eligible_alert() {
        let gate = ProbabilisticGate::seeded(1, 0.0, 0);
        let mut generator = AlertGenerator::new(AlertThresholds::default(), Box::new(gate));
        let r = reading(0.9, 40.0, 90.0);
        let assessment = assess(&r, 100, 30);

        assert!(generator.is_eligible(&assessment));
        assert!(generator.evaluate(&r, &assessment).is_none());
    }

    #[test]
    fn test_each_eligible_reading_alerts_without_gate() {
        let mut generator = AlertGenerator::default();
        let r = reading(0.9, 40.0, 90.0);
        let now = Utc::now();

        let raised = (0..10)
            .filter_map(|_| {
                let assessment = RiskAssessment::from_scores("Sector A", 100, 30, now);
                generator.evaluate(&r, &assessment)
            })
            .count();
        assert_eq!(raised, 10);
    }
}
