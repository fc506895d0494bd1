//! Observer-side dashboard state
//!
//! [`DashboardState`] is a plain reducer: every change goes through
//! [`DashboardState::apply`], and presentation only ever sees a cloned
//! [`DashboardSnapshot`].

use crate::events::{Alert, RiskAssessment, RiskLevel, SensorReading, Severity, Timestamp};
use crate::scoring::{system_status, SensorStatus};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Readings kept per observer
pub const READING_BUFFER: usize = 50;

/// Alerts kept per observer
pub const ALERT_BUFFER: usize = 10;

/// Local wall-clock `HH:MM:SS`
pub fn display_time(timestamp: &Timestamp) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// A reading as shown to an observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingView {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub time: String,
}

impl From<SensorReading> for ReadingView {
    fn from(reading: SensorReading) -> Self {
        let time = display_time(&reading.timestamp);
        Self { reading, time }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub time: String,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        let time = display_time(&alert.timestamp);
        Self { alert, time }
    }
}

/// Latest risk figures; all zero and `LOW` before the first assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub sensor_risk: u8,
    pub image_risk: u8,
    pub overall_risk: u8,
    pub risk_level: RiskLevel,
    pub sector: Option<String>,
    pub time: Option<String>,
}

impl Default for RiskSnapshot {
    fn default() -> Self {
        Self {
            sensor_risk: 0,
            image_risk: 0,
            overall_risk: 0,
            risk_level: RiskLevel::Low,
            sector: None,
            time: None,
        }
    }
}

impl From<&RiskAssessment> for RiskSnapshot {
    fn from(assessment: &RiskAssessment) -> Self {
        Self {
            sensor_risk: assessment.sensor_risk,
            image_risk: assessment.image_risk,
            overall_risk: assessment.overall_risk,
            risk_level: assessment.risk_level,
            sector: Some(assessment.sector.clone()),
            time: Some(display_time(&assessment.timestamp)),
        }
    }
}

/// Result of the activation bulk fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialData {
    /// Newest first
    pub readings: Vec<SensorReading>,
    /// Newest first
    pub alerts: Vec<Alert>,
    pub risk: Option<RiskAssessment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardAction {
    AppendReading(SensorReading),
    AppendAlert(Alert),
    ReplaceRisk(RiskAssessment),
    Loaded(InitialData),
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    readings: VecDeque<ReadingView>,
    alerts: VecDeque<AlertView>,
    risk: RiskSnapshot,
    loading: bool,
    reading_capacity: usize,
    alert_capacity: usize,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(READING_BUFFER, ALERT_BUFFER)
    }
}

impl DashboardState {
    pub fn new(reading_capacity: usize, alert_capacity: usize) -> Self {
        let reading_capacity = reading_capacity.max(1);
        let alert_capacity = alert_capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(reading_capacity),
            alerts: VecDeque::with_capacity(alert_capacity),
            risk: RiskSnapshot::default(),
            loading: true,
            reading_capacity,
            alert_capacity,
        }
    }

    pub fn apply(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::AppendReading(reading) => {
                self.readings.push_front(reading.into());
                self.readings.truncate(self.reading_capacity);
            }
            DashboardAction::AppendAlert(alert) => {
                self.alerts.push_front(alert.into());
                self.alerts.truncate(self.alert_capacity);
            }
            DashboardAction::ReplaceRisk(assessment) => {
                self.risk = RiskSnapshot::from(&assessment);
            }
            DashboardAction::Loaded(data) => {
                self.readings = data
                    .readings
                    .into_iter()
                    .take(self.reading_capacity)
                    .map(ReadingView::from)
                    .collect();
                self.alerts = data
                    .alerts
                    .into_iter()
                    .take(self.alert_capacity)
                    .map(AlertView::from)
                    .collect();
                self.risk = data
                    .risk
                    .as_ref()
                    .map(RiskSnapshot::from)
                    .unwrap_or_default();
                self.loading = false;
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Newest reading
    pub fn latest_reading(&self) -> Option<&SensorReading> {
        self.readings.front().map(|view| &view.reading)
    }

    pub fn snapshot(&self, stale: bool) -> DashboardSnapshot {
        DashboardSnapshot {
            readings: self.readings.iter().cloned().collect(),
            alerts: self.alerts.iter().cloned().collect(),
            risk: self.risk.clone(),
            sensor_status: self.latest_reading().map(SensorStatus::of),
            system_status: system_status(self.risk.risk_level),
            loading: self.loading,
            stale,
        }
    }
}

/// Immutable copy of observer state handed to presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Newest first
    pub readings: Vec<ReadingView>,
    /// Newest first
    pub alerts: Vec<AlertView>,
    pub risk: RiskSnapshot,
    /// Status of the newest reading
    pub sensor_status: Option<SensorStatus>,
    pub system_status: Severity,
    pub loading: bool,
    /// Live updates have stopped; data is last-known
    pub stale: bool,
}
