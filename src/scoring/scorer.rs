//! Rule-based risk scoring
//!
//! Each sensor dimension contributes an independent step score and the sum
//! is capped at 100, so no single dimension dominates while combined
//! extremes still saturate.

use crate::aggregator::{RollingWindow, DEFAULT_SMOOTHING_WINDOW};
use crate::events::{RiskAssessment, SensorReading};

/// Vibration step score: `>0.7 → 40, >0.5 → 25, >0.3 → 15, else 5`
pub fn vibration_contribution(vibration: f64) -> u8 {
    if vibration > 0.7 {
        40
    } else if vibration > 0.5 {
        25
    } else if vibration > 0.3 {
        15
    } else {
        5
    }
}

/// Temperature step score: `>35 or <0 → 30, >30 or <5 → 15, else 5`
pub fn temperature_contribution(temperature: f64) -> u8 {
    if temperature > 35.0 || temperature < 0.0 {
        30
    } else if temperature > 30.0 || temperature < 5.0 {
        15
    } else {
        5
    }
}

/// Moisture step score: `>80 → 30, >60 → 15, else 5`
pub fn moisture_contribution(moisture: f64) -> u8 {
    if moisture > 80.0 {
        30
    } else if moisture > 60.0 {
        15
    } else {
        5
    }
}

/// Per-dimension contributions and their capped total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRiskBreakdown {
    pub vibration: u8,
    pub temperature: u8,
    pub moisture: u8,
    pub total: u8,
}

pub fn breakdown(vibration: f64, temperature: f64, moisture: f64) -> SensorRiskBreakdown {
    let vibration = vibration_contribution(vibration);
    let temperature = temperature_contribution(temperature);
    let moisture = moisture_contribution(moisture);
    let total = (u16::from(vibration) + u16::from(temperature) + u16::from(moisture)).min(100) as u8;

    SensorRiskBreakdown {
        vibration,
        temperature,
        moisture,
        total,
    }
}

/// Sensor risk of a single reading, in `[5, 100]`
pub fn score(vibration: f64, temperature: f64, moisture: f64) -> u8 {
    breakdown(vibration, temperature, moisture).total
}

/// Sensor risk from a smoothed vibration mean: `clamp(round(mean * 100), 0, 100)`
pub fn moving_average_risk(mean_vibration: f64) -> u8 {
    (mean_vibration * 100.0).round().clamp(0.0, 100.0) as u8
}

/// How sensor risk is derived from readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    /// Step scoring of the instantaneous reading
    Step,
    /// Mean vibration over the last `window` readings of the stream
    MovingAverage { window: usize },
}

impl Default for ScoringMode {
    fn default() -> Self {
        ScoringMode::Step
    }
}

impl ScoringMode {
    pub fn moving_average() -> Self {
        ScoringMode::MovingAverage {
            window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Turns readings into risk assessments
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    mode: ScoringMode,
}

impl RiskScorer {
    pub fn new(mode: ScoringMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    /// Sensor risk for `reading`
    ///
    /// `history` is the reading's stream window, already containing
    /// `reading`. Moving-average mode falls back to the reading's own
    /// vibration when no history is supplied.
    pub fn sensor_risk(
        &self,
        reading: &SensorReading,
        history: Option<&RollingWindow<SensorReading>>,
    ) -> u8 {
        match self.mode {
            ScoringMode::Step => score(reading.vibration, reading.temperature, reading.moisture),
            ScoringMode::MovingAverage { window } => {
                let mean = history
                    .and_then(|h| h.mean_of(window, |r| r.vibration))
                    .unwrap_or(reading.vibration);
                moving_average_risk(mean)
            }
        }
    }

    /// Full assessment for `reading` given an image risk value
    pub fn assess(
        &self,
        reading: &SensorReading,
        history: Option<&RollingWindow<SensorReading>>,
        image_risk: u8,
    ) -> RiskAssessment {
        let sensor_risk = self.sensor_risk(reading, history);
        RiskAssessment::from_scores(
            reading.sector.clone(),
            sensor_risk,
            image_risk,
            reading.timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RiskLevel;
    use chrono::Utc;

    #[test]
    fn test_reference_reading() {
        // 40 (vibration > 0.7) + 5 + 5
        assert_eq!(score(0.8, 22.0, 50.0), 50);
    }

    #[test]
    fn test_step_boundaries_are_exclusive() {
        assert_eq!(vibration_contribution(0.7), 25);
        assert_eq!(vibration_contribution(0.71), 40);
        assert_eq!(vibration_contribution(0.5), 15);
        assert_eq!(vibration_contribution(0.3), 5);

        assert_eq!(temperature_contribution(35.0), 15);
        assert_eq!(temperature_contribution(35.1), 30);
        assert_eq!(temperature_contribution(30.0), 5);
        assert_eq!(temperature_contribution(5.0), 5);
        assert_eq!(temperature_contribution(4.9), 15);
        assert_eq!(temperature_contribution(0.0), 15);
        assert_eq!(temperature_contribution(-0.1), 30);

        assert_eq!(moisture_contribution(80.0), 15);
        assert_eq!(moisture_contribution(80.5), 30);
        assert_eq!(moisture_contribution(60.0), 5);
    }

    #[test]
    fn test_extremes_sum() {
        let worst = breakdown(1.2, 40.0, 95.0);
        assert_eq!(worst.vibration, 40);
        assert_eq!(worst.temperature, 30);
        assert_eq!(worst.moisture, 30);
        assert_eq!(worst.total, 100);

        assert_eq!(score(0.1, 20.0, 30.0), 15);
    }

    #[test]
    fn test_moving_average_risk_clamps() {
        assert_eq!(moving_average_risk(0.456), 46);
        assert_eq!(moving_average_risk(1.7), 100);
        assert_eq!(moving_average_risk(-0.2), 0);
    }

    #[test]
    fn test_moving_average_mode_uses_window() {
        let now = Utc::now();
        let mut history = RollingWindow::new(21);
        for vibration in [0.9, 0.3, 0.4, 0.5, 0.6, 0.7] {
            history.push(SensorReading::at(now, "Sector A", vibration, 25.0, 50.0));
        }
        let latest = history.latest().unwrap().clone();

        let scorer = RiskScorer::new(ScoringMode::moving_average());
        assert_eq!(scorer.sensor_risk(&latest, Some(&history)), 50);
        assert_eq!(scorer.sensor_risk(&latest, None), 70);
    }

    #[test]
    fn test_assess_with_fixed_image_risk() {
        let scorer = RiskScorer::default();
        let reading = SensorReading::new("Sector B", 0.8, 38.0, 85.0);

        let assessment = scorer.assess(&reading, None, 22);
        assert_eq!(assessment.sensor_risk, 100);
        assert_eq!(assessment.image_risk, 22);
        assert_eq!(assessment.overall_risk, 61);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.sector, "Sector B");
        assert_eq!(assessment.timestamp, reading.timestamp);
    }
}
