//! Fully local evaluation path
//!
//! The local simulator never touches the gateway. It keeps one history
//! window seeded with 21 readings at 30 second spacing, scores every new
//! reading by the moving average of recent vibration, and raises alerts only
//! through the probabilistic gate.

use crate::aggregator::RollingWindow;
use crate::alerts::{AlertGenerator, ProbabilisticGate};
use crate::client::state::{DashboardAction, DashboardSnapshot, DashboardState, InitialData};
use crate::config::Config;
use crate::events::{Alert, RiskAssessment, SensorReading, Severity, DEFAULT_SECTORS};
use crate::generator::{GeneratorProfile, ReadingGenerator};
use crate::scoring::{
    ImageRiskSource, RiskScorer, ScoringMode, SyntheticImageRisk, LOCAL_IMAGE_RISK,
};
use chrono::{Duration, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Readings in the seeded history window
pub const LOCAL_HISTORY: usize = 21;

/// Spacing of the seeded history, in seconds
pub const LOCAL_HISTORY_SPACING_SECS: i64 = 30;

/// Calmer ranges used for the seeded history
fn history_profile() -> GeneratorProfile {
    GeneratorProfile {
        vibration: 0.2..0.5,
        temperature: 22.0..30.0,
        moisture: 45.0..65.0,
    }
}

/// Rows produced by one local tick
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTick {
    pub reading: SensorReading,
    pub assessment: RiskAssessment,
    pub alert: Option<Alert>,
}

pub struct LocalSimulator {
    history: RollingWindow<SensorReading>,
    generator: ReadingGenerator,
    scorer: RiskScorer,
    image_risk: Box<dyn ImageRiskSource>,
    alerts: AlertGenerator,
    sectors: Vec<String>,
    sector_rng: StdRng,
    state: DashboardState,
}

impl LocalSimulator {
    /// Simulator seeded from `config.simulation.seed`, or from entropy
    pub fn new(config: &Config) -> Self {
        let seed = config
            .simulation
            .seed
            .unwrap_or_else(|| StdRng::from_entropy().gen());
        Self::seeded(seed, config)
    }

    pub fn seeded(seed: u64, config: &Config) -> Self {
        let mut sector_rng = StdRng::seed_from_u64(seed);
        let sectors = if config.simulation.sectors.is_empty() {
            DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect()
        } else {
            config.simulation.sectors.clone()
        };

        let mut seeder = ReadingGenerator::seeded(seed.wrapping_add(1), history_profile());
        let now = Utc::now();
        let history = RollingWindow::seeded((0..LOCAL_HISTORY).map(|i| {
            let age = (LOCAL_HISTORY - 1 - i) as i64 * LOCAL_HISTORY_SPACING_SECS;
            let sector = pick(&mut sector_rng, &sectors);
            seeder.generate_at(&sector, now - Duration::seconds(age))
        }));

        let gate = ProbabilisticGate::seeded(
            seed.wrapping_add(3),
            config.alerts.gate_probability,
            config.alerts.gate_sensor_risk,
        );

        let mut state = DashboardState::new(LOCAL_HISTORY, config.client.alert_buffer);
        state.apply(DashboardAction::Loaded(InitialData {
            readings: history.iter().rev().cloned().collect(),
            alerts: initial_alerts(&sectors),
            risk: Some(RiskAssessment::from_scores(sectors[0].clone(), 23, 15, now)),
        }));

        Self {
            history,
            generator: ReadingGenerator::seeded(seed.wrapping_add(2), GeneratorProfile::live()),
            scorer: RiskScorer::new(ScoringMode::MovingAverage {
                window: config.scoring.window,
            }),
            image_risk: Box::new(SyntheticImageRisk::seeded(
                seed.wrapping_add(4),
                LOCAL_IMAGE_RISK,
            )),
            alerts: AlertGenerator::new(config.alerts.thresholds(), Box::new(gate)),
            sectors,
            sector_rng,
            state,
        }
    }

    pub fn with_alert_generator(mut self, alerts: AlertGenerator) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_image_risk(mut self, source: Box<dyn ImageRiskSource>) -> Self {
        self.image_risk = source;
        self
    }

    pub fn history(&self) -> &RollingWindow<SensorReading> {
        &self.history
    }

    /// Generate, score and possibly alert on one new reading
    pub fn tick(&mut self) -> LocalTick {
        let sector = pick(&mut self.sector_rng, &self.sectors);
        let reading = self.generator.generate(&sector);
        self.history.push(reading.clone());

        let image_risk = self.image_risk.next_risk(&sector);
        let assessment = self.scorer.assess(&reading, Some(&self.history), image_risk);
        let alert = self.alerts.evaluate(&reading, &assessment);
        debug!(
            "Local tick {}: vibration {} sensor {} overall {}",
            sector, reading.vibration, assessment.sensor_risk, assessment.overall_risk
        );

        self.state
            .apply(DashboardAction::AppendReading(reading.clone()));
        self.state
            .apply(DashboardAction::ReplaceRisk(assessment.clone()));
        if let Some(alert) = &alert {
            self.state.apply(DashboardAction::AppendAlert(alert.clone()));
        }

        LocalTick {
            reading,
            assessment,
            alert,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.snapshot(false)
    }
}

fn pick(rng: &mut StdRng, sectors: &[String]) -> String {
    sectors[rng.gen_range(0..sectors.len())].clone()
}

fn initial_alerts(sectors: &[String]) -> Vec<Alert> {
    let now = Utc::now();
    let last = &sectors[sectors.len() - 1];
    vec![
        Alert::new(
            Severity::Safe,
            "All sensors operating within normal parameters",
            sectors[0].clone(),
            now,
        ),
        Alert::new(
            Severity::Caution,
            "Minor vibration increase detected in monitoring zone",
            last.clone(),
            now - Duration::minutes(15),
        ),
    ]
}
