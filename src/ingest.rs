//! Ingest and trigger calls of the persisted pipeline
//!
//! An [`Ingestor`] owns every stateful stage between raw input and the
//! gateway: per-sector history for smoothing, the image-risk source, the
//! alert generator and the reading generator used by [`Ingestor::trigger`].

use crate::aggregator::ReadingAggregator;
use crate::alerts::{AlertGenerator, OpenGate};
use crate::config::Config;
use crate::error::{IngestError, StoreError, ValidationError};
use crate::events::{Alert, RiskAssessment, SensorReading, DEFAULT_SECTORS};
use crate::gateway::Gateway;
use crate::generator::{GeneratorProfile, ReadingGenerator};
use crate::scoring::{ImageRiskSource, RiskScorer, SyntheticImageRisk, PERSISTED_IMAGE_RISK};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One entry of an ingest batch, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub sector: Option<String>,
    pub vibration: Option<f64>,
    pub temperature: Option<f64>,
    pub moisture: Option<f64>,
}

impl RawReading {
    pub fn new(sector: impl Into<String>, vibration: f64, temperature: f64, moisture: f64) -> Self {
        Self {
            sector: Some(sector.into()),
            vibration: Some(vibration),
            temperature: Some(temperature),
            moisture: Some(moisture),
        }
    }

    /// Check every field and stamp a new reading
    pub fn validate(&self, index: usize) -> Result<SensorReading, ValidationError> {
        let sector = match self.sector.as_deref().map(str::trim) {
            None => return Err(ValidationError::new(index, "missing field `sector`")),
            Some("") => return Err(ValidationError::new(index, "empty `sector`")),
            Some(sector) => sector,
        };
        let vibration = finite(index, "vibration", self.vibration)?;
        let temperature = finite(index, "temperature", self.temperature)?;
        let moisture = finite(index, "moisture", self.moisture)?;

        Ok(SensorReading::new(sector, vibration, temperature, moisture))
    }
}

fn finite(index: usize, field: &str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::new(index, format!("missing field `{}`", field))),
        Some(v) if !v.is_finite() => Err(ValidationError::new(
            index,
            format!("`{}` is not a finite number", field),
        )),
        Some(v) => Ok(v),
    }
}

impl From<&SensorReading> for RawReading {
    fn from(reading: &SensorReading) -> Self {
        Self::new(
            reading.sector.clone(),
            reading.vibration,
            reading.temperature,
            reading.moisture,
        )
    }
}

/// Body of an ingest call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub sensor_data: Vec<RawReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    /// The generated batch, as forwarded to ingest
    pub data: Vec<RawReading>,
}

/// Rows written for one ingested reading
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedReading {
    pub reading: SensorReading,
    pub assessment: RiskAssessment,
    pub alert: Option<Alert>,
}

pub struct Ingestor {
    gateway: Arc<Gateway>,
    scorer: RiskScorer,
    history: ReadingAggregator,
    image_risk: Box<dyn ImageRiskSource>,
    alerts: AlertGenerator,
    generator: ReadingGenerator,
    sectors: Vec<String>,
}

impl Ingestor {
    /// Ingestor with default scoring and thresholds and entropy-seeded sources
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            scorer: RiskScorer::default(),
            history: ReadingAggregator::default(),
            image_risk: Box::new(SyntheticImageRisk::from_entropy(PERSISTED_IMAGE_RISK)),
            alerts: AlertGenerator::default(),
            generator: ReadingGenerator::from_entropy(GeneratorProfile::base()),
            sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(gateway: Arc<Gateway>, config: &Config) -> Self {
        let (generator, image_risk) = match config.simulation.seed {
            Some(seed) => (
                ReadingGenerator::seeded(seed, GeneratorProfile::base()),
                SyntheticImageRisk::seeded(seed.wrapping_add(1), PERSISTED_IMAGE_RISK),
            ),
            None => (
                ReadingGenerator::from_entropy(GeneratorProfile::base()),
                SyntheticImageRisk::from_entropy(PERSISTED_IMAGE_RISK),
            ),
        };

        Self {
            gateway,
            scorer: RiskScorer::new(config.scoring.scoring_mode()),
            history: ReadingAggregator::new(config.scoring.window),
            image_risk: Box::new(image_risk),
            alerts: AlertGenerator::new(config.alerts.thresholds(), Box::new(OpenGate)),
            generator,
            sectors: config.simulation.sectors.clone(),
        }
    }

    pub fn with_image_risk(mut self, source: Box<dyn ImageRiskSource>) -> Self {
        self.image_risk = source;
        self
    }

    pub fn with_generator(mut self, generator: ReadingGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_alert_generator(mut self, alerts: AlertGenerator) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_sectors(mut self, sectors: Vec<String>) -> Self {
        self.sectors = sectors;
        self
    }

    pub fn sectors(&self) -> &[String] {
        &self.sectors
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Score and persist a batch of raw readings
    ///
    /// The whole batch is validated before anything is written. A storage
    /// failure stops the loop; items already written stay written.
    pub fn ingest(&mut self, batch: &[RawReading]) -> Result<IngestResponse, IngestError> {
        let readings = batch
            .iter()
            .enumerate()
            .map(|(index, raw)| raw.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut alerts = 0;
        for (index, reading) in readings.into_iter().enumerate() {
            let processed = self.process(reading).map_err(|e| {
                error!("Ingest stopped at index {}: {}", index, e);
                e
            })?;
            if processed.alert.is_some() {
                alerts += 1;
            }
        }

        info!(
            "Processed {} reading(s), raised {} alert(s)",
            batch.len(),
            alerts
        );
        Ok(IngestResponse {
            success: true,
            message: "Sensor data processed successfully".to_string(),
        })
    }

    /// Persist one validated reading, its assessment and any alert, in that
    /// order
    pub fn process(&mut self, reading: SensorReading) -> Result<ProcessedReading, StoreError> {
        self.gateway.insert_reading(&reading)?;

        let image_risk = self.image_risk.next_risk(&reading.sector);
        let window = self.history.add(reading.clone());
        let assessment = self.scorer.assess(&reading, Some(window), image_risk);
        self.gateway.insert_assessment(&assessment)?;
        debug!(
            "{}: sensor {} image {} overall {} ({})",
            assessment.sector,
            assessment.sensor_risk,
            assessment.image_risk,
            assessment.overall_risk,
            assessment.risk_level.as_str()
        );

        let alert = self.alerts.evaluate(&reading, &assessment);
        if let Some(alert) = &alert {
            self.gateway.insert_alert(alert)?;
        }

        Ok(ProcessedReading {
            reading,
            assessment,
            alert,
        })
    }

    /// Generate one reading per configured sector and ingest the batch
    pub fn trigger(&mut self) -> Result<TriggerResponse, IngestError> {
        let data: Vec<RawReading> = self
            .generator
            .generate_batch(&self.sectors)
            .iter()
            .map(RawReading::from)
            .collect();

        self.ingest(&data)?;
        Ok(TriggerResponse {
            success: true,
            message: "Sensor data simulated and processed".to_string(),
            data,
        })
    }
}
