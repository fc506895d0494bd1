/// Error types for the rockfall monitor
pub mod error;

/// Readings, assessments and alerts
pub mod events;

/// Synthetic sensor readings
pub mod generator;

/// Rolling windows of recent readings
pub mod aggregator;

/// Risk scoring and sensor status
pub mod scoring;

/// Alert thresholds, causes and gating
pub mod alerts;

/// Persistence and publish/subscribe fan-out
pub mod gateway;

/// Ingest and trigger calls
pub mod ingest;

/// Periodic background cycles
pub mod scheduler;

/// Observer state and live hook
pub mod client;

/// Local-only evaluation path
pub mod simulation;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ConfigError, IngestError, StoreError, ValidationError};
pub use events::{Alert, RiskAssessment, RiskLevel, SensorReading, Severity};
