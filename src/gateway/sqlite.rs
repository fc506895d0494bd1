use crate::error::StoreError;
use crate::events::{Alert, RiskAssessment, RiskLevel, SensorReading, Severity, Timestamp};
use crate::gateway::Store;
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sensor_readings (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        sector TEXT NOT NULL,
        vibration REAL NOT NULL,
        temperature REAL NOT NULL,
        moisture REAL NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sensor_readings_timestamp ON sensor_readings(timestamp);

    CREATE TABLE IF NOT EXISTS risk_assessments (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        sensor_risk INTEGER NOT NULL,
        image_risk INTEGER NOT NULL,
        overall_risk INTEGER NOT NULL,
        risk_level TEXT NOT NULL,
        sector TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_risk_assessments_timestamp ON risk_assessments(timestamp);

    CREATE TABLE IF NOT EXISTS alerts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        type TEXT NOT NULL,
        message TEXT NOT NULL,
        sector TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    );
    CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);
";

/// Durable store backed by a SQLite database
pub struct SqliteStore {
    connection: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("connection", &"<SQLite Connection>")
            .finish()
    }
}

impl SqliteStore {
    /// Open or create the database at `path` and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connection = Connection::open(path)?;
        connection.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        info!("Opened SQLite store at {}", path.display());
        Self::with_connection(connection)
    }

    /// Private database that lives as long as the store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self { connection })
    }
}

/// Fixed-width RFC 3339 so lexical order matches chronological order
fn encode_timestamp(timestamp: &Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(table: &'static str, value: &str) -> Result<Timestamp, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            reason: format!("bad timestamp {:?}: {}", value, e),
        })
}

fn decode_id(table: &'static str, value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::CorruptRow {
        table,
        reason: format!("bad id {:?}: {}", value, e),
    })
}

fn decode_score(table: &'static str, value: i64) -> Result<u8, StoreError> {
    u8::try_from(value)
        .ok()
        .filter(|score| *score <= 100)
        .ok_or_else(|| StoreError::CorruptRow {
            table,
            reason: format!("score {} out of range", value),
        })
}

type ReadingRow = (String, String, f64, f64, f64, String);
type AssessmentRow = (String, i64, i64, i64, String, String, String);
type AlertRow = (String, String, String, String, String, bool);

fn reading_from_row(row: ReadingRow) -> Result<SensorReading, StoreError> {
    let (id, sector, vibration, temperature, moisture, timestamp) = row;
    Ok(SensorReading {
        id: decode_id("sensor_readings", &id)?,
        sector,
        vibration,
        temperature,
        moisture,
        timestamp: decode_timestamp("sensor_readings", &timestamp)?,
    })
}

fn assessment_from_row(row: AssessmentRow) -> Result<RiskAssessment, StoreError> {
    const TABLE: &str = "risk_assessments";
    let (id, sensor_risk, image_risk, overall_risk, risk_level, sector, timestamp) = row;
    Ok(RiskAssessment {
        id: decode_id(TABLE, &id)?,
        sensor_risk: decode_score(TABLE, sensor_risk)?,
        image_risk: decode_score(TABLE, image_risk)?,
        overall_risk: decode_score(TABLE, overall_risk)?,
        risk_level: RiskLevel::parse(&risk_level).ok_or_else(|| StoreError::CorruptRow {
            table: TABLE,
            reason: format!("unknown risk level {:?}", risk_level),
        })?,
        sector,
        timestamp: decode_timestamp(TABLE, &timestamp)?,
    })
}

fn alert_from_row(row: AlertRow) -> Result<Alert, StoreError> {
    let (id, alert_type, message, sector, timestamp, active) = row;
    Ok(Alert {
        id: decode_id("alerts", &id)?,
        alert_type: Severity::parse(&alert_type).ok_or_else(|| StoreError::CorruptRow {
            table: "alerts",
            reason: format!("unknown alert type {:?}", alert_type),
        })?,
        message,
        sector,
        timestamp: decode_timestamp("alerts", &timestamp)?,
        active,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl Store for SqliteStore {
    fn insert_reading(&mut self, reading: &SensorReading) -> Result<(), StoreError> {
        self.connection.execute(
            "INSERT INTO sensor_readings (id, sector, vibration, temperature, moisture, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reading.id.to_string(),
                reading.sector,
                reading.vibration,
                reading.temperature,
                reading.moisture,
                encode_timestamp(&reading.timestamp),
            ],
        )?;
        Ok(())
    }

    fn insert_assessment(&mut self, assessment: &RiskAssessment) -> Result<(), StoreError> {
        self.connection.execute(
            "INSERT INTO risk_assessments
                (id, sensor_risk, image_risk, overall_risk, risk_level, sector, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                assessment.id.to_string(),
                i64::from(assessment.sensor_risk),
                i64::from(assessment.image_risk),
                i64::from(assessment.overall_risk),
                assessment.risk_level.as_str(),
                assessment.sector,
                encode_timestamp(&assessment.timestamp),
            ],
        )?;
        Ok(())
    }

    fn insert_alert(&mut self, alert: &Alert) -> Result<(), StoreError> {
        self.connection.execute(
            "INSERT INTO alerts (id, type, message, sector, timestamp, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                alert.id.to_string(),
                alert.alert_type.as_str(),
                alert.message,
                alert.sector,
                encode_timestamp(&alert.timestamp),
                alert.active,
            ],
        )?;
        Ok(())
    }

    fn recent_readings(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT id, sector, vibration, temperature, moisture, timestamp
             FROM sensor_readings ORDER BY timestamp DESC, seq DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map::<ReadingRow, _, _>([sql_limit(limit)], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(reading_from_row(row?)?);
        }
        Ok(results)
    }

    fn recent_assessments(&self, limit: usize) -> Result<Vec<RiskAssessment>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT id, sensor_risk, image_risk, overall_risk, risk_level, sector, timestamp
             FROM risk_assessments ORDER BY timestamp DESC, seq DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map::<AssessmentRow, _, _>([sql_limit(limit)], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(assessment_from_row(row?)?);
        }
        Ok(results)
    }

    fn latest_assessment_for(&self, sector: &str) -> Result<Option<RiskAssessment>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT id, sensor_risk, image_risk, overall_risk, risk_level, sector, timestamp
             FROM risk_assessments WHERE sector = ?1
             ORDER BY timestamp DESC, seq DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map::<AssessmentRow, _, _>([sector], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;

        let latest = match rows.next() {
            Some(row) => Some(assessment_from_row(row?)?),
            None => None,
        };
        Ok(latest)
    }

    fn recent_alerts(&self, limit: usize, active: Option<bool>) -> Result<Vec<Alert>, StoreError> {
        let mut stmt = self.connection.prepare(
            "SELECT id, type, message, sector, timestamp, is_active
             FROM alerts WHERE (?1 IS NULL OR is_active = ?1)
             ORDER BY timestamp DESC, seq DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map::<AlertRow, _, _>(params![active, sql_limit(limit)], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(alert_from_row(row?)?);
        }
        Ok(results)
    }

    fn deactivate_alert(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let changed = self.connection.execute(
            "UPDATE alerts SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            [id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("pitwatch.db")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_reading_round_trip() {
        let (_dir, mut store) = setup_test_store();
        let reading = SensorReading::new("Sector A", 0.412, 27.35, 55.1);
        store.insert_reading(&reading).unwrap();

        let rows = store.recent_readings(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, reading.id);
        assert_eq!(rows[0].sector, "Sector A");
        assert_eq!(rows[0].vibration, 0.412);
        assert_eq!(rows[0].temperature, 27.35);
        assert_eq!(rows[0].moisture, 55.1);
        assert_eq!(
            encode_timestamp(&rows[0].timestamp),
            encode_timestamp(&reading.timestamp)
        );
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("pitwatch.db");
        let assessment = RiskAssessment::from_scores("Sector B", 45, 20, Utc::now());

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_assessment(&assessment).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let latest = store.latest_assessment_for("Sector B").unwrap().unwrap();
        assert_eq!(latest.id, assessment.id);
        assert_eq!(latest.overall_risk, 33);
        assert_eq!(latest.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_recent_order_and_limit() {
        let (_dir, mut store) = setup_test_store();
        let now = Utc::now();

        let mut ids = Vec::new();
        for i in 0..6 {
            let reading =
                SensorReading::at(now + Duration::seconds(i), "Sector C", 0.3, 20.0, 50.0);
            ids.push(reading.id);
            store.insert_reading(&reading).unwrap();
        }
        // same timestamp as the newest, inserted later
        let tie = SensorReading::at(now + Duration::seconds(5), "Sector A", 0.3, 20.0, 50.0);
        store.insert_reading(&tie).unwrap();

        let recent: Vec<Uuid> = store
            .recent_readings(3)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(recent, vec![tie.id, ids[5], ids[4]]);
        assert_eq!(
            store.recent_readings(3).unwrap(),
            store.recent_readings(3).unwrap()
        );
    }

    #[test]
    fn test_alert_filter_and_deactivate() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let old = Alert::new(Severity::Caution, "old", "Sector A", now);
        let new = Alert::new(Severity::Danger, "new", "Sector A", now + Duration::seconds(1));
        store.insert_alert(&old).unwrap();
        store.insert_alert(&new).unwrap();

        assert!(store.deactivate_alert(old.id).unwrap());
        assert!(!store.deactivate_alert(old.id).unwrap());

        let active = store.recent_alerts(10, Some(true)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, new.id);
        assert_eq!(active[0].alert_type, Severity::Danger);
        assert!(active[0].active);

        let all = store.recent_alerts(10, None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[1].active);
    }

    #[test]
    fn test_corrupt_level_is_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection
            .execute(
                "INSERT INTO risk_assessments
                    (id, sensor_risk, image_risk, overall_risk, risk_level, sector, timestamp)
                 VALUES (?1, 10, 10, 10, 'EXTREME', 'Sector A', ?2)",
                params![Uuid::new_v4().to_string(), encode_timestamp(&Utc::now())],
            )
            .unwrap();

        match store.recent_assessments(1) {
            Err(StoreError::CorruptRow { table, .. }) => assert_eq!(table, "risk_assessments"),
            other => panic!("expected corrupt row, got {:?}", other),
        }
    }
}
