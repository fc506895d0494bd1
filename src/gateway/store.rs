use crate::error::StoreError;
use crate::events::{Alert, RiskAssessment, SensorReading, Timestamp};
use uuid::Uuid;

/// Append-only storage for the three row types
///
/// Every `recent_*` query returns rows ordered by timestamp descending; rows
/// sharing a timestamp come back newest-inserted first. Re-running a query
/// without intervening inserts yields the same rows in the same order.
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send {
    fn insert_reading(&mut self, reading: &SensorReading) -> Result<(), StoreError>;

    fn insert_assessment(&mut self, assessment: &RiskAssessment) -> Result<(), StoreError>;

    fn insert_alert(&mut self, alert: &Alert) -> Result<(), StoreError>;

    fn recent_readings(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError>;

    fn recent_assessments(&self, limit: usize) -> Result<Vec<RiskAssessment>, StoreError>;

    /// Most recent assessment of one sector
    fn latest_assessment_for(&self, sector: &str) -> Result<Option<RiskAssessment>, StoreError>;

    /// Most recent alerts, optionally only those with the given active flag
    fn recent_alerts(&self, limit: usize, active: Option<bool>) -> Result<Vec<Alert>, StoreError>;

    /// Mark an alert inactive; returns whether an active alert was changed
    fn deactivate_alert(&mut self, id: Uuid) -> Result<bool, StoreError>;
}

/// Volatile store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: Vec<SensorReading>,
    assessments: Vec<RiskAssessment>,
    alerts: Vec<Alert>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pick up to `limit` rows by timestamp descending, ties newest-inserted first
fn most_recent<T, K, F>(rows: &[T], limit: usize, timestamp: K, keep: F) -> Vec<T>
where
    T: Clone,
    K: Fn(&T) -> Timestamp,
    F: Fn(&T) -> bool,
{
    let mut picked: Vec<&T> = rows.iter().rev().filter(|row| keep(*row)).collect();
    // stable sort keeps reverse insertion order among equal timestamps
    picked.sort_by(|a, b| timestamp(*b).cmp(&timestamp(*a)));
    picked.into_iter().take(limit).cloned().collect()
}

impl Store for MemoryStore {
    fn insert_reading(&mut self, reading: &SensorReading) -> Result<(), StoreError> {
        self.readings.push(reading.clone());
        Ok(())
    }

    fn insert_assessment(&mut self, assessment: &RiskAssessment) -> Result<(), StoreError> {
        self.assessments.push(assessment.clone());
        Ok(())
    }

    fn insert_alert(&mut self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts.push(alert.clone());
        Ok(())
    }

    fn recent_readings(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError> {
        Ok(most_recent(&self.readings, limit, |r| r.timestamp, |_| true))
    }

    fn recent_assessments(&self, limit: usize) -> Result<Vec<RiskAssessment>, StoreError> {
        Ok(most_recent(&self.assessments, limit, |a| a.timestamp, |_| true))
    }

    fn latest_assessment_for(&self, sector: &str) -> Result<Option<RiskAssessment>, StoreError> {
        Ok(
            most_recent(&self.assessments, 1, |a| a.timestamp, |a| a.sector == sector)
                .into_iter()
                .next(),
        )
    }

    fn recent_alerts(&self, limit: usize, active: Option<bool>) -> Result<Vec<Alert>, StoreError> {
        Ok(most_recent(
            &self.alerts,
            limit,
            |a| a.timestamp,
            |a| active.map_or(true, |flag| a.active == flag),
        ))
    }

    fn deactivate_alert(&mut self, id: Uuid) -> Result<bool, StoreError> {
        match self.alerts.iter_mut().find(|alert| alert.id == id) {
            Some(alert) if alert.active => {
                alert.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Severity;
    use chrono::{Duration, Utc};

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            let reading =
                SensorReading::at(now + Duration::seconds(i), "Sector A", i as f64, 20.0, 50.0);
            store.insert_reading(&reading).unwrap();
        }

        let recent = store.recent_readings(3).unwrap();
        let vibrations: Vec<f64> = recent.iter().map(|r| r.vibration).collect();
        assert_eq!(vibrations, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_out_of_order_timestamps_are_sorted() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let late = SensorReading::at(now, "Sector A", 0.9, 20.0, 50.0);
        let early = SensorReading::at(now - Duration::seconds(5), "Sector A", 0.1, 20.0, 50.0);
        store.insert_reading(&late).unwrap();
        store.insert_reading(&early).unwrap();

        let recent = store.recent_readings(10).unwrap();
        assert_eq!(recent[0].id, late.id);
        assert_eq!(recent[1].id, early.id);
    }

    #[test]
    fn test_equal_timestamps_newest_insert_first() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let first = SensorReading::at(now, "Sector A", 0.1, 20.0, 50.0);
        let second = SensorReading::at(now, "Sector B", 0.2, 20.0, 50.0);
        store.insert_reading(&first).unwrap();
        store.insert_reading(&second).unwrap();

        let recent = store.recent_readings(2).unwrap();
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..8 {
            store
                .insert_reading(&SensorReading::at(now, "Sector C", i as f64, 20.0, 50.0))
                .unwrap();
        }

        assert_eq!(
            store.recent_readings(5).unwrap(),
            store.recent_readings(5).unwrap()
        );
    }

    #[test]
    fn test_alert_active_filter_and_deactivation() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let a = Alert::new(Severity::Caution, "a", "Sector A", now);
        let b = Alert::new(Severity::Danger, "b", "Sector B", now + Duration::seconds(1));
        store.insert_alert(&a).unwrap();
        store.insert_alert(&b).unwrap();

        assert!(store.deactivate_alert(a.id).unwrap());
        assert!(!store.deactivate_alert(a.id).unwrap());
        assert!(!store.deactivate_alert(Uuid::new_v4()).unwrap());

        let active = store.recent_alerts(10, Some(true)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);

        let inactive = store.recent_alerts(10, Some(false)).unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, a.id);

        assert_eq!(store.recent_alerts(10, None).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_assessment_for_sector() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let a1 = RiskAssessment::from_scores("Sector A", 20, 10, now);
        let b1 = RiskAssessment::from_scores("Sector B", 45, 30, now + Duration::seconds(1));
        let a2 = RiskAssessment::from_scores("Sector A", 70, 30, now + Duration::seconds(2));
        for assessment in [&a1, &b1, &a2] {
            store.insert_assessment(assessment).unwrap();
        }

        assert_eq!(store.latest_assessment_for("Sector A").unwrap().unwrap().id, a2.id);
        assert_eq!(store.latest_assessment_for("Sector B").unwrap().unwrap().id, b1.id);
        assert!(store.latest_assessment_for("Sector Z").unwrap().is_none());
        assert_eq!(store.recent_assessments(1).unwrap()[0].id, a2.id);
    }
}
