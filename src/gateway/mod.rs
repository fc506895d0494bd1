//! Persistence and live fan-out
//!
//! The gateway couples a [`Store`] with an [`EventBus`]: every insert is
//! persisted first and then published to the topic of its row type. A single
//! write lock spans both steps, so subscribers observe rows of one topic in
//! insertion order and a client holding [`Gateway::quiesced`] can fetch a
//! snapshot and subscribe without missing or double-counting a row.

pub mod bus;
pub mod sqlite;
pub mod store;

pub use bus::{EventBus, Handler, Row, RowEvent, Subscription, Topic};
pub use sqlite::SqliteStore;
pub use store::{MemoryStore, Store};

#[cfg(test)]
pub use store::MockStore;

use crate::error::StoreError;
use crate::events::{Alert, RiskAssessment, SensorReading};
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub struct Gateway {
    store: Mutex<Box<dyn Store>>,
    bus: EventBus,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self {
            store: Mutex::new(store),
            bus: EventBus::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Gateway over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn store(&self) -> Result<MutexGuard<'_, Box<dyn Store>>, StoreError> {
        self.store.lock().map_err(|_| {
            error!("Store lock poisoned by an earlier panic");
            StoreError::Unavailable("store lock poisoned".to_string())
        })
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `row` with `insert`, then publish it while still holding the
    /// write lock
    fn persist_and_publish<T, F>(&self, row: &T, insert: F) -> Result<(), StoreError>
    where
        T: Row,
        F: FnOnce(&mut dyn Store, &T) -> Result<(), StoreError>,
    {
        let _writer = self.writer();
        {
            let mut store = self.store()?;
            insert(&mut **store, row)?;
        }
        let delivered = self.bus.publish(&row.clone().into_event());
        debug!("Published {} row to {} subscriber(s)", T::TOPIC, delivered);
        Ok(())
    }

    pub fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        self.persist_and_publish(reading, |store, row| store.insert_reading(row))
    }

    pub fn insert_assessment(&self, assessment: &RiskAssessment) -> Result<(), StoreError> {
        self.persist_and_publish(assessment, |store, row| store.insert_assessment(row))
    }

    pub fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.persist_and_publish(alert, |store, row| store.insert_alert(row))
    }

    pub fn recent_readings(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError> {
        self.store()?.recent_readings(limit)
    }

    pub fn recent_assessments(&self, limit: usize) -> Result<Vec<RiskAssessment>, StoreError> {
        self.store()?.recent_assessments(limit)
    }

    /// Most recent assessment across all sectors
    pub fn latest_assessment(&self) -> Result<Option<RiskAssessment>, StoreError> {
        Ok(self.store()?.recent_assessments(1)?.into_iter().next())
    }

    pub fn latest_assessment_for(&self, sector: &str) -> Result<Option<RiskAssessment>, StoreError> {
        self.store()?.latest_assessment_for(sector)
    }

    pub fn recent_alerts(&self, limit: usize, active: Option<bool>) -> Result<Vec<Alert>, StoreError> {
        self.store()?.recent_alerts(limit, active)
    }

    /// Clear an alert's active flag
    ///
    /// This is the only way an alert becomes inactive; nothing is published.
    pub fn deactivate_alert(&self, id: Uuid) -> Result<bool, StoreError> {
        let _writer = self.writer();
        let changed = self.store()?.deactivate_alert(id)?;
        if changed {
            debug!("Deactivated alert {}", id);
        }
        Ok(changed)
    }

    /// Subscribe to inserts of one row type
    pub fn subscribe<T, F>(&self, on_insert: F) -> Subscription
    where
        T: Row,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.bus.subscribe(
            T::TOPIC,
            Arc::new(move |event: &RowEvent| {
                if let Some(row) = T::from_event(event) {
                    on_insert(row);
                }
            }),
        )
    }

    /// Run `f` with no insert in progress and none able to start
    ///
    /// `f` must not insert through this gateway.
    pub fn quiesced<R>(&self, f: impl FnOnce(&Gateway) -> R) -> R {
        let _writer = self.writer();
        f(self)
    }

    /// Disconnect every subscriber; the store stays readable
    pub fn close(&self) {
        let _writer = self.writer();
        self.bus.close();
    }
}
