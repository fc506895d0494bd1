use crate::client::state::{DashboardAction, DashboardSnapshot, DashboardState, InitialData};
use crate::config::ClientConfig;
use crate::error::StoreError;
use crate::events::{Alert, RiskAssessment, SensorReading};
use crate::gateway::{Gateway, Subscription};
use crate::scheduler::PeriodicTrigger;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Buffer sizes for one observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookOptions {
    pub reading_buffer: usize,
    pub alert_buffer: usize,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for HookOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            reading_buffer: config.reading_buffer,
            alert_buffer: config.alert_buffer,
        }
    }
}

type SharedState = Arc<Mutex<DashboardState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Live observer of the gateway
///
/// Activation bulk-loads recent rows and subscribes to all three topics in
/// one quiesced section, so no row is missed or seen twice. The hook owns
/// its subscriptions and, optionally, the periodic trigger feeding the
/// gateway; all of them stop together.
pub struct ClientHook {
    state: SharedState,
    subscriptions: Vec<Subscription>,
    trigger: Option<PeriodicTrigger>,
    stale_reported: AtomicBool,
}

impl std::fmt::Debug for ClientHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHook")
            .field("subscriptions", &self.subscriptions)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl ClientHook {
    pub fn activate(
        gateway: &Gateway,
        options: HookOptions,
        trigger: Option<PeriodicTrigger>,
    ) -> Self {
        let state: SharedState = Arc::new(Mutex::new(DashboardState::new(
            options.reading_buffer,
            options.alert_buffer,
        )));

        let subscriptions = gateway.quiesced(|gateway| {
            let initial = match fetch_initial(gateway, options) {
                Ok(data) => {
                    info!(
                        "Loaded {} reading(s) and {} active alert(s)",
                        data.readings.len(),
                        data.alerts.len()
                    );
                    data
                }
                Err(e) => {
                    error!("Initial fetch failed, starting empty: {}", e);
                    InitialData::default()
                }
            };
            lock(&state).apply(DashboardAction::Loaded(initial));

            let readings = Arc::clone(&state);
            let alerts = Arc::clone(&state);
            let risk = Arc::clone(&state);
            vec![
                gateway.subscribe::<SensorReading, _>(move |reading| {
                    lock(&readings).apply(DashboardAction::AppendReading(reading.clone()));
                }),
                gateway.subscribe::<Alert, _>(move |alert| {
                    lock(&alerts).apply(DashboardAction::AppendAlert(alert.clone()));
                }),
                gateway.subscribe::<RiskAssessment, _>(move |assessment| {
                    lock(&risk).apply(DashboardAction::ReplaceRisk(assessment.clone()));
                }),
            ]
        });

        Self {
            state,
            subscriptions,
            trigger,
            stale_reported: AtomicBool::new(false),
        }
    }

    /// True once any channel has disconnected
    pub fn is_stale(&self) -> bool {
        self.subscriptions.iter().any(|sub| !sub.is_connected())
    }

    /// Copy of the current state; last-known data when stale
    pub fn snapshot(&self) -> DashboardSnapshot {
        let stale = self.is_stale();
        if stale && !self.stale_reported.swap(true, Ordering::Relaxed) {
            warn!("Live updates disconnected; serving last-known data");
        }
        lock(&self.state).snapshot(stale)
    }

    /// Unsubscribe every channel and cancel the trigger
    pub fn deactivate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.subscriptions.is_empty() {
            self.subscriptions.clear();
            info!("Client hook unsubscribed");
        }
        if let Some(trigger) = self.trigger.take() {
            trigger.cancel();
        }
    }
}

impl Drop for ClientHook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn fetch_initial(gateway: &Gateway, options: HookOptions) -> Result<InitialData, StoreError> {
    Ok(InitialData {
        readings: gateway.recent_readings(options.reading_buffer)?,
        alerts: gateway.recent_alerts(options.alert_buffer, Some(true))?,
        risk: gateway.latest_assessment()?,
    })
}
