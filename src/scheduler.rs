//! Fixed-cadence background cycles
//!
//! A [`PeriodicTrigger`] runs a synchronous cycle on a tokio task every
//! period until it is cancelled or dropped. A failing cycle is logged and the
//! next one runs on schedule.

use log::{debug, error, info};
use std::fmt::Display;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running periodic task; aborts the task when dropped
#[derive(Debug)]
#[must_use = "dropping a PeriodicTrigger cancels it immediately"]
pub struct PeriodicTrigger {
    name: String,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTrigger {
    /// Spawn `cycle` on the current tokio runtime
    ///
    /// The first cycle runs one full `period` after start. Must be called
    /// from within a runtime.
    pub fn start<F, E>(name: impl Into<String>, period: Duration, mut cycle: F) -> Self
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        info!("Starting periodic trigger '{}' every {:?}", name, period);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval's first tick completes immediately
            ticker.tick().await;

            let mut cycles: u64 = 0;
            loop {
                ticker.tick().await;
                cycles += 1;
                match cycle() {
                    Ok(()) => debug!("Trigger '{}' cycle {} complete", task_name, cycles),
                    Err(e) => error!("Trigger '{}' cycle {} failed: {}", task_name, cycles, e),
                }
            }
        });

        Self {
            name,
            period,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the task; a cycle already running completes first
    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Cancelled periodic trigger '{}'", self.name);
        }
    }
}

impl Drop for PeriodicTrigger {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() -> Result<(), String> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runs_repeatedly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let trigger = PeriodicTrigger::start("test", Duration::from_millis(20), counting(&counter));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(counter.load(Ordering::SeqCst) >= 3);
        assert!(!trigger.is_finished());
        trigger.cancel();
    }

    #[tokio::test]
    async fn test_first_cycle_waits_one_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let _trigger =
            PeriodicTrigger::start("slow", Duration::from_millis(500), counting(&counter));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_cycles() {
        let counter = Arc::new(AtomicUsize::new(0));
        let trigger = PeriodicTrigger::start("test", Duration::from_millis(10), counting(&counter));

        tokio::time::sleep(Duration::from_millis(60)).await;
        trigger.cancel();
        // let the abort land
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_cancel = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _trigger =
                PeriodicTrigger::start("scoped", Duration::from_millis(10), counting(&counter));
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_failed_cycle_does_not_stop_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&counter);
        let trigger = PeriodicTrigger::start("flaky", Duration::from_millis(15), move || {
            let n = handle.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(format!("cycle {} failed", n))
            } else {
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(counter.load(Ordering::SeqCst) >= 3);
        trigger.cancel();
    }
}
