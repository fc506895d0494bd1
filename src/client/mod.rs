/// Live observer built on gateway subscriptions
pub mod hook;
/// Reducer state and snapshots
pub mod state;

pub use hook::{ClientHook, HookOptions};
pub use state::{
    display_time, AlertView, DashboardAction, DashboardSnapshot, DashboardState, InitialData,
    ReadingView, RiskSnapshot, ALERT_BUFFER, READING_BUFFER,
};
