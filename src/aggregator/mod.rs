/// Rolling aggregation of recent readings
pub mod reading_aggregator;
pub mod rolling_window;

pub use reading_aggregator::{ReadingAggregator, DEFAULT_SMOOTHING_WINDOW};
pub use rolling_window::RollingWindow;
