mod analyzer;
mod calendar;
mod classifier;
mod column_time;
mod metrics;
mod normalizer;
mod timeline;

pub use analyzer::{analyze_sprint, DEFAULT_CONCURRENCY};
pub use calendar::BusinessCalendar;
pub use normalizer::DroppedEntry;
pub use timeline::SprintTimeline;
