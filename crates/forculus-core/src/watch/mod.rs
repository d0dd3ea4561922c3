// Polling watchers that turn ZoneMinder state into bus events.

pub mod monitor_event_watch;
pub mod monitor_watch;

pub use monitor_event_watch::MonitorEventWatch;
pub use monitor_watch::MonitorWatch;
