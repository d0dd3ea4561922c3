// forculus-core: Event bus, lifecycle and ZoneMinder change watchers.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod handlers;
pub mod lifecycle;
pub mod watch;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{Dispatch, EventHandler, HandlerError, HandlerLoop, Reactor, SubscriberLogic};
pub use config::WatchConfig;
pub use error::CoreError;
pub use event::{Event, EventType, RecordedEvent, UploadedEvent};
pub use gateway::MonitorGateway;
pub use handlers::EventLogger;
pub use lifecycle::{LifecycleManager, Service};
pub use watch::{MonitorEventWatch, MonitorWatch};
