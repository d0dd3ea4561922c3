// forculus-api: Async Rust client for the ZoneMinder HTTP API

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod models;
pub mod monitors;
pub mod session;
pub mod transport;

pub use client::{Endpoint, ZmClient};
pub use error::Error;
pub use models::{
    AlarmStatus, AlertedMonitor, EventId, LoginDetails, Monitor, MonitorDetails, MonitorEvent,
    MonitorId, MonitorStatus, ServerTimeZone, Version,
};
pub use session::{Credentials, LoginSession, SessionAction};
pub use transport::{TlsMode, TransportConfig};
