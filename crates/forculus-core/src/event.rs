// ── Bus event vocabulary ──

use forculus_api::{AlertedMonitor, MonitorEvent};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Tag identifying a kind of occurrence on the bus.
///
/// `All` is reserved for subscriptions: it is never the type of a concrete
/// event, but an interest set containing it accepts everything.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    All,
    MonitorAlerted,
    MonitorAlertStatusChanged,
    MonitorExitingAlert,
    MonitorNewEvent,
    MonitorEventUploaded,
    MonitorEventRecorded,
}

/// A recorded event was copied to object storage.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedEvent {
    pub source: MonitorEvent,
    /// Bucket or storage provider name.
    pub storage_target: String,
    pub storage_key: String,
}

/// A recorded event was registered with an external record keeper.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    pub source: MonitorEvent,
    pub access_url: String,
}

/// One occurrence flowing through the bus. The variant fixes the payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    MonitorAlerted(AlertedMonitor),
    MonitorAlertStatusChanged(AlertedMonitor),
    /// Carries the last state observed before the monitor left alert.
    MonitorExitingAlert(AlertedMonitor),
    MonitorNewEvent(MonitorEvent),
    MonitorEventUploaded(UploadedEvent),
    MonitorEventRecorded(RecordedEvent),
}

impl Event {
    /// The tag of this event. Never [`EventType::All`].
    pub fn event_type(&self) -> EventType {
        match self {
            Self::MonitorAlerted(_) => EventType::MonitorAlerted,
            Self::MonitorAlertStatusChanged(_) => EventType::MonitorAlertStatusChanged,
            Self::MonitorExitingAlert(_) => EventType::MonitorExitingAlert,
            Self::MonitorNewEvent(_) => EventType::MonitorNewEvent,
            Self::MonitorEventUploaded(_) => EventType::MonitorEventUploaded,
            Self::MonitorEventRecorded(_) => EventType::MonitorEventRecorded,
        }
    }
}
