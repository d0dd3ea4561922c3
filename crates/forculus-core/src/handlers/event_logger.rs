// ── Event logger ──
//
// Logs every bus event with structured fields. Registered for all event
// types when debug output is enabled.

use tracing::info;

use crate::bus::{EventHandler, HandlerError};
use crate::event::Event;

#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

impl EventHandler for EventLogger {
    async fn handle(&self, event: Event) -> Result<(), HandlerError> {
        let event_type = event.event_type();
        match &event {
            Event::MonitorAlerted(m)
            | Event::MonitorAlertStatusChanged(m)
            | Event::MonitorExitingAlert(m) => {
                info!(
                    %event_type,
                    monitor_id = %m.id(),
                    monitor_name = %m.monitor.details.name,
                    alarm_status = %m.alarm_status,
                    "bus event"
                );
            }
            Event::MonitorNewEvent(e) => {
                info!(
                    %event_type,
                    monitor_id = %e.monitor_id,
                    event_id = %e.id,
                    event_name = %e.name,
                    cause = e.cause.as_deref().unwrap_or(""),
                    alarm_frames = e.alarm_frames.as_deref().unwrap_or(""),
                    "bus event"
                );
            }
            Event::MonitorEventUploaded(u) => {
                info!(
                    %event_type,
                    event_id = %u.source.id,
                    storage_target = %u.storage_target,
                    storage_key = %u.storage_key,
                    "bus event"
                );
            }
            Event::MonitorEventRecorded(r) => {
                info!(
                    %event_type,
                    event_id = %r.source.id,
                    access_url = %r.access_url,
                    "bus event"
                );
            }
        }
        Ok(())
    }
}
