// ── Upstream gateway seam ──
//
// The watchers only need three calls from ZoneMinder. Keeping them behind
// a trait lets tests drive the watchers with scripted responses.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forculus_api::{AlertedMonitor, MonitorEvent, MonitorId, ServerTimeZone, ZmClient};

/// Alerted monitors keyed by id, plus any per-monitor failures.
pub type AlertedSnapshot = (HashMap<MonitorId, AlertedMonitor>, Vec<forculus_api::Error>);

pub trait MonitorGateway: Send + Sync + 'static {
    /// Zone the server's event timestamps are written in.
    fn time_zone(&self) -> ServerTimeZone;

    fn alerted_monitors(&self) -> impl Future<Output = AlertedSnapshot> + Send;

    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send;

    fn monitor_events_between(
        &self,
        monitor: &MonitorId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send;
}

impl MonitorGateway for ZmClient {
    fn time_zone(&self) -> ServerTimeZone {
        ZmClient::time_zone(self)
    }

    fn alerted_monitors(&self) -> impl Future<Output = AlertedSnapshot> + Send {
        ZmClient::alerted_monitors(self)
    }

    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send {
        self.list_events_between(start, end)
    }

    fn monitor_events_between(
        &self,
        monitor: &MonitorId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send {
        self.list_monitor_events_between(monitor, start, end)
    }
}

impl<G: MonitorGateway> MonitorGateway for Arc<G> {
    fn time_zone(&self) -> ServerTimeZone {
        (**self).time_zone()
    }

    fn alerted_monitors(&self) -> impl Future<Output = AlertedSnapshot> + Send {
        (**self).alerted_monitors()
    }

    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send {
        (**self).events_between(start, end)
    }

    fn monitor_events_between(
        &self,
        monitor: &MonitorId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MonitorEvent>, forculus_api::Error>> + Send {
        (**self).monitor_events_between(monitor, start, end)
    }
}
