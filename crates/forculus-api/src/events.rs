// Event index and server version endpoints

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::ZmClient;
use crate::error::Error;
use crate::models::{ListEventsResponse, MonitorEvent, MonitorId, Version};

impl ZmClient {
    /// Server and API version.
    ///
    /// `GET api/host/getVersion.json`
    pub async fn version(&self) -> Result<Version, Error> {
        self.get(&["host", "getVersion.json"], &[]).await
    }

    /// All events across every monitor that started at or after `start`
    /// and ended at or before `end`. Bounds are sent in the server's zone.
    pub async fn list_events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitorEvent>, Error> {
        self.list_events(None, start, end).await
    }

    /// Events of a single monitor within `[start, end]`.
    pub async fn list_monitor_events_between(
        &self,
        monitor: &MonitorId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitorEvent>, Error> {
        self.list_events(Some(monitor), start, end).await
    }

    /// `GET api/events/index[/MonitorId:<id>]/StartTime >=:<ts>/EndTime <=:<ts>.json?page=N`,
    /// following `pagination.nextPage` until the server says there is no more.
    async fn list_events(
        &self,
        monitor: Option<&MonitorId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitorEvent>, Error> {
        let monitor_filter = monitor.map(|id| format!("MonitorId:{id}"));
        let zone = self.time_zone();
        let start_filter = format!("StartTime >=:{}", zone.format(start));
        let end_filter = format!("EndTime <=:{}.json", zone.format(end));

        let mut segments = vec!["events", "index"];
        if let Some(filter) = monitor_filter.as_deref() {
            segments.push(filter);
        }
        segments.push(&start_filter);
        segments.push(&end_filter);

        let mut events = Vec::new();
        let mut page: u64 = 1;
        loop {
            let resp: ListEventsResponse = self
                .get(&segments, &[("page", page.to_string())])
                .await?;

            let received = resp.events.len();
            events.extend(resp.events.into_iter().map(|w| w.event));
            debug!(
                page = resp.pagination.page.unwrap_or(page),
                page_count = ?resp.pagination.page_count,
                received,
                "fetched event page"
            );

            // An empty page ends the walk even if the server claims more.
            if !resp.pagination.next_page || received == 0 {
                break;
            }
            page += 1;
        }

        Ok(events)
    }
}
