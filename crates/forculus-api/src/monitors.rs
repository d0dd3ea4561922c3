// Monitor listing and alarm status endpoints

use std::collections::HashMap;

use futures_util::future::join_all;
use tracing::{debug, trace};

use crate::client::ZmClient;
use crate::error::Error;
use crate::models::{
    AlarmStatus, AlarmStatusResponse, AlertedMonitor, ListMonitorsResponse, Monitor, MonitorId,
};

impl ZmClient {
    /// List all monitors configured on the server.
    ///
    /// `GET api/monitors.json`
    pub async fn monitors(&self) -> Result<Vec<Monitor>, Error> {
        let resp: ListMonitorsResponse = self.get(&["monitors.json"], &[]).await?;
        debug!(count = resp.monitors.len(), "listed monitors");
        Ok(resp.monitors)
    }

    /// Current alarm state of one monitor.
    ///
    /// `GET api/monitors/alarm/id:<id>/command:status.json`
    pub async fn alarm_status(&self, monitor: &MonitorId) -> Result<AlarmStatus, Error> {
        let id_segment = format!("id:{monitor}");
        let resp: AlarmStatusResponse = self
            .get(
                &["monitors", "alarm", &id_segment, "command:status.json"],
                &[],
            )
            .await?;
        let status = AlarmStatus::from(resp.status);
        trace!(monitor = %monitor, %status, "alarm status");
        Ok(status)
    }

    /// Every monitor currently in `PreAlarm`, `Alert` or `Alarm`.
    ///
    /// Alarm statuses are fetched concurrently. Per-monitor failures are
    /// collected rather than short-circuiting, so callers can tell a quiet
    /// system from a partially unreachable one. A failure to list the
    /// monitors at all yields an empty map and that single error.
    pub async fn alerted_monitors(&self) -> (HashMap<MonitorId, AlertedMonitor>, Vec<Error>) {
        let monitors = match self.monitors().await {
            Ok(monitors) => monitors,
            Err(e) => return (HashMap::new(), vec![e]),
        };

        let lookups = monitors.into_iter().map(|monitor| async move {
            let status = self.alarm_status(monitor.id()).await;
            (monitor, status)
        });

        let mut alerted = HashMap::new();
        let mut errors = Vec::new();
        for (monitor, status) in join_all(lookups).await {
            match status {
                Ok(alarm_status) if alarm_status.is_alerted() => {
                    alerted.insert(
                        monitor.id().clone(),
                        AlertedMonitor {
                            monitor,
                            alarm_status,
                        },
                    );
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }

        (alerted, errors)
    }
}
