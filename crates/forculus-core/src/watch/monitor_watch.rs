// ── MonitorWatch: alert-state transitions ──
//
// Polls the alarm status of every monitor and diffs it against the set of
// monitors that were alerted on the previous poll.

use std::collections::HashMap;
use std::time::Duration;

use forculus_api::{AlertedMonitor, MonitorId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::Dispatch;
use crate::event::Event;
use crate::gateway::MonitorGateway;
use crate::lifecycle::Service;

pub struct MonitorWatch<G, D> {
    gateway: G,
    dispatch: D,
    interval: Duration,
    /// Monitors alerted as of the last successful poll.
    tracked: HashMap<MonitorId, AlertedMonitor>,
}

impl<G: MonitorGateway, D: Dispatch> MonitorWatch<G, D> {
    pub fn new(gateway: G, dispatch: D, interval: Duration) -> Self {
        Self {
            gateway,
            dispatch,
            interval,
            tracked: HashMap::new(),
        }
    }

    /// Apply one snapshot of alerted monitors and return the transitions,
    /// entries first, then exits. Each group is ordered by monitor id.
    pub fn observe(&mut self, alerted: HashMap<MonitorId, AlertedMonitor>) -> Vec<Event> {
        let mut events = Vec::new();

        let mut exited: Vec<MonitorId> = self
            .tracked
            .keys()
            .filter(|id| !alerted.contains_key(*id))
            .cloned()
            .collect();
        exited.sort();

        let mut current: Vec<(MonitorId, AlertedMonitor)> = alerted.into_iter().collect();
        current.sort_by(|a, b| a.0.cmp(&b.0));

        for (id, monitor) in current {
            match self.tracked.get(&id) {
                None => {
                    self.tracked.insert(id, monitor.clone());
                    events.push(Event::MonitorAlerted(monitor));
                }
                Some(previous) if previous.alarm_status != monitor.alarm_status => {
                    self.tracked.insert(id, monitor.clone());
                    events.push(Event::MonitorAlertStatusChanged(monitor));
                }
                Some(_) => {
                    self.tracked.insert(id, monitor);
                }
            }
        }

        for id in exited {
            if let Some(last) = self.tracked.remove(&id) {
                events.push(Event::MonitorExitingAlert(last));
            }
        }

        events
    }

    /// One polling cycle. A snapshot with any per-monitor failure is
    /// discarded whole: no events, tracked state untouched.
    pub async fn poll_once(&mut self) {
        let (alerted, errors) = self.gateway.alerted_monitors().await;
        if !errors.is_empty() {
            for error in &errors {
                warn!(%error, "alarm status query failed");
            }
            debug!(failures = errors.len(), "skipping monitor watch cycle");
            return;
        }

        for event in self.observe(alerted) {
            if let Event::MonitorAlerted(m)
            | Event::MonitorAlertStatusChanged(m)
            | Event::MonitorExitingAlert(m) = &event
            {
                info!(
                    monitor = %m.monitor.label(),
                    status = %m.alarm_status,
                    event_type = %event.event_type(),
                    "monitor alert transition"
                );
            }
            self.dispatch.publish(event);
        }
    }

    pub fn tracked(&self) -> &HashMap<MonitorId, AlertedMonitor> {
        &self.tracked
    }
}

impl<G: MonitorGateway, D: Dispatch> Service for MonitorWatch<G, D> {
    fn name(&self) -> &str {
        "monitor-watch"
    }

    async fn run(mut self, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume the immediate first tick

        info!(interval = ?self.interval, "monitor watch started");
        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                () = self.poll_once() => {}
            }
        }
        info!("monitor watch stopped");
    }
}
