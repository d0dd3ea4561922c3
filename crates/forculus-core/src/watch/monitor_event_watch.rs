// ── MonitorEventWatch: new recordings after an alert ──
//
// When a monitor leaves alert, a watch window opens for it starting a
// little before the exit. Every tick the open windows are queried and
// each event id not yet in the seen cache is published once; the window
// closes as soon as it yields something new. The seen cache is seeded at
// startup so recordings that already existed are not reported.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use forculus_api::{EventId, MonitorId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{Dispatch, Mailbox, SubscriberLogic};
use crate::config::{WatchConfig, reach_back, time_delta};
use crate::event::Event;
use crate::gateway::MonitorGateway;

pub struct MonitorEventWatch<G, D> {
    gateway: G,
    dispatch: D,
    config: WatchConfig,
    lookback: TimeDelta,
    ttl: TimeDelta,
    bootstrap_window: TimeDelta,
    /// Monitor -> start of the range to search.
    windows: HashMap<MonitorId, DateTime<Utc>>,
    /// Event -> when it was last seen.
    seen: HashMap<EventId, DateTime<Utc>>,
}

impl<G: MonitorGateway, D: Dispatch> MonitorEventWatch<G, D> {
    pub fn new(gateway: G, dispatch: D, config: WatchConfig) -> Self {
        Self {
            gateway,
            dispatch,
            lookback: time_delta(config.event_lookback),
            ttl: time_delta(config.seen_event_ttl),
            bootstrap_window: time_delta(config.bootstrap_window),
            config,
            windows: HashMap::new(),
            seen: HashMap::new(),
        }
    }

    /// Seed the seen cache from recent history, retrying until it works.
    ///
    /// Returns `false` if `stop` fired first.
    pub async fn bootstrap(&mut self, stop: &CancellationToken) -> bool {
        let zone = self.gateway.time_zone();
        loop {
            let now = Utc::now();
            let start = reach_back(now, self.bootstrap_window);

            let result = tokio::select! {
                biased;
                () = stop.cancelled() => return false,
                result = self.gateway.events_between(start, now) => result,
            };

            match result {
                Ok(events) => {
                    for event in events {
                        match event.parse_end_time(zone) {
                            Ok(ended) => {
                                self.seen.insert(event.id, ended);
                            }
                            Err(error) => {
                                warn!(event = %event, %error, "skipping event with unreadable end time");
                            }
                        }
                    }
                    info!(seen = self.seen.len(), "event watch bootstrapped");
                    return true;
                }
                Err(error) => {
                    warn!(
                        %error,
                        retry_in = ?self.config.bootstrap_retry,
                        "event watch bootstrap failed"
                    );
                    tokio::select! {
                        biased;
                        () = stop.cancelled() => return false,
                        () = tokio::time::sleep(self.config.bootstrap_retry) => {}
                    }
                }
            }
        }
    }

    /// React to a bus event. Only alert exits matter here.
    pub fn handle_event(&mut self, event: &Event, now: DateTime<Utc>) {
        match event {
            Event::MonitorExitingAlert(alerted) => self.open_window(alerted.id().clone(), now),
            other => debug!(event_type = %other.event_type(), "ignoring event"),
        }
    }

    /// Open (or move) the watch window for `monitor`.
    pub fn open_window(&mut self, monitor: MonitorId, now: DateTime<Utc>) {
        let start = reach_back(now, self.lookback);
        debug!(monitor = %monitor, %start, "opening watch window");
        self.windows.insert(monitor, start);
    }

    /// Query every open window once.
    ///
    /// A failed query leaves its window open for the next tick and does
    /// not affect the other windows.
    pub async fn scan_windows(&mut self, now: DateTime<Utc>) {
        let mut open: Vec<(MonitorId, DateTime<Utc>)> =
            self.windows.iter().map(|(id, start)| (id.clone(), *start)).collect();
        open.sort();

        for (monitor, start) in open {
            let events = match self.gateway.monitor_events_between(&monitor, start, now).await {
                Ok(events) => events,
                Err(error) => {
                    warn!(monitor = %monitor, %error, "event query failed, window kept open");
                    continue;
                }
            };

            let mut found = false;
            for event in events {
                if self.seen.contains_key(&event.id) {
                    continue;
                }
                info!(monitor = %monitor, event = %event, "new monitor event");
                self.seen.insert(event.id.clone(), now);
                self.dispatch.publish(Event::MonitorNewEvent(event));
                found = true;
            }

            if found {
                self.windows.remove(&monitor);
            }
        }
    }

    /// Forget events last seen more than the TTL ago.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let before = self.seen.len();
        let ttl = self.ttl;
        self.seen.retain(|_, seen_at| now - *seen_at <= ttl);
        let evicted = before - self.seen.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.seen.len(), "pruned seen events");
        }
    }

    /// Record `event` as already seen at `at`.
    pub fn mark_seen(&mut self, event: EventId, at: DateTime<Utc>) {
        self.seen.insert(event, at);
    }

    pub fn is_seen(&self, event: &EventId) -> bool {
        self.seen.contains_key(event)
    }

    pub fn watch_windows(&self) -> &HashMap<MonitorId, DateTime<Utc>> {
        &self.windows
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl<G: MonitorGateway, D: Dispatch> SubscriberLogic for MonitorEventWatch<G, D> {
    async fn run(mut self, mut mailbox: Mailbox, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume the immediate first tick

        info!(interval = ?self.config.poll_interval, "monitor event watch started");
        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                event = mailbox.recv() => match event {
                    Some(event) => self.handle_event(&event, Utc::now()),
                    None => break,
                },
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        () = stop.cancelled() => break,
                        () = self.scan_windows(Utc::now()) => {}
                    }
                    self.prune(Utc::now());
                }
            }
        }
        info!("monitor event watch stopped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use forculus_api::{MonitorEvent, ServerTimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::AlertedSnapshot;

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Dispatch for Recorder {
        fn publish(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    /// Per-monitor canned event lists; monitors listed in `failing` error.
    #[derive(Default)]
    struct Canned {
        events: HashMap<MonitorId, Vec<MonitorEvent>>,
        failing: Vec<MonitorId>,
        history: Vec<MonitorEvent>,
        bootstrap_failures: Mutex<u32>,
    }

    impl MonitorGateway for Canned {
        fn time_zone(&self) -> ServerTimeZone {
            ServerTimeZone::utc()
        }

        async fn alerted_monitors(&self) -> AlertedSnapshot {
            AlertedSnapshot::default()
        }

        async fn events_between(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MonitorEvent>, forculus_api::Error> {
            let mut failures = self.bootstrap_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(forculus_api::Error::Api {
                    status: 502,
                    message: "bad gateway".into(),
                });
            }
            Ok(self.history.clone())
        }

        async fn monitor_events_between(
            &self,
            monitor: &MonitorId,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MonitorEvent>, forculus_api::Error> {
            if self.failing.contains(monitor) {
                return Err(forculus_api::Error::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(self.events.get(monitor).cloned().unwrap_or_default())
        }
    }

    fn event(id: &str, monitor: &str, end: Option<&str>) -> MonitorEvent {
        serde_json::from_value(serde_json::json!({
            "Id": id,
            "MonitorId": monitor,
            "Name": format!("Event-{id}"),
            "EndTime": end,
            "AlarmFrames": "4"
        }))
        .unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_718_445_600 + secs, 0).unwrap()
    }

    fn published_ids(recorder: &Recorder) -> Vec<String> {
        recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                Event::MonitorNewEvent(ev) => ev.id.to_string(),
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    fn watch(gateway: Canned) -> (MonitorEventWatch<Canned, Recorder>, Recorder) {
        let recorder = Recorder::default();
        let w = MonitorEventWatch::new(gateway, recorder.clone(), WatchConfig::default());
        (w, recorder)
    }

    #[tokio::test]
    async fn new_event_is_published_once_and_closes_window() {
        let mut gateway = Canned::default();
        gateway
            .events
            .insert("5".into(), vec![event("E1", "5", Some("2024-06-15 10:00:00"))]);
        let (mut w, recorder) = watch(gateway);

        w.open_window("5".into(), t(0));
        assert_eq!(w.watch_windows()[&MonitorId::from("5")], t(-30));

        w.scan_windows(t(2)).await;
        assert_eq!(published_ids(&recorder), ["E1"]);
        assert!(w.watch_windows().is_empty());

        // Same event shows up in a later window: no second notification.
        w.open_window("5".into(), t(3));
        w.scan_windows(t(4)).await;
        assert_eq!(published_ids(&recorder), ["E1"]);
        assert!(w.watch_windows().contains_key(&MonitorId::from("5")));
    }

    #[tokio::test]
    async fn failed_query_keeps_window_and_others_proceed() {
        let mut gateway = Canned::default();
        gateway.failing.push("1".into());
        gateway
            .events
            .insert("2".into(), vec![event("E9", "2", None)]);
        let (mut w, recorder) = watch(gateway);

        w.open_window("1".into(), t(0));
        w.open_window("2".into(), t(0));
        w.scan_windows(t(2)).await;

        assert_eq!(published_ids(&recorder), ["E9"]);
        let open: Vec<&MonitorId> = w.watch_windows().keys().collect();
        assert_eq!(open, [&MonitorId::from("1")]);
    }

    #[tokio::test]
    async fn empty_result_keeps_window_open() {
        let (mut w, recorder) = watch(Canned::default());
        w.open_window("3".into(), t(0));
        w.scan_windows(t(2)).await;
        assert!(published_ids(&recorder).is_empty());
        assert_eq!(w.watch_windows().len(), 1);
    }

    #[test]
    fn prune_evicts_only_entries_older_than_ttl() {
        let (mut w, _) = watch(Canned::default());
        let now = t(10_000);
        w.mark_seen("old".into(), now - TimeDelta::minutes(31));
        w.mark_seen("edge".into(), now - TimeDelta::minutes(30));
        w.mark_seen("fresh".into(), now - TimeDelta::minutes(5));

        w.prune(now);

        assert!(!w.is_seen(&"old".into()));
        assert!(w.is_seen(&"edge".into()));
        assert!(w.is_seen(&"fresh".into()));
    }

    #[test]
    fn only_exiting_alert_opens_windows() {
        let (mut w, _) = watch(Canned::default());
        w.handle_event(&Event::MonitorNewEvent(event("E1", "5", None)), t(0));
        assert!(w.watch_windows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_retries_and_seeds_seen_cache() {
        let gateway = Canned {
            history: vec![
                event("H1", "1", Some("2024-06-15 09:50:00")),
                event("H2", "2", None),
            ],
            bootstrap_failures: Mutex::new(2),
            ..Canned::default()
        };
        let (mut w, _) = watch(gateway);

        let started = tokio::time::Instant::now();
        assert!(w.bootstrap(&CancellationToken::new()).await);

        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(w.is_seen(&"H1".into()));
        // Unreadable end time: skipped, not fatal.
        assert!(!w.is_seen(&"H2".into()));
        assert_eq!(w.seen_count(), 1);
    }

    #[tokio::test]
    async fn oversized_windows_clamp_to_earliest_instant() {
        let config = WatchConfig {
            event_lookback: Duration::from_secs(u64::MAX / 2),
            bootstrap_window: Duration::from_secs(u64::MAX / 2),
            ..WatchConfig::default()
        };
        let gateway = Canned {
            history: vec![event("H1", "1", Some("2024-06-15 09:50:00"))],
            ..Canned::default()
        };
        let mut w = MonitorEventWatch::new(gateway, Recorder::default(), config);

        assert!(w.bootstrap(&CancellationToken::new()).await);
        assert!(w.is_seen(&"H1".into()));

        w.open_window("5".into(), t(0));
        assert_eq!(
            w.watch_windows()[&MonitorId::from("5")],
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[test]
    fn end_times_are_read_in_server_zone() {
        let zone: ServerTimeZone = "+02:00".parse().unwrap();
        let seen_at = event("H1", "1", Some("2024-06-15 12:00:00"))
            .parse_end_time(zone)
            .unwrap();
        assert_eq!(seen_at, t(0));
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_gives_up_when_stopped() {
        let gateway = Canned {
            bootstrap_failures: Mutex::new(u32::MAX),
            ..Canned::default()
        };
        let (mut w, _) = watch(gateway);

        let stop = CancellationToken::new();
        let cancel = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            cancel.cancel();
        });

        assert!(!w.bootstrap(&stop).await);
    }
}
