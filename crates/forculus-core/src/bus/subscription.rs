// ── Subscription: interest filter + bounded mailbox ──
//
// The publisher side (`Subscription`) lives in the reactor's list; the
// consumer side (`Mailbox`) moves into the subscriber's task. Delivery
// is `try_send`: a full mailbox drops the newest event, the publisher
// never waits.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::event::{Event, EventType};

/// Mailbox capacity used when none is configured.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 15;

/// Which event types a subscription wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interests {
    types: HashSet<EventType>,
}

impl Interests {
    /// Accept every event.
    pub fn all() -> Self {
        Self {
            types: HashSet::from([EventType::All]),
        }
    }

    /// Accept the given types. An empty list means everything.
    pub fn of(types: impl IntoIterator<Item = EventType>) -> Self {
        let types: HashSet<EventType> = types.into_iter().collect();
        if types.is_empty() {
            return Self::all();
        }
        Self { types }
    }

    pub fn accepts(&self, event_type: EventType) -> bool {
        self.types.contains(&EventType::All) || self.types.contains(&event_type)
    }
}

impl<const N: usize> From<[EventType; N]> for Interests {
    fn from(types: [EventType; N]) -> Self {
        Self::of(types)
    }
}

/// Outcome of handing one event to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The subscription is not interested in this type.
    Filtered,
    /// The mailbox was full; the event was dropped.
    Dropped,
    /// The subscriber has exited.
    Closed,
}

/// Publisher-side handle of a registered subscriber.
#[derive(Debug, Clone)]
pub struct Subscription {
    name: Arc<str>,
    interests: Interests,
    tx: mpsc::Sender<Event>,
}

impl Subscription {
    /// Create a subscription and the mailbox its subscriber will drain.
    pub fn new(name: impl Into<Arc<str>>, interests: Interests, capacity: usize) -> (Self, Mailbox) {
        let name = name.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: Arc::clone(&name),
                interests,
                tx,
            },
            Mailbox { name, rx },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, event_type: EventType) -> bool {
        self.interests.accepts(event_type)
    }

    /// Non-blocking enqueue.
    pub fn deliver(&self, event: &Event) -> Delivery {
        let event_type = event.event_type();
        if !self.accepts(event_type) {
            return Delivery::Filtered;
        }

        match self.tx.try_send(event.clone()) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                error!(
                    subscription = %self.name,
                    %event_type,
                    "mailbox full, dropping event"
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscription = %self.name, %event_type, "subscriber gone, event discarded");
                Delivery::Closed
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Subscriber-side inbound stream, in publish order.
#[derive(Debug)]
pub struct Mailbox {
    name: Arc<str>,
    rx: mpsc::Receiver<Event>,
}

impl Mailbox {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next event, or `None` once every publisher handle is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next event, or `None` if `stop` fires first. Stop wins ties.
    pub async fn next(&mut self, stop: &CancellationToken) -> Option<Event> {
        tokio::select! {
            biased;
            () = stop.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Refuse further deliveries. Already queued events can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
