// ── Reactor: in-process broadcast bus ──

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::handler::SubscriberLogic;
use super::subscription::{Delivery, Interests, Mailbox, Subscription};
use super::Dispatch;
use crate::event::{Event, EventType};
use crate::lifecycle::{LifecycleManager, Service};

struct ReactorInner {
    lifecycle: LifecycleManager,
    /// Guards registration and serializes publishers.
    subscriptions: Mutex<Vec<Subscription>>,
    mailbox_capacity: usize,
}

/// Fans events out to every interested subscription.
///
/// Cheaply cloneable; clones share the same subscription list.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<ReactorInner>,
}

impl Reactor {
    pub fn new(lifecycle: LifecycleManager, mailbox_capacity: usize) -> Self {
        Self {
            inner: Arc::new(ReactorInner {
                lifecycle,
                subscriptions: Mutex::new(Vec::new()),
                mailbox_capacity,
            }),
        }
    }

    /// Wrap `logic` in a subscription, start it and include it in future
    /// broadcasts. An empty `interests` list subscribes to everything.
    pub fn register<L: SubscriberLogic>(
        &self,
        name: &str,
        logic: L,
        interests: impl IntoIterator<Item = EventType>,
    ) {
        let interests = Interests::of(interests);
        let (subscription, mailbox) =
            Subscription::new(name, interests.clone(), self.inner.mailbox_capacity);

        let mut subscriptions = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscriptions.push(subscription);
        self.inner.lifecycle.start(SubscriberTask {
            name: name.to_owned(),
            mailbox,
            logic,
        });
        debug!(subscription = name, ?interests, "registered");
    }

    /// Offer `event` to every subscription without waiting on any of them.
    pub fn publish(&self, event: Event) {
        let subscriptions = self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut delivered = 0_usize;
        for subscription in subscriptions.iter() {
            if subscription.deliver(&event) == Delivery::Delivered {
                delivered += 1;
            }
        }
        trace!(event_type = %event.event_type(), delivered, "published");
    }

    /// Stop every registered task and wait for them to exit.
    pub async fn stop(&self) {
        self.inner.lifecycle.stop().await;
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.inner.lifecycle
    }

    pub fn subscription_count(&self) -> usize {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Dispatch for Reactor {
    fn publish(&self, event: Event) {
        Reactor::publish(self, event);
    }
}

/// Adapts a subscriber into a lifecycle-managed service.
struct SubscriberTask<L> {
    name: String,
    mailbox: Mailbox,
    logic: L,
}

impl<L: SubscriberLogic> Service for SubscriberTask<L> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self, stop: CancellationToken) {
        self.logic.run(self.mailbox, stop).await;
    }
}
