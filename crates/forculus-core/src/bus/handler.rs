// ── Subscriber logic ──
//
// Two shapes of subscriber: `SubscriberLogic` owns its whole loop (and
// may multiplex the mailbox with its own timers), `EventHandler` only
// reacts to one event at a time and is driven by `HandlerLoop`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use super::subscription::Mailbox;
use crate::event::Event;

/// Error type handlers report back to their loop.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber that drives its own mailbox until `stop` fires.
pub trait SubscriberLogic: Send + 'static {
    fn run(self, mailbox: Mailbox, stop: CancellationToken) -> impl Future<Output = ()> + Send;
}

/// Reacts to a single event.
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: Event) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

/// Drives an [`EventHandler`] from a mailbox.
///
/// An error or panic while handling one event is logged and the loop
/// moves on to the next event.
pub struct HandlerLoop<H> {
    handler: H,
}

impl<H: EventHandler> HandlerLoop<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: EventHandler> SubscriberLogic for HandlerLoop<H> {
    async fn run(self, mut mailbox: Mailbox, stop: CancellationToken) {
        while let Some(event) = mailbox.next(&stop).await {
            let event_type = event.event_type();
            trace!(subscription = mailbox.name(), %event_type, "handling event");

            match AssertUnwindSafe(self.handler.handle(event))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(subscription = mailbox.name(), %event_type, error = %e, "handler failed");
                }
                Err(panic) => {
                    error!(
                        subscription = mailbox.name(),
                        %event_type,
                        panic = panic_message(panic.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
