// ── In-process event bus ──

pub mod handler;
pub mod reactor;
pub mod subscription;

pub use handler::{EventHandler, HandlerError, HandlerLoop, SubscriberLogic};
pub use reactor::Reactor;
pub use subscription::{DEFAULT_MAILBOX_CAPACITY, Delivery, Interests, Mailbox, Subscription};

use crate::event::Event;

/// Capability to put events on the bus.
///
/// Watchers and handlers take this instead of the whole reactor so
/// derived events (uploads, records) can be chained back in.
pub trait Dispatch: Send + Sync + 'static {
    fn publish(&self, event: Event);
}

impl<D: Dispatch> Dispatch for std::sync::Arc<D> {
    fn publish(&self, event: Event) {
        (**self).publish(event);
    }
}
