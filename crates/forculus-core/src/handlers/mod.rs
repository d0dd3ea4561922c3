// Built-in reaction handlers.

pub mod event_logger;

pub use event_logger::EventLogger;
