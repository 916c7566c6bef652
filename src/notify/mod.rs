//! Notification Dispatcher module (§4.10) — typed events, category
//! filtering, Detect batching, and the Pushover/webhook transports.

pub mod dispatcher;
pub mod event;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use event::Event;
pub use transport::{Notifier, PushoverNotifier, WebhookNotifier};
