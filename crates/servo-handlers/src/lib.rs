//! servo-handlers
//!
//! Concrete sinks behind the `Handler` trait:
//! - `ChannelHandler`: in-process bounded hand-off keyed by name
//! - `PubSubHandler`: publish/reply over a `PubSubTransport` (Redis in
//!   production, `MemoryTransport` in tests)
//! - `TemplateFileHandler`: routes the two reconciliation names into a
//!   `ReconciliationEngine` and writes through a receiver handler
//! - `CompositeHandler`: primary plus best-effort secondaries
//!
//! Every handler is owned by its composer. Closing is never cascaded
//! implicitly; `CompositeHandler::close_all` is the explicit opt-in.

mod channel;
mod composite;
mod pubsub;
mod redis_transport;
mod template_file;

pub use channel::ChannelHandler;
pub use composite::CompositeHandler;
pub use pubsub::{reply_name, MemoryTransport, PubSubHandler, PubSubTransport};
pub use redis_transport::{RedisSettings, RedisTransport};
pub use template_file::{ConfigFileWriter, TemplateFileHandler};
