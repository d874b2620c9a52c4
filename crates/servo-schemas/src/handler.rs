//! Sink capability contract.
//!
//! Every sink exposes the same three operations: channel hand-off, pub/sub
//! bus, template-driven config writer and the fan-out composite alike.
//! Handlers are owned (`Box<dyn Handler>`) by whoever composes them.

use std::time::Duration;

use crate::ServoError;

/// Variant tag of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Channel,
    PubSub,
    TemplateFile,
    Composite,
    /// Plain sinks and test doubles.
    Other,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Channel => "channel",
            HandlerKind::PubSub => "pubsub",
            HandlerKind::TemplateFile => "template-file",
            HandlerKind::Composite => "composite",
            HandlerKind::Other => "other",
        }
    }
}

pub trait Handler: Send {
    fn kind(&self) -> HandlerKind;

    /// Deliver `value` under `name`.
    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError>;

    /// Block until a value is available for `name`.
    ///
    /// No timeout is imposed; use [`Handler::receive_timeout`] when the caller
    /// needs bounded latency.
    fn receive(&mut self, name: &str) -> Result<String, ServoError>;

    /// Like [`Handler::receive`] but gives up with `ServoError::Timeout`.
    fn receive_timeout(&mut self, name: &str, timeout: Duration) -> Result<String, ServoError> {
        let _ = (name, timeout);
        Err(ServoError::Capability {
            handler: self.kind().as_str(),
            operation: "receive_timeout",
        })
    }

    /// Release held resources. Idempotent.
    fn close(&mut self);
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn kind(&self) -> HandlerKind {
        (**self).kind()
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        (**self).send(name, value)
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        (**self).receive(name)
    }

    fn receive_timeout(&mut self, name: &str, timeout: Duration) -> Result<String, ServoError> {
        (**self).receive_timeout(name, timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
