use std::time::Duration;

use servo_schemas::{Handler, HandlerKind, ServoError};
use tracing::{debug, warn};

/// One primary sink plus best-effort secondaries.
///
/// `send` reaches the secondaries only after the primary succeeded, and their
/// failures are logged and dropped. Reads go to the primary alone. `close` does
/// not cascade: the composer closes the children it owns, or calls
/// [`CompositeHandler::close_all`].
pub struct CompositeHandler {
    primary: Box<dyn Handler>,
    secondaries: Vec<Box<dyn Handler>>,
}

impl CompositeHandler {
    pub fn new(primary: Box<dyn Handler>) -> Self {
        Self {
            primary,
            secondaries: Vec::new(),
        }
    }

    pub fn with_secondary(mut self, handler: Box<dyn Handler>) -> Self {
        self.secondaries.push(handler);
        self
    }

    pub fn secondaries(&self) -> usize {
        self.secondaries.len()
    }

    /// Close the primary and every secondary.
    pub fn close_all(&mut self) {
        self.primary.close();
        for h in &mut self.secondaries {
            h.close();
        }
    }

    pub fn into_parts(self) -> (Box<dyn Handler>, Vec<Box<dyn Handler>>) {
        (self.primary, self.secondaries)
    }
}

impl Handler for CompositeHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Composite
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        self.primary.send(name, value)?;
        for (idx, h) in self.secondaries.iter_mut().enumerate() {
            if let Err(e) = h.send(name, value) {
                warn!(
                    name,
                    secondary = idx,
                    handler = h.kind().as_str(),
                    error = %e,
                    "secondary handler failed; ignored"
                );
            }
        }
        Ok(())
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        self.primary.receive(name)
    }

    fn receive_timeout(&mut self, name: &str, timeout: Duration) -> Result<String, ServoError> {
        self.primary.receive_timeout(name, timeout)
    }

    fn close(&mut self) {
        debug!("composite close does not cascade");
    }
}

impl std::fmt::Debug for CompositeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secondaries: Vec<&str> = self.secondaries.iter().map(|h| h.kind().as_str()).collect();
        f.debug_struct("CompositeHandler")
            .field("primary", &self.primary.kind())
            .field("secondaries", &secondaries)
            .finish()
    }
}
