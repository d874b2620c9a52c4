use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use servo_schemas::{Handler, HandlerKind, ServoError};
use tracing::debug;

#[derive(Debug, Clone)]
struct Lane {
    tx: SyncSender<String>,
    rx: Arc<Mutex<Receiver<String>>>,
}

/// In-process hand-off: one bounded channel per name.
///
/// Clones share the same lanes, so a producer and a consumer on different
/// threads each hold their own handle. `send` blocks while a lane is full;
/// `receive` blocks until a value arrives. Capacity 0 is a rendezvous.
#[derive(Debug, Clone, Default)]
pub struct ChannelHandler {
    lanes: HashMap<String, Lane>,
}

impl ChannelHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the lane for `name`.
    pub fn with_channel(mut self, name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity);
        self.lanes.insert(
            name.into(),
            Lane {
                tx,
                rx: Arc::new(Mutex::new(rx)),
            },
        );
        self
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lanes.keys().cloned().collect();
        names.sort();
        names
    }

    fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.get(name)
    }
}

fn not_found(name: &str) -> String {
    format!("channel not found: {name}")
}

impl Handler for ChannelHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Channel
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        let lane = self
            .lane(name)
            .ok_or_else(|| ServoError::emission(name, not_found(name)))?;
        lane.tx
            .send(value.to_string())
            .map_err(|_| ServoError::emission(name, "channel closed"))
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        let lane = self
            .lane(name)
            .ok_or_else(|| ServoError::Transport(not_found(name)))?;
        let rx = lane.rx.lock().unwrap_or_else(PoisonError::into_inner);
        rx.recv()
            .map_err(|_| ServoError::Transport(format!("channel closed: {name}")))
    }

    fn receive_timeout(&mut self, name: &str, timeout: Duration) -> Result<String, ServoError> {
        let lane = self
            .lane(name)
            .ok_or_else(|| ServoError::Transport(not_found(name)))?;
        let rx = lane.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(ServoError::Timeout {
                name: name.to_string(),
                after: timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ServoError::Transport(format!("channel closed: {name}")))
            }
        }
    }

    /// Drops this handle's lanes. Other clones keep theirs.
    fn close(&mut self) {
        if !self.lanes.is_empty() {
            debug!(lanes = self.lanes.len(), "closing channel handler");
        }
        self.lanes.clear();
    }
}
