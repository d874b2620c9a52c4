use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use servo_schemas::{Handler, HandlerKind, ServoError};
use tracing::debug;

/// Bus boundary for [`PubSubHandler`].
pub trait PubSubTransport: Send {
    /// Publish `value` on `channel`.
    fn publish(&mut self, channel: &str, value: &str) -> Result<(), ServoError>;

    /// Pop the head of `list`, waiting up to `timeout` (`None` waits forever).
    /// `Ok(None)` means the wait elapsed.
    fn pop(&mut self, list: &str, timeout: Option<Duration>) -> Result<Option<String>, ServoError>;

    fn close(&mut self);
}

/// List a peer pushes its answer to after receiving a publish on `name`.
pub fn reply_name(name: &str) -> String {
    format!("{name}-reply")
}

/// Publishes under `name`; receives from the `<name>-reply` list.
#[derive(Debug)]
pub struct PubSubHandler<T> {
    transport: T,
}

impl<T: PubSubTransport> PubSubHandler<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: PubSubTransport> Handler for PubSubHandler<T> {
    fn kind(&self) -> HandlerKind {
        HandlerKind::PubSub
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        self.transport.publish(name, value).map_err(|e| match e {
            ServoError::Emission { .. } => e,
            other => ServoError::emission(name, other),
        })
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        let list = reply_name(name);
        debug!(list = %list, "waiting for reply");
        self.transport
            .pop(&list, None)?
            .ok_or_else(|| ServoError::Transport(format!("no reply on {list}")))
    }

    fn receive_timeout(&mut self, name: &str, timeout: Duration) -> Result<String, ServoError> {
        let list = reply_name(name);
        self.transport
            .pop(&list, Some(timeout))?
            .ok_or_else(|| ServoError::Timeout {
                name: name.to_string(),
                after: timeout,
            })
    }

    fn close(&mut self) {
        self.transport.close();
    }
}

// ---------------------------------------------------------------------------
// In-memory bus
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Bus {
    published: Vec<(String, String)>,
    lists: HashMap<String, VecDeque<String>>,
    closed: bool,
}

/// Process-local bus with the same publish/pop semantics as the Redis one.
///
/// Clones share state: a test keeps one handle to push replies and inspect
/// what was published.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<(Mutex<Bus>, Condvar)>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `value` to `list` and wake any waiting pop.
    pub fn push(&self, list: &str, value: &str) {
        self.bus()
            .lists
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_string());
        self.inner.1.notify_all();
    }

    /// Every `(channel, value)` published so far, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.bus().published.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.bus().closed
    }
}

impl PubSubTransport for MemoryTransport {
    fn publish(&mut self, channel: &str, value: &str) -> Result<(), ServoError> {
        let mut bus = self.bus();
        if bus.closed {
            return Err(ServoError::Transport("bus closed".to_string()));
        }
        bus.published.push((channel.to_string(), value.to_string()));
        Ok(())
    }

    fn pop(&mut self, list: &str, timeout: Option<Duration>) -> Result<Option<String>, ServoError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let (lock, cvar) = &*self.inner;
        let mut bus = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if bus.closed {
                return Err(ServoError::Transport("bus closed".to_string()));
            }
            if let Some(value) = bus.lists.get_mut(list).and_then(VecDeque::pop_front) {
                return Ok(Some(value));
            }
            bus = match deadline {
                None => cvar.wait(bus).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    cvar.wait_timeout(bus, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Closes the bus for every clone and wakes pending pops.
    fn close(&mut self) {
        self.bus().closed = true;
        self.inner.1.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_schemas::ErrorKind;
    use std::thread;

    #[test]
    fn send_publishes_under_name() {
        let bus = MemoryTransport::new();
        let mut h = PubSubHandler::new(bus.clone());
        h.send("get-instance-status", "GetInstanceStatus").unwrap();
        assert_eq!(
            bus.published(),
            vec![(
                "get-instance-status".to_string(),
                "GetInstanceStatus".to_string()
            )]
        );
    }

    #[test]
    fn receive_reads_the_reply_list() {
        let bus = MemoryTransport::new();
        bus.push("get-instance-status-reply", "healthy");
        let mut h = PubSubHandler::new(bus);
        assert_eq!(h.receive("get-instance-status").unwrap(), "healthy");
    }

    #[test]
    fn receive_blocks_until_a_reply_is_pushed() {
        let bus = MemoryTransport::new();
        let mut h = PubSubHandler::new(bus.clone());
        let t = thread::spawn(move || h.receive("m"));
        thread::sleep(Duration::from_millis(20));
        bus.push("m-reply", "late");
        assert_eq!(t.join().unwrap().unwrap(), "late");
    }

    #[test]
    fn bounded_receive_times_out() {
        let mut h = PubSubHandler::new(MemoryTransport::new());
        let err = h.receive_timeout("m", Duration::from_millis(20)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn close_unblocks_a_pending_receive() {
        let bus = MemoryTransport::new();
        let mut h = PubSubHandler::new(bus.clone());
        let t = thread::spawn(move || h.receive("m"));
        thread::sleep(Duration::from_millis(20));
        let mut closer = bus.clone();
        closer.close();
        assert_eq!(t.join().unwrap().unwrap_err().kind(), ErrorKind::Transport);
    }

    #[test]
    fn publish_after_close_is_an_emission_error() {
        let bus = MemoryTransport::new();
        let mut h = PubSubHandler::new(bus);
        h.close();
        assert_eq!(h.send("m", "v").unwrap_err().kind(), ErrorKind::Emission);
    }
}
