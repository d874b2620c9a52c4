use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use servo_schemas::{Handler, HandlerKind, ServoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Receive,
    Close,
}

/// One observed handler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub handler: String,
    pub op: Operation,
    pub name: String,
    pub value: Option<String>,
}

/// Call log shared by any number of doubles, in global call order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `(handler, name, value)` of every send, in order.
    pub fn sends(&self) -> Vec<(String, String, String)> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == Operation::Send)
            .map(|c| (c.handler, c.name, c.value.unwrap_or_default()))
            .collect()
    }

    pub fn count(&self, handler: &str, op: Operation) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.handler == handler && c.op == op)
            .count()
    }
}

/// Accepts every send; replies from a queue.
#[derive(Debug)]
pub struct RecordingHandler {
    label: String,
    log: CallLog,
    replies: VecDeque<String>,
}

impl RecordingHandler {
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            replies: VecDeque::new(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.replies.push_back(reply.into());
        self
    }

    fn record(&self, op: Operation, name: &str, value: Option<&str>) {
        self.log.push(Call {
            handler: self.label.clone(),
            op,
            name: name.to_string(),
            value: value.map(str::to_string),
        });
    }
}

impl Handler for RecordingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Other
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        self.record(Operation::Send, name, Some(value));
        Ok(())
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        self.record(Operation::Receive, name, None);
        self.replies
            .pop_front()
            .ok_or_else(|| ServoError::Transport(format!("no reply queued for {name}")))
    }

    fn receive_timeout(
        &mut self,
        name: &str,
        _timeout: std::time::Duration,
    ) -> Result<String, ServoError> {
        self.receive(name)
    }

    fn close(&mut self) {
        self.record(Operation::Close, "", None);
    }
}

/// Fails every send with an `Emission` error; the attempt is still logged.
#[derive(Debug)]
pub struct FailingHandler {
    label: String,
    log: CallLog,
}

impl FailingHandler {
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
        }
    }
}

impl Handler for FailingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Other
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        self.log.push(Call {
            handler: self.label.clone(),
            op: Operation::Send,
            name: name.to_string(),
            value: Some(value.to_string()),
        });
        Err(ServoError::emission(self.label.as_str(), "sink unavailable"))
    }

    fn receive(&mut self, name: &str) -> Result<String, ServoError> {
        self.log.push(Call {
            handler: self.label.clone(),
            op: Operation::Receive,
            name: name.to_string(),
            value: None,
        });
        Err(ServoError::Transport("sink unavailable".to_string()))
    }

    fn close(&mut self) {
        self.log.push(Call {
            handler: self.label.clone(),
            op: Operation::Close,
            name: String::new(),
            value: None,
        });
    }
}
