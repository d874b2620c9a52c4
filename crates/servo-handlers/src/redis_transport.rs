use std::time::Duration;

use servo_schemas::ServoError;
use tracing::{debug, info};

use crate::pubsub::PubSubTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub url: String,
    pub connect_timeout: Duration,
    /// Socket read timeout for everything except unbounded BLPOP.
    pub read_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// `PUBLISH` / `BLPOP` over a lazily opened connection.
pub struct RedisTransport {
    settings: RedisSettings,
    client: redis::Client,
    conn: Option<redis::Connection>,
}

fn transport(e: redis::RedisError) -> ServoError {
    ServoError::Transport(e.to_string())
}

impl RedisTransport {
    /// Validates the URL; no connection is made until first use.
    pub fn open(settings: RedisSettings) -> Result<Self, ServoError> {
        let client = redis::Client::open(settings.url.as_str()).map_err(transport)?;
        Ok(Self {
            settings,
            client,
            conn: None,
        })
    }

    pub fn settings(&self) -> &RedisSettings {
        &self.settings
    }

    fn connection(&mut self) -> Result<&mut redis::Connection, ServoError> {
        if self.conn.is_none() {
            let conn = self
                .client
                .get_connection_with_timeout(self.settings.connect_timeout)
                .map_err(transport)?;
            info!(url = %self.settings.url, "connected to pub/sub bus");
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| ServoError::Transport("connection unavailable".to_string()))
    }

    /// A failed command leaves the connection in an unknown state.
    fn reset_on_error<V>(&mut self, result: redis::RedisResult<V>) -> Result<V, ServoError> {
        result.map_err(|e| {
            self.conn = None;
            transport(e)
        })
    }
}

impl PubSubTransport for RedisTransport {
    fn publish(&mut self, channel: &str, value: &str) -> Result<(), ServoError> {
        let read_timeout = self.settings.read_timeout;
        let conn = self.connection()?;
        let result = conn
            .set_read_timeout(Some(read_timeout))
            .and_then(|_| {
                redis::cmd("PUBLISH")
                    .arg(channel)
                    .arg(value)
                    .query::<i64>(conn)
            });
        let receivers = self.reset_on_error(result)?;
        debug!(channel, receivers, "published");
        Ok(())
    }

    fn pop(&mut self, list: &str, timeout: Option<Duration>) -> Result<Option<String>, ServoError> {
        // BLPOP takes whole seconds; 0 blocks forever.
        let (blpop_secs, socket_timeout) = match timeout {
            None => (0, None),
            Some(t) => {
                let secs = t.as_secs() + u64::from(t.subsec_nanos() > 0);
                let secs = secs.max(1);
                (secs, Some(Duration::from_secs(secs) + self.settings.read_timeout))
            }
        };
        let conn = self.connection()?;
        let result = conn.set_read_timeout(socket_timeout).and_then(|_| {
            redis::cmd("BLPOP")
                .arg(list)
                .arg(blpop_secs)
                .query::<Option<(String, String)>>(conn)
        });
        let popped = self.reset_on_error(result)?;
        Ok(popped.map(|(_, value)| value))
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!(url = %self.settings.url, "closed pub/sub connection");
        }
    }
}

impl std::fmt::Debug for RedisTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTransport")
            .field("settings", &self.settings)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_a_malformed_url() {
        let err = RedisTransport::open(RedisSettings {
            url: "not a url".to_string(),
            ..RedisSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), servo_schemas::ErrorKind::Transport);
    }

    #[test]
    fn open_is_lazy() {
        let t = RedisTransport::open(RedisSettings::default()).unwrap();
        assert!(format!("{t:?}").contains("connected: false"));
    }

    #[test]
    fn close_without_connection_is_a_no_op() {
        let mut t = RedisTransport::open(RedisSettings::default()).unwrap();
        t.close();
        t.close();
    }
}
