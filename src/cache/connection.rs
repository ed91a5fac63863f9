use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::CacheError;

/// Tunables for connection establishment. Production values follow the
/// shared deployment convention; tests shrink them to keep runs fast.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub connect_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(3000),
            max_attempts: 10,
        }
    }
}

type AttemptOutcome = Option<Result<MultiplexedConnection, CacheError>>;

struct State {
    conn: Option<MultiplexedConnection>,
    /// Present while a connection attempt is in flight. Waiters subscribe to
    /// the channel instead of dialing duplicate connections.
    pending: Option<watch::Receiver<AttemptOutcome>>,
}

enum Flight {
    Connect(watch::Sender<AttemptOutcome>),
    Wait(watch::Receiver<AttemptOutcome>),
}

/// Owner of the single live connection to the cache store.
///
/// The connection is established lazily on first demand. Establishment is
/// mutually exclusive: one caller becomes the connector while every
/// concurrent caller awaits the shared outcome, so a cold start under load
/// produces exactly one connect attempt sequence instead of a connection
/// storm.
pub struct ConnectionManager {
    url: String,
    settings: ConnectionSettings,
    state: Mutex<State>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_settings(url, ConnectionSettings::default())
    }

    pub fn with_settings(url: impl Into<String>, settings: ConnectionSettings) -> Self {
        Self {
            url: url.into(),
            settings,
            state: Mutex::new(State {
                conn: None,
                pending: None,
            }),
        }
    }

    /// Return the live connection, establishing it if necessary.
    ///
    /// A ready connection is returned immediately with no I/O. If an attempt
    /// is already in flight the caller waits for its outcome; otherwise the
    /// caller dials with bounded exponential backoff and publishes the result
    /// to every waiter.
    pub async fn get(&self) -> Result<MultiplexedConnection, CacheError> {
        let flight = {
            let mut state = self.state.lock().await;
            if let Some(conn) = &state.conn {
                return Ok(conn.clone());
            }
            match &state.pending {
                Some(rx) => Flight::Wait(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.pending = Some(rx);
                    Flight::Connect(tx)
                }
            }
        };

        match flight {
            Flight::Wait(rx) => self.await_outcome(rx).await,
            Flight::Connect(tx) => {
                let result = self.connect_with_backoff().await;
                let mut state = self.state.lock().await;
                state.pending = None;
                if let Ok(conn) = &result {
                    state.conn = Some(conn.clone());
                }
                // Waiters may already be gone; a closed channel is fine.
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    async fn await_outcome(
        &self,
        mut rx: watch::Receiver<AttemptOutcome>,
    ) -> Result<MultiplexedConnection, CacheError> {
        // Clone the outcome out of the watch guard immediately: the guard is
        // not `Send` and must not be held across the lock await below.
        let outcome = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map(|outcome| outcome.clone());
        match outcome {
            Ok(outcome) => outcome.unwrap_or_else(|| {
                Err(CacheError::ConnectionError(
                    "connection attempt produced no outcome".into(),
                ))
            }),
            Err(_) => {
                // The connector was cancelled before publishing a result.
                // Clear the stale pending marker so the next caller can retry.
                let mut state = self.state.lock().await;
                if state
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.has_changed().is_err())
                {
                    state.pending = None;
                }
                Err(CacheError::ConnectionError(
                    "connection attempt abandoned".into(),
                ))
            }
        }
    }

    async fn connect_with_backoff(&self) -> Result<MultiplexedConnection, CacheError> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|err| CacheError::ConnectionError(format!("invalid cache url: {}", err)))?;

        let mut last_error = String::new();
        for attempt in 1..=self.settings.max_attempts {
            debug!("Cache connecting (attempt {})...", attempt);
            match timeout(
                self.settings.connect_timeout,
                client.get_multiplexed_async_connection(),
            )
            .await
            {
                Ok(Ok(conn)) => {
                    info!("Cache connection ready after {} attempt(s)", attempt);
                    return Ok(conn);
                }
                Ok(Err(err)) => last_error = err.to_string(),
                Err(_) => {
                    last_error = format!(
                        "connect timed out after {:?}",
                        self.settings.connect_timeout
                    )
                }
            }

            if attempt < self.settings.max_attempts {
                let backoff = (self.settings.backoff_base * attempt).min(self.settings.backoff_cap);
                warn!(
                    "Cache connect attempt {} failed ({}), retrying in {:?}",
                    attempt, last_error, backoff
                );
                sleep(backoff).await;
            }
        }

        warn!(
            "Cache reconnection failed after {} attempts",
            self.settings.max_attempts
        );
        Err(CacheError::ConnectionError(format!(
            "failed after {} attempts: {}",
            self.settings.max_attempts, last_error
        )))
    }

    /// Drop the stored connection so the next caller reconnects from
    /// scratch. Called by the facade when a command fails with a
    /// connection-class error (the multiplexed handle is no longer usable).
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        if state.conn.take().is_some() {
            debug!("Cache connection dropped, will reconnect on next use");
        }
    }

    /// Close any existing connection and clear all state. Idempotent.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.conn = None;
        state.pending = None;
        info!("Cache connection closed");
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.conn.is_some()
    }
}
