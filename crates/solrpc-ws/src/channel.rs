//! Subscription channel: one logical subscription over a reconnecting socket.
//!
//! State transitions:
//! - `Disconnected` → `Connecting`:   `connect()` called
//! - `Connecting` → `Subscribing`:    socket opened, request body sent
//! - `Subscribing` → `Streaming`:     first inbound frame (retry counter reset)
//! - `Subscribing|Streaming` → `Reconnecting`: close, read error or keepalive lapse
//! - `Reconnecting` → `Connecting`:   retry budget left, after a fixed pause
//! - `Reconnecting` → `Closed`:       retry budget exhausted
//! - any → `Closed`:                  handler returned [`HandlerAction::Stop`]
//!
//! Every reconnect re-sends the original request body, so the server hands
//! out a fresh subscription id each time. Callers must not assume the id
//! survives a reconnect; the channel replaces its [`SubscriptionHandle`]
//! and logs the change.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use solrpc_core::error::TransportError;
use solrpc_core::policy::{RetryConfig, RetryPolicy};
use solrpc_core::request::{JsonRpcError, JsonRpcResponse};
use solrpc_core::store::MessageStore;

use crate::subscriptions::{self, SubscriptionHandle};
use crate::transport::{SocketConnector, SocketEvent, TransportSocket, TungsteniteConnector};

/// Configuration for a subscription channel.
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Reconnects allowed after consecutive failures before giving up.
    pub retry_limit: u32,
    /// Pause before each reconnect.
    pub retry_pause: Duration,
    /// Interval between keepalive probes.
    pub keepalive_interval: Duration,
    /// Probes that may go unanswered before the socket counts as dropped.
    pub max_missed_probes: u32,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Send the derived unsubscribe request when the handler stops the channel.
    pub unsubscribe_on_stop: bool,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            retry_pause: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(60),
            max_missed_probes: 2,
            connect_timeout: Duration::from_secs(30),
            unsubscribe_on_stop: true,
        }
    }
}

impl WsClientConfig {
    pub fn with_retry(mut self, limit: u32, pause: Duration) -> Self {
        self.retry_limit = limit;
        self.retry_pause = pause;
        self
    }

    pub fn with_keepalive(mut self, interval: Duration, max_missed_probes: u32) -> Self {
        self.keepalive_interval = interval;
        self.max_missed_probes = max_missed_probes;
        self
    }

    pub fn with_unsubscribe_on_stop(mut self, enabled: bool) -> Self {
        self.unsubscribe_on_stop = enabled;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(RetryConfig::fixed(self.retry_limit, self.retry_pause))
    }
}

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Subscribing,
    Streaming,
    Reconnecting,
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Subscribing => write!(f, "subscribing"),
            Self::Streaming => write!(f, "streaming"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// What the message handler wants the channel to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    Continue,
    Stop,
}

impl From<()> for HandlerAction {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

/// Consecutive failures since the channel last reached `Streaming`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounter(u32);

impl RetryCounter {
    pub fn get(&self) -> u32 {
        self.0
    }

    fn increment(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

/// How one socket session ended.
enum SessionEnd {
    /// Handler asked to stop.
    Stopped,
    /// Server answered the subscribe request with an error object.
    Rejected(JsonRpcError),
    /// Socket went away; recoverable.
    Dropped(TransportError),
}

/// Maintains one subscription across socket drops.
pub struct SubscriptionChannel {
    endpoint: String,
    config: WsClientConfig,
    retry: RetryPolicy,
    connector: Arc<dyn SocketConnector>,
    store: Option<Arc<dyn MessageStore>>,
    state: ChannelState,
    retries: RetryCounter,
    handle: Option<SubscriptionHandle>,
}

impl SubscriptionChannel {
    /// Create a channel for a `ws://` or `wss://` endpoint.
    pub fn new(endpoint: impl Into<String>, config: WsClientConfig) -> Result<Self, TransportError> {
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint)?;
        if config.keepalive_interval.is_zero() {
            return Err(TransportError::Config(
                "keepalive_interval must be greater than zero".into(),
            ));
        }
        Ok(Self {
            endpoint,
            retry: config.retry_policy(),
            config,
            connector: Arc::new(TungsteniteConnector),
            store: None,
            state: ChannelState::Disconnected,
            retries: RetryCounter::default(),
            handle: None,
        })
    }

    /// Replace the socket factory.
    pub fn with_connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Append every inbound message to `store` before the handler sees it.
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retries.get()
    }

    /// The subscription confirmed on the current (or last) socket.
    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        self.handle.as_ref()
    }

    /// Derive the unsubscribe body for a subscription. Pure: no I/O.
    pub fn unsubscribe_request(
        original_request_body: &str,
        confirmation: &str,
    ) -> Result<String, TransportError> {
        subscriptions::unsubscribe_request(original_request_body, confirmation)
    }

    /// Subscribe with `request_body` and feed every inbound frame to
    /// `on_message` until it returns [`HandlerAction::Stop`].
    ///
    /// Returns `Ok(())` only when the handler stops the channel. Fails with
    /// the connect error if the very first connection cannot be opened, with
    /// [`TransportError::Rpc`] if the server rejects the subscribe request,
    /// and with [`TransportError::ChannelExhausted`] once the retry budget
    /// is spent.
    pub async fn connect<F, R>(
        &mut self,
        request_body: &str,
        mut on_message: F,
    ) -> Result<(), TransportError>
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        let method = request_method(request_body);
        self.retries.reset();
        self.handle = None;
        let mut opened_once = false;

        loop {
            self.transition(ChannelState::Connecting);

            let mut socket = match self.open_socket().await {
                Ok(socket) => socket,
                Err(e) if !opened_once => {
                    tracing::error!(url = %self.endpoint, error = %e, "WS connect failed");
                    self.transition(ChannelState::Closed);
                    return Err(e);
                }
                Err(e) => {
                    self.recover(e).await?;
                    continue;
                }
            };
            opened_once = true;

            let end = self
                .run_session(socket.as_mut(), request_body, method.as_deref(), &mut on_message)
                .await;
            socket.close().await;

            match end {
                SessionEnd::Stopped => {
                    tracing::info!(url = %self.endpoint, "subscription stopped by handler");
                    self.transition(ChannelState::Closed);
                    return Ok(());
                }
                SessionEnd::Rejected(err) => {
                    tracing::error!(url = %self.endpoint, code = err.code, reason = %err.message, "subscribe request rejected");
                    self.transition(ChannelState::Closed);
                    return Err(TransportError::Rpc(err));
                }
                SessionEnd::Dropped(e) => self.recover(e).await?,
            }
        }
    }

    async fn open_socket(&self) -> Result<Box<dyn TransportSocket>, TransportError> {
        tracing::info!(url = %self.endpoint, "connecting via WebSocket");
        let timeout = self.config.connect_timeout;
        time::timeout(timeout, self.connector.connect(&self.endpoint))
            .await
            .map_err(|_| TransportError::Timeout {
                ms: timeout.as_millis() as u64,
            })?
    }

    /// Count a failure and either wait out the pause or give up.
    async fn recover(&mut self, cause: TransportError) -> Result<(), TransportError> {
        self.transition(ChannelState::Reconnecting);
        let attempt = self.retries.increment();
        match self.retry.next_delay(attempt) {
            Some(delay) => {
                tracing::warn!(
                    url = %self.endpoint,
                    attempt,
                    limit = self.config.retry_limit,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "WS dropped, reconnecting"
                );
                time::sleep(delay).await;
                Ok(())
            }
            None => {
                tracing::error!(
                    url = %self.endpoint,
                    attempts = attempt,
                    error = %cause,
                    "WS retry budget exhausted"
                );
                self.transition(ChannelState::Closed);
                Err(TransportError::ChannelExhausted { attempts: attempt })
            }
        }
    }

    /// Drive one socket from `Subscribing` until it ends.
    async fn run_session<F, R>(
        &mut self,
        socket: &mut dyn TransportSocket,
        request_body: &str,
        method: Option<&str>,
        on_message: &mut F,
    ) -> SessionEnd
    where
        F: FnMut(&str) -> R,
        R: Into<HandlerAction>,
    {
        self.transition(ChannelState::Subscribing);
        if let Err(e) = socket.send_text(request_body.to_owned()).await {
            return SessionEnd::Dropped(e);
        }

        let period = self.config.keepalive_interval;
        let mut keepalive = time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut missed_probes = 0u32;

        loop {
            tokio::select! {
                event = socket.next_event() => match event {
                    SocketEvent::Message(text) => {
                        missed_probes = 0;
                        if self.state == ChannelState::Subscribing {
                            if let Some(err) = subscribe_error(&text) {
                                return SessionEnd::Rejected(err);
                            }
                            self.enter_streaming(method, &text);
                        }
                        self.tap(&text);
                        let action: HandlerAction = on_message(&text).into();
                        if action == HandlerAction::Stop {
                            self.unsubscribe_before_close(socket).await;
                            return SessionEnd::Stopped;
                        }
                    }
                    SocketEvent::Pong => missed_probes = 0,
                    SocketEvent::Closed(reason) => {
                        let reason = reason.unwrap_or_else(|| "stream ended".into());
                        return SessionEnd::Dropped(TransportError::WebSocket(format!(
                            "connection closed: {reason}"
                        )));
                    }
                    SocketEvent::Error(e) => return SessionEnd::Dropped(e),
                },
                _ = keepalive.tick() => {
                    if missed_probes >= self.config.max_missed_probes {
                        return SessionEnd::Dropped(TransportError::Timeout {
                            ms: (period * missed_probes).as_millis() as u64,
                        });
                    }
                    missed_probes += 1;
                    tracing::trace!(missed_probes, "sending keepalive probe");
                    if let Err(e) = socket.send_ping().await {
                        return SessionEnd::Dropped(e);
                    }
                }
            }
        }
    }

    fn enter_streaming(&mut self, method: Option<&str>, confirmation: &str) {
        let handle = method.and_then(|m| SubscriptionHandle::from_confirmation(m, confirmation));
        match (&self.handle, &handle) {
            (Some(old), Some(new)) if old.subscription_id != new.subscription_id => {
                tracing::info!(
                    old = old.subscription_id,
                    new = new.subscription_id,
                    "resubscribed under a new subscription id"
                );
            }
            (_, Some(new)) => {
                tracing::info!(subscription = new.subscription_id, method = %new.method, "subscription confirmed");
            }
            _ => {}
        }
        self.handle = handle;
        self.transition(ChannelState::Streaming);
        self.retries.reset();
    }

    fn tap(&self, message: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.append(message) {
                tracing::warn!(error = %e, "failed to store WS message");
            }
        }
    }

    async fn unsubscribe_before_close(&self, socket: &mut dyn TransportSocket) {
        if !self.config.unsubscribe_on_stop {
            return;
        }
        let Some(handle) = &self.handle else {
            return;
        };
        let body = handle
            .unsubscribe_request()
            .and_then(|req| Ok(serde_json::to_string(&req)?));
        match body {
            Ok(body) => {
                if let Err(e) = socket.send_text(body).await {
                    tracing::debug!(error = %e, "unsubscribe send failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "could not derive unsubscribe request"),
        }
    }

    fn transition(&mut self, next: ChannelState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "channel state");
            self.state = next;
        }
    }
}

impl std::fmt::Debug for SubscriptionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionChannel")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("retries", &self.retries.get())
            .finish()
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), TransportError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(TransportError::Config(
            "websocket endpoint is missing; pass one to the channel explicitly".into(),
        ));
    }
    if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
        return Err(TransportError::Config(format!(
            "websocket endpoint must start with ws:// or wss://, got '{endpoint}'"
        )));
    }
    Ok(())
}

fn request_method(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("method")?.as_str().map(str::to_string)
}

/// The error object of a rejected subscribe request, if `frame` is one.
fn subscribe_error(frame: &str) -> Option<JsonRpcError> {
    serde_json::from_str::<JsonRpcResponse>(frame).ok()?.error
}
