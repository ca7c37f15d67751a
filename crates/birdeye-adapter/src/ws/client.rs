/*
[INPUT]:  Chain, API key, WsConfig and a Connector
[OUTPUT]: Live stream session: read loop, reconnection, outbound subscriptions
[POS]:    WebSocket layer - connection lifecycle and public streaming API
[UPDATE]: When changing connection lifecycle or reconnection policy
*/

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::http::{BirdeyeError, Result};
use crate::types::Chain;
use crate::ws::config::WsConfig;
use crate::ws::connector::{
    ConnectRequest, Connector, FrameSink, FrameStream, Transport, TungsteniteConnector,
};
use crate::ws::dispatcher::route_frame;
use crate::ws::message::Category;
use crate::ws::registry::{EventReceiver, SubscriptionRegistry};
use crate::ws::subscription::{SubscriptionAction, SubscriptionFilter, SubscriptionRequest};

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnecting after a read failure
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// WebSocket client for the Birdeye streaming API.
///
/// Cloning is cheap; all clones drive the same connection.
#[derive(Clone)]
pub struct BirdeyeWebSocket {
    inner: Arc<Inner>,
}

struct Inner {
    chain: Chain,
    api_key: String,
    config: WsConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriptionRegistry>,
    writer: Mutex<Option<FrameSink>>,
    /// Held by `connect` from the liveness check until the read loop is spawned
    connecting: Mutex<()>,
    reconnecting: AtomicBool,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: StdMutex<CancellationToken>,
    subscriptions: StdMutex<Vec<SubscriptionRequest>>,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

impl BirdeyeWebSocket {
    /// Create a client for `chain` with default settings. Not connected yet.
    pub fn new(chain: Chain, api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(chain, api_key, WsConfig::default())
    }

    pub fn with_config(chain: Chain, api_key: impl Into<String>, config: WsConfig) -> Result<Self> {
        Self::with_connector(chain, api_key, config, Arc::new(TungsteniteConnector))
    }

    /// Create a client that performs handshakes through `connector`
    pub fn with_connector(
        chain: Chain,
        api_key: impl Into<String>,
        config: WsConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BirdeyeError::Config("API key must not be empty".to_string()));
        }

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let registry = Arc::new(SubscriptionRegistry::new(config.channel_capacity));

        Ok(Self {
            inner: Arc::new(Inner {
                chain,
                api_key,
                config,
                connector,
                registry,
                writer: Mutex::new(None),
                connecting: Mutex::new(()),
                reconnecting: AtomicBool::new(false),
                state_tx,
                shutdown: StdMutex::new(CancellationToken::new()),
                subscriptions: StdMutex::new(Vec::new()),
                reader: StdMutex::new(None),
            }),
        })
    }

    pub fn chain(&self) -> Chain {
        self.inner.chain
    }

    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch receiver that observes every state transition
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Perform the handshake and start the read loop.
    ///
    /// A failed handshake is returned as `BirdeyeError::Connect` and is not retried.
    /// Overlapping calls are serialized; only one of them starts a session.
    pub async fn connect(&self) -> Result<()> {
        let _connecting = self.inner.connecting.lock().await;
        if lock(&self.inner.reader)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            return Err(BirdeyeError::AlreadyConnected);
        }

        let shutdown = self.inner.reset_shutdown();
        self.inner.set_state(ConnectionState::Connecting);

        let Transport { sink, stream } = match self.inner.establish().await {
            Ok(transport) => transport,
            Err(err) => {
                self.inner.set_state(ConnectionState::Disconnected);
                error!(chain = %self.inner.chain, error = %err, "ws connect failed");
                return Err(err);
            }
        };

        *self.inner.writer.lock().await = Some(sink);
        self.inner.set_state(ConnectionState::Connected);
        info!(chain = %self.inner.chain, "ws connected");

        let handle = tokio::spawn(Arc::clone(&self.inner).read_loop(stream, shutdown));
        *lock(&self.inner.reader) = Some(handle);
        Ok(())
    }

    /// Stop the session. No reconnection follows; `connect` may be called again.
    pub async fn close(&self) {
        lock(&self.inner.shutdown).cancel();

        let sink = self.inner.writer.lock().await.take();
        if let Some(mut sink) = sink
            && let Err(err) = sink.close().await
        {
            debug!(error = %err, "ws close frame not sent");
        }

        let reader = lock(&self.inner.reader).take();
        if let Some(handle) = reader {
            let _ = handle.await;
        }

        lock(&self.inner.subscriptions).clear();
        self.inner.set_state(ConnectionState::Disconnected);
        info!(chain = %self.inner.chain, "ws closed");
    }

    /// Validate and write one subscribe/unsubscribe frame.
    pub async fn send(&self, request: SubscriptionRequest) -> Result<()> {
        request.validate()?;
        self.inner.write_request(&request).await?;
        self.inner.track(&request);

        info!(
            action = action_name(request.action),
            message_type = request.type_tag(),
            "ws subscription sent"
        );
        Ok(())
    }

    pub async fn subscribe(&self, filter: SubscriptionFilter) -> Result<()> {
        self.send(SubscriptionRequest::subscribe(filter)).await
    }

    pub async fn unsubscribe(&self, filter: SubscriptionFilter) -> Result<()> {
        self.send(SubscriptionRequest::unsubscribe(filter)).await
    }

    /// Register a bounded event channel for `category`
    pub fn new_channel(&self, category: Category) -> EventReceiver {
        self.inner.registry.new_channel(category)
    }

    /// Unregister and close a channel. Returns `false` if it was already removed.
    pub fn remove_channel(&self, receiver: &EventReceiver) -> bool {
        self.inner.registry.remove_channel(receiver)
    }

    pub fn subscriber_count(&self, category: Category) -> usize {
        self.inner.registry.subscriber_count(category)
    }

    /// Subscriptions that will be replayed after a reconnection
    pub fn active_subscriptions(&self) -> Vec<SubscriptionRequest> {
        lock(&self.inner.subscriptions).clone()
    }
}

impl fmt::Debug for BirdeyeWebSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BirdeyeWebSocket")
            .field("chain", &self.inner.chain)
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Token for a new session; a token cancelled by `close` is replaced.
    fn reset_shutdown(&self) -> CancellationToken {
        let mut shutdown = lock(&self.shutdown);
        if shutdown.is_cancelled() {
            *shutdown = CancellationToken::new();
        }
        shutdown.clone()
    }

    async fn establish(&self) -> Result<Transport> {
        let request = ConnectRequest {
            url: self.config.stream_url(self.chain, &self.api_key)?,
            origin: self.config.origin.clone(),
            protocol: self.config.protocol.clone(),
        };
        self.connector.connect(&request).await
    }

    async fn read_loop(self: Arc<Self>, mut stream: FrameStream, shutdown: CancellationToken) {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(frame)) => {
                    route_frame(frame, &self.registry, self.config.delivery_timeout);
                    continue;
                }
                Some(Err(err)) => warn!(chain = %self.chain, error = %err, "ws read failed"),
                None => warn!(chain = %self.chain, "ws stream ended"),
            }

            match self.reconnect(&shutdown).await {
                Some(fresh) => stream = fresh,
                None if shutdown.is_cancelled() => break,
                None => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
        debug!(chain = %self.chain, "ws read loop stopped");
    }

    /// Re-establish the connection until it succeeds or the session is closed.
    ///
    /// Only one attempt runs at a time; a concurrent caller gets `None`
    /// immediately.
    async fn reconnect(&self, shutdown: &CancellationToken) -> Option<FrameStream> {
        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("ws reconnect already in progress");
            return None;
        }
        let _guard = ReconnectGuard(&self.reconnecting);

        self.writer.lock().await.take();

        let mut attempt = 0u32;
        loop {
            if shutdown.is_cancelled() {
                return None;
            }
            attempt += 1;
            self.set_state(ConnectionState::Reconnecting { attempt });
            info!(chain = %self.chain, attempt, "ws reconnecting");

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => return None,
                outcome = self.establish() => outcome,
            };

            match outcome {
                Ok(Transport { sink, stream }) => {
                    {
                        let mut writer = self.writer.lock().await;
                        if shutdown.is_cancelled() {
                            return None;
                        }
                        *writer = Some(sink);
                    }
                    self.set_state(ConnectionState::Connected);
                    info!(chain = %self.chain, attempt, "ws reconnected");

                    if self.config.resubscribe_on_reconnect {
                        self.resubscribe().await;
                    }
                    return Some(stream);
                }
                Err(err) => {
                    error!(chain = %self.chain, attempt, error = %err, "ws reconnect failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
    }

    async fn resubscribe(&self) {
        let requests = lock(&self.subscriptions).clone();
        for request in &requests {
            match self.write_request(request).await {
                Ok(()) => debug!(message_type = request.type_tag(), "ws subscription replayed"),
                Err(err) => {
                    warn!(message_type = request.type_tag(), error = %err, "ws subscription replay failed");
                }
            }
        }
        if !requests.is_empty() {
            info!(count = requests.len(), "ws subscriptions replayed");
        }
    }

    async fn write_request(&self, request: &SubscriptionRequest) -> Result<()> {
        let payload = serde_json::to_string(request)?;
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(BirdeyeError::NotConnected)?;
        sink.send(Message::text(payload)).await?;
        Ok(())
    }

    fn track(&self, request: &SubscriptionRequest) {
        let mut subscriptions = lock(&self.subscriptions);
        match request.action {
            SubscriptionAction::Subscribe => {
                if !subscriptions.iter().any(|tracked| tracked.filter == request.filter) {
                    subscriptions.push(request.clone());
                }
            }
            SubscriptionAction::Unsubscribe => {
                subscriptions.retain(|tracked| tracked.filter != request.filter);
            }
        }
    }
}

/// Clears the in-progress flag however the attempt ends
struct ReconnectGuard<'a>(&'a AtomicBool);

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn action_name(action: SubscriptionAction) -> &'static str {
    match action {
        SubscriptionAction::Subscribe => "subscribe",
        SubscriptionAction::Unsubscribe => "unsubscribe",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartType;
    use crate::ws::subscription::{Currency, PriceFilter};
    use async_trait::async_trait;
    use futures_util::{sink, stream};
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite;

    /// Connects after a delay with a transport that never yields frames
    struct SlowConnector {
        attempts: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl Connector for SlowConnector {
        async fn connect(&self, _request: &ConnectRequest) -> Result<Transport> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let sink = sink::drain::<Message>().sink_map_err(|never: Infallible| -> tungstenite::Error {
                match never {}
            });
            let stream = stream::pending::<std::result::Result<Message, tungstenite::Error>>();
            Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
        }
    }

    fn slow_client(attempts: &Arc<AtomicUsize>) -> BirdeyeWebSocket {
        let connector = SlowConnector {
            attempts: Arc::clone(attempts),
            delay: Duration::from_secs(1),
        };
        BirdeyeWebSocket::with_connector(
            Chain::Solana,
            "test-key",
            WsConfig::default(),
            Arc::new(connector),
        )
        .expect("client")
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = BirdeyeWebSocket::new(Chain::Solana, "  ").expect_err("empty key");
        assert!(matches!(err, BirdeyeError::Config(_)));
    }

    #[tokio::test]
    async fn test_close_before_connect_is_noop() {
        let client = BirdeyeWebSocket::new(Chain::Ethereum, "key").expect("client");
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reconnects_run_one_handshake() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = slow_client(&attempts);
        let token = CancellationToken::new();

        let (first, second) = tokio::join!(
            client.inner.reconnect(&token),
            client.inner.reconnect(&token)
        );

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(usize::from(first.is_some()) + usize::from(second.is_some()), 1);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(!client.inner.reconnecting.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_stops_when_cancelled() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = slow_client(&attempts);
        let token = CancellationToken::new();
        token.cancel();

        assert!(client.inner.reconnect(&token).await.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice_is_rejected() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = slow_client(&attempts);

        client.connect().await.expect("first connect");
        assert!(client.state().is_connected());
        assert!(matches!(
            client.connect().await,
            Err(BirdeyeError::AlreadyConnected)
        ));

        client.close().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        client.connect().await.expect("connect after close");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_connects_start_one_session() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = slow_client(&attempts);

        let (first, second) = tokio::join!(client.connect(), client.connect());

        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        assert!(
            matches!(first, Err(BirdeyeError::AlreadyConnected))
                || matches!(second, Err(BirdeyeError::AlreadyConnected))
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(client.state().is_connected());

        client.close().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_tracking_adds_once_and_unsubscribe_removes() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = slow_client(&attempts);
        let filter = SubscriptionFilter::Price(PriceFilter::new(
            "So11111111111111111111111111111111111111112",
            ChartType::OneMinute,
            Currency::Usd,
        ));

        client.inner.track(&SubscriptionRequest::subscribe(filter.clone()));
        client.inner.track(&SubscriptionRequest::subscribe(filter.clone()));
        assert_eq!(client.active_subscriptions().len(), 1);

        client.inner.track(&SubscriptionRequest::unsubscribe(filter));
        assert!(client.active_subscriptions().is_empty());
    }
}
