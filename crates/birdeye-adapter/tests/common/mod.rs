/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, scripted connector and in-memory transports
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for birdeye-adapter tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use birdeye_adapter::ws::{ConnectRequest, Connector, Transport};
use birdeye_adapter::{BirdeyeError, BirdeyeWebSocket, Chain, Result, WsConfig};
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-key";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server end of an in-memory connection
pub struct ServerSide {
    frames: mpsc::UnboundedSender<std::result::Result<Message, tungstenite::Error>>,
    sent: mpsc::UnboundedReceiver<Message>,
}

impl ServerSide {
    pub fn push_text(&self, text: &str) {
        let _ = self.frames.send(Ok(Message::text(text.to_owned())));
    }

    pub fn push_frame(&self, frame: Message) {
        let _ = self.frames.send(Ok(frame));
    }

    /// Make the client's next read fail
    pub fn fail(&self) {
        let _ = self.frames.send(Err(tungstenite::Error::ConnectionClosed));
    }

    /// Next frame the client wrote, as JSON
    pub async fn next_sent_json(&mut self) -> Option<serde_json::Value> {
        match self.sent.recv().await? {
            Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
            _ => None,
        }
    }

    pub fn try_next_sent(&mut self) -> Option<Message> {
        self.sent.try_recv().ok()
    }
}

/// A connected client transport and the server end that drives it
pub fn transport_pair() -> (Transport, ServerSide) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel::<Message>();

    let stream = stream::unfold(frames_rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    let sink = sink::unfold(sent_tx, |tx, message: Message| async move {
        tx.send(message)
            .map_err(|_| tungstenite::Error::ConnectionClosed)?;
        Ok::<_, tungstenite::Error>(tx)
    });

    (
        Transport::new(Box::pin(sink), Box::pin(stream)),
        ServerSide {
            frames: frames_tx,
            sent: sent_rx,
        },
    )
}

/// Connector that replays a fixed list of handshake outcomes
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Result<Transport>>>,
    attempts: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ConnectRequest>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful handshake and return its server end
    pub fn push_ok(&self) -> ServerSide {
        let (transport, server) = transport_pair();
        self.script.lock().unwrap().push_back(Ok(transport));
        server
    }

    /// Queue a rejected handshake
    pub fn push_err(&self, status: Option<u16>) {
        self.script.lock().unwrap().push_back(Err(BirdeyeError::Connect {
            status,
            source: tungstenite::Error::ConnectionClosed,
        }));
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Transport> {
        self.attempts.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(BirdeyeError::Connect {
                status: Some(503),
                source: tungstenite::Error::ConnectionClosed,
            })
        })
    }
}

pub fn scripted_client(connector: &Arc<ScriptedConnector>, config: WsConfig) -> BirdeyeWebSocket {
    BirdeyeWebSocket::with_connector(Chain::Solana, TEST_API_KEY, config, connector.clone())
        .expect("client init")
}

pub fn price_frame(address: &str, close: f64) -> String {
    serde_json::json!({
        "type": "PRICE_DATA",
        "data": {
            "o": 24.5, "h": 25.1, "l": 24.2, "c": close,
            "eventType": "ohlcv", "type": "1m", "unixTime": 1_675_506_000,
            "v": 1203.7, "symbol": "SOL", "address": address
        }
    })
    .to_string()
}
