/*
[INPUT]:  Stream URL, origin and sub-protocol for the upgrade request
[OUTPUT]: Split read/write halves of an established WebSocket
[POS]:    WebSocket layer - transport seam between client and network
[UPDATE]: When changing handshake headers or the transport backend
*/

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{self, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::http::{BirdeyeError, Result};

const SEC_WEBSOCKET_ORIGIN: HeaderName = HeaderName::from_static("sec-websocket-origin");

/// Write half of a connection
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;
/// Read half of a connection
pub type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, tungstenite::Error>> + Send>>;

/// Everything needed to perform one upgrade handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: Url,
    pub origin: String,
    pub protocol: String,
}

/// An established connection, already split so reads and writes can run concurrently
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Performs the WebSocket upgrade.
///
/// Failures must be reported as `BirdeyeError::Connect` so callers can see
/// the HTTP status of a rejected handshake.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, request: &ConnectRequest) -> Result<Transport>;
}

/// Network connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Transport> {
        let mut upgrade = request
            .url
            .as_str()
            .into_client_request()
            .map_err(BirdeyeError::connect)?;

        let origin = header_value("origin", &request.origin)?;
        let headers = upgrade.headers_mut();
        headers.insert(header::ORIGIN, origin.clone());
        headers.insert(SEC_WEBSOCKET_ORIGIN, origin);
        headers.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            header_value("protocol", &request.protocol)?,
        );

        let (ws_stream, response) = connect_async(upgrade)
            .await
            .map_err(BirdeyeError::connect)?;
        debug!(
            host = request.url.host_str().unwrap_or_default(),
            status = response.status().as_u16(),
            "ws handshake completed"
        );

        let (sink, stream) = ws_stream.split();
        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| BirdeyeError::Config(format!("invalid {name} header value: {err}")))
}
