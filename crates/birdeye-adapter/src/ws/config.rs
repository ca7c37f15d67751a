/*
[INPUT]:  Caller overrides for the streaming connection
[OUTPUT]: WsConfig consumed by BirdeyeWebSocket
[POS]:    WebSocket layer - connection, reconnection and delivery tuning
[UPDATE]: When adding connection options or changing defaults
*/

use std::time::Duration;

use url::Url;

use crate::http::Result;
use crate::types::Chain;

pub const DEFAULT_STREAM_URL: &str = "wss://public-api.birdeye.so/socket";
pub const DEFAULT_ORIGIN: &str = "ws://public-api.birdeye.so";
pub const DEFAULT_PROTOCOL: &str = "echo-protocol";
pub const DEFAULT_API_KEY_PARAM: &str = "x-api-key";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Streaming client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Streaming endpoint without the chain segment
    pub base_url: String,
    /// Value for the `Origin` and `Sec-WebSocket-Origin` headers
    pub origin: String,
    /// Value for the `Sec-WebSocket-Protocol` header
    pub protocol: String,
    /// Query parameter carrying the API key
    pub api_key_param: String,
    /// Flat delay between reconnection attempts
    pub reconnect_delay: Duration,
    /// Deadline for a single event delivery to one receiver
    pub delivery_timeout: Duration,
    /// Buffer size of each event channel
    pub channel_capacity: usize,
    /// Re-send tracked subscriptions after a successful reconnection
    pub resubscribe_on_reconnect: bool,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STREAM_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            api_key_param: DEFAULT_API_KEY_PARAM.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            resubscribe_on_reconnect: true,
        }
    }
}

impl WsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_resubscribe_on_reconnect(mut self, enabled: bool) -> Self {
        self.resubscribe_on_reconnect = enabled;
        self
    }

    /// `<base_url>/<chain>?<api_key_param>=<api_key>`
    pub fn stream_url(&self, chain: Chain, api_key: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            chain.as_str()
        ))?;
        url.query_pairs_mut()
            .append_pair(&self.api_key_param, api_key);
        Ok(url)
    }
}
