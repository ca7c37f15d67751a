/*
[INPUT]:  Raw WebSocket text frames ({"type": .., "data": ..})
[OUTPUT]: Category tags, typed stream payloads, InboundMessage classification
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing payload fields
*/

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WELCOME_TAG: &str = "WELCOME";
pub const ERROR_TAG: &str = "ERROR";

/// Streaming data kind. Each category owns one inbound data tag and one
/// subscribe/unsubscribe tag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Price,
    Txs,
    BaseQuotePrice,
    TokenNewListing,
    NewPair,
    LargeTradeTxs,
    WalletTxs,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Price,
        Category::Txs,
        Category::BaseQuotePrice,
        Category::TokenNewListing,
        Category::NewPair,
        Category::LargeTradeTxs,
        Category::WalletTxs,
    ];

    /// Tag carried by inbound frames of this category
    pub fn data_tag(self) -> &'static str {
        match self {
            Category::Price => "PRICE_DATA",
            Category::Txs => "TXS_DATA",
            Category::BaseQuotePrice => "BASE_QUOTE_PRICE_DATA",
            Category::TokenNewListing => "TOKEN_NEW_LISTING_DATA",
            Category::NewPair => "NEW_PAIR_DATA",
            Category::LargeTradeTxs => "TXS_LARGE_TRADE_DATA",
            Category::WalletTxs => "WALLET_TXS_DATA",
        }
    }

    pub fn subscribe_tag(self) -> &'static str {
        match self {
            Category::Price => "SUBSCRIBE_PRICE",
            Category::Txs => "SUBSCRIBE_TXS",
            Category::BaseQuotePrice => "SUBSCRIBE_BASE_QUOTE_PRICE",
            Category::TokenNewListing => "SUBSCRIBE_TOKEN_NEW_LISTING",
            Category::NewPair => "SUBSCRIBE_NEW_PAIR",
            Category::LargeTradeTxs => "SUBSCRIBE_LARGE_TRADE_TXS",
            Category::WalletTxs => "SUBSCRIBE_WALLET_TXS",
        }
    }

    pub fn unsubscribe_tag(self) -> &'static str {
        match self {
            Category::Price => "UNSUBSCRIBE_PRICE",
            Category::Txs => "UNSUBSCRIBE_TXS",
            Category::BaseQuotePrice => "UNSUBSCRIBE_BASE_QUOTE_PRICE",
            Category::TokenNewListing => "UNSUBSCRIBE_TOKEN_NEW_LISTING",
            Category::NewPair => "UNSUBSCRIBE_NEW_PAIR",
            Category::LargeTradeTxs => "UNSUBSCRIBE_LARGE_TRADE_TXS",
            Category::WalletTxs => "UNSUBSCRIBE_WALLET_TXS",
        }
    }

    pub fn from_data_tag(tag: &str) -> Option<Category> {
        match tag {
            "PRICE_DATA" => Some(Category::Price),
            "TXS_DATA" => Some(Category::Txs),
            "BASE_QUOTE_PRICE_DATA" => Some(Category::BaseQuotePrice),
            "TOKEN_NEW_LISTING_DATA" => Some(Category::TokenNewListing),
            "NEW_PAIR_DATA" => Some(Category::NewPair),
            "TXS_LARGE_TRADE_DATA" => Some(Category::LargeTradeTxs),
            "WALLET_TXS_DATA" => Some(Category::WalletTxs),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data_tag())
    }
}

/// OHLCV update for a token or pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsPriceData {
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    /// e.g. "ohlcv"
    pub event_type: String,
    /// Candle interval as sent by the server, e.g. "1m" or "1s"
    #[serde(rename = "type")]
    pub chart_type: String,
    /// Seconds
    pub unix_time: i64,
    pub v: f64,
    /// "SOL" for a token, "SOL-USDC" for a pair
    pub symbol: String,
    pub address: String,
}

/// One side of a swap in a transaction update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsTxTokenInfo {
    pub symbol: String,
    pub decimals: i64,
    pub address: String,
    /// Raw amount; the server sends either a number or a string
    pub amount: Value,
    #[serde(rename = "type")]
    pub kind: String,
    /// "from" or "to"
    pub type_swap: String,
    pub ui_amount: f64,
    pub price: Option<f64>,
    /// Fallback when `price` is missing
    pub nearest_price: f64,
    pub change_amount: Value,
    pub ui_change_amount: f64,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsTxsData {
    pub block_unix_time: i64,
    pub owner: String,
    pub source: String,
    pub tx_hash: String,
    pub alias: Option<String>,
    /// Trade executed through Birdeye
    pub is_trade_on_be: bool,
    pub platform: String,
    #[serde(rename = "volumeUSD")]
    pub volume_usd: f64,
    pub from: WsTxTokenInfo,
    pub to: WsTxTokenInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsBaseQuotePriceData {
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub event_type: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub unix_time: i64,
    /// Always 0 for base/quote candles
    pub v: f64,
    pub base_address: String,
    pub quote_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsTokenNewListingData {
    pub address: String,
    pub decimals: i64,
    pub name: String,
    pub symbol: String,
    /// USD
    pub liquidity: f64,
    pub liquidity_added_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsNewPairTokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsNewPairData {
    pub address: String,
    pub name: String,
    pub source: String,
    pub base: WsNewPairTokenInfo,
    pub quote: WsNewPairTokenInfo,
    pub tx_hash: String,
    /// Sent as a string or a bare number depending on the chain
    #[serde(deserialize_with = "string_or_number")]
    pub block_time: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsLargeTradeTxsTokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i64,
    pub ui_amount: f64,
    pub price: f64,
    pub nearest_price: f64,
    pub ui_change_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsLargeTradeTxsData {
    pub block_unix_time: i64,
    pub block_human_time: String,
    pub owner: String,
    pub source: String,
    pub pool_address: String,
    pub tx_hash: String,
    #[serde(rename = "volumeUSD")]
    pub volume_usd: f64,
    pub network: String,
    pub from: WsLargeTradeTxsTokenInfo,
    pub to: WsLargeTradeTxsTokenInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsWalletTxsTokenInfo {
    pub symbol: String,
    pub decimals: i64,
    pub address: String,
    pub ui_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WsWalletTxsData {
    #[serde(rename = "type")]
    pub kind: String,
    pub block_unix_time: i64,
    pub block_human_time: String,
    pub owner: String,
    pub source: String,
    pub tx_hash: String,
    #[serde(rename = "volumeUSD")]
    pub volume_usd: f64,
    pub network: String,
    pub base: WsWalletTxsTokenInfo,
    pub quote: WsWalletTxsTokenInfo,
}

/// A decoded, deliverable stream event
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Price(WsPriceData),
    Txs(WsTxsData),
    BaseQuotePrice(WsBaseQuotePriceData),
    TokenNewListing(WsTokenNewListingData),
    NewPair(WsNewPairData),
    LargeTradeTxs(WsLargeTradeTxsData),
    WalletTxs(WsWalletTxsData),
}

impl WsEvent {
    pub fn category(&self) -> Category {
        match self {
            WsEvent::Price(_) => Category::Price,
            WsEvent::Txs(_) => Category::Txs,
            WsEvent::BaseQuotePrice(_) => Category::BaseQuotePrice,
            WsEvent::TokenNewListing(_) => Category::TokenNewListing,
            WsEvent::NewPair(_) => Category::NewPair,
            WsEvent::LargeTradeTxs(_) => Category::LargeTradeTxs,
            WsEvent::WalletTxs(_) => Category::WalletTxs,
        }
    }

    /// Decode the `data` object of a frame whose tag selected `category`.
    pub fn decode(category: Category, data: Value) -> serde_json::Result<Self> {
        Ok(match category {
            Category::Price => WsEvent::Price(serde_json::from_value(data)?),
            Category::Txs => WsEvent::Txs(serde_json::from_value(data)?),
            Category::BaseQuotePrice => WsEvent::BaseQuotePrice(serde_json::from_value(data)?),
            Category::TokenNewListing => WsEvent::TokenNewListing(serde_json::from_value(data)?),
            Category::NewPair => WsEvent::NewPair(serde_json::from_value(data)?),
            Category::LargeTradeTxs => WsEvent::LargeTradeTxs(serde_json::from_value(data)?),
            Category::WalletTxs => WsEvent::WalletTxs(serde_json::from_value(data)?),
        })
    }
}

/// Classification of one inbound text frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Connection acknowledged by the server
    Welcome(Value),
    /// Server-reported error
    Error(Value),
    Event(WsEvent),
    Unrecognized { tag: String, data: Value },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    data: Value,
}

impl InboundMessage {
    /// Parse a text frame. Fails on malformed JSON, a non-string `type`, or a
    /// payload that does not fit the type its tag selects.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let RawEnvelope { tag, data } = serde_json::from_str(text)?;

        if tag == WELCOME_TAG {
            return Ok(InboundMessage::Welcome(data));
        }
        if tag == ERROR_TAG {
            return Ok(InboundMessage::Error(data));
        }

        match Category::from_data_tag(&tag) {
            Some(category) => Ok(InboundMessage::Event(WsEvent::decode(category, data)?)),
            None => Ok(InboundMessage::Unrecognized { tag, data }),
        }
    }
}
