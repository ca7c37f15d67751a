/*
[INPUT]:  Caller-chosen category filters
[OUTPUT]: Validated {"type": .., "data": ..} subscribe/unsubscribe frames
[POS]:    WebSocket layer - outbound control messages
[UPDATE]: When Birdeye changes filter fields or server-side floors
*/

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::http::{BirdeyeError, Result};
use crate::types::ChartType;
use crate::ws::message::Category;

/// Server-side minimum for `TokenNewListingFilter::min_liquidity`
pub const NEW_LISTING_MIN_LIQUIDITY_FLOOR: f64 = 10.0;
/// Server-side minimum for `LargeTradeTxsFilter::min_volume` (USD)
pub const LARGE_TRADE_MIN_VOLUME_FLOOR: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Simple,
    Complex,
}

/// Quote currency of price candles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// Token price in USD
    Usd,
    /// Pair price in the quote token
    Pair,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Pair => "pair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    pub query_type: QueryType,
    pub chart_type: ChartType,
    pub address: String,
    pub currency: Currency,
}

impl PriceFilter {
    pub fn new(address: impl Into<String>, chart_type: ChartType, currency: Currency) -> Self {
        Self {
            query_type: QueryType::Simple,
            chart_type,
            address: address.into(),
            currency,
        }
    }

    /// Clause usable in a complex query
    pub fn query(&self) -> String {
        format!(
            "(address = {} AND chartType = {} AND currency = {})",
            self.address,
            self.chart_type,
            self.currency.as_str()
        )
    }
}

/// Set exactly one of `address` (token) or `pair_address`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxsFilter {
    pub query_type: QueryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_address: Option<String>,
}

impl TxsFilter {
    pub fn token(address: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Simple,
            address: Some(address.into()),
            pair_address: None,
        }
    }

    pub fn pair(pair_address: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Simple,
            address: None,
            pair_address: Some(pair_address.into()),
        }
    }

    pub fn query(&self) -> String {
        match (&self.address, &self.pair_address) {
            (Some(address), _) => format!("address = {address}"),
            (None, Some(pair)) => format!("pairAddress = {pair}"),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseQuotePriceFilter {
    pub base_address: String,
    pub quote_address: String,
    pub chart_type: ChartType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenNewListingFilter {
    /// Include listings from meme platforms such as pump.fun
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meme_platform_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_liquidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_liquidity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewPairFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_liquidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_liquidity: Option<f64>,
}

/// Trades for any token whose USD volume falls inside the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargeTradeTxsFilter {
    pub min_volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletTxsFilter {
    pub address: String,
}

/// Free-form query joining several simple clauses, see [`join_queries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexQuery {
    pub query_type: QueryType,
    pub query: String,
}

impl ComplexQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Complex,
            query: query.into(),
        }
    }
}

/// Join simple clauses into one complex query (`a OR b OR c`).
pub fn join_queries<I, S>(queries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    queries
        .into_iter()
        .map(|query| query.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionFilter {
    Price(PriceFilter),
    Txs(TxsFilter),
    BaseQuotePrice(BaseQuotePriceFilter),
    TokenNewListing(TokenNewListingFilter),
    NewPair(NewPairFilter),
    LargeTradeTxs(LargeTradeTxsFilter),
    WalletTxs(WalletTxsFilter),
    /// Only `Category::Price` and `Category::Txs` accept complex queries
    Complex {
        category: Category,
        query: ComplexQuery,
    },
}

impl SubscriptionFilter {
    pub fn category(&self) -> Category {
        match self {
            SubscriptionFilter::Price(_) => Category::Price,
            SubscriptionFilter::Txs(_) => Category::Txs,
            SubscriptionFilter::BaseQuotePrice(_) => Category::BaseQuotePrice,
            SubscriptionFilter::TokenNewListing(_) => Category::TokenNewListing,
            SubscriptionFilter::NewPair(_) => Category::NewPair,
            SubscriptionFilter::LargeTradeTxs(_) => Category::LargeTradeTxs,
            SubscriptionFilter::WalletTxs(_) => Category::WalletTxs,
            SubscriptionFilter::Complex { category, .. } => *category,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SubscriptionFilter::Price(filter) => require_non_empty("price address", &filter.address),
            SubscriptionFilter::Txs(filter) => match (&filter.address, &filter.pair_address) {
                (Some(_), Some(_)) => Err(invalid(
                    "txs filter takes either a token address or a pair address, not both",
                )),
                (None, None) => Err(invalid("txs filter needs a token address or a pair address")),
                (Some(address), None) => require_non_empty("txs token address", address),
                (None, Some(pair)) => require_non_empty("txs pair address", pair),
            },
            SubscriptionFilter::BaseQuotePrice(filter) => {
                require_non_empty("base address", &filter.base_address)?;
                require_non_empty("quote address", &filter.quote_address)
            }
            SubscriptionFilter::TokenNewListing(filter) => {
                if let Some(min) = filter.min_liquidity
                    && (min.is_nan() || min <= NEW_LISTING_MIN_LIQUIDITY_FLOOR)
                {
                    return Err(invalid(format!(
                        "min_liquidity must be greater than {NEW_LISTING_MIN_LIQUIDITY_FLOOR}"
                    )));
                }
                check_range("liquidity", filter.min_liquidity, filter.max_liquidity)
            }
            SubscriptionFilter::NewPair(filter) => {
                check_range("liquidity", filter.min_liquidity, filter.max_liquidity)
            }
            SubscriptionFilter::LargeTradeTxs(filter) => {
                if filter.min_volume.is_nan() || filter.min_volume < LARGE_TRADE_MIN_VOLUME_FLOOR {
                    return Err(invalid(format!(
                        "min_volume must be at least {LARGE_TRADE_MIN_VOLUME_FLOOR}"
                    )));
                }
                check_range("volume", Some(filter.min_volume), filter.max_volume)
            }
            SubscriptionFilter::WalletTxs(filter) => {
                require_non_empty("wallet address", &filter.address)
            }
            SubscriptionFilter::Complex { category, query } => {
                if !matches!(category, Category::Price | Category::Txs) {
                    return Err(invalid(format!(
                        "complex queries are not supported for {category}"
                    )));
                }
                require_non_empty("complex query", &query.query)
            }
        }
    }
}

impl Serialize for SubscriptionFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SubscriptionFilter::Price(filter) => filter.serialize(serializer),
            SubscriptionFilter::Txs(filter) => filter.serialize(serializer),
            SubscriptionFilter::BaseQuotePrice(filter) => filter.serialize(serializer),
            SubscriptionFilter::TokenNewListing(filter) => filter.serialize(serializer),
            SubscriptionFilter::NewPair(filter) => filter.serialize(serializer),
            SubscriptionFilter::LargeTradeTxs(filter) => filter.serialize(serializer),
            SubscriptionFilter::WalletTxs(filter) => filter.serialize(serializer),
            SubscriptionFilter::Complex { query, .. } => query.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// Outbound control message, serialized as `{"type": <tag>, "data": <filter>}`
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRequest {
    pub action: SubscriptionAction,
    pub filter: SubscriptionFilter,
}

impl SubscriptionRequest {
    pub fn subscribe(filter: SubscriptionFilter) -> Self {
        Self {
            action: SubscriptionAction::Subscribe,
            filter,
        }
    }

    pub fn unsubscribe(filter: SubscriptionFilter) -> Self {
        Self {
            action: SubscriptionAction::Unsubscribe,
            filter,
        }
    }

    pub fn category(&self) -> Category {
        self.filter.category()
    }

    /// Wire value of the `type` field
    pub fn type_tag(&self) -> &'static str {
        match self.action {
            SubscriptionAction::Subscribe => self.category().subscribe_tag(),
            SubscriptionAction::Unsubscribe => self.category().unsubscribe_tag(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()
    }
}

/// Large-trade payloads repeat the request tag inside `data`.
#[derive(Serialize)]
struct TaggedLargeTradeTxs<'a> {
    #[serde(rename = "type")]
    tag: &'static str,
    #[serde(flatten)]
    filter: &'a LargeTradeTxsFilter,
}

impl Serialize for SubscriptionRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("SubscriptionRequest", 2)?;
        envelope.serialize_field("type", self.type_tag())?;
        match &self.filter {
            SubscriptionFilter::LargeTradeTxs(filter) => envelope.serialize_field(
                "data",
                &TaggedLargeTradeTxs {
                    tag: self.type_tag(),
                    filter,
                },
            )?,
            filter => envelope.serialize_field("data", filter)?,
        }
        envelope.end()
    }
}

fn invalid(message: impl Into<String>) -> BirdeyeError {
    BirdeyeError::InvalidSubscription(message.into())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn check_range(name: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
    if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
        return Err(invalid(format!("{name} bounds must be numbers")));
    }
    if let (Some(min), Some(max)) = (min, max)
        && max <= min
    {
        return Err(invalid(format!(
            "max {name} ({max}) must be greater than min {name} ({min})"
        )));
    }
    Ok(())
}
