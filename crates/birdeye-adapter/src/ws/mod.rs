/*
[INPUT]:  Chain, API key and streaming configuration
[OUTPUT]: Typed real-time events fanned out to per-category channels
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new categories or changing connection logic
*/

pub mod client;
pub mod config;
pub mod connector;
mod dispatcher;
pub mod message;
pub mod registry;
pub mod subscription;

pub use client::{BirdeyeWebSocket, ConnectionState};
pub use config::WsConfig;
pub use connector::{ConnectRequest, Connector, FrameSink, FrameStream, Transport, TungsteniteConnector};
pub use message::{Category, InboundMessage, WsEvent};
pub use registry::{EventReceiver, SubscriberId, SubscriptionRegistry};
pub use subscription::{
    ComplexQuery, Currency, QueryType, SubscriptionAction, SubscriptionFilter, SubscriptionRequest,
    join_queries,
};
