/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Birdeye adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{
    BirdeyeClient,
    BirdeyeError,
    ClientConfig,
    RateLimiter,
    Result,
    WindowLimiter,
    api_key_from_env,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    BirdeyeWebSocket,
    Category,
    ConnectionState,
    EventReceiver,
    SubscriptionFilter,
    SubscriptionRequest,
    WsConfig,
    WsEvent,
};
