/*
[INPUT]:  HTTP client configuration, API key and rate limiter
[OUTPUT]: Enveloped REST responses and the crate-wide error type
[POS]:    HTTP layer - REST API communication
[UPDATE]: When changing the transport or error taxonomy
*/

pub mod client;
pub mod error;
pub mod limiter;

pub use error::{BirdeyeError, Result};
pub use limiter::{RateLimiter, Unlimited, WindowLimiter};

pub use client::{API_KEY_ENV, BASE_URL, BirdeyeClient, ClientConfig, api_key_from_env};
