/*
[INPUT]:  Request capacity per time window
[OUTPUT]: Async permits gating outbound REST requests
[POS]:    HTTP layer - client-side request pacing
[UPDATE]: When Birdeye plan limits change
*/

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Waits until a request is permitted to go out.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Fixed-window limiter: at most `capacity` permits per `window`.
#[derive(Debug)]
pub struct WindowLimiter {
    window: Duration,
    capacity: u32,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    started_at: Instant,
    used: u32,
}

impl WindowLimiter {
    pub fn new(window: Duration, capacity: u32) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            state: Mutex::new(WindowState {
                started_at: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Standard plan: 1 request per second
    pub fn standard() -> Self {
        Self::new(Duration::from_secs(1), 1)
    }

    /// Starter plan: 15 requests per second
    pub fn starter() -> Self {
        Self::new(Duration::from_secs(1), 15)
    }

    /// Premium plan: 1000 requests per minute
    pub fn premium() -> Self {
        Self::new(Duration::from_secs(60), 1000)
    }

    /// Business plan: 1500 requests per minute
    pub fn business() -> Self {
        Self::new(Duration::from_secs(60), 1500)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl RateLimiter for WindowLimiter {
    async fn acquire(&self) {
        loop {
            let wake_at = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                if now.duration_since(state.started_at) >= self.window {
                    state.started_at = now;
                    state.used = 0;
                }
                if state.used < self.capacity {
                    state.used += 1;
                    return;
                }
                state.started_at + self.window
            };
            tokio::time::sleep_until(wake_at).await;
        }
    }
}

/// Limiter that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}
