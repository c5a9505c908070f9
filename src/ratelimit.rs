use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorRateLimiter};

/// Keeps page fetches at least `period` apart so the catalog site isn't
/// hammered. A zero period disables the limit.
pub struct RateLimiter {
    between_req: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        // `with_period` only refuses a zero period, which means "no limit".
        let between_req = Quota::with_period(period).map(GovernorRateLimiter::direct);
        RateLimiter { between_req }
    }

    pub async fn wait_until_ready(&self) {
        if let Some(limiter) = &self.between_req {
            limiter.until_ready().await;
        }
    }
}
