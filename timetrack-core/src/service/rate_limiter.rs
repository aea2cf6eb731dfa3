//! Fixed-window rate limiting keyed by `(route class, client ip)`, backed
//! by the same Redis instance as the session store via
//! [`RedisClient::incr_fixed_window`].

use shared::{config::RateLimitConfig, errors::ApiError, redis_client::RedisClient};
use std::time::Duration;

/// Which limit applies to a request. Auth routes (register/login/refresh)
/// get a tighter window than the rest of the API because they are the
/// target of credential-stuffing and brute force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Auth,
    Api,
}

#[derive(Clone)]
pub struct RateLimiter {
    redis: RedisClient,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(redis: RedisClient, config: RateLimitConfig) -> Self {
        Self { redis, config }
    }

    /// Increments the window counter for `(class, client_key)` and returns
    /// `Err(ApiError::TooManyRequests)` once the class's limit is exceeded.
    pub async fn check(&self, class: RouteClass, client_key: &str) -> Result<(), ApiError> {
        let (limit, window_seconds, prefix) = match class {
            RouteClass::Auth => (self.config.auth_attempts, self.config.auth_window_seconds, "ratelimit:auth"),
            RouteClass::Api => (self.config.api_attempts, self.config.api_window_seconds, "ratelimit:api"),
        };

        let key = format!("{prefix}:{client_key}");
        let count = self
            .redis
            .incr_fixed_window(&key, Duration::from_secs(window_seconds))
            .await?;

        if count as u32 > limit {
            return Err(ApiError::TooManyRequests { retry_after_seconds: window_seconds });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_class_distinct() {
        assert_ne!(RouteClass::Auth, RouteClass::Api);
    }
}
