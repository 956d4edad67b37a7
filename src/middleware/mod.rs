//! Middleware components for request processing

pub mod rate_limiter;
pub mod validator;

pub use rate_limiter::{rate_limit_middleware, RateLimitConfig, RateLimitError, RateLimiter};
pub use validator::{InputValidator, ValidationError};
