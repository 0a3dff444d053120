pub mod client;
pub mod rate_limit;

pub use client::UpbitClient;
pub use rate_limit::RateLimiter;
