//! Rate limiting logic and state management.

mod backend;
mod bucket;
mod global;
mod key;
mod limiter;
mod rules;
mod status;
mod window;

pub use backend::{RequestGovernor, Unlimited};
pub use bucket::TokenBucket;
pub use global::get_rate_limiter;
pub use key::ServiceKey;
pub use limiter::{
    default_rate_limits, RateLimitStatistics, RateLimitingService, ServiceStatistics,
};
pub use rules::{
    load_from_file, load_from_json, RateLimitConfig, RateLimitEntry, RateLimitFile,
    RateLimitStrategy, RateLimitUpdate,
};
pub use status::RateLimitStatus;
pub use window::SlidingWindowCounter;
