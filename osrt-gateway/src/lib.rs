pub mod dispatch;
pub mod error;
pub mod http_translate;
pub mod invoke;
pub mod rate_limiter;
pub mod route_matcher;

pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use invoke::augment_payload;
pub use rate_limiter::RateLimiter;
pub use route_matcher::match_route;
