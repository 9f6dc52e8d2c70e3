//! In-memory caching of storefront reads.

mod config;
mod request;

pub use config::CacheConfig;
pub use request::RequestCache;
