/// In-process caching of upstream API responses
mod result_cache;

pub use result_cache::{ResultCache, DEFAULT_TTL_SECS};
