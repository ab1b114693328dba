//! Cache Module
//!
//! Read-through value cache with negative caching of loader failures.

mod entry;
mod flight;
mod key;
mod value;


pub use entry::CacheEntry;
pub use key::{normalize, normalize_namespace, CacheKey};
pub use value::{CacheConfig, LoadFn, ValueCache, SPAN_TAG_CACHE, SPAN_TAG_KEY, SPAN_TAG_OP};
