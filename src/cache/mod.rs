//! Rendered fragment cache.
//!
//! The global feed is rendered once per page and kept for a short TTL.
//! Creating or editing a post clears the whole store; readers may see a
//! stale page until then.
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! capacity = 256
//! ```

mod config;
mod keys;
mod store;

pub use config::CacheConfig;
pub use keys::{FragmentKey, INDEX_PAGE_FRAGMENT, hash_value};
pub use store::{CacheError, FragmentCache, MemoryFragmentCache, NullFragmentCache};

use std::sync::Arc;

use metrics::counter;
use tracing::warn;

/// Count and log a failed cache operation. Callers continue without the cache.
pub fn record_failure(op: &'static str, key: Option<&FragmentKey>, error: &CacheError) {
    counter!("yatube_fragment_cache_error_total", "op" => op).increment(1);
    let key = key.map_or_else(|| "*".to_string(), FragmentKey::storage_key);
    warn!(
        target = "yatube::cache",
        op,
        key = %key,
        error = %error,
        "fragment cache operation failed; continuing without cache"
    );
}

/// Flush every stored fragment after a write, tolerating store failures.
pub fn clear_after_write(cache: &dyn FragmentCache, reason: &'static str) {
    match cache.clear() {
        Ok(()) => tracing::debug!(target = "yatube::cache", reason, "fragment cache cleared"),
        Err(err) => record_failure("clear", None, &err),
    }
}

/// Build the fragment store selected by `config`.
pub fn build_fragment_cache(config: &CacheConfig) -> Arc<dyn FragmentCache> {
    if config.enabled {
        Arc::new(MemoryFragmentCache::new(config))
    } else {
        Arc::new(NullFragmentCache)
    }
}
