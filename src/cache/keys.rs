//! Fragment cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Name of the fragment holding the rendered global feed.
pub const INDEX_PAGE_FRAGMENT: &str = "index_page";

/// Identifies one rendered fragment: a fixed template name plus the values
/// the fragment varies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    name: &'static str,
    vary_on: Vec<String>,
}

impl FragmentKey {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            vary_on: Vec::new(),
        }
    }

    pub fn vary_on(mut self, value: impl ToString) -> Self {
        self.vary_on.push(value.to_string());
        self
    }

    /// Key of the global feed fragment for one page number.
    pub fn index_page(page: u32) -> Self {
        Self::new(INDEX_PAGE_FRAGMENT).vary_on(page)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stable textual form, e.g. `template.cache.index_page.1a2b…`.
    pub fn storage_key(&self) -> String {
        format!(
            "template.cache.{}.{:016x}",
            self.name,
            hash_value(&self.vary_on)
        )
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
