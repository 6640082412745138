//! Rendered page cache with path-based revalidation.
//!
//! Invoice list pages are cached by request path and query string. Mutations
//! call [`RenderCache::revalidate_path`] so the next request renders fresh
//! data: [`Scope::Page`] drops every cached variant of one path, and
//! [`Scope::Layout`] drops everything under a path prefix.
//!
//! Every revalidation also bumps a generation counter. A render captures the
//! generation before it reads, and [`RenderCache::put`] discards the HTML when
//! a revalidation has happened since, so a slow render cannot store a page
//! that predates a mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

/// Maximum number of rendered pages held at once.
const MAX_ENTRIES: u64 = 1_000;

/// How much of the tree a revalidation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Exactly this path, any query string.
    Page,
    /// This path and everything nested under it.
    Layout,
}

/// Cache of rendered HTML keyed by `path?query`.
#[async_trait]
pub trait RenderCache: Send + Sync {
    /// Cached HTML for a key.
    async fn get(&self, key: &str) -> Option<String>;

    /// Revalidation generation; read it before fetching the data to render.
    fn generation(&self) -> u64;

    /// Store HTML rendered from data read at `generation`.
    ///
    /// Dropped if any revalidation happened after `generation` was read.
    async fn put(&self, key: String, html: String, generation: u64);

    /// Mark cached renders for `path` as stale.
    async fn revalidate_path(&self, path: &str, scope: Scope);
}

/// The path part of a cache key.
fn key_path(key: &str) -> &str {
    key.split_once('?').map_or(key, |(path, _)| path)
}

fn is_covered(key: &str, path: &str, scope: Scope) -> bool {
    let key_path = key_path(key);
    match scope {
        Scope::Page => key_path == path,
        Scope::Layout => {
            let prefix = path.trim_end_matches('/');
            prefix.is_empty()
                || key_path == prefix
                || key_path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
    }
}

/// [`RenderCache`] backed by `moka`.
///
/// A zero TTL disables caching: `get` always misses and `put` is a no-op.
#[derive(Clone)]
pub struct PageCache {
    cache: Option<Cache<String, String>>,
    generation: Arc<AtomicU64>,
}

impl PageCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build()
        });
        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("enabled", &self.cache.is_some())
            .field("generation", &self.generation())
            .field(
                "entries",
                &self.cache.as_ref().map_or(0, Cache::entry_count),
            )
            .finish()
    }
}

#[async_trait]
impl RenderCache for PageCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.as_ref()?.get(key).await
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn put(&self, key: String, html: String, generation: u64) {
        let Some(cache) = &self.cache else {
            return;
        };
        if self.generation() != generation {
            debug!(%key, "Dropped render that predates a revalidation");
            return;
        }

        cache.insert(key.clone(), html).await;

        // A revalidation that bumped the generation after the check above may
        // have scanned the cache before this insert landed.
        if self.generation() != generation {
            cache.invalidate(key.as_str()).await;
        }
    }

    async fn revalidate_path(&self, path: &str, scope: Scope) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let Some(cache) = &self.cache else {
            return;
        };

        let stale: Vec<_> = cache
            .iter()
            .filter(|(key, _)| is_covered(key, path, scope))
            .map(|(key, _)| key)
            .collect();

        debug!(path, ?scope, evicted = stale.len(), "Revalidated path");

        for key in stale {
            cache.invalidate(key.as_str()).await;
        }
    }
}
