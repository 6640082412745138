//! Application state shared across handlers.

use std::sync::Arc;

use crate::actions::Actions;
use crate::cache::{PageCache, RenderCache};
use crate::config::DashboardConfig;
use crate::data::Data;
use crate::supabase::{
    AuthProvider, DataBackend, MemoryAuth, MemoryBackend, RemoteError, SupabaseAuth,
    SupabaseClient,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    backend: Arc<dyn DataBackend>,
    cache: Arc<dyn RenderCache>,
    data: Data,
    actions: Actions,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the state from explicit collaborators.
    #[must_use]
    pub fn new(
        config: DashboardConfig,
        backend: Arc<dyn DataBackend>,
        auth: Arc<dyn AuthProvider>,
        cache: Arc<dyn RenderCache>,
    ) -> Self {
        let data = Data::new(backend.clone());
        let actions = Actions::new(backend.clone(), auth, cache.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                cache,
                data,
                actions,
            }),
        }
    }

    /// Build the state the configuration asks for.
    ///
    /// With Supabase settings present this talks to the remote project;
    /// otherwise it runs on the seeded in-memory backend.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if an HTTP client cannot be built.
    pub fn from_config(config: DashboardConfig) -> Result<Self, RemoteError> {
        let cache: Arc<dyn RenderCache> = Arc::new(PageCache::new(config.render_cache_ttl));

        let (backend, auth): (Arc<dyn DataBackend>, Arc<dyn AuthProvider>) =
            match &config.supabase {
                Some(supabase) => (
                    Arc::new(SupabaseClient::new(
                        &supabase.url,
                        &supabase.anon_key,
                        supabase.timeout,
                    )?),
                    Arc::new(SupabaseAuth::new(
                        &supabase.url,
                        &supabase.anon_key,
                        supabase.timeout,
                    )?),
                ),
                None => (
                    Arc::new(MemoryBackend::seeded()),
                    Arc::new(MemoryAuth::seeded()),
                ),
            };

        Ok(Self::new(config, backend, auth, cache))
    }

    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Remote backend, used directly only by the readiness probe.
    #[must_use]
    pub fn backend(&self) -> &dyn DataBackend {
        self.inner.backend.as_ref()
    }

    #[must_use]
    pub fn cache(&self) -> &dyn RenderCache {
        self.inner.cache.as_ref()
    }

    #[must_use]
    pub fn data(&self) -> &Data {
        &self.inner.data
    }

    #[must_use]
    pub fn actions(&self) -> &Actions {
        &self.inner.actions
    }
}
