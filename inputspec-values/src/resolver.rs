//! Values resolver: pages of admissible values for a value domain.
//!
//! A remote resolution goes through, in order:
//!
//! 1. the minimum search length check (a too-short, non-empty search resolves
//!    to an empty page with no further work);
//! 2. debounce, when a search string is present and the interval is non-zero;
//! 3. the cache, when the domain's cache strategy allows it;
//! 4. the transport, whose response is parsed per the domain's mapping and
//!    stored back in the cache.
//!
//! Embedded domains resolve locally by filtering and slicing their items.

use inputspec_fields::{PaginationStrategy, ValuesEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheProvider, InMemoryCache};
use crate::config::ResolverConfig;
use crate::debounce::PendingRegistry;
use crate::error::{ResolverError, Result};
use crate::request::{key_prefix, EffectiveQuery, FetchValuesOptions, ValuesRequest};
use crate::response::{parse_page, ValuesPage};
use crate::transport::{HttpTransport, Transport};

/// Resolves value domains through an injected transport and cache.
///
/// Dropping the resolver shuts it down: pending debounced calls are aborted
/// and their callers fail with [`ResolverError::Shutdown`].
pub struct ValuesResolver {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheProvider>,
    config: ResolverConfig,
    pending: PendingRegistry,
}

impl std::fmt::Debug for ValuesResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuesResolver")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ValuesResolver {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn CacheProvider>) -> Self {
        Self::with_config(transport, cache, ResolverConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheProvider>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            config,
            pending: PendingRegistry::new(),
        }
    }

    /// An HTTP transport and an in-memory cache built from `config`.
    pub fn http(config: ResolverConfig) -> Result<Self> {
        let transport = HttpTransport::with_config(&config).map_err(|source| {
            ResolverError::FetchFailure {
                uri: config.base_url.clone().unwrap_or_default(),
                source,
            }
        })?;
        Ok(Self::with_config(
            Arc::new(transport),
            Arc::new(InMemoryCache::new()),
            config,
        ))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn CacheProvider> {
        &self.cache
    }

    /// Resolve one page of `endpoint`.
    ///
    /// A call superseded by a newer call for the same request key never
    /// completes; callers should drop its future. A debounced call whose
    /// transport or parser panics fails with [`ResolverError::Interrupted`].
    pub async fn resolve(
        &self,
        endpoint: &ValuesEndpoint,
        options: FetchValuesOptions,
    ) -> Result<ValuesPage> {
        if self.pending.is_closed() {
            return Err(ResolverError::Shutdown);
        }
        endpoint.validate()?;

        let search = options.search_text();
        let min_len = endpoint.min_search_len();
        if !search.is_empty() && search.chars().count() < min_len {
            debug!(search, min_len, "search below minimum length, returning empty page");
            return Ok(ValuesPage::empty());
        }

        let query = EffectiveQuery::resolve(endpoint, &options, &self.config);
        if endpoint.is_inline() {
            return Ok(resolve_inline(endpoint, &query));
        }

        let uri = endpoint.uri.clone().unwrap_or_default();
        let key = query.key(endpoint, &uri);
        let fetch = Fetch {
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            request: query.to_request(endpoint, &uri, &self.config),
            endpoint: endpoint.clone(),
            key: key.clone(),
        };

        let debounce = endpoint
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.default_debounce());
        if query.search.is_empty() || debounce.is_zero() {
            return fetch.run().await;
        }

        let receiver = self.pending.schedule(key, debounce, fetch.run())?;
        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => {
                // The waiter is only dropped unanswered when a newer call
                // replaced it, and a superseded call never produces an outcome.
                std::future::pending().await
            }
        }
    }

    /// Drop every cached page of `endpoint`, returning how many were removed.
    pub fn clear_cache_for_endpoint(&self, endpoint: &ValuesEndpoint) -> usize {
        match endpoint.uri.as_deref() {
            Some(uri) => {
                let removed = self.cache.delete_prefix(&key_prefix(uri));
                debug!(uri, removed, "cleared cached pages");
                removed
            }
            None => 0,
        }
    }

    /// Abort pending debounced calls and refuse new ones.
    pub fn shutdown(&self) {
        self.pending.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.pending.is_closed()
    }

    /// Number of debounced calls still waiting for their outcome.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ValuesResolver {
    fn drop(&mut self) {
        self.pending.shutdown();
    }
}

/// Everything one remote fetch needs, owned so it can run on a debounce task.
struct Fetch {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheProvider>,
    endpoint: ValuesEndpoint,
    request: ValuesRequest,
    key: String,
}

impl Fetch {
    async fn run(self) -> Result<ValuesPage> {
        let strategy = self.endpoint.cache();
        if strategy.is_cached() {
            if let Some(page) = self.cache.get(&self.key) {
                debug!(key = %self.key, "cache hit");
                return Ok(page);
            }
            debug!(key = %self.key, "cache miss");
        }

        debug!(
            uri = %self.request.uri,
            method = self.request.method.as_str(),
            "fetching remote values"
        );
        let body = self.transport.request(&self.request).await.map_err(|source| {
            warn!(uri = %self.request.uri, error = %source, "values fetch failed");
            ResolverError::FetchFailure {
                uri: self.request.uri.clone(),
                source,
            }
        })?;
        let page = parse_page(&body, self.endpoint.response_mapping.as_ref()).map_err(|reason| {
            warn!(uri = %self.request.uri, reason = %reason, "values response not parseable");
            ResolverError::ParseFailure {
                uri: self.request.uri.clone(),
                reason,
            }
        })?;

        if strategy.is_cached() {
            self.cache.set(&self.key, page.clone(), strategy.ttl());
        }
        Ok(page)
    }
}

/// Filter embedded items by the search string and, for page-number
/// pagination, slice out the requested page.
fn resolve_inline(endpoint: &ValuesEndpoint, query: &EffectiveQuery) -> ValuesPage {
    let matches = endpoint.search_items(&query.search);
    let total = matches.len() as u64;
    match endpoint.pagination() {
        PaginationStrategy::PageNumber => {
            let size = query.limit.max(1) as usize;
            let start = (query.page.max(1) as usize - 1).saturating_mul(size);
            let values: Vec<_> = matches.into_iter().skip(start).take(size).collect();
            let has_next = (start + values.len()) < total as usize;
            ValuesPage {
                values,
                has_next,
                total: Some(total),
                page: Some(query.page.max(1)),
                page_size: Some(size as u32),
            }
        }
        PaginationStrategy::None => ValuesPage {
            values: matches,
            has_next: false,
            total: Some(total),
            page: None,
            page_size: None,
        },
    }
}
