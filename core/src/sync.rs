//! Read and write operations over the grocery API, kept consistent through
//! the query cache.
//!
//! # Design
//! `GroceryStore` composes the pieces: `GroceryClient` builds and parses,
//! a `Transport` executes, `QueryCache` de-duplicates and invalidates, and a
//! `Notifier` tells the user how writes went. Reads return live
//! `Subscription`s; writes invalidate a fixed set of keys on success and never
//! touch the cache on failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::FutureExt;
use tracing::{info, warn};

use crate::cache::{QueryCache, QueryKey, QueryOptions, Subscription};
use crate::client::GroceryClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::notify::{Notification, Notifier};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateRequest, FilterCriteria, GroceryId, GroceryItem, UpdateRequest};

pub type ItemsQuery = Subscription<Vec<GroceryItem>>;
pub type ItemQuery = Subscription<Option<GroceryItem>>;
pub type CategoriesQuery = Subscription<Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Keys whose data a successful mutation may have changed.
    pub fn invalidates(self) -> Vec<QueryKey> {
        match self {
            MutationKind::Create => vec![QueryKey::Groceries, QueryKey::Categories, QueryKey::LowStock],
            MutationKind::Update => vec![QueryKey::Groceries, QueryKey::LowStock, QueryKey::Categories],
            MutationKind::Delete => vec![QueryKey::LowStock, QueryKey::Groceries],
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            MutationKind::Create => "Grocery item created successfully!",
            MutationKind::Update => "Grocery item updated successfully!",
            MutationKind::Delete => "Grocery item deleted successfully!",
        }
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            MutationKind::Create => "Failed to create grocery item",
            MutationKind::Update => "Failed to update grocery item",
            MutationKind::Delete => "Failed to delete grocery item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Bookkeeping for one mutation kind. Calls may overlap, so the kind stays
/// pending until every call has settled.
#[derive(Debug, Default)]
struct MutationRuns {
    pending: usize,
    last: MutationStatus,
}

impl MutationRuns {
    fn status(&self) -> MutationStatus {
        if self.pending > 0 {
            MutationStatus::Pending
        } else {
            self.last
        }
    }
}

#[derive(Clone)]
pub struct GroceryStore {
    client: GroceryClient,
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    mutations: Arc<Mutex<HashMap<MutationKind, MutationRuns>>>,
}

impl GroceryStore {
    pub fn new(
        client: GroceryClient,
        transport: Arc<dyn Transport>,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            transport,
            cache,
            notifier,
            mutations: Arc::default(),
        }
    }

    /// Store talking to `config.api_base_url` over `reqwest`, with a fresh cache.
    pub fn from_config(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(
            GroceryClient::new(&config.api_base_url),
            Arc::new(transport),
            QueryCache::new(),
            notifier,
        ))
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn client(&self) -> &GroceryClient {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn groceries(&self) -> ItemsQuery {
        let request = self.client.build_list_groceries();
        self.read(QueryKey::Groceries, request, GroceryClient::parse_list_groceries, true)
            .await
    }

    /// Single-item lookup. Disabled without an id (`None` or zero).
    pub async fn grocery(&self, id: Option<GroceryId>) -> ItemQuery {
        let enabled = id.is_some_and(|id| id.0 != 0);
        let id = id.unwrap_or(GroceryId(0));
        let request = self.client.build_get_grocery(id);
        self.read(QueryKey::Grocery(id), request, parse_optional_grocery, enabled)
            .await
    }

    /// Name search. Disabled for empty text.
    pub async fn search(&self, name: &str) -> ItemsQuery {
        let request = self.client.build_search_groceries(name);
        self.read(
            QueryKey::Search(name.to_string()),
            request,
            GroceryClient::parse_search_groceries,
            !name.is_empty(),
        )
        .await
    }

    /// Structured filter. Disabled when no criterion is set.
    pub async fn filter(&self, criteria: &FilterCriteria) -> ItemsQuery {
        let request = self.client.build_filter_groceries(criteria);
        self.read(
            QueryKey::filter(criteria),
            request,
            GroceryClient::parse_filter_groceries,
            !criteria.is_empty(),
        )
        .await
    }

    pub async fn low_stock(&self) -> ItemsQuery {
        let request = self.client.build_low_stock_groceries();
        self.read(QueryKey::LowStock, request, GroceryClient::parse_low_stock_groceries, true)
            .await
    }

    pub async fn categories(&self) -> CategoriesQuery {
        let request = self.client.build_list_categories();
        self.read(QueryKey::Categories, request, GroceryClient::parse_list_categories, true)
            .await
    }

    async fn read<T>(
        &self,
        key: QueryKey,
        request: HttpRequest,
        parse: fn(&GroceryClient, HttpResponse) -> Result<T, ApiError>,
        enabled: bool,
    ) -> Subscription<T>
    where
        T: Send + Sync + 'static,
    {
        let client = self.client.clone();
        let transport = Arc::clone(&self.transport);
        let fetcher = move || {
            let client = client.clone();
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move {
                let response = transport.execute(request).await?;
                parse(&client, response)
            }
            .boxed()
        };
        self.cache.subscribe(key, fetcher, QueryOptions::enabled(enabled)).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn create(&self, input: &CreateRequest) -> Result<GroceryItem, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        self.mutate(MutationKind::Create, async {
            let request = self.client.build_create_grocery(input)?;
            let response = self.transport.execute(request).await?;
            self.client.parse_create_grocery(response)
        })
        .await
    }

    pub async fn update(&self, id: GroceryId, input: &UpdateRequest) -> Result<GroceryItem, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        self.mutate(MutationKind::Update, async {
            let request = self.client.build_update_grocery(id, input)?;
            let response = self.transport.execute(request).await?;
            self.client.parse_update_grocery(response)
        })
        .await
    }

    pub async fn delete(&self, id: GroceryId) -> Result<(), ApiError> {
        self.mutate(MutationKind::Delete, async {
            let request = self.client.build_delete_grocery(id);
            let response = self.transport.execute(request).await?;
            self.client.parse_delete_grocery(response)
        })
        .await
    }

    /// `Pending` while any call of `kind` is unsettled, otherwise the
    /// outcome of the most recently settled call.
    pub fn mutation_status(&self, kind: MutationKind) -> MutationStatus {
        self.mutations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(MutationStatus::Idle, MutationRuns::status)
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.mutation_status(kind) == MutationStatus::Pending
    }

    pub fn is_error(&self, kind: MutationKind) -> bool {
        self.mutation_status(kind) == MutationStatus::Error
    }

    fn begin(&self, kind: MutationKind) {
        let mut mutations = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        mutations.entry(kind).or_default().pending += 1;
    }

    fn finish(&self, kind: MutationKind, outcome: MutationStatus) {
        let mut mutations = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        let runs = mutations.entry(kind).or_default();
        runs.pending = runs.pending.saturating_sub(1);
        runs.last = outcome;
    }

    async fn mutate<T, Fut>(&self, kind: MutationKind, call: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.begin(kind);
        let result = call.await;
        match &result {
            Ok(_) => {
                self.cache.invalidate(kind.invalidates()).await;
                self.finish(kind, MutationStatus::Success);
                info!(?kind, "mutation succeeded");
                self.notifier.notify(Notification::success(kind.success_message()));
            }
            Err(error) => {
                self.finish(kind, MutationStatus::Error);
                warn!(?kind, %error, "mutation failed");
                let message = error
                    .user_message()
                    .unwrap_or_else(|| kind.fallback_message().to_string());
                self.notifier.notify(Notification::error(message));
            }
        }
        result
    }
}

impl std::fmt::Debug for GroceryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroceryStore")
            .field("client", &self.client)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn parse_optional_grocery(client: &GroceryClient, response: HttpResponse) -> Result<Option<GroceryItem>, ApiError> {
    client.parse_get_grocery(response).map(Some)
}
