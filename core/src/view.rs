//! View models for the grocery list and the low-stock banner.
//!
//! These hold the decisions a screen makes (which source to read, which
//! empty state to show) so every front end renders the same thing.

use crate::sync::{GroceryStore, ItemsQuery};
use crate::types::{FilterCriteria, GroceryItem};

/// The one data source a list view reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum ListSource {
    Search(String),
    Filter(FilterCriteria),
    All,
}

/// Search text wins over filters; filters win over the full collection.
pub fn resolve_list_source(search: &str, filters: &FilterCriteria) -> ListSource {
    if !search.is_empty() {
        ListSource::Search(search.to_string())
    } else if !filters.is_empty() {
        ListSource::Filter(filters.clone())
    } else {
        ListSource::All
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    Loading,
    Failed {
        title: &'static str,
        description: &'static str,
        action_label: &'static str,
    },
    Empty {
        title: &'static str,
        description: &'static str,
    },
    Items(Vec<GroceryItem>),
}

impl ListView {
    fn failed() -> Self {
        ListView::Failed {
            title: "Something went wrong",
            description: "Failed to load groceries. Please try again.",
            action_label: "Retry",
        }
    }

    fn empty(narrowed: bool) -> Self {
        if narrowed {
            ListView::Empty {
                title: "No groceries found",
                description: "Try adjusting your search terms or filters.",
            }
        } else {
            ListView::Empty {
                title: "No groceries yet",
                description: "Start building your grocery inventory by adding your first item.",
            }
        }
    }
}

/// A mounted grocery list. Only the resolved source is subscribed.
#[derive(Debug)]
pub struct GroceryListView {
    store: GroceryStore,
    source: ListSource,
    query: Option<ItemsQuery>,
}

impl GroceryListView {
    pub async fn mount(store: GroceryStore, search: &str, filters: &FilterCriteria) -> Self {
        let source = resolve_list_source(search, filters);
        let query = Some(subscribe(&store, &source).await);
        Self { store, source, query }
    }

    /// Re-resolve after the search text or filters changed. The previous
    /// subscription is released before the new source is read.
    pub async fn update(&mut self, search: &str, filters: &FilterCriteria) {
        let source = resolve_list_source(search, filters);
        if source == self.source {
            return;
        }
        self.query = None;
        self.query = Some(subscribe(&self.store, &source).await);
        self.source = source;
    }

    pub fn source(&self) -> &ListSource {
        &self.source
    }

    pub fn render(&self) -> ListView {
        let Some(query) = &self.query else {
            return ListView::Loading;
        };
        if query.is_loading() {
            return ListView::Loading;
        }
        if query.is_error() {
            return ListView::failed();
        }
        let items = query.data();
        if items.is_empty() {
            return ListView::empty(self.source != ListSource::All);
        }
        ListView::Items(items)
    }

    /// Re-run the read behind the current source.
    pub async fn retry(&self) {
        if let Some(query) = &self.query {
            query.refetch().await;
        }
    }
}

async fn subscribe(store: &GroceryStore, source: &ListSource) -> ItemsQuery {
    match source {
        ListSource::Search(name) => store.search(name).await,
        ListSource::Filter(criteria) => store.filter(criteria).await,
        ListSource::All => store.groceries().await,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockBanner {
    pub title: &'static str,
    pub description: &'static str,
    pub badges: Vec<String>,
}

impl LowStockBanner {
    /// `None` when nothing is running low.
    pub fn from_items(items: &[GroceryItem]) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            title: "Low Stock Alert",
            description: "The following items are running low on stock:",
            badges: items.iter().map(GroceryItem::stock_label).collect(),
        })
    }

    pub async fn load(store: &GroceryStore) -> Option<Self> {
        let query = store.low_stock().await;
        Self::from_items(&query.data())
    }
}
