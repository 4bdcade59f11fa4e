//! Data-sync behavior of `GroceryStore` over a scripted transport.
//!
//! # Design
//! `ScriptedTransport` answers from a table of canned responses keyed by
//! method and path, logs every request, and can be told to fail all writes.
//! That makes network call counts, invalidation and notifications directly
//! observable without a server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grocery_core::{
    ApiError, Category, CreateRequest, FilterCriteria, GroceryClient, GroceryId, GroceryListView, GroceryStore,
    HttpMethod, HttpRequest, HttpResponse, ListSource, ListView, LowStockBanner, MemoryNotifier, MutationKind,
    MutationStatus, Notification, QueryCache, QueryKey, Transport, Unit, UpdateRequest,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const BASE_URL: &str = "http://groceries.test";

#[derive(Default)]
struct ScriptedTransport {
    log: Mutex<Vec<HttpRequest>>,
    responses: Mutex<HashMap<String, HttpResponse>>,
    write_failure: Mutex<Option<ApiError>>,
}

fn route(method: HttpMethod, path: &str) -> String {
    format!("{} {path}", method.as_str())
}

impl ScriptedTransport {
    fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &Value) {
        let body = if body.is_null() { String::new() } else { body.to_string() };
        self.respond_raw(method, path, status, &body);
    }

    fn respond_raw(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(
            route(method, path),
            HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            },
        );
    }

    fn fail_writes(&self, error: ApiError) {
        *self.write_failure.lock().unwrap() = Some(error);
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, method: HttpMethod, path: &str) -> usize {
        let url = format!("{BASE_URL}{path}");
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.log.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        if request.method != HttpMethod::Get {
            if let Some(error) = self.write_failure.lock().unwrap().clone() {
                return Err(error);
            }
        }
        let path = request.url.trim_start_matches(BASE_URL);
        let response = self.responses.lock().unwrap().get(&route(request.method, path)).cloned();
        Ok(response.unwrap_or(HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: String::new(),
        }))
    }
}

struct Harness {
    store: GroceryStore,
    transport: Arc<ScriptedTransport>,
    notifier: Arc<MemoryNotifier>,
}

fn harness() -> Harness {
    let transport = Arc::new(ScriptedTransport::default());
    let notifier = Arc::new(MemoryNotifier::new());
    let store = GroceryStore::new(
        GroceryClient::new(BASE_URL),
        transport.clone(),
        QueryCache::new(),
        notifier.clone(),
    );
    Harness {
        store,
        transport,
        notifier,
    }
}

fn item(id: i64, name: &str, quantity: u32, category: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("Fresh {name}"),
        "price": 2.49,
        "quantity": quantity,
        "category": category,
        "unit": "KG",
        "createdAt": "2024-04-01T08:00:00",
        "updatedAt": "2024-04-01T08:00:00"
    })
}

fn banana() -> CreateRequest {
    CreateRequest {
        name: "Banana".to_string(),
        description: "Yellow banana".to_string(),
        price: 1.99,
        quantity: 10,
        category: Category::Fruits,
        unit: Unit::Kg,
    }
}

/// Seed the three lists a create touches.
fn script_lists(transport: &ScriptedTransport) {
    transport.respond(HttpMethod::Get, "/api/groceries", 200, &json!([item(1, "Apples", 30, "FRUITS")]));
    transport.respond(HttpMethod::Get, "/api/groceries/categories", 200, &json!(["FRUITS"]));
    transport.respond(HttpMethod::Get, "/api/groceries/low-stock", 200, &json!([]));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_posts_exact_body_and_refreshes_affected_lists() {
    let h = harness();
    script_lists(&h.transport);
    let groceries = h.store.groceries().await;
    let categories = h.store.categories().await;
    let low_stock = h.store.low_stock().await;
    assert_eq!(groceries.data().len(), 1);

    let created = item(2, "Banana", 10, "FRUITS");
    h.transport.respond(HttpMethod::Post, "/api/groceries", 201, &created);
    h.transport.respond(
        HttpMethod::Get,
        "/api/groceries",
        200,
        &json!([created.clone(), item(1, "Apples", 30, "FRUITS")]),
    );
    h.transport.respond(HttpMethod::Get, "/api/groceries/low-stock", 200, &json!([]));

    let result = h.store.create(&banana()).await.unwrap();
    assert_eq!(result.id, GroceryId(2));

    let post = h
        .transport
        .requests()
        .into_iter()
        .find(|r| r.method == HttpMethod::Post)
        .unwrap();
    assert_eq!(post.url, format!("{BASE_URL}/api/groceries"));
    let body: Value = serde_json::from_str(post.body.as_deref().unwrap()).unwrap();
    assert_eq!(
        body,
        json!({
            "name": "Banana",
            "description": "Yellow banana",
            "price": 1.99,
            "quantity": 10,
            "category": "FRUITS",
            "unit": "KG"
        })
    );

    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/categories"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/low-stock"), 2);
    assert_eq!(groceries.data().len(), 2);
    assert_eq!(categories.data(), ["FRUITS"]);
    assert!(low_stock.data().is_empty());

    assert_eq!(
        h.notifier.notifications(),
        [Notification::success("Grocery item created successfully!")]
    );
    assert_eq!(h.store.mutation_status(MutationKind::Create), MutationStatus::Success);
}

#[tokio::test]
async fn failed_create_leaves_collection_untouched() {
    let h = harness();
    script_lists(&h.transport);
    let groceries = h.store.groceries().await;
    let before = groceries.data();

    h.transport.respond_raw(HttpMethod::Post, "/api/groceries", 500, "");
    let err = h.store.create(&banana()).await.unwrap_err();

    assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    assert_eq!(groceries.data(), before);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 1);
    assert!(!h.store.cache().is_invalidated(&QueryKey::Groceries));
    assert_eq!(
        h.notifier.notifications(),
        [Notification::error("Failed to create grocery item")]
    );
    assert!(h.store.is_error(MutationKind::Create));
    assert!(!h.store.is_pending(MutationKind::Create));
}

#[tokio::test]
async fn silent_network_failures_fall_back_per_operation() {
    let h = harness();
    script_lists(&h.transport);
    let _groceries = h.store.groceries().await;
    h.transport.fail_writes(ApiError::Transport(String::new()));

    let patch = UpdateRequest {
        quantity: Some(2),
        ..UpdateRequest::default()
    };
    assert!(h.store.update(GroceryId(1), &patch).await.is_err());
    assert!(h.store.delete(GroceryId(1)).await.is_err());

    assert_eq!(
        h.notifier.take(),
        [
            Notification::error("Failed to update grocery item"),
            Notification::error("Failed to delete grocery item"),
        ]
    );
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 1);
    assert!(!h.store.cache().is_invalidated(&QueryKey::LowStock));
}

#[tokio::test]
async fn server_message_is_preferred_over_fallback() {
    let h = harness();
    h.transport.respond(
        HttpMethod::Post,
        "/api/groceries",
        400,
        &json!({ "message": "Grocery with name 'Banana' already exists" }),
    );

    assert!(h.store.create(&banana()).await.is_err());
    assert_eq!(
        h.notifier.notifications(),
        [Notification::error("Grocery with name 'Banana' already exists")]
    );
}

#[tokio::test]
async fn invalid_input_never_reaches_the_network() {
    let h = harness();
    let mut input = banana();
    input.price = 0.0;
    input.name = "   ".to_string();

    let err = h.store.create(&input).await.unwrap_err();
    let ApiError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<&str> = errors.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, ["name", "price"]);

    assert!(h.transport.requests().is_empty());
    assert!(h.notifier.notifications().is_empty());
    assert_eq!(h.store.mutation_status(MutationKind::Create), MutationStatus::Idle);
}

#[tokio::test]
async fn update_refreshes_all_three_lists() {
    let h = harness();
    script_lists(&h.transport);
    let _groceries = h.store.groceries().await;
    let _categories = h.store.categories().await;
    let _low = h.store.low_stock().await;
    h.transport.respond(HttpMethod::Put, "/api/groceries/1", 200, &item(1, "Apples", 3, "FRUITS"));

    let patch = UpdateRequest {
        quantity: Some(3),
        ..UpdateRequest::default()
    };
    let updated = h.store.update(GroceryId(1), &patch).await.unwrap();
    assert!(updated.is_low_stock());

    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/categories"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/low-stock"), 2);
    assert_eq!(
        h.notifier.notifications(),
        [Notification::success("Grocery item updated successfully!")]
    );
}

#[tokio::test]
async fn delete_leaves_categories_alone() {
    let h = harness();
    script_lists(&h.transport);
    let _groceries = h.store.groceries().await;
    let _categories = h.store.categories().await;
    let _low = h.store.low_stock().await;
    h.transport.respond(HttpMethod::Delete, "/api/groceries/1", 204, &Value::Null);

    h.store.delete(GroceryId(1)).await.unwrap();

    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/low-stock"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/categories"), 1);
    assert!(!h.store.cache().is_invalidated(&QueryKey::Categories));
}

#[tokio::test]
async fn unmounted_lists_are_marked_for_the_next_read() {
    let h = harness();
    script_lists(&h.transport);
    drop(h.store.low_stock().await);
    h.transport.respond(HttpMethod::Post, "/api/groceries", 201, &item(2, "Banana", 10, "FRUITS"));

    h.store.create(&banana()).await.unwrap();

    assert!(h.store.cache().is_invalidated(&QueryKey::LowStock));
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/low-stock"), 1);
    let _low = h.store.low_stock().await;
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/low-stock"), 2);
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_search_never_fetches() {
    let h = harness();
    let search = h.store.search("").await;

    assert!(!search.is_enabled());
    assert!(!search.is_loading());
    assert!(search.data().is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn each_search_text_fetches_once_per_mount() {
    let h = harness();
    h.transport
        .respond(HttpMethod::Get, "/api/groceries/search?name=milk", 200, &json!([item(3, "Milk", 15, "DAIRY")]));
    h.transport.respond(HttpMethod::Get, "/api/groceries/search?name=eggs", 200, &json!([]));

    let (a, b) = tokio::join!(h.store.search("milk"), h.store.search("milk"));
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/search?name=milk"), 1);
    assert_eq!(a.data(), b.data());

    let eggs = h.store.search("eggs").await;
    assert!(eggs.data().is_empty());
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries/search?name=eggs"), 1);
    assert_eq!(h.transport.requests().len(), 2);
}

#[tokio::test]
async fn filter_with_only_low_stock_flag_is_disabled() {
    let h = harness();
    let filters = FilterCriteria {
        low_stock: Some(true),
        ..FilterCriteria::default()
    };
    let query = h.store.filter(&filters).await;

    assert!(!query.is_enabled());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn single_item_lookup_needs_an_id() {
    let h = harness();
    h.transport.respond(HttpMethod::Get, "/api/groceries/5", 200, &item(5, "Kale", 4, "VEGETABLES"));

    let none = h.store.grocery(None).await;
    assert!(!none.is_enabled());
    assert_eq!(none.data(), None);
    assert!(h.transport.requests().is_empty());

    let kale = h.store.grocery(Some(GroceryId(5))).await;
    assert_eq!(kale.data().map(|g| g.name), Some("Kale".to_string()));

    let missing = h.store.grocery(Some(GroceryId(6))).await;
    assert_eq!(missing.error(), Some(ApiError::NotFound));
    assert_eq!(missing.data(), None);
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_view_reads_only_the_resolved_source() {
    let h = harness();
    h.transport
        .respond(HttpMethod::Get, "/api/groceries/search?name=app", 200, &json!([item(1, "Apples", 30, "FRUITS")]));
    h.transport.respond(HttpMethod::Get, "/api/groceries/filter?category=DAIRY", 200, &json!([]));

    let dairy = FilterCriteria {
        category: Some(Category::Dairy),
        ..FilterCriteria::default()
    };
    let mut view = GroceryListView::mount(h.store.clone(), "app", &dairy).await;
    assert_eq!(view.source(), &ListSource::Search("app".to_string()));
    assert!(matches!(view.render(), ListView::Items(items) if items.len() == 1));
    assert_eq!(h.transport.requests().len(), 1);

    view.update("", &dairy).await;
    assert_eq!(view.source(), &ListSource::Filter(dairy.clone()));
    assert_eq!(
        h.store.cache().subscriber_count(&QueryKey::Search("app".to_string())),
        0
    );
    assert_eq!(
        view.render(),
        ListView::Empty {
            title: "No groceries found",
            description: "Try adjusting your search terms or filters.",
        }
    );
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 0);
}

#[tokio::test]
async fn list_view_shows_onboarding_when_nothing_exists() {
    let h = harness();
    h.transport.respond(HttpMethod::Get, "/api/groceries", 200, &json!([]));

    let view = GroceryListView::mount(h.store.clone(), "", &FilterCriteria::default()).await;
    assert_eq!(view.source(), &ListSource::All);
    assert!(matches!(view.render(), ListView::Empty { title: "No groceries yet", .. }));
}

#[tokio::test]
async fn list_view_retry_recovers_from_failure() {
    let h = harness();
    h.transport.respond_raw(HttpMethod::Get, "/api/groceries", 500, "");

    let view = GroceryListView::mount(h.store.clone(), "", &FilterCriteria::default()).await;
    assert_eq!(
        view.render(),
        ListView::Failed {
            title: "Something went wrong",
            description: "Failed to load groceries. Please try again.",
            action_label: "Retry",
        }
    );

    h.transport.respond(HttpMethod::Get, "/api/groceries", 200, &json!([item(1, "Apples", 30, "FRUITS")]));
    view.retry().await;
    assert!(matches!(view.render(), ListView::Items(items) if items[0].name == "Apples"));
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/groceries"), 2);
}

#[tokio::test]
async fn low_stock_banner_follows_the_low_stock_list() {
    let h = harness();
    h.transport.respond(HttpMethod::Get, "/api/groceries/low-stock", 200, &json!([]));
    assert_eq!(LowStockBanner::load(&h.store).await, None);

    h.transport.respond(
        HttpMethod::Get,
        "/api/groceries/low-stock",
        200,
        &json!([item(9, "Chicken Breast", 8, "MEAT")]),
    );
    let banner = LowStockBanner::load(&h.store).await.unwrap();
    assert_eq!(banner.title, "Low Stock Alert");
    assert_eq!(banner.badges, ["Chicken Breast (8 KG)"]);
}
