use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

/// Default cut-off for `/low-stock`; items strictly below it are listed.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grocery {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    pub category: String,
    pub unit: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateGrocery {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    pub category: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGrocery {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub category: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub category: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<u32>,
}

/// In-memory backing store. Ids are sequential from 1.
#[derive(Debug, Default)]
pub struct Store {
    next_id: i64,
    items: BTreeMap<i64, Grocery>,
}

impl Store {
    /// Store pre-filled with a small demo catalog.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        for input in catalog() {
            store.insert(input);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn create(&mut self, input: CreateGrocery) -> Result<Grocery, AppError> {
        check_name(&input.name)?;
        check_description(&input.description)?;
        check_price(input.price)?;
        if self.name_taken(&input.name, None) {
            return Err(AppError::duplicate(&input.name));
        }
        Ok(self.insert(input))
    }

    /// Store `input` under the next id without validating it.
    fn insert(&mut self, input: CreateGrocery) -> Grocery {
        self.next_id += 1;
        let now = Local::now().naive_local();
        let grocery = Grocery {
            id: self.next_id,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            category: input.category,
            unit: input.unit,
            created_at: now,
            updated_at: now,
        };
        self.items.insert(grocery.id, grocery.clone());
        grocery
    }

    pub fn update(&mut self, id: i64, input: UpdateGrocery) -> Result<Grocery, AppError> {
        if !self.items.contains_key(&id) {
            return Err(AppError::BadRequest(format!("Grocery not found with id: {id}")));
        }
        if let Some(name) = &input.name {
            check_name(name)?;
            if self.name_taken(name, Some(id)) {
                return Err(AppError::duplicate(name));
            }
        }
        if let Some(description) = &input.description {
            check_description(description)?;
        }
        if let Some(price) = input.price {
            check_price(price)?;
        }

        let grocery = self
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::BadRequest(format!("Grocery not found with id: {id}")))?;
        if let Some(name) = input.name {
            grocery.name = name;
        }
        if let Some(description) = input.description {
            grocery.description = description;
        }
        if let Some(price) = input.price {
            grocery.price = price;
        }
        if let Some(quantity) = input.quantity {
            grocery.quantity = quantity;
        }
        if let Some(category) = input.category {
            grocery.category = category;
        }
        if let Some(unit) = input.unit {
            grocery.unit = unit;
        }
        grocery.updated_at = Local::now().naive_local();
        Ok(grocery.clone())
    }

    pub fn get(&self, id: i64) -> Option<&Grocery> {
        self.items.get(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<Grocery> {
        self.items.remove(&id)
    }

    /// Items matching `keep`, most recently updated first.
    pub fn select(&self, keep: impl Fn(&Grocery) -> bool) -> Vec<Grocery> {
        let mut items: Vec<Grocery> = self.items.values().filter(|g| keep(g)).cloned().collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        items
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.items.values().map(|g| g.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        let name = name.to_lowercase();
        self.items
            .values()
            .any(|g| Some(g.id) != except && g.name.to_lowercase() == name)
    }
}

fn check_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(AppError::BadRequest(format!(
            "Name must be between 1 and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(AppError::BadRequest(format!(
            "Description must not exceed {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), AppError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(AppError::BadRequest("Price must be greater than 0".to_string()));
    }
    Ok(())
}

const CATALOG: &[(&str, &str, f64, u32, &str, &str)] = &[
    ("Bananas", "Fresh yellow bananas", 2.99, 50, "FRUITS", "LB"),
    ("Apples", "Crisp red apples", 3.49, 30, "FRUITS", "LB"),
    ("Oranges", "Juicy navel oranges", 4.99, 25, "FRUITS", "LB"),
    ("Carrots", "Organic baby carrots", 1.99, 40, "VEGETABLES", "LB"),
    ("Broccoli", "Fresh green broccoli", 2.49, 20, "VEGETABLES", "LB"),
    ("Tomatoes", "Vine-ripened tomatoes", 3.99, 35, "VEGETABLES", "LB"),
    ("Milk", "Whole milk", 3.99, 15, "DAIRY", "GALLON"),
    ("Cheese", "Aged cheddar cheese", 5.99, 12, "DAIRY", "LB"),
    ("Yogurt", "Greek yogurt", 1.99, 25, "DAIRY", "CONTAINER"),
    ("Bread", "Whole wheat bread", 2.99, 20, "GRAINS", "LOAF"),
    ("Rice", "Long grain white rice", 4.99, 10, "GRAINS", "BAG"),
    ("Pasta", "Spaghetti pasta", 1.49, 30, "GRAINS", "BOX"),
    ("Chicken Breast", "Boneless skinless chicken breast", 7.99, 8, "MEAT", "LB"),
];

fn catalog() -> impl Iterator<Item = CreateGrocery> {
    CATALOG
        .iter()
        .map(|(name, description, price, quantity, category, unit)| CreateGrocery {
            name: name.to_string(),
            description: description.to_string(),
            price: *price,
            quantity: *quantity,
            category: category.to_string(),
            unit: unit.to_string(),
        })
}

/// Failures surfaced to clients. Bad requests carry `{"message": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    NotFound,
    BadRequest(String),
}

impl AppError {
    fn duplicate(name: &str) -> Self {
        AppError::BadRequest(format!("Grocery with name '{name}' already exists"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { message })).into_response()
            }
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Router over an empty store.
pub fn app() -> Router {
    router(Store::default())
}

/// Router over the demo catalog.
pub fn seeded_app() -> Router {
    router(Store::seeded())
}

pub fn router(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/api/groceries", get(list_groceries).post(create_grocery))
        .route("/api/groceries/search", get(search_groceries))
        .route("/api/groceries/filter", get(filter_groceries))
        .route("/api/groceries/low-stock", get(low_stock_groceries))
        .route("/api/groceries/categories", get(list_categories))
        .route(
            "/api/groceries/{id}",
            get(get_grocery).put(update_grocery).delete(delete_grocery),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn list_groceries(State(db): State<Db>) -> Json<Vec<Grocery>> {
    Json(db.read().await.select(|_| true))
}

async fn create_grocery(
    State(db): State<Db>,
    Json(input): Json<CreateGrocery>,
) -> Result<(StatusCode, Json<Grocery>), AppError> {
    let grocery = db.write().await.create(input)?;
    info!(id = grocery.id, name = %grocery.name, "grocery created");
    Ok((StatusCode::CREATED, Json(grocery)))
}

async fn get_grocery(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Grocery>, AppError> {
    let store = db.read().await;
    store.get(id).cloned().map(Json).ok_or(AppError::NotFound)
}

async fn update_grocery(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateGrocery>,
) -> Result<Json<Grocery>, AppError> {
    let grocery = db.write().await.update(id, input)?;
    info!(id, "grocery updated");
    Ok(Json(grocery))
}

async fn delete_grocery(State(db): State<Db>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    let mut store = db.write().await;
    store.remove(id).ok_or(AppError::NotFound)?;
    info!(id, "grocery deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn search_groceries(
    State(db): State<Db>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Grocery>> {
    let needle = params.name.to_lowercase();
    debug!(%needle, "search");
    Json(db.read().await.select(|g| g.name.to_lowercase().contains(&needle)))
}

async fn filter_groceries(
    State(db): State<Db>,
    Query(params): Query<FilterParams>,
) -> Json<Vec<Grocery>> {
    debug!(?params, "filter");
    let name = params.name.as_deref().map(str::to_lowercase);
    Json(db.read().await.select(|g| {
        params.category.as_ref().map_or(true, |c| &g.category == c)
            && name.as_ref().map_or(true, |n| g.name.to_lowercase().contains(n))
            && params.min_price.map_or(true, |min| g.price >= min)
            && params.max_price.map_or(true, |max| g.price <= max)
    }))
}

async fn low_stock_groceries(
    State(db): State<Db>,
    Query(params): Query<LowStockParams>,
) -> Json<Vec<Grocery>> {
    let threshold = params.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Json(db.read().await.select(|g| g.quantity < threshold))
}

async fn list_categories(State(db): State<Db>) -> Json<Vec<String>> {
    Json(db.read().await.categories())
}
