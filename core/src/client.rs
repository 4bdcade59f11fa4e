//! Stateless HTTP request builder and response parser for the grocery API.
//!
//! # Design
//! `GroceryClient` holds only a `base_url` and carries no mutable state
//! between calls. Each backend operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Execution is left to a `Transport`, which keeps this layer
//! deterministic: the same inputs always yield the same URL and body.
//! Failures are reported as-is; nothing here retries.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::{filter_query, search_query};
use crate::types::{CreateRequest, FilterCriteria, GroceryId, GroceryItem, UpdateRequest};

pub const GROCERIES_PATH: &str = "/api/groceries";
pub const SEARCH_PATH: &str = "/api/groceries/search";
pub const FILTER_PATH: &str = "/api/groceries/filter";
pub const LOW_STOCK_PATH: &str = "/api/groceries/low-stock";
pub const CATEGORIES_PATH: &str = "/api/groceries/categories";

#[derive(Debug, Clone)]
pub struct GroceryClient {
    base_url: String,
}

impl GroceryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path_and_query: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{path_and_query}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn with_json<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn build_list_groceries(&self) -> HttpRequest {
        self.get(GROCERIES_PATH)
    }

    pub fn build_get_grocery(&self, id: GroceryId) -> HttpRequest {
        self.get(&format!("{GROCERIES_PATH}/{id}"))
    }

    pub fn build_create_grocery(&self, input: &CreateRequest) -> Result<HttpRequest, ApiError> {
        self.with_json(HttpMethod::Post, GROCERIES_PATH, input)
    }

    pub fn build_update_grocery(&self, id: GroceryId, input: &UpdateRequest) -> Result<HttpRequest, ApiError> {
        self.with_json(HttpMethod::Put, &format!("{GROCERIES_PATH}/{id}"), input)
    }

    pub fn build_delete_grocery(&self, id: GroceryId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            ..self.get(&format!("{GROCERIES_PATH}/{id}"))
        }
    }

    pub fn build_search_groceries(&self, name: &str) -> HttpRequest {
        self.get(&format!("{SEARCH_PATH}?{}", search_query(name)))
    }

    /// The `?` is always present, so an empty filter targets `.../filter?`.
    pub fn build_filter_groceries(&self, criteria: &FilterCriteria) -> HttpRequest {
        self.get(&format!("{FILTER_PATH}?{}", filter_query(criteria)))
    }

    pub fn build_low_stock_groceries(&self) -> HttpRequest {
        self.get(LOW_STOCK_PATH)
    }

    pub fn build_list_categories(&self) -> HttpRequest {
        self.get(CATEGORIES_PATH)
    }

    pub fn parse_list_groceries(&self, response: HttpResponse) -> Result<Vec<GroceryItem>, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_grocery(&self, response: HttpResponse) -> Result<GroceryItem, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_grocery(&self, response: HttpResponse) -> Result<GroceryItem, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_grocery(&self, response: HttpResponse) -> Result<GroceryItem, ApiError> {
        parse_json(response)
    }

    pub fn parse_delete_grocery(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_search_groceries(&self, response: HttpResponse) -> Result<Vec<GroceryItem>, ApiError> {
        parse_json(response)
    }

    pub fn parse_filter_groceries(&self, response: HttpResponse) -> Result<Vec<GroceryItem>, ApiError> {
        parse_json(response)
    }

    pub fn parse_low_stock_groceries(&self, response: HttpResponse) -> Result<Vec<GroceryItem>, ApiError> {
        parse_json(response)
    }

    pub fn parse_list_categories(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        parse_json(response)
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
