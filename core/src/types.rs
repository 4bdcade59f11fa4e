//! Domain DTOs for the grocery API.
//!
//! # Design
//! These types mirror the backend's JSON schema (camelCase field names,
//! SCREAMING_CASE enum values) but are defined independently of the
//! mock-server crate. Integration tests catch any schema drift between the
//! two.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Items at or below this quantity get a "Low Stock" badge.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Opaque numeric identity assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroceryId(pub i64);

impl fmt::Display for GroceryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GroceryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Category {
    Fruits,
    Vegetables,
    Dairy,
    Meat,
    Grains,
    Beverages,
    Snacks,
    Frozen,
    Household,
    Other,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Fruits => "Fruits",
            Category::Vegetables => "Vegetables",
            Category::Dairy => "Dairy",
            Category::Meat => "Meat",
            Category::Grains => "Grains",
            Category::Beverages => "Beverages",
            Category::Snacks => "Snacks",
            Category::Frozen => "Frozen",
            Category::Household => "Household",
            Category::Other => "Other",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Unit {
    Kg,
    G,
    L,
    Ml,
    Lb,
    Pieces,
    Packs,
    Box,
    Bag,
    Bottle,
    Container,
    Gallon,
    Loaf,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Kg => "Kilogram",
            Unit::G => "Gram",
            Unit::L => "Liter",
            Unit::Ml => "Milliliter",
            Unit::Lb => "Pound",
            Unit::Pieces => "Pieces",
            Unit::Packs => "Packs",
            Unit::Box => "Box",
            Unit::Bag => "Bag",
            Unit::Bottle => "Bottle",
            Unit::Container => "Container",
            Unit::Gallon => "Gallon",
            Unit::Loaf => "Loaf",
        }
    }
}

/// A single grocery record returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    pub id: GroceryId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    pub category: Category,
    pub unit: Unit,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl GroceryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= LOW_STOCK_THRESHOLD
    }

    pub fn formatted_price(&self) -> String {
        format!("${:.2}", self.price)
    }

    /// Short "name (quantity unit)" label used by the low-stock banner.
    pub fn stock_label(&self) -> String {
        format!("{} ({} {})", self.name, self.quantity, self.unit)
    }
}

/// Request payload for creating a new grocery item. Every field is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    pub category: Category,
    pub unit: Unit,
}

/// Request payload for updating an existing item. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl UpdateRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Structured list filter. Set criteria combine conjunctively on the server.
///
/// `low_stock` is accepted for shape compatibility with the UI state but is
/// never sent to the server and never counts as an active criterion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub category: Option<Category>,
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub low_stock: Option<bool>,
}

impl FilterCriteria {
    /// Defined criteria as query pairs, in declaration order. Empty names
    /// are treated as unset.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = self.category {
            pairs.push(("category", category.to_string()));
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            pairs.push(("name", name.to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        pairs
    }

    pub fn active_count(&self) -> usize {
        self.pairs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}
