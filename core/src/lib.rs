//! Client core for the grocery inventory service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). On top of that sits a data
//! synchronization layer: reads go through a shared `QueryCache`, writes
//! invalidate the cached lists they affect and report their outcome through
//! a `Notifier`.
//!
//! # Design
//! - `GroceryClient` is stateless: it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `Transport` executes a request; `ReqwestTransport` is the real one and
//!   tests substitute scripted transports.
//! - `GroceryStore` composes client, transport, cache and notifier.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod query;
pub mod sync;
pub mod transport;
pub mod types;
pub mod validate;
pub mod view;

pub use cache::{QueryCache, QueryKey, QueryOptions, QueryState, Subscription};
pub use client::GroceryClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use notify::{MemoryNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use sync::{GroceryStore, MutationKind, MutationStatus};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Category, CreateRequest, FilterCriteria, GroceryId, GroceryItem, Unit, UpdateRequest};
pub use validate::{FieldError, ValidationErrors};
pub use view::{resolve_list_source, GroceryListView, ListSource, ListView, LowStockBanner};
