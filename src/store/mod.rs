//! Storage capabilities used by the order services.
//!
//! Services only see these traits, so the Postgres backend and the in-memory
//! backend are interchangeable.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NewOrder, NewOrderItem, Order, OrderStatus, Product},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// A window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }
}

/// Read-only product lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order and its items as one unit and returns the new order id.
    ///
    /// Stock for every referenced product is re-checked and decremented in the
    /// same unit, so concurrent orders can not oversell. On any error nothing
    /// is written.
    async fn create_with_items(&self, order: NewOrder, items: Vec<NewOrderItem>) -> AppResult<Uuid>;

    /// Loads an order with its items and each item's current product name.
    async fn get_by_id(&self, id: Uuid) -> AppResult<Order>;

    /// Orders placed by `buyer_id`, newest first, plus the total match count.
    async fn get_by_buyer(&self, buyer_id: Uuid, page: PageRequest) -> AppResult<(Vec<Order>, u64)>;

    /// Orders containing at least one product of `seller_id`, each listed once,
    /// newest first, plus the total match count.
    async fn get_by_seller(&self, seller_id: Uuid, page: PageRequest)
    -> AppResult<(Vec<Order>, u64)>;

    /// Blind status write. Transition legality is checked by the caller.
    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()>;

    async fn update_tracking_number(&self, order_id: Uuid, tracking_number: String)
    -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}
