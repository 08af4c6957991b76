//! Persistence seams.
//!
//! Services talk to storage only through these traits. `postgres` is the
//! production implementation; `memory` backs the unit tests.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InventoryRecord, Order, OrderFilter, OrderStatus, Product};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate value: {0}")]
    Duplicate(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Atomically reserves the next product number. Two callers never get
    /// the same value, and a number is never handed out twice even after the
    /// product holding it is deleted.
    async fn allocate_product_number(&self) -> RepoResult<u64>;

    async fn insert_product(&self, product: &Product) -> RepoResult<()>;

    /// Overwrites the stored product with the same `id`. Returns false when
    /// no such product exists.
    async fn save_product(&self, product: &Product) -> RepoResult<bool>;

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>>;

    async fn list_products(&self) -> RepoResult<Vec<Product>>;

    /// Deletes a product together with its inventory records in one
    /// transaction. Returns the number of inventory records removed, or
    /// `None` (with nothing deleted) when the product does not exist.
    async fn delete_product_cascade(&self, id: Uuid) -> RepoResult<Option<u64>>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn insert_inventory(&self, record: &InventoryRecord) -> RepoResult<()>;

    async fn list_inventory(&self, product_id: Option<Uuid>) -> RepoResult<Vec<InventoryRecord>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> RepoResult<()>;

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>>;

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>>;

    /// Orders in any of `statuses`, oldest first. The outer error means the
    /// query itself failed; an inner error is a single row that could not be
    /// decoded and does not affect the others.
    async fn list_orders_in(&self, statuses: &[OrderStatus])
        -> RepoResult<Vec<RepoResult<Order>>>;

    /// Compare-and-set on `version`. Writes `status`, bumps the version and
    /// returns true only if the stored order is still at `expected_version`.
    async fn update_order_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> RepoResult<bool>;
}

/// Everything the server needs from storage.
pub trait Repository: ProductRepository + InventoryRepository + OrderRepository {}

impl<T> Repository for T where T: ProductRepository + InventoryRepository + OrderRepository {}
