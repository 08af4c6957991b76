//! In-process repository for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    InventoryRepository, OrderRepository, ProductRepository, RepoResult, RepositoryError,
};
use crate::models::{InventoryRecord, Order, OrderFilter, OrderStatus, Product};

#[derive(Default)]
pub struct MemoryRepository {
    counter: AtomicU64,
    products: Mutex<HashMap<Uuid, Product>>,
    inventory: Mutex<Vec<InventoryRecord>>,
    orders: Mutex<HashMap<Uuid, Order>>,
    /// Orders whose status writes fail, for exercising sweep error paths.
    failing_orders: Mutex<HashSet<Uuid>>,
    /// Orders that come back from `list_orders_in` as undecodable rows.
    corrupt_orders: Mutex<HashSet<Uuid>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds products and starts the counter at their highest number.
    pub fn with_products(products: Vec<Product>) -> Self {
        let highest = products
            .iter()
            .filter_map(|p| p.product_id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            counter: AtomicU64::new(highest),
            products: Mutex::new(products.into_iter().map(|p| (p.id, p)).collect()),
            ..Self::default()
        }
    }

    pub async fn fail_status_writes_for(&self, id: Uuid) {
        self.failing_orders.lock().await.insert(id);
    }

    pub async fn corrupt_order(&self, id: Uuid) {
        self.corrupt_orders.lock().await.insert(id);
    }
}

#[async_trait]
impl ProductRepository for MemoryRepository {
    async fn allocate_product_number(&self) -> RepoResult<u64> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_product(&self, product: &Product) -> RepoResult<()> {
        let mut products = self.products.lock().await;
        if products
            .values()
            .any(|p| p.product_id == product.product_id || p.upc == product.upc)
        {
            return Err(RepositoryError::Duplicate("products_product_id_key".to_string()));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> RepoResult<bool> {
        let mut products = self.products.lock().await;
        match products.get_mut(&product.id) {
            Some(stored) => {
                *stored = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.products.lock().await.get(&id).cloned())
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.lock().await.values().cloned().collect();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(products)
    }

    async fn delete_product_cascade(&self, id: Uuid) -> RepoResult<Option<u64>> {
        let mut products = self.products.lock().await;
        let mut inventory = self.inventory.lock().await;
        if products.remove(&id).is_none() {
            return Ok(None);
        }
        let before = inventory.len();
        inventory.retain(|r| r.product_id != id);
        Ok(Some((before - inventory.len()) as u64))
    }
}

#[async_trait]
impl InventoryRepository for MemoryRepository {
    async fn insert_inventory(&self, record: &InventoryRecord) -> RepoResult<()> {
        self.inventory.lock().await.push(record.clone());
        Ok(())
    }

    async fn list_inventory(&self, product_id: Option<Uuid>) -> RepoResult<Vec<InventoryRecord>> {
        Ok(self
            .inventory
            .lock()
            .await
            .iter()
            .filter(|r| product_id.map_or(true, |id| r.product_id == id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        let mut orders = self.orders.lock().await;
        let duplicate_bill = order.bill_no.is_some()
            && orders.values().any(|o| o.bill_no == order.bill_no);
        if duplicate_bill {
            return Err(RepositoryError::Duplicate("orders_bill_no_key".to_string()));
        }
        if orders.values().any(|o| o.order_id == order.order_id) {
            return Err(RepositoryError::Duplicate("orders_order_id_key".to_string()));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.branch_id.map_or(true, |b| o.branch_id == b))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_orders_in(
        &self,
        statuses: &[OrderStatus],
    ) -> RepoResult<Vec<RepoResult<Order>>> {
        let corrupt = self.corrupt_orders.lock().await;
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders
            .into_iter()
            .map(|o| {
                if corrupt.contains(&o.id) {
                    Err(RepositoryError::Corrupt(format!("order {}: undecodable row", o.id)))
                } else {
                    Ok(o)
                }
            })
            .collect())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> RepoResult<bool> {
        if self.failing_orders.lock().await.contains(&id) {
            return Err(RepositoryError::Corrupt(format!("injected failure for {id}")));
        }
        let mut orders = self.orders.lock().await;
        match orders.get_mut(&id) {
            Some(order) if order.version == expected_version => {
                order.status = status;
                order.version += 1;
                order.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
