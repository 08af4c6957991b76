pub mod inventory;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::response::Json;
use serde_json::{json, Value};

use crate::{
    repository::Repository,
    services::{CatalogService, OrderService},
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub repo: Arc<dyn Repository>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
