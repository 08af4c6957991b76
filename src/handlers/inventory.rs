use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::AppError,
    models::{CreateInventory, InventoryQuery, InventoryRecord},
};

// Stock levels are only kept so product deletion has something to cascade to.
pub async fn create_inventory(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<CreateInventory>, AppError>,
) -> Result<(StatusCode, Json<InventoryRecord>), AppError> {
    if form.quantity.is_sign_negative() {
        return Err(AppError::Validation("quantity must not be negative".to_string()));
    }
    // 404 for unknown products
    state.catalog.get_product(form.product_id).await?;

    let record = InventoryRecord {
        id: Uuid::new_v4(),
        product_id: form.product_id,
        branch_id: form.branch_id,
        quantity: form.quantity,
        created_at: Utc::now(),
    };
    state.repo.insert_inventory(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_inventory(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<InventoryQuery>, AppError>,
) -> Result<Json<Vec<InventoryRecord>>, AppError> {
    Ok(Json(state.repo.list_inventory(query.product_id).await?))
}
