use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::AppError,
    models::{CreateOrder, Order, OrderFilter, StatusUpdate},
};

pub async fn create_order(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateOrder>, AppError>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<OrderFilter>, AppError>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list_orders(&filter).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.get_order(id).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(update), _): WithRejection<Json<StatusUpdate>, AppError>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.update_status(id, update).await?))
}
