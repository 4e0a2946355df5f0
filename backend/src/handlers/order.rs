//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{NewOrder, Order};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::OrderQuery;
use crate::services::OrderService;
use crate::AppState;

pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.list(&query).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewOrder>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.create(&current_user.0.actor(), input).await?))
}

/// Receive an order into stock
pub async fn receive_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.receive(&current_user.0.actor(), order_id).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.cancel(&current_user.0.actor(), order_id).await?))
}
