//! HTTP handlers for the cart

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{CartItem, CartLineInput, ExitRequest};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::CartService;
use crate::AppState;

pub async fn get_cart(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<CartItem>>> {
    let service = CartService::new(state.db);
    Ok(Json(service.list(current_user.0.user_id).await?))
}

pub async fn add_cart_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CartLineInput>,
) -> AppResult<Json<CartItem>> {
    let service = CartService::new(state.db);
    Ok(Json(service.add(current_user.0.user_id, input).await?))
}

pub async fn set_cart_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CartLineInput>,
) -> AppResult<Json<CartItem>> {
    let service = CartService::new(state.db);
    Ok(Json(service.set(current_user.0.user_id, input).await?))
}

pub async fn remove_cart_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CartService::new(state.db);
    service.remove(current_user.0.user_id, product_id).await?;
    Ok(Json(()))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<()>> {
    let service = CartService::new(state.db);
    service.clear(current_user.0.user_id).await?;
    Ok(Json(()))
}

/// Submit the cart as one basket of pending requests
pub async fn submit_cart(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ExitRequest>>> {
    let service = CartService::new(state.db);
    Ok(Json(service.submit(&current_user.0.actor()).await?))
}
