//! HTTP handlers for the exit request workflow

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{
    check_input, Basket, BasketKey, BasketOperation, BasketOutcome, ExitRequest, InventoryCount,
    NewExitRequest, RejectExitRequest,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::exit_request::ExitRequestQuery;
use crate::services::ExitRequestService;
use crate::AppState;

fn exit_request_service(state: &AppState) -> ExitRequestService {
    ExitRequestService::new(state.db.clone(), state.config.stock.policy())
}

/// Submit an exit request
pub async fn create_exit_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewExitRequest>,
) -> AppResult<Json<ExitRequest>> {
    let request = exit_request_service(&state)
        .create(&current_user.0.actor(), input)
        .await?;
    Ok(Json(request))
}

/// List exit requests
pub async fn list_exit_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExitRequestQuery>,
) -> AppResult<Json<Vec<ExitRequest>>> {
    let requests = exit_request_service(&state)
        .list(&current_user.0.actor(), &query)
        .await?;
    Ok(Json(requests))
}

/// Approve an exit request
pub async fn approve_exit_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ExitRequest>> {
    let request = exit_request_service(&state)
        .approve(&current_user.0.actor(), request_id)
        .await?;
    Ok(Json(request))
}

/// Reject an exit request with a reason
pub async fn reject_exit_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<RejectExitRequest>,
) -> AppResult<Json<ExitRequest>> {
    check_input(&input)?;
    let request = exit_request_service(&state)
        .reject(&current_user.0.actor(), request_id, &input.reason)
        .await?;
    Ok(Json(request))
}

/// Park an exit request until goods are received
pub async fn await_reception(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ExitRequest>> {
    let request = exit_request_service(&state)
        .await_reception(&current_user.0.actor(), request_id)
        .await?;
    Ok(Json(request))
}

/// Cancel a pending exit request
pub async fn cancel_exit_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    exit_request_service(&state)
        .cancel(&current_user.0.actor(), request_id)
        .await?;
    Ok(Json(()))
}

/// Submit a physical count as a discrepancy request
pub async fn submit_inventory_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(count): Json<InventoryCount>,
) -> AppResult<Json<ExitRequest>> {
    let request = exit_request_service(&state)
        .submit_inventory_count(&current_user.0.actor(), count)
        .await?;
    Ok(Json(request))
}

/// List baskets
pub async fn list_baskets(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExitRequestQuery>,
) -> AppResult<Json<Vec<Basket>>> {
    let baskets = exit_request_service(&state)
        .baskets(&current_user.0.actor(), &query)
        .await?;
    Ok(Json(baskets))
}

/// Basket rejection body
#[derive(Debug, Deserialize)]
pub struct RejectBasketRequest {
    #[serde(flatten)]
    pub key: BasketKey,
    pub reason: String,
}

/// Approve every pending member of a basket
pub async fn approve_basket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(key): Json<BasketKey>,
) -> AppResult<Json<BasketOutcome>> {
    let outcome = exit_request_service(&state)
        .apply_to_basket(&current_user.0.actor(), key, BasketOperation::Approve)
        .await?;
    Ok(Json(outcome))
}

/// Reject every pending member of a basket
pub async fn reject_basket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<RejectBasketRequest>,
) -> AppResult<Json<BasketOutcome>> {
    let outcome = exit_request_service(&state)
        .apply_to_basket(
            &current_user.0.actor(),
            body.key,
            BasketOperation::Reject {
                reason: body.reason,
            },
        )
        .await?;
    Ok(Json(outcome))
}

/// Cancel every pending member of a basket
pub async fn cancel_basket(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(key): Json<BasketKey>,
) -> AppResult<Json<BasketOutcome>> {
    let outcome = exit_request_service(&state)
        .apply_to_basket(&current_user.0.actor(), key, BasketOperation::Cancel)
        .await?;
    Ok(Json(outcome))
}
