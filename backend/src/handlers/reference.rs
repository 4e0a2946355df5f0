//! HTTP handlers for categories, units and storage zones
//!
//! The router attaches the [`ReferenceKind`] of each nested path as an extension.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use shared::{ReferenceEntry, ReferenceInput, ReferenceKind};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ReferenceService;
use crate::AppState;

pub async fn list_references(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ReferenceEntry>>> {
    let service = ReferenceService::new(state.db);
    Ok(Json(service.list(kind).await?))
}

pub async fn create_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    current_user: CurrentUser,
    Json(input): Json<ReferenceInput>,
) -> AppResult<Json<ReferenceEntry>> {
    current_user.0.require_manager()?;
    let service = ReferenceService::new(state.db);
    Ok(Json(service.create(kind, input).await?))
}

pub async fn update_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReferenceInput>,
) -> AppResult<Json<ReferenceEntry>> {
    current_user.0.require_manager()?;
    let service = ReferenceService::new(state.db);
    Ok(Json(service.update(kind, id, input).await?))
}

pub async fn delete_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require_manager()?;
    let service = ReferenceService::new(state.db);
    service.delete(kind, id).await?;
    Ok(Json(()))
}
