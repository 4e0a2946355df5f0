//! HTTP handlers for the pick list

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use shared::PendingExit;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::pending_exit::PendingExitQuery;
use crate::services::reporting::{export_to_csv, PickListCsvRow};
use crate::services::PendingExitService;
use crate::AppState;

pub async fn list_pending_exits(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PendingExitQuery>,
) -> AppResult<Json<Vec<PendingExit>>> {
    let service = PendingExitService::new(state.db);
    Ok(Json(service.list(query.include_processed).await?))
}

pub async fn mark_exit_processed(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(pending_exit_id): Path<Uuid>,
) -> AppResult<Json<PendingExit>> {
    let service = PendingExitService::new(state.db);
    let exit = service
        .mark_processed(&current_user.0.actor(), pending_exit_id)
        .await?;
    Ok(Json(exit))
}

/// Export the pick list as CSV
pub async fn export_pending_exits(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PendingExitQuery>,
) -> AppResult<impl IntoResponse> {
    current_user.0.require_manager()?;

    let service = PendingExitService::new(state.db);
    let exits = service.list(query.include_processed).await?;
    let rows: Vec<PickListCsvRow> = exits.iter().map(PickListCsvRow::from).collect();
    let csv = export_to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"pick_list.csv\""),
        ],
        csv,
    ))
}
