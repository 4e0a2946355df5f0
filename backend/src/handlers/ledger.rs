//! HTTP handlers for the stock ledger

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use shared::{PaginatedResponse, StockMovement};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::MovementQuery;
use crate::services::reporting::{export_to_csv, MovementCsvRow};
use crate::services::LedgerService;
use crate::AppState;

/// Query the ledger, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let filter = query.filter(state.config.stock.movement_window_days, Utc::now());
    let service = LedgerService::new(state.db);
    let page = service.list(&filter, &query.pagination()).await?;
    Ok(Json(page))
}

/// Export the filtered ledger as CSV
pub async fn export_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<impl IntoResponse> {
    current_user.0.require_manager()?;

    let filter = query.filter(state.config.stock.movement_window_days, Utc::now());
    let service = LedgerService::new(state.db);
    let movements = service.export(&filter).await?;
    let rows: Vec<MovementCsvRow> = movements.iter().map(MovementCsvRow::from).collect();
    let csv = export_to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"movements.csv\""),
        ],
        csv,
    ))
}
