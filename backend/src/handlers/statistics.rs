//! HTTP handlers for alerts and statistics

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{ConsumptionStats, DashboardStats, StockAlert, MAX_WINDOW_DAYS};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::statistics::DeliveryTimeStats;
use crate::services::StatisticsService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub window_days: Option<u32>,
}

impl WindowQuery {
    /// Requested window or the configured default, refused outside `1..=MAX_WINDOW_DAYS`
    fn resolve(&self, default_days: u32) -> AppResult<u32> {
        match self.window_days {
            None => Ok(default_days),
            Some(days) if (1..=MAX_WINDOW_DAYS).contains(&days) => Ok(days),
            Some(_) => Err(AppError::Validation {
                field: "window_days".to_string(),
                message: format!("Window must be between 1 and {} days", MAX_WINDOW_DAYS),
                message_fr: format!("La période doit être comprise entre 1 et {} jours", MAX_WINDOW_DAYS),
            }),
        }
    }
}

pub async fn get_stock_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<StockAlert>>> {
    let service = StatisticsService::new(state.db);
    Ok(Json(service.alerts().await?))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<DashboardStats>> {
    let window = query.resolve(state.config.stock.movement_window_days)?;
    let service = StatisticsService::new(state.db);
    Ok(Json(service.dashboard(window).await?))
}

pub async fn get_consumption(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<ConsumptionStats>> {
    let window = query.resolve(state.config.stock.consumption_window_days)?;
    let service = StatisticsService::new(state.db);
    Ok(Json(service.consumption(product_id, window).await?))
}

pub async fn get_delivery_time(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DeliveryTimeStats>> {
    let service = StatisticsService::new(state.db);
    Ok(Json(service.delivery_time().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_when_absent() {
        let query = WindowQuery { window_days: None };
        assert_eq!(query.resolve(30).unwrap(), 30);
    }

    #[test]
    fn test_window_out_of_range_is_refused() {
        for days in [0, MAX_WINDOW_DAYS + 1, u32::MAX] {
            let query = WindowQuery { window_days: Some(days) };
            assert!(matches!(query.resolve(30), Err(AppError::Validation { .. })));
        }
        let query = WindowQuery { window_days: Some(MAX_WINDOW_DAYS) };
        assert_eq!(query.resolve(30).unwrap(), MAX_WINDOW_DAYS);
    }
}
