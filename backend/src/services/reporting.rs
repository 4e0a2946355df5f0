//! CSV exports of the ledger and the pick list

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{PendingExit, StockMovement};

use crate::error::{AppError, AppResult};

/// Flat ledger row as exported
#[derive(Debug, Serialize)]
pub struct MovementCsvRow {
    pub timestamp: DateTime<Utc>,
    pub reference: String,
    pub designation: String,
    pub movement_type: String,
    pub quantity: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub user: String,
    pub reason: String,
    pub notes: Option<String>,
}

impl From<&StockMovement> for MovementCsvRow {
    fn from(m: &StockMovement) -> Self {
        Self {
            timestamp: m.timestamp,
            reference: m.product_reference.clone(),
            designation: m.product_designation.clone(),
            movement_type: m.movement_type.to_string(),
            quantity: m.quantity,
            previous_stock: m.previous_stock,
            new_stock: m.new_stock,
            user: m.user_name.clone(),
            reason: m.reason.clone(),
            notes: m.notes.clone(),
        }
    }
}

/// Flat pick-list row as exported
#[derive(Debug, Serialize)]
pub struct PickListCsvRow {
    pub approved_at: DateTime<Utc>,
    pub reference: String,
    pub designation: String,
    pub location: String,
    pub quantity: Decimal,
    pub requested_by: String,
    pub processed: bool,
}

impl From<&PendingExit> for PickListCsvRow {
    fn from(e: &PendingExit) -> Self {
        Self {
            approved_at: e.approved_at,
            reference: e.product_reference.clone(),
            designation: e.product_designation.clone(),
            location: e.location.clone(),
            quantity: e.quantity,
            requested_by: e.requested_by_name.clone(),
            processed: e.processed_at.is_some(),
        }
    }
}

/// Serialize rows to CSV with a header line
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV write error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 error: {}", e)))
}
