//! Exit request models and status machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::basket::BasketKey;

/// Prefix of the reason text that marks an inventory-count correction
pub const DISCREPANCY_MARKER: &str = "Écart d'inventaire";

/// Exit request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExitRequestStatus {
    Pending,
    AwaitingReception,
    Approved,
    Rejected,
}

impl ExitRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitRequestStatus::Pending => "pending",
            ExitRequestStatus::AwaitingReception => "awaiting_reception",
            ExitRequestStatus::Approved => "approved",
            ExitRequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExitRequestStatus::Approved | ExitRequestStatus::Rejected)
    }

    /// Allowed transitions; a request awaiting reception is closed by the
    /// reception flow with an approval or a rejection
    pub fn can_transition_to(&self, next: ExitRequestStatus) -> bool {
        use ExitRequestStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, AwaitingReception)
                | (AwaitingReception, Approved)
                | (AwaitingReception, Rejected)
        )
    }
}

impl std::str::FromStr for ExitRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExitRequestStatus::Pending),
            "awaiting_reception" => Ok(ExitRequestStatus::AwaitingReception),
            "approved" => Ok(ExitRequestStatus::Approved),
            "rejected" => Ok(ExitRequestStatus::Rejected),
            other => Err(format!("unknown exit request status: {}", other)),
        }
    }
}

impl std::fmt::Display for ExitRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's request to take stock out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitRequest {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_reference: String,
    pub product_designation: String,
    pub product_photo: Option<String>,
    pub quantity: Decimal,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub requested_at: DateTime<Utc>,
    pub status: ExitRequestStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub notes: Option<String>,
}

impl ExitRequest {
    /// Discrepancy approvals set stock to `quantity` instead of subtracting it
    pub fn is_discrepancy(&self) -> bool {
        is_discrepancy_reason(&self.reason)
    }

    pub fn basket_key(&self) -> BasketKey {
        BasketKey::new(self.requested_by, self.requested_at)
    }
}

pub fn is_discrepancy_reason(reason: &str) -> bool {
    reason.trim_start().starts_with(DISCREPANCY_MARKER)
}

/// Build the reason text of a discrepancy request
pub fn discrepancy_reason(details: Option<&str>) -> String {
    match details.map(str::trim).filter(|d| !d.is_empty()) {
        Some(details) => format!("{}: {}", DISCREPANCY_MARKER, details),
        None => DISCREPANCY_MARKER.to_string(),
    }
}

/// Input for submitting a single exit request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewExitRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: String,
    pub notes: Option<String>,
}

/// Input for rejecting a request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectExitRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}
