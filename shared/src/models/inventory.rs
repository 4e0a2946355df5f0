//! Warehouse floor models: pick list, cart and physical counts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An approved exit waiting to be physically picked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingExit {
    pub id: Uuid,
    pub exit_request_id: Uuid,
    pub product_id: Uuid,
    pub product_reference: String,
    pub product_designation: String,
    pub location: String,
    pub quantity: Decimal,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub approved_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A draft line in a user's cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

/// Input for adding or updating a cart line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: String,
}

/// A physical count of one product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InventoryCount {
    pub product_id: Uuid,
    pub counted_quantity: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}
