//! Stock ledger models

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason class of a stock movement; quantity direction is implied by it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entry,
    Exit,
    Adjustment,
    Initial,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::Adjustment => "adjustment",
            MovementType::Initial => "initial",
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementType::Entry),
            "exit" => Ok(MovementType::Exit),
            "adjustment" => Ok(MovementType::Adjustment),
            "initial" => Ok(MovementType::Initial),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Snapshot at write time
    pub product_reference: String,
    pub product_designation: String,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub user_id: Uuid,
    pub user_name: String,
    pub reason: String,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A ledger entry about to be appended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub product_reference: String,
    pub product_designation: String,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub user_id: Uuid,
    pub user_name: String,
    pub reason: String,
    pub notes: Option<String>,
}

impl NewMovement {
    /// Id derived from the row's content, so replaying the same action
    /// at the same instant yields the same ledger row
    pub fn derived_id(&self, timestamp: DateTime<Utc>) -> Uuid {
        let name = format!(
            "{}|{}|{}|{}|{}|{}",
            self.movement_type.as_str(),
            timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            self.previous_stock,
            self.new_stock,
            self.user_id,
            self.reason,
        );
        Uuid::new_v5(&self.product_id, name.as_bytes())
    }

    pub fn into_derived_movement(self, timestamp: DateTime<Utc>) -> StockMovement {
        let id = self.derived_id(timestamp);
        self.into_movement(id, timestamp)
    }

    pub fn into_movement(self, id: Uuid, timestamp: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id,
            product_id: self.product_id,
            product_reference: self.product_reference,
            product_designation: self.product_designation,
            movement_type: self.movement_type,
            quantity: self.quantity,
            previous_stock: self.previous_stock,
            new_stock: self.new_stock,
            user_id: self.user_id,
            user_name: self.user_name,
            reason: self.reason,
            notes: self.notes,
            timestamp,
        }
    }
}

/// Ledger query filter; every present field must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn for_product(product_id: Uuid) -> Self {
        Self {
            product_id: Some(product_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, movement: &StockMovement) -> bool {
        self.product_id.map_or(true, |id| id == movement.product_id)
            && self.user_id.map_or(true, |id| id == movement.user_id)
            && self.movement_type.map_or(true, |t| t == movement.movement_type)
            && self.from.map_or(true, |from| movement.timestamp >= from)
            && self.to.map_or(true, |to| movement.timestamp <= to)
    }
}
