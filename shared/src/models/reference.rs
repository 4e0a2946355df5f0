//! Reference data: categories, units and storage zones

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Kinds of reference tables products point at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Category,
    Unit,
    StorageZone,
}

impl ReferenceKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Category => "categories",
            ReferenceKind::Unit => "units",
            ReferenceKind::StorageZone => "storage_zones",
        }
    }

    /// Product column holding the foreign key
    pub fn product_column(&self) -> &'static str {
        match self {
            ReferenceKind::Category => "category_id",
            ReferenceKind::Unit => "unit_id",
            ReferenceKind::StorageZone => "storage_zone_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Category => "Category",
            ReferenceKind::Unit => "Unit",
            ReferenceKind::StorageZone => "Storage zone",
        }
    }
}

/// A row of one of the reference tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub type Category = ReferenceEntry;
pub type Unit = ReferenceEntry;
pub type StorageZone = ReferenceEntry;

/// Input for creating or renaming a reference row
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReferenceInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}
