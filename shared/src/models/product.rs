//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::alerts::AlertLevel;

/// Maximum number of supplier/order links on a product
pub const MAX_SUPPLIER_LINKS: usize = 3;

/// A product held in stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    /// Human-facing unique reference (e.g., "RF00001")
    pub reference: String,
    pub designation: String,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub storage_zone_id: Option<Uuid>,
    pub shelf: Option<String>,
    pub position: Option<String>,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub max_stock: Decimal,
    pub unit_price: Option<Decimal>,
    /// Opaque object-storage reference
    pub photo_reference: Option<String>,
    pub supplier_links: Vec<SupplierLink>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Supplier name paired with an ordering URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupplierLink {
    pub supplier: String,
    pub url: Option<String>,
}

/// Product with reference names and location resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category: String,
    pub unit: String,
    pub storage_zone: Option<String>,
    pub location: String,
    pub photo_url: Option<String>,
    pub alert: Option<AlertLevel>,
}

/// Compose the display location `zone.shelf.position`
///
/// Missing parts render as empty segments; a product with no placement at all
/// has an empty location.
pub fn compose_location(zone: Option<&str>, shelf: Option<&str>, position: Option<&str>) -> String {
    let parts = [zone, shelf, position];
    if parts.iter().all(|p| p.map_or(true, |s| s.is_empty())) {
        return String::new();
    }
    parts.map(|p| p.unwrap_or("")).join(".")
}

/// Input for creating a product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_new_product"))]
pub struct NewProduct {
    /// Generated when absent
    pub reference: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub designation: String,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub storage_zone_id: Option<Uuid>,
    pub shelf: Option<String>,
    pub position: Option<String>,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub max_stock: Decimal,
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    #[validate(length(max = 3))]
    pub supplier_links: Vec<SupplierLink>,
}

fn validate_new_product(input: &NewProduct) -> Result<(), ValidationError> {
    crate::validation::validate_stock_levels(input.current_stock, input.min_stock, input.max_stock)
        .map_err(ValidationError::new)?;
    if let Some(reference) = &input.reference {
        crate::validation::validate_reference(reference).map_err(ValidationError::new)?;
    }
    if input.designation.trim().is_empty() {
        return Err(ValidationError::new("Designation is required"));
    }
    Ok(())
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 255))]
    pub designation: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub storage_zone_id: Option<Uuid>,
    pub shelf: Option<String>,
    pub position: Option<String>,
    pub current_stock: Option<Decimal>,
    pub min_stock: Option<Decimal>,
    pub max_stock: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub photo_reference: Option<String>,
    #[validate(length(max = 3))]
    pub supplier_links: Option<Vec<SupplierLink>>,
}

impl ProductPatch {
    pub fn stock(value: Decimal) -> Self {
        Self {
            current_stock: Some(value),
            ..Default::default()
        }
    }

    /// Apply the present fields onto a copy of `product`
    pub fn apply_to(&self, product: &Product, now: DateTime<Utc>) -> Product {
        let mut updated = product.clone();
        if let Some(designation) = &self.designation {
            updated.designation = designation.clone();
        }
        if let Some(category_id) = self.category_id {
            updated.category_id = category_id;
        }
        if let Some(unit_id) = self.unit_id {
            updated.unit_id = unit_id;
        }
        if let Some(zone_id) = self.storage_zone_id {
            updated.storage_zone_id = Some(zone_id);
        }
        if let Some(shelf) = &self.shelf {
            updated.shelf = Some(shelf.clone());
        }
        if let Some(position) = &self.position {
            updated.position = Some(position.clone());
        }
        if let Some(stock) = self.current_stock {
            updated.current_stock = stock;
        }
        if let Some(min) = self.min_stock {
            updated.min_stock = min;
        }
        if let Some(max) = self.max_stock {
            updated.max_stock = max;
        }
        if let Some(price) = self.unit_price {
            updated.unit_price = Some(price);
        }
        if let Some(photo) = &self.photo_reference {
            updated.photo_reference = Some(photo.clone());
        }
        if let Some(links) = &self.supplier_links {
            updated.supplier_links = links.clone();
        }
        updated.updated_at = now;
        updated
    }
}

/// Catalog listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub storage_zone_id: Option<Uuid>,
    /// Matches reference or designation, case-insensitive
    pub search: Option<String>,
    #[serde(default)]
    pub alert_only: bool,
    #[serde(default)]
    pub include_deleted: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_deleted && product.is_deleted() {
            return false;
        }
        if self.category_id.is_some_and(|id| id != product.category_id) {
            return false;
        }
        if self
            .storage_zone_id
            .is_some_and(|id| Some(id) != product.storage_zone_id)
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !product.reference.to_lowercase().contains(&needle)
                && !product.designation.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.alert_only
            && crate::alerts::classify_stock(product.current_stock, product.min_stock).is_none()
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_location() {
        assert_eq!(compose_location(Some("A"), Some("3"), Some("12")), "A.3.12");
        assert_eq!(compose_location(Some("A"), None, Some("2")), "A..2");
        assert_eq!(compose_location(None, None, None), "");
    }

    #[test]
    fn test_new_product_thresholds_validated() {
        let input = NewProduct {
            reference: None,
            designation: "Roulement 6204".to_string(),
            category_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            storage_zone_id: None,
            shelf: None,
            position: None,
            current_stock: Decimal::from(5),
            min_stock: Decimal::from(10),
            max_stock: Decimal::from(2),
            unit_price: None,
            supplier_links: vec![],
        };
        assert!(input.validate().is_err());

        let valid = NewProduct {
            max_stock: Decimal::from(50),
            ..input
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_too_many_supplier_links_rejected() {
        let link = SupplierLink {
            supplier: "Acme".to_string(),
            url: None,
        };
        let patch = ProductPatch {
            supplier_links: Some(vec![link.clone(), link.clone(), link.clone(), link]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
