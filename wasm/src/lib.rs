//! WebAssembly module for the Stock Manager platform
//!
//! Provides client-side computation for:
//! - Stock alert classification and percentages
//! - Basket grouping of exit requests
//! - Product location and reference formatting
//! - The application-state reducer used for optimistic updates

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::store::{Action, Snapshot};
pub use shared::types::*;

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// Classify a stock level: "critical", "low", or "" when not alerted
#[wasm_bindgen]
pub fn classify_stock_level(current_stock: f64, min_stock: f64) -> String {
    shared::classify_stock(to_decimal(current_stock), to_decimal(min_stock))
        .map(|level| level.as_str().to_string())
        .unwrap_or_default()
}

/// Alert-list percentage (stock against minimum)
#[wasm_bindgen]
pub fn alert_percentage(current_stock: f64, min_stock: f64) -> f64 {
    shared::alert_percentage(to_decimal(current_stock), to_decimal(min_stock))
        .to_f64()
        .unwrap_or(0.0)
}

/// Dashboard percentage (stock against maximum)
#[wasm_bindgen]
pub fn fill_percentage(current_stock: f64, max_stock: f64) -> f64 {
    shared::fill_percentage(to_decimal(current_stock), to_decimal(max_stock))
        .to_f64()
        .unwrap_or(0.0)
}

/// Compose a `zone.shelf.position` location string
#[wasm_bindgen]
pub fn format_location(zone: Option<String>, shelf: Option<String>, position: Option<String>) -> String {
    compose_location(zone.as_deref(), shelf.as_deref(), position.as_deref())
}

/// Next generated product reference after the given JSON array of references
#[wasm_bindgen]
pub fn next_product_reference(references_json: &str) -> Result<String, JsValue> {
    let references: Vec<String> =
        serde_json::from_str(references_json).map_err(|e| js_error("Invalid references JSON", e))?;
    Ok(shared::next_reference(references.iter().map(String::as_str)))
}

/// Group a JSON array of exit requests into baskets
#[wasm_bindgen]
pub fn group_baskets(requests_json: &str) -> Result<String, JsValue> {
    let requests: Vec<ExitRequest> =
        serde_json::from_str(requests_json).map_err(|e| js_error("Invalid requests JSON", e))?;
    serde_json::to_string(&shared::group_into_baskets(&requests))
        .map_err(|e| js_error("Serialization failed", e))
}

/// Alert list for a JSON array of products
#[wasm_bindgen]
pub fn stock_alert_list(products_json: &str) -> Result<String, JsValue> {
    let products: Vec<Product> =
        serde_json::from_str(products_json).map_err(|e| js_error("Invalid products JSON", e))?;
    serde_json::to_string(&shared::stock_alerts(&products))
        .map_err(|e| js_error("Serialization failed", e))
}

/// Apply one action to a snapshot and return the new snapshot as JSON
#[wasm_bindgen]
pub fn apply_action(
    snapshot_json: &str,
    action_json: &str,
    actor_json: &str,
    now_rfc3339: &str,
) -> Result<String, JsValue> {
    let snapshot: Snapshot =
        serde_json::from_str(snapshot_json).map_err(|e| js_error("Invalid snapshot JSON", e))?;
    let action: Action =
        serde_json::from_str(action_json).map_err(|e| js_error("Invalid action JSON", e))?;
    let actor: Actor =
        serde_json::from_str(actor_json).map_err(|e| js_error("Invalid actor JSON", e))?;
    let now = DateTime::parse_from_rfc3339(now_rfc3339)
        .map_err(|e| js_error("Invalid timestamp", e))?
        .with_timezone(&Utc);

    let next = snapshot
        .apply(&action, &actor, now)
        .map_err(|e| js_error("Action refused", e))?;
    serde_json::to_string(&next).map_err(|e| js_error("Serialization failed", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_stock_level() {
        assert_eq!(classify_stock_level(0.0, 10.0), "critical");
        assert_eq!(classify_stock_level(10.0, 10.0), "low");
        assert_eq!(classify_stock_level(11.0, 10.0), "");
    }

    #[test]
    fn test_percentages() {
        assert!((alert_percentage(5.0, 10.0) - 50.0).abs() < 0.001);
        assert!((fill_percentage(5.0, 20.0) - 25.0).abs() < 0.001);
        assert_eq!(fill_percentage(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_format_location() {
        assert_eq!(
            format_location(Some("B".into()), Some("2".into()), Some("07".into())),
            "B.2.07"
        );
    }

    #[test]
    fn test_next_product_reference() {
        assert_eq!(
            next_product_reference(r#"["RF00007","RF00002"]"#).unwrap(),
            "RF00008"
        );
    }
}
