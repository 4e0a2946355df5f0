//! Stock alert classification
//!
//! Two percentage bases coexist: the alert list measures stock against the
//! minimum threshold, the dashboard measures fill against the maximum.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Product;

/// Alert severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Critical,
    Low,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "critical",
            AlertLevel::Low => "low",
        }
    }
}

/// `critical` at zero (or below), `low` at or under the minimum, else none
pub fn classify_stock(current: Decimal, min: Decimal) -> Option<AlertLevel> {
    if current <= Decimal::ZERO {
        Some(AlertLevel::Critical)
    } else if current <= min {
        Some(AlertLevel::Low)
    } else {
        None
    }
}

fn percentage(value: Decimal, base: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (value / base * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Alert-list percentage: `current / min * 100`
pub fn alert_percentage(current: Decimal, min: Decimal) -> Decimal {
    percentage(current, min)
}

/// Dashboard percentage: `current / max * 100`
pub fn fill_percentage(current: Decimal, max: Decimal) -> Decimal {
    percentage(current, max)
}

/// One row of the alert list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlert {
    pub product_id: Uuid,
    pub reference: String,
    pub designation: String,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub level: AlertLevel,
    pub percentage: Decimal,
}

/// Alerted, non-deleted products sorted by ascending min-based percentage
pub fn stock_alerts<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = products
        .into_iter()
        .filter(|p| !p.is_deleted())
        .filter_map(|p| {
            classify_stock(p.current_stock, p.min_stock).map(|level| StockAlert {
                product_id: p.id,
                reference: p.reference.clone(),
                designation: p.designation.clone(),
                current_stock: p.current_stock,
                min_stock: p.min_stock,
                level,
                percentage: alert_percentage(p.current_stock, p.min_stock),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.percentage
            .cmp(&b.percentage)
            .then_with(|| a.reference.cmp(&b.reference))
    });
    alerts
}
