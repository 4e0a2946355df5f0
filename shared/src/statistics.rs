//! Read-side statistics over the catalog, the ledger and orders

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::{classify_stock, fill_percentage, AlertLevel};
use crate::models::{
    ExitRequest, ExitRequestStatus, MovementType, Order, OrderStatus, Product, StockMovement,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Longest accepted statistics window (ten years)
pub const MAX_WINDOW_DAYS: u32 = 3_650;

/// Clamp a requested window into `1..=MAX_WINDOW_DAYS`
pub fn clamp_window(window_days: u32) -> u32 {
    window_days.clamp(1, MAX_WINDOW_DAYS)
}

/// Start of the trailing window ending at `now`
pub fn window_start(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(clamp_window(window_days))))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Consumption and stock-out forecast for one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionStats {
    pub product_id: Uuid,
    pub window_days: u32,
    pub total_consumed: Decimal,
    pub average_daily: Decimal,
    /// `None` when nothing was consumed: stock never runs out at this rate
    pub days_until_stockout: Option<Decimal>,
}

/// Sum `exit` rows of the trailing window and project the stock-out date
pub fn consumption_stats(
    product: &Product,
    movements: &[StockMovement],
    window_days: u32,
    now: DateTime<Utc>,
) -> ConsumptionStats {
    let window_days = clamp_window(window_days);
    let since = window_start(now, window_days);
    let total_consumed: Decimal = movements
        .iter()
        .filter(|m| {
            m.product_id == product.id
                && m.movement_type == MovementType::Exit
                && m.timestamp >= since
                && m.timestamp <= now
        })
        .map(|m| m.quantity)
        .sum();

    let average_daily = total_consumed / Decimal::from(window_days);
    let days_until_stockout = if average_daily.is_zero() {
        None
    } else if product.current_stock <= Decimal::ZERO {
        Some(Decimal::ZERO)
    } else {
        Some((product.current_stock / average_daily).round_dp(1))
    };

    ConsumptionStats {
        product_id: product.id,
        window_days,
        total_consumed,
        average_daily: average_daily.round_dp(3),
        days_until_stockout,
    }
}

/// Mean days between ordering and receipt over received orders; zero if none
pub fn average_delivery_days(orders: &[Order]) -> Decimal {
    let durations: Vec<Decimal> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Received)
        .filter_map(|o| o.received_at.map(|r| r - o.ordered_at))
        .map(|d| Decimal::from(d.num_seconds()) / Decimal::from(SECONDS_PER_DAY))
        .collect();

    if durations.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = durations.iter().sum();
    (total / Decimal::from(durations.len())).round_dp(2)
}

/// Quantity consumed per product over the window, largest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumedProduct {
    pub product_id: Uuid,
    pub reference: String,
    pub designation: String,
    pub quantity: Decimal,
}

pub fn top_consumed(
    movements: &[StockMovement],
    window_days: u32,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ConsumedProduct> {
    let since = window_start(now, window_days);
    let mut totals: HashMap<Uuid, ConsumedProduct> = HashMap::new();
    for m in movements
        .iter()
        .filter(|m| m.movement_type == MovementType::Exit && m.timestamp >= since)
    {
        totals
            .entry(m.product_id)
            .or_insert_with(|| ConsumedProduct {
                product_id: m.product_id,
                reference: m.product_reference.clone(),
                designation: m.product_designation.clone(),
                quantity: Decimal::ZERO,
            })
            .quantity += m.quantity;
    }

    let mut ranked: Vec<ConsumedProduct> = totals.into_values().collect();
    ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.reference.cmp(&b.reference)));
    ranked.truncate(limit);
    ranked
}

/// Fill level of one product against its maximum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductFill {
    pub product_id: Uuid,
    pub reference: String,
    pub designation: String,
    pub current_stock: Decimal,
    pub max_stock: Decimal,
    pub fill_percentage: Decimal,
    pub alert: Option<AlertLevel>,
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub product_count: usize,
    pub stock_value: Decimal,
    pub low_stock_count: usize,
    pub critical_stock_count: usize,
    pub pending_request_count: usize,
    pub pending_order_count: usize,
    pub movements_in_window: usize,
    pub window_days: u32,
    /// Alerted products by ascending max-based fill
    pub fill_levels: Vec<ProductFill>,
    pub top_consumed: Vec<ConsumedProduct>,
}

pub fn dashboard_stats(
    products: &[Product],
    requests: &[ExitRequest],
    orders: &[Order],
    movements: &[StockMovement],
    window_days: u32,
    now: DateTime<Utc>,
) -> DashboardStats {
    let window_days = clamp_window(window_days);
    let active: Vec<&Product> = products.iter().filter(|p| !p.is_deleted()).collect();
    let since = window_start(now, window_days);

    let stock_value: Decimal = active
        .iter()
        .filter_map(|p| p.unit_price.map(|price| price * p.current_stock))
        .sum();

    let levels: Vec<Option<AlertLevel>> = active
        .iter()
        .map(|p| classify_stock(p.current_stock, p.min_stock))
        .collect();

    let mut fill_levels: Vec<ProductFill> = active
        .iter()
        .zip(&levels)
        .filter(|(_, level)| level.is_some())
        .map(|(p, level)| ProductFill {
            product_id: p.id,
            reference: p.reference.clone(),
            designation: p.designation.clone(),
            current_stock: p.current_stock,
            max_stock: p.max_stock,
            fill_percentage: fill_percentage(p.current_stock, p.max_stock),
            alert: *level,
        })
        .collect();
    fill_levels.sort_by(|a, b| {
        a.fill_percentage
            .cmp(&b.fill_percentage)
            .then_with(|| a.reference.cmp(&b.reference))
    });

    DashboardStats {
        product_count: active.len(),
        stock_value,
        low_stock_count: levels.iter().filter(|l| **l == Some(AlertLevel::Low)).count(),
        critical_stock_count: levels
            .iter()
            .filter(|l| **l == Some(AlertLevel::Critical))
            .count(),
        pending_request_count: requests
            .iter()
            .filter(|r| r.status == ExitRequestStatus::Pending)
            .count(),
        pending_order_count: orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count(),
        movements_in_window: movements.iter().filter(|m| m.timestamp >= since).count(),
        window_days,
        fill_levels,
        top_consumed: top_consumed(movements, window_days, now, 5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(ordered_at: DateTime<Utc>, received_at: Option<DateTime<Utc>>, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_reference: "RF00001".to_string(),
            product_designation: "Courroie".to_string(),
            quantity: Decimal::from(4),
            ordered_by: Uuid::new_v4(),
            ordered_by_name: "Manager".to_string(),
            ordered_at,
            status,
            received_at,
            notes: None,
        }
    }

    #[test]
    fn test_average_delivery_days() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let orders = vec![
            order(t0, Some(t0 + Duration::days(2)), OrderStatus::Received),
            order(t0, Some(t0 + Duration::days(5)), OrderStatus::Received),
            order(t0, None, OrderStatus::Pending),
            order(t0, None, OrderStatus::Cancelled),
        ];
        assert_eq!(average_delivery_days(&orders), Decimal::new(35, 1));
    }

    #[test]
    fn test_window_start_clamps_huge_window() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        assert_eq!(clamp_window(u32::MAX), MAX_WINDOW_DAYS);
        assert_eq!(clamp_window(0), 1);
        assert_eq!(
            window_start(now, u32::MAX),
            now - Duration::days(i64::from(MAX_WINDOW_DAYS))
        );
        assert_eq!(window_start(now, 0), now - Duration::days(1));
    }

    #[test]
    fn test_average_delivery_days_none_received() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        assert_eq!(
            average_delivery_days(&[order(t0, None, OrderStatus::Pending)]),
            Decimal::ZERO
        );
        assert_eq!(average_delivery_days(&[]), Decimal::ZERO);
    }
}
