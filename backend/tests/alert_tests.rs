//! Stock alert and dashboard tests
//!
//! Properties covered:
//! - Property 8: alert level follows current stock against the minimum

mod common;

use common::{at, dec, fixture, manager};
use proptest::prelude::*;
use shared::store::Action;
use shared::{
    alert_percentage, classify_stock, consumption_stats, dashboard_stats, fill_percentage,
    AlertLevel, ProductPatch, StockPolicy, MAX_WINDOW_DAYS,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_threshold_examples() {
        assert_eq!(classify_stock(dec(11), dec(10)), None);
        assert_eq!(classify_stock(dec(10), dec(10)), Some(AlertLevel::Low));
        assert_eq!(classify_stock(dec(0), dec(10)), Some(AlertLevel::Critical));
        assert_eq!(classify_stock(dec(-3), dec(10)), Some(AlertLevel::Critical));
    }

    #[test]
    fn test_percentages_use_distinct_bases() {
        assert_eq!(alert_percentage(dec(5), dec(10)), dec(50));
        assert_eq!(fill_percentage(dec(5), dec(20)), dec(25));
        assert_eq!(alert_percentage(dec(5), dec(0)), dec(0));
    }

    #[test]
    fn test_alert_list_sorted_by_percentage() {
        let mut f = fixture(StockPolicy::default());
        let half = f.add_product("Câble 2.5mm", dec(5), dec(10), dec(50));
        let empty = f.add_product("Disjoncteur 16A", dec(0), dec(4), dec(20));
        f.add_product("Gaine ICTA", dec(30), dec(10), dec(50));

        let alerts = f.snapshot.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].product_id, empty);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[1].product_id, half);
        assert_eq!(alerts[1].percentage, dec(50));
    }

    #[test]
    fn test_archived_products_raise_no_alert() {
        let mut f = fixture(StockPolicy::default());
        let id = f.add_product("Disjoncteur 16A", dec(0), dec(4), dec(20));
        f.apply(Action::SoftDeleteProduct { id }, &manager(), at(1, 0));
        assert!(f.snapshot.alerts().is_empty());
    }

    #[test]
    fn test_dashboard_counts_and_value() {
        let mut f = fixture(StockPolicy::default());
        let low = f.add_product("Câble 2.5mm", dec(5), dec(10), dec(50));
        f.add_product("Disjoncteur 16A", dec(0), dec(4), dec(20));
        f.apply(
            Action::UpdateProduct {
                id: low,
                patch: ProductPatch { unit_price: Some(dec(3)), ..Default::default() },
                skip_movement: false,
            },
            &manager(),
            at(1, 0),
        );

        let stats = dashboard_stats(
            &f.snapshot.products,
            &f.snapshot.exit_requests,
            &f.snapshot.orders,
            &f.snapshot.movements,
            30,
            at(30, 0),
        );
        assert_eq!(stats.product_count, 2);
        assert_eq!(stats.stock_value, dec(15));
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.critical_stock_count, 1);
        assert_eq!(stats.fill_levels.len(), 2);
        assert_eq!(stats.fill_levels[0].fill_percentage, dec(0));
        assert_eq!(stats.fill_levels[1].fill_percentage, dec(10));
    }

    #[test]
    fn test_huge_window_is_clamped() {
        let mut f = fixture(StockPolicy::default());
        let id = f.add_product("Câble 2.5mm", dec(50), dec(10), dec(80));
        f.apply(
            Action::UpdateProduct { id, patch: ProductPatch::stock(dec(40)), skip_movement: false },
            &manager(),
            at(1, 0),
        );
        let product = f.snapshot.product(id).unwrap().clone();

        let consumption = consumption_stats(&product, &f.snapshot.movements, u32::MAX, at(30, 0));
        assert_eq!(consumption.window_days, MAX_WINDOW_DAYS);
        assert_eq!(consumption.total_consumed, dec(10));

        let stats = dashboard_stats(
            &f.snapshot.products,
            &f.snapshot.exit_requests,
            &f.snapshot.orders,
            &f.snapshot.movements,
            u32::MAX,
            at(30, 0),
        );
        assert_eq!(stats.window_days, MAX_WINDOW_DAYS);
        assert_eq!(stats.movements_in_window, 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 8: none above min, low in (0, min], critical at or below zero
        #[test]
        fn prop_alert_level_classification(current in -100i64..1_000, min in 0i64..500) {
            let level = classify_stock(dec(current), dec(min));
            if current <= 0 {
                prop_assert_eq!(level, Some(AlertLevel::Critical));
            } else if current <= min {
                prop_assert_eq!(level, Some(AlertLevel::Low));
            } else {
                prop_assert_eq!(level, None);
            }
        }

        /// A product view carries the same level as the alert list
        #[test]
        fn prop_view_and_alert_list_agree(stock in 0i64..100, min in 0i64..100) {
            let mut f = fixture(StockPolicy::default());
            let id = f.add_product("Câble 2.5mm", dec(stock), dec(min), dec(100));
            let view = f.snapshot.product_view(f.snapshot.product(id).unwrap());
            let listed = f.snapshot.alerts().into_iter().find(|a| a.product_id == id).map(|a| a.level);
            prop_assert_eq!(view.alert, listed);
        }
    }
}
