//! Purchase order tests
//!
//! Properties covered:
//! - Property 6: receiving an order adds its quantity with one `entry` row

mod common;

use chrono::Duration;
use common::{at, dec, fixture, manager, requester};
use proptest::prelude::*;
use shared::store::Action;
use shared::{
    average_delivery_days, MovementFilter, MovementType, NewOrder, OrderStatus, StockPolicy,
    WorkflowError,
};
use uuid::Uuid;

fn order_input(product_id: Uuid, quantity: i64) -> NewOrder {
    NewOrder {
        product_id,
        quantity: dec(quantity),
        notes: Some("Fournisseur habituel".to_string()),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_requires_manager() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Lame de scie", dec(2), dec(5), dec(20));
        let result = f.snapshot.apply(
            &Action::PlaceOrder { id: Uuid::new_v4(), input: order_input(product_id, 10) },
            &requester(),
            at(1, 0),
        );
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[test]
    fn test_zero_quantity_order_refused() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Lame de scie", dec(2), dec(5), dec(20));
        let result = f.snapshot.apply(
            &Action::PlaceOrder { id: Uuid::new_v4(), input: order_input(product_id, 0) },
            &manager(),
            at(1, 0),
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_received_order_is_terminal() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Lame de scie", dec(2), dec(5), dec(20));
        let id = Uuid::new_v4();
        f.apply(Action::PlaceOrder { id, input: order_input(product_id, 10) }, &manager(), at(1, 0));
        f.apply(Action::ReceiveOrder { id }, &manager(), at(2, 0));

        let cancel = f.snapshot.apply(&Action::CancelOrder { id }, &manager(), at(3, 0));
        assert!(matches!(cancel, Err(WorkflowError::InvalidTransition { .. })));
        let again = f.snapshot.apply(&Action::ReceiveOrder { id }, &manager(), at(3, 0));
        assert!(matches!(again, Err(WorkflowError::InvalidTransition { .. })));
        assert_eq!(f.stock(product_id), dec(12));
    }

    #[test]
    fn test_cancelled_order_leaves_stock() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Lame de scie", dec(2), dec(5), dec(20));
        let id = Uuid::new_v4();
        f.apply(Action::PlaceOrder { id, input: order_input(product_id, 10) }, &manager(), at(1, 0));
        f.apply(Action::CancelOrder { id }, &manager(), at(2, 0));

        assert_eq!(f.snapshot.order(id).unwrap().status, OrderStatus::Cancelled);
        assert_eq!(f.stock(product_id), dec(2));
        let receive = f.snapshot.apply(&Action::ReceiveOrder { id }, &manager(), at(3, 0));
        assert!(receive.is_err());
    }

    #[test]
    fn test_average_delivery_days() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Lame de scie", dec(2), dec(5), dec(20));
        let fast = Uuid::new_v4();
        let slow = Uuid::new_v4();
        let open = Uuid::new_v4();
        for id in [fast, slow, open] {
            f.apply(Action::PlaceOrder { id, input: order_input(product_id, 1) }, &manager(), at(0, 0));
        }
        f.apply(Action::ReceiveOrder { id: fast }, &manager(), at(0, 0) + Duration::days(2));
        f.apply(Action::ReceiveOrder { id: slow }, &manager(), at(0, 0) + Duration::days(5));

        assert_eq!(average_delivery_days(&f.snapshot.orders), rust_decimal::Decimal::new(35, 1));
    }

    #[test]
    fn test_no_received_orders_gives_zero() {
        assert_eq!(average_delivery_days(&[]), dec(0));
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

        /// Property 6: stock S, ordered Q -> S + Q, one `entry` row, received_at set
        #[test]
        fn prop_receipt_adds_quantity(stock in 0i64..1_000, quantity in 1i64..1_000) {
            let mut f = fixture(StockPolicy::default());
            let product_id = f.add_product("Lame de scie", dec(stock), dec(0), dec(2_000));
            let id = Uuid::new_v4();
            f.apply(Action::PlaceOrder { id, input: order_input(product_id, quantity) }, &manager(), at(1, 0));
            f.apply(Action::ReceiveOrder { id }, &manager(), at(2, 0));

            prop_assert_eq!(f.stock(product_id), dec(stock + quantity));
            let order = f.snapshot.order(id).unwrap();
            prop_assert_eq!(order.status, OrderStatus::Received);
            prop_assert_eq!(order.received_at, Some(at(2, 0)));

            let entries = f.snapshot.movements(&MovementFilter {
                product_id: Some(product_id),
                movement_type: Some(MovementType::Entry),
                ..Default::default()
            });
            prop_assert_eq!(entries.len(), 1);
            prop_assert_eq!(entries[0].quantity, dec(quantity));
            prop_assert_eq!(entries[0].previous_stock, dec(stock));
        }
    }
}
