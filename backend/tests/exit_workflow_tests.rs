//! Exit request workflow tests
//!
//! Properties covered:
//! - Property 3: approving a normal request subtracts its quantity once
//! - Property 4: approving an inventory count sets stock to the counted value
//! - Property 5: rejecting leaves stock and ledger untouched

mod common;

use common::{at, dec, fixture, manager, other_requester, requester};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::store::Action;
use shared::{
    ExitRequestStatus, InventoryCount, MovementFilter, MovementType, NewExitRequest, StockPolicy,
    WorkflowError, DISCREPANCY_MARKER,
};
use uuid::Uuid;

fn exit_input(product_id: Uuid, quantity: Decimal) -> NewExitRequest {
    NewExitRequest {
        product_id,
        quantity,
        reason: "Maintenance ligne 2".to_string(),
        notes: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_zero_quantity_refused() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let result = f.snapshot.apply(
            &Action::SubmitExitRequest {
                id: Uuid::new_v4(),
                input: exit_input(product_id, dec(0)),
            },
            &requester(),
            at(1, 0),
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_inventory_count_may_be_zero() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitInventoryCount {
                id,
                count: InventoryCount {
                    product_id,
                    counted_quantity: dec(0),
                    notes: Some("Bac vide".to_string()),
                },
            },
            &requester(),
            at(1, 0),
        );

        let request = f.snapshot.exit_request(id).unwrap();
        assert!(request.reason.starts_with(DISCREPANCY_MARKER));
        assert!(request.is_discrepancy());
        assert_eq!(request.status, ExitRequestStatus::Pending);
    }

    #[test]
    fn test_approval_requires_manager() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(2)) },
            &requester(),
            at(1, 0),
        );
        let result = f.snapshot.apply(&Action::ApproveExitRequest { id }, &requester(), at(2, 0));
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[test]
    fn test_strict_policy_refuses_negative_stock() {
        let mut f = fixture(StockPolicy::strict());
        let product_id = f.add_product("Graisse EP2", dec(3), dec(1), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(5)) },
            &requester(),
            at(1, 0),
        );
        let result = f.snapshot.apply(&Action::ApproveExitRequest { id }, &manager(), at(2, 0));
        assert!(matches!(result, Err(WorkflowError::InsufficientStock { .. })));
        assert_eq!(f.stock(product_id), dec(3));
    }

    #[test]
    fn test_default_policy_allows_negative_stock() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(3), dec(1), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(5)) },
            &requester(),
            at(1, 0),
        );
        f.apply(Action::ApproveExitRequest { id }, &manager(), at(2, 0));
        assert_eq!(f.stock(product_id), dec(-2));
    }

    #[test]
    fn test_approval_adds_pick_list_row() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(4)) },
            &requester(),
            at(1, 0),
        );
        f.apply(Action::ApproveExitRequest { id }, &manager(), at(2, 0));

        assert_eq!(f.snapshot.pending_exits.len(), 1);
        let exit = &f.snapshot.pending_exits[0];
        assert_eq!(exit.exit_request_id, id);
        assert_eq!(exit.location, "A.3.12");
        assert_eq!(exit.quantity, dec(4));
        assert!(exit.processed_at.is_none());

        let exit_id = exit.id;
        f.apply(Action::MarkExitProcessed { id: exit_id }, &manager(), at(3, 0));
        let again = f.snapshot.apply(&Action::MarkExitProcessed { id: exit_id }, &manager(), at(4, 0));
        assert!(matches!(again, Err(WorkflowError::InvalidTransition { .. })));
    }

    #[test]
    fn test_approved_request_cannot_be_approved_again() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(4)) },
            &requester(),
            at(1, 0),
        );
        f.apply(Action::ApproveExitRequest { id }, &manager(), at(2, 0));
        let result = f.snapshot.apply(&Action::ApproveExitRequest { id }, &manager(), at(3, 0));
        assert!(matches!(result, Err(WorkflowError::InvalidTransition { .. })));
        assert_eq!(f.stock(product_id), dec(6));
    }

    #[test]
    fn test_awaiting_reception_then_approved() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(4)) },
            &requester(),
            at(1, 0),
        );
        f.apply(Action::MarkAwaitingReception { id }, &manager(), at(2, 0));
        assert_eq!(
            f.snapshot.exit_request(id).unwrap().status,
            ExitRequestStatus::AwaitingReception
        );

        f.apply(Action::ApproveExitRequest { id }, &manager(), at(3, 0));
        assert_eq!(f.snapshot.exit_request(id).unwrap().status, ExitRequestStatus::Approved);
        assert_eq!(f.stock(product_id), dec(6));
    }

    #[test]
    fn test_rejection_requires_reason() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id, input: exit_input(product_id, dec(4)) },
            &requester(),
            at(1, 0),
        );
        let result = f.snapshot.apply(
            &Action::RejectExitRequest { id, reason: "   ".to_string() },
            &manager(),
            at(2, 0),
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_cancellation_rules() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        let own = Uuid::new_v4();
        let approved = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest { id: own, input: exit_input(product_id, dec(1)) },
            &requester(),
            at(1, 0),
        );
        f.apply(
            Action::SubmitExitRequest { id: approved, input: exit_input(product_id, dec(1)) },
            &requester(),
            at(2, 0),
        );
        f.apply(Action::ApproveExitRequest { id: approved }, &manager(), at(3, 0));

        let stranger = f.snapshot.apply(&Action::CancelExitRequest { id: own }, &other_requester(), at(4, 0));
        assert!(stranger.is_err());

        let closed = f.snapshot.apply(&Action::CancelExitRequest { id: approved }, &requester(), at(4, 0));
        assert!(matches!(closed, Err(WorkflowError::InvalidTransition { .. })));

        f.apply(Action::CancelExitRequest { id: own }, &requester(), at(4, 0));
        assert!(f.snapshot.exit_request(own).is_none());
    }

    #[test]
    fn test_request_on_archived_product_refused() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Graisse EP2", dec(10), dec(2), dec(20));
        f.apply(Action::SoftDeleteProduct { id: product_id }, &manager(), at(1, 0));
        let result = f.snapshot.apply(
            &Action::SubmitExitRequest { id: Uuid::new_v4(), input: exit_input(product_id, dec(1)) },
            &requester(),
            at(2, 0),
        );
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
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

        /// Property 3: stock S, quantity Q -> S - Q and one `exit` row of Q
        #[test]
        fn prop_approval_subtracts_quantity(stock in 0i64..1_000, quantity in 1i64..500) {
            let mut f = fixture(StockPolicy::default());
            let product_id = f.add_product("Filtre à huile", dec(stock), dec(0), dec(1_000));
            let id = Uuid::new_v4();
            f.apply(Action::SubmitExitRequest { id, input: exit_input(product_id, dec(quantity)) }, &requester(), at(1, 0));
            f.apply(Action::ApproveExitRequest { id }, &manager(), at(2, 0));

            prop_assert_eq!(f.stock(product_id), dec(stock - quantity));
            let exits = f.snapshot.movements(&MovementFilter {
                product_id: Some(product_id),
                movement_type: Some(MovementType::Exit),
                ..Default::default()
            });
            prop_assert_eq!(exits.len(), 1);
            prop_assert_eq!(exits[0].quantity, dec(quantity));
            prop_assert_eq!(exits[0].previous_stock, dec(stock));
            prop_assert_eq!(exits[0].new_stock, dec(stock - quantity));
            prop_assert_eq!(exits[0].user_id, manager().user_id);
        }

        /// Property 4: count C on stock S -> stock C and one `adjustment` of |S - C|
        #[test]
        fn prop_inventory_count_sets_stock(stock in 0i64..1_000, counted in 0i64..1_000) {
            let mut f = fixture(StockPolicy::default());
            let product_id = f.add_product("Filtre à huile", dec(stock), dec(0), dec(1_000));
            let id = Uuid::new_v4();
            f.apply(
                Action::SubmitInventoryCount {
                    id,
                    count: InventoryCount { product_id, counted_quantity: dec(counted), notes: None },
                },
                &requester(),
                at(1, 0),
            );
            f.apply(Action::ApproveExitRequest { id }, &manager(), at(2, 0));

            prop_assert_eq!(f.stock(product_id), dec(counted));
            let adjustments = f.snapshot.movements(&MovementFilter {
                product_id: Some(product_id),
                movement_type: Some(MovementType::Adjustment),
                ..Default::default()
            });
            prop_assert_eq!(adjustments.len(), 1);
            prop_assert_eq!(adjustments[0].quantity, dec((stock - counted).abs()));
            prop_assert_eq!(adjustments[0].new_stock, dec(counted));
        }

        /// Property 5: rejection keeps stock and ledger, stores the reason
        #[test]
        fn prop_rejection_changes_nothing(stock in 0i64..1_000, quantity in 1i64..500, reason in "[a-z]{1,12}( [a-z]{1,12}){0,3}") {
            let mut f = fixture(StockPolicy::default());
            let product_id = f.add_product("Filtre à huile", dec(stock), dec(0), dec(1_000));
            let id = Uuid::new_v4();
            f.apply(Action::SubmitExitRequest { id, input: exit_input(product_id, dec(quantity)) }, &requester(), at(1, 0));
            let ledger_len = f.snapshot.movements.len();

            f.apply(Action::RejectExitRequest { id, reason: reason.clone() }, &manager(), at(2, 0));

            let request = f.snapshot.exit_request(id).unwrap();
            prop_assert_eq!(request.status, ExitRequestStatus::Rejected);
            prop_assert_eq!(request.notes.as_deref(), Some(reason.as_str()));
            prop_assert_eq!(request.approved_by, Some(manager().user_id));
            prop_assert_eq!(f.stock(product_id), dec(stock));
            prop_assert_eq!(f.snapshot.movements.len(), ledger_len);
            prop_assert!(f.snapshot.pending_exits.is_empty());
        }
    }
}
