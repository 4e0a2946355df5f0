//! Optimistic client state tests
//!
//! Actions show in the view at once, then fold into the confirmed state on
//! success or vanish on failure.

mod common;

use common::{at, dec, fixture, manager, requester};
use proptest::prelude::*;
use shared::store::{Action, OptimisticStore};
use shared::{NewExitRequest, ProductPatch, StockPolicy};
use uuid::Uuid;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_confirmed_action_reaches_confirmed_state() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let mut store = OptimisticStore::new(f.snapshot.clone(), manager());

        let id = store
            .dispatch(
                Action::UpdateProduct { id: product_id, patch: ProductPatch::stock(dec(35)), skip_movement: false },
                at(1, 0),
            )
            .unwrap();
        assert_eq!(store.view().product(product_id).unwrap().current_stock, dec(35));
        assert_eq!(store.confirmed().product(product_id).unwrap().current_stock, dec(40));

        store.confirm(id).unwrap();
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.confirmed().product(product_id).unwrap().current_stock, dec(35));
    }

    #[test]
    fn test_failed_photo_upload_reverts_view() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let mut snapshot = f.snapshot.clone();
        snapshot.photo_base_url = Some("https://storage.example.test/object/public/photos".to_string());
        let mut store = OptimisticStore::new(snapshot, manager());

        let id = store
            .dispatch(
                Action::SetProductPhoto { id: product_id, photo_reference: "products/x.jpg".to_string() },
                at(1, 0),
            )
            .unwrap();
        let view = store.view().product_view(store.view().product(product_id).unwrap());
        assert_eq!(
            view.photo_url.as_deref(),
            Some("https://storage.example.test/object/public/photos/products/x.jpg")
        );

        let dropped = store.revert(id).unwrap();
        assert!(dropped.is_empty());
        assert!(store.view().product(product_id).unwrap().photo_reference.is_none());
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_revert_drops_dependent_actions() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let request_id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest {
                id: request_id,
                input: NewExitRequest {
                    product_id,
                    quantity: dec(4),
                    reason: "Armoire 3".to_string(),
                    notes: None,
                },
            },
            &requester(),
            at(1, 0),
        );
        let mut store = OptimisticStore::new(f.snapshot.clone(), manager());

        let approve = store.dispatch(Action::ApproveExitRequest { id: request_id }, at(2, 0)).unwrap();
        let exit_id = store.view().pending_exits[0].id;
        let processed = store.dispatch(Action::MarkExitProcessed { id: exit_id }, at(3, 0)).unwrap();

        let dropped = store.revert(approve).unwrap();
        assert_eq!(dropped, vec![processed]);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.view().product(product_id).unwrap().current_stock, dec(40));
        assert!(store.view().pending_exits.is_empty());
    }

    #[test]
    fn test_confirm_keeps_later_pick_list_action() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let request_id = Uuid::new_v4();
        f.apply(
            Action::SubmitExitRequest {
                id: request_id,
                input: NewExitRequest {
                    product_id,
                    quantity: dec(4),
                    reason: String::new(),
                    notes: None,
                },
            },
            &requester(),
            at(1, 0),
        );
        let mut store = OptimisticStore::new(f.snapshot.clone(), manager());

        let approve = store.dispatch(Action::ApproveExitRequest { id: request_id }, at(2, 0)).unwrap();
        let exit_id = store.view().pending_exits[0].id;
        store.dispatch(Action::MarkExitProcessed { id: exit_id }, at(3, 0)).unwrap();

        store.confirm(approve).unwrap();
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.confirmed().pending_exits[0].id, exit_id);
        assert!(store.view().pending_exits[0].processed_at.is_some());
    }

    #[test]
    fn test_rebuild_keeps_optimistic_movement_ids() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let mut store = OptimisticStore::new(f.snapshot.clone(), manager());

        let first = store
            .dispatch(
                Action::UpdateProduct { id: product_id, patch: ProductPatch::stock(dec(35)), skip_movement: false },
                at(1, 0),
            )
            .unwrap();
        let second = store
            .dispatch(
                Action::UpdateProduct { id: product_id, patch: ProductPatch::stock(dec(30)), skip_movement: false },
                at(2, 0),
            )
            .unwrap();
        let before: Vec<Uuid> = store.view().movements.iter().map(|m| m.id).collect();

        store.refresh(f.snapshot.clone());
        let after_refresh: Vec<Uuid> = store.view().movements.iter().map(|m| m.id).collect();
        assert_eq!(after_refresh, before);

        store.confirm(first).unwrap();
        let after_confirm: Vec<Uuid> = store.view().movements.iter().map(|m| m.id).collect();
        assert_eq!(after_confirm, before);

        store.confirm(second).unwrap();
        assert_eq!(
            store.confirmed().movements.iter().map(|m| m.id).collect::<Vec<_>>(),
            before
        );
    }

    #[test]
    fn test_invalid_action_refused_outright() {
        let mut f = fixture(StockPolicy::default());
        f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let mut store = OptimisticStore::new(f.snapshot.clone(), requester());

        let result = store.dispatch(Action::SoftDeleteProduct { id: f.snapshot.products[0].id }, at(1, 0));
        assert!(result.is_err());
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_refresh_replays_pending_actions() {
        let mut f = fixture(StockPolicy::default());
        let product_id = f.add_product("Fusible 10A", dec(40), dec(5), dec(100));
        let mut store = OptimisticStore::new(f.snapshot.clone(), manager());
        store
            .dispatch(
                Action::UpdateProduct {
                    id: product_id,
                    patch: ProductPatch { designation: Some("Fusible 10A gG".to_string()), ..Default::default() },
                    skip_movement: true,
                },
                at(1, 0),
            )
            .unwrap();

        // another session moved stock meanwhile
        f.apply(
            Action::UpdateProduct { id: product_id, patch: ProductPatch::stock(dec(12)), skip_movement: false },
            &manager(),
            at(1, 30),
        );
        let dropped = store.refresh(f.snapshot.clone());

        assert!(dropped.is_empty());
        let product = store.view().product(product_id).unwrap();
        assert_eq!(product.current_stock, dec(12));
        assert_eq!(product.designation, "Fusible 10A gG");
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

        /// Reverting every action restores the confirmed view
        #[test]
        fn prop_revert_all_restores_confirmed(stocks in prop::collection::vec(0i64..500, 1..6)) {
            let mut f = fixture(StockPolicy::default());
            let product_id = f.add_product("Fusible 10A", dec(40), dec(0), dec(500));
            let mut store = OptimisticStore::new(f.snapshot.clone(), manager());

            let ids: Vec<_> = stocks
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    store
                        .dispatch(
                            Action::UpdateProduct { id: product_id, patch: ProductPatch::stock(dec(*s)), skip_movement: false },
                            at(1 + i as u32, 0),
                        )
                        .unwrap()
                })
                .collect();
            prop_assert_eq!(store.view().product(product_id).unwrap().current_stock, dec(*stocks.last().unwrap()));

            for id in ids.into_iter().rev() {
                store.revert(id).unwrap();
            }
            prop_assert_eq!(store.pending_count(), 0);
            prop_assert_eq!(&store.view().products, &store.confirmed().products);
            prop_assert_eq!(store.view().movements.len(), store.confirmed().movements.len());
        }
    }
}
