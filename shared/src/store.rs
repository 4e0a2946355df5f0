//! Client-side application state
//!
//! `Snapshot` is the single application-state object of the browser client.
//! It is only changed through [`Snapshot::apply`], which returns a new
//! snapshot. [`OptimisticStore`] layers optimistic updates on top: actions are
//! shown immediately and later confirmed or reverted once the backend answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::{classify_stock, stock_alerts, StockAlert};
use crate::basket::{
    group_into_baskets, pending_members, Basket, BasketKey, BasketOperation, BasketOutcome,
};
use crate::error::{require_manager, WorkflowError, WorkflowResult};
use crate::ledger::{
    check_exit_cancellation, plan_awaiting_reception, plan_exit_approval, plan_exit_rejection,
    plan_exit_request, plan_inventory_count, plan_order, plan_order_cancellation,
    plan_order_receipt, plan_product_creation, plan_product_update, StockPolicy,
};
use crate::models::{
    compose_location, Actor, ExitRequest, InventoryCount, MovementFilter, NewExitRequest,
    NewOrder, NewProduct, Order, PendingExit, Product, ProductFilter, ProductPatch, ProductView,
    ReferenceEntry, ReferenceKind, StockMovement,
};
use crate::validation::next_reference;

/// An operation on the application state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    AddReference {
        kind: ReferenceKind,
        entry: ReferenceEntry,
    },
    RenameReference {
        kind: ReferenceKind,
        id: Uuid,
        name: String,
    },
    DeleteReference {
        kind: ReferenceKind,
        id: Uuid,
    },
    CreateProduct {
        id: Uuid,
        input: NewProduct,
    },
    UpdateProduct {
        id: Uuid,
        patch: ProductPatch,
        skip_movement: bool,
    },
    SetProductPhoto {
        id: Uuid,
        photo_reference: String,
    },
    SoftDeleteProduct {
        id: Uuid,
    },
    SubmitExitRequest {
        id: Uuid,
        input: NewExitRequest,
    },
    /// Every line shares one submission time and therefore one basket
    SubmitCart {
        lines: Vec<(Uuid, NewExitRequest)>,
    },
    SubmitInventoryCount {
        id: Uuid,
        count: InventoryCount,
    },
    ApproveExitRequest {
        id: Uuid,
    },
    RejectExitRequest {
        id: Uuid,
        reason: String,
    },
    MarkAwaitingReception {
        id: Uuid,
    },
    CancelExitRequest {
        id: Uuid,
    },
    ApproveBasket {
        key: BasketKey,
    },
    RejectBasket {
        key: BasketKey,
        reason: String,
    },
    CancelBasket {
        key: BasketKey,
    },
    MarkExitProcessed {
        id: Uuid,
    },
    PlaceOrder {
        id: Uuid,
        input: NewOrder,
    },
    ReceiveOrder {
        id: Uuid,
    },
    CancelOrder {
        id: Uuid,
    },
}

/// Application state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub categories: Vec<ReferenceEntry>,
    pub units: Vec<ReferenceEntry>,
    pub storage_zones: Vec<ReferenceEntry>,
    pub products: Vec<Product>,
    pub movements: Vec<StockMovement>,
    pub exit_requests: Vec<ExitRequest>,
    pub orders: Vec<Order>,
    pub pending_exits: Vec<PendingExit>,
    pub policy: StockPolicy,
    /// Public object-storage prefix used to resolve photo references
    pub photo_base_url: Option<String>,
}

impl Snapshot {
    pub fn with_policy(policy: StockPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn references(&self, kind: ReferenceKind) -> &[ReferenceEntry] {
        match kind {
            ReferenceKind::Category => &self.categories,
            ReferenceKind::Unit => &self.units,
            ReferenceKind::StorageZone => &self.storage_zones,
        }
    }

    fn references_mut(&mut self, kind: ReferenceKind) -> &mut Vec<ReferenceEntry> {
        match kind {
            ReferenceKind::Category => &mut self.categories,
            ReferenceKind::Unit => &mut self.units,
            ReferenceKind::StorageZone => &mut self.storage_zones,
        }
    }

    pub fn reference_name(&self, kind: ReferenceKind, id: Uuid) -> Option<&str> {
        self.references(kind)
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    /// Any product, soft-deleted ones included
    pub fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn exit_request(&self, id: Uuid) -> Option<&ExitRequest> {
        self.exit_requests.iter().find(|r| r.id == id)
    }

    pub fn order(&self, id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn location_of(&self, product: &Product) -> String {
        let zone = product
            .storage_zone_id
            .and_then(|id| self.reference_name(ReferenceKind::StorageZone, id));
        compose_location(zone, product.shelf.as_deref(), product.position.as_deref())
    }

    /// Resolve reference names at read time
    pub fn product_view(&self, product: &Product) -> ProductView {
        ProductView {
            category: self
                .reference_name(ReferenceKind::Category, product.category_id)
                .unwrap_or_default()
                .to_string(),
            unit: self
                .reference_name(ReferenceKind::Unit, product.unit_id)
                .unwrap_or_default()
                .to_string(),
            storage_zone: product
                .storage_zone_id
                .and_then(|id| self.reference_name(ReferenceKind::StorageZone, id))
                .map(str::to_string),
            location: self.location_of(product),
            photo_url: product.photo_reference.as_ref().map(|reference| {
                match &self.photo_base_url {
                    Some(base) => format!("{}/{}", base.trim_end_matches('/'), reference),
                    None => reference.clone(),
                }
            }),
            alert: classify_stock(product.current_stock, product.min_stock),
            product: product.clone(),
        }
    }

    /// Catalog listing ordered by reference; soft-deleted rows excluded by default
    pub fn list_products(&self, filter: &ProductFilter) -> Vec<ProductView> {
        let mut views: Vec<ProductView> = self
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| self.product_view(p))
            .collect();
        views.sort_by(|a, b| a.product.reference.cmp(&b.product.reference));
        views
    }

    /// Ledger rows matching the filter, newest first
    pub fn movements(&self, filter: &MovementFilter) -> Vec<&StockMovement> {
        let mut rows: Vec<&StockMovement> =
            self.movements.iter().filter(|m| filter.matches(m)).collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }

    pub fn baskets(&self) -> Vec<Basket> {
        group_into_baskets(&self.exit_requests)
    }

    pub fn alerts(&self) -> Vec<StockAlert> {
        stock_alerts(&self.products)
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Apply an action and return the resulting snapshot
    ///
    /// On error the receiver is unchanged.
    pub fn apply(&self, action: &Action, actor: &Actor, now: DateTime<Utc>) -> WorkflowResult<Snapshot> {
        let mut next = self.clone();
        match action {
            Action::AddReference { kind, entry } => {
                require_manager(actor)?;
                next.add_reference(*kind, entry.clone())?;
            }
            Action::RenameReference { kind, id, name } => {
                require_manager(actor)?;
                next.rename_reference(*kind, *id, name)?;
            }
            Action::DeleteReference { kind, id } => {
                require_manager(actor)?;
                next.delete_reference(*kind, *id)?;
            }
            Action::CreateProduct { id, input } => {
                next.create_product(*id, input, actor, now)?;
            }
            Action::UpdateProduct {
                id,
                patch,
                skip_movement,
            } => {
                next.update_product(*id, patch, *skip_movement, actor, now)?;
            }
            Action::SetProductPhoto {
                id,
                photo_reference,
            } => {
                let patch = ProductPatch {
                    photo_reference: Some(photo_reference.clone()),
                    ..Default::default()
                };
                next.update_product(*id, &patch, true, actor, now)?;
            }
            Action::SoftDeleteProduct { id } => {
                require_manager(actor)?;
                let product = next
                    .products
                    .iter_mut()
                    .find(|p| p.id == *id && !p.is_deleted())
                    .ok_or_else(|| WorkflowError::not_found("Product"))?;
                product.deleted_at = Some(now);
                product.updated_at = now;
            }
            Action::SubmitExitRequest { id, input } => {
                let product = next.active_product(input.product_id)?;
                let request = plan_exit_request(*id, product, input, actor, now)?;
                next.exit_requests.push(request);
            }
            Action::SubmitCart { lines } => {
                if lines.is_empty() {
                    return Err(WorkflowError::validation("lines", "Cart is empty"));
                }
                for (id, input) in lines {
                    let product = next.active_product(input.product_id)?;
                    let request = plan_exit_request(*id, product, input, actor, now)?;
                    next.exit_requests.push(request);
                }
            }
            Action::SubmitInventoryCount { id, count } => {
                let product = next.active_product(count.product_id)?;
                let request = plan_inventory_count(*id, product, count, actor, now)?;
                next.exit_requests.push(request);
            }
            Action::ApproveExitRequest { id } => {
                require_manager(actor)?;
                next.approve_exit_request(*id, actor, now)?;
            }
            Action::RejectExitRequest { id, reason } => {
                require_manager(actor)?;
                next.reject_exit_request(*id, reason, actor, now)?;
            }
            Action::MarkAwaitingReception { id } => {
                require_manager(actor)?;
                let request = next.exit_request_mut(*id)?;
                *request = plan_awaiting_reception(request)?;
            }
            Action::CancelExitRequest { id } => {
                next.cancel_exit_request(*id, actor)?;
            }
            Action::ApproveBasket { key } => {
                next = self.apply_basket(key, &BasketOperation::Approve, actor, now)?.0;
            }
            Action::RejectBasket { key, reason } => {
                let operation = BasketOperation::Reject {
                    reason: reason.clone(),
                };
                next = self.apply_basket(key, &operation, actor, now)?.0;
            }
            Action::CancelBasket { key } => {
                next = self.apply_basket(key, &BasketOperation::Cancel, actor, now)?.0;
            }
            Action::MarkExitProcessed { id } => {
                require_manager(actor)?;
                let exit = next
                    .pending_exits
                    .iter_mut()
                    .find(|e| e.id == *id)
                    .ok_or_else(|| WorkflowError::not_found("Pending exit"))?;
                if exit.processed_at.is_some() {
                    return Err(WorkflowError::InvalidTransition {
                        from: "processed".to_string(),
                        to: "processed".to_string(),
                    });
                }
                exit.processed_at = Some(now);
            }
            Action::PlaceOrder { id, input } => {
                require_manager(actor)?;
                let product = next.active_product(input.product_id)?;
                let order = plan_order(*id, product, input, actor, now)?;
                next.orders.push(order);
            }
            Action::ReceiveOrder { id } => {
                require_manager(actor)?;
                let order = next
                    .order(*id)
                    .ok_or_else(|| WorkflowError::not_found("Order"))?;
                let product = next
                    .product(order.product_id)
                    .ok_or_else(|| WorkflowError::not_found("Product"))?;
                let plan = plan_order_receipt(product, order, actor, now)?;
                next.set_stock(plan.order.product_id, plan.new_stock, now);
                next.push_movement(plan.movement.into_derived_movement(now));
                next.replace_order(plan.order);
            }
            Action::CancelOrder { id } => {
                require_manager(actor)?;
                let order = next
                    .order(*id)
                    .ok_or_else(|| WorkflowError::not_found("Order"))?;
                let cancelled = plan_order_cancellation(order)?;
                next.replace_order(cancelled);
            }
        }
        Ok(next)
    }

    /// Apply a bulk operation to every pending member of a basket, in order
    ///
    /// Each member transition is atomic on its own; failures are reported per
    /// request and do not undo the members that already succeeded.
    pub fn apply_basket(
        &self,
        key: &BasketKey,
        operation: &BasketOperation,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(Snapshot, BasketOutcome)> {
        if !matches!(operation, BasketOperation::Cancel) {
            require_manager(actor)?;
        }
        let members = pending_members(&self.exit_requests, key);
        if members.is_empty() {
            return Err(WorkflowError::not_found("Pending basket requests"));
        }

        let mut current = self.clone();
        let mut outcome = BasketOutcome::default();
        for id in members {
            let mut candidate = current.clone();
            let result = match operation {
                BasketOperation::Approve => candidate.approve_exit_request(id, actor, now),
                BasketOperation::Reject { reason } => {
                    candidate.reject_exit_request(id, reason, actor, now)
                }
                BasketOperation::Cancel => candidate.cancel_exit_request(id, actor),
            };
            if result.is_ok() {
                current = candidate;
            }
            outcome.record(id, result);
        }
        Ok((current, outcome))
    }

    // ------------------------------------------------------------------------
    // In-place helpers, only reachable through `apply`
    // ------------------------------------------------------------------------

    fn active_product(&self, id: Uuid) -> WorkflowResult<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id && !p.is_deleted())
            .ok_or_else(|| WorkflowError::not_found("Product"))
    }

    fn exit_request_mut(&mut self, id: Uuid) -> WorkflowResult<&mut ExitRequest> {
        self.exit_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found("Exit request"))
    }

    fn set_stock(&mut self, product_id: Uuid, stock: rust_decimal::Decimal, now: DateTime<Utc>) {
        if let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) {
            product.current_stock = stock;
            product.updated_at = now;
        }
    }

    fn push_movement(&mut self, movement: StockMovement) {
        self.movements.push(movement);
    }

    fn replace_order(&mut self, order: Order) {
        if let Some(slot) = self.orders.iter_mut().find(|o| o.id == order.id) {
            *slot = order;
        }
    }

    fn check_reference_exists(&self, kind: ReferenceKind, id: Uuid) -> WorkflowResult<()> {
        self.reference_name(kind, id)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::not_found(kind.label()))
    }

    fn add_reference(&mut self, kind: ReferenceKind, entry: ReferenceEntry) -> WorkflowResult<()> {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("name", "Name is required"));
        }
        if self.references(kind).iter().any(|r| r.name == name || r.id == entry.id) {
            return Err(WorkflowError::validation("name", "Name already exists"));
        }
        let entry = ReferenceEntry {
            name: name.to_string(),
            ..entry
        };
        self.references_mut(kind).push(entry);
        Ok(())
    }

    /// Products hold ids, so a rename is visible everywhere without a cascade
    fn rename_reference(&mut self, kind: ReferenceKind, id: Uuid, name: &str) -> WorkflowResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("name", "Name is required"));
        }
        if self.references(kind).iter().any(|r| r.name == name && r.id != id) {
            return Err(WorkflowError::validation("name", "Name already exists"));
        }
        let entry = self
            .references_mut(kind)
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found(kind.label()))?;
        entry.name = name.to_string();
        Ok(())
    }

    fn delete_reference(&mut self, kind: ReferenceKind, id: Uuid) -> WorkflowResult<()> {
        let users: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| match kind {
                ReferenceKind::Category => p.category_id == id,
                ReferenceKind::Unit => p.unit_id == id,
                ReferenceKind::StorageZone => p.storage_zone_id == Some(id),
            })
            .collect();
        if users.iter().any(|p| !p.is_deleted()) {
            return Err(WorkflowError::validation(
                "id",
                "Still referenced by at least one product",
            ));
        }
        // archived products keep their references
        if !users.is_empty() {
            return Err(WorkflowError::validation(
                "id",
                "Still referenced by archived products",
            ));
        }
        let entries = self.references_mut(kind);
        let before = entries.len();
        entries.retain(|r| r.id != id);
        if entries.len() == before {
            return Err(WorkflowError::not_found(kind.label()));
        }
        Ok(())
    }

    fn create_product(
        &mut self,
        id: Uuid,
        input: &NewProduct,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        self.check_reference_exists(ReferenceKind::Category, input.category_id)?;
        self.check_reference_exists(ReferenceKind::Unit, input.unit_id)?;
        if let Some(zone_id) = input.storage_zone_id {
            self.check_reference_exists(ReferenceKind::StorageZone, zone_id)?;
        }

        let reference = match &input.reference {
            Some(reference) => {
                if self.products.iter().any(|p| &p.reference == reference) {
                    return Err(WorkflowError::validation("reference", "Reference already exists"));
                }
                reference.clone()
            }
            None => next_reference(self.products.iter().map(|p| p.reference.as_str())),
        };

        let plan = plan_product_creation(id, reference, input, actor, now)?;
        self.products.push(plan.product);
        self.push_movement(plan.movement.into_derived_movement(now));
        Ok(())
    }

    fn update_product(
        &mut self,
        id: Uuid,
        patch: &ProductPatch,
        skip_movement: bool,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        if let Some(category_id) = patch.category_id {
            self.check_reference_exists(ReferenceKind::Category, category_id)?;
        }
        if let Some(unit_id) = patch.unit_id {
            self.check_reference_exists(ReferenceKind::Unit, unit_id)?;
        }
        if let Some(zone_id) = patch.storage_zone_id {
            self.check_reference_exists(ReferenceKind::StorageZone, zone_id)?;
        }

        let product = self.active_product(id)?;
        let plan = plan_product_update(product, patch, skip_movement, actor, None, now)?;
        if let Some(slot) = self.products.iter_mut().find(|p| p.id == id) {
            *slot = plan.product;
        }
        if let Some(movement) = plan.movement {
            self.push_movement(movement.into_derived_movement(now));
        }
        Ok(())
    }

    fn approve_exit_request(&mut self, id: Uuid, actor: &Actor, now: DateTime<Utc>) -> WorkflowResult<()> {
        let request = self
            .exit_request(id)
            .ok_or_else(|| WorkflowError::not_found("Exit request"))?;
        let product = self
            .product(request.product_id)
            .ok_or_else(|| WorkflowError::not_found("Product"))?;
        let location = self.location_of(product);
        let plan = plan_exit_approval(product, request, actor, self.policy, location, now)?;

        self.set_stock(plan.request.product_id, plan.new_stock, now);
        self.push_movement(plan.movement.into_derived_movement(now));
        self.pending_exits.push(plan.pending_exit);
        *self.exit_request_mut(id)? = plan.request;
        Ok(())
    }

    fn reject_exit_request(
        &mut self,
        id: Uuid,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        let request = self.exit_request_mut(id)?;
        *request = plan_exit_rejection(request, actor, reason, now)?;
        Ok(())
    }

    fn cancel_exit_request(&mut self, id: Uuid, actor: &Actor) -> WorkflowResult<()> {
        let request = self
            .exit_request(id)
            .ok_or_else(|| WorkflowError::not_found("Exit request"))?;
        check_exit_cancellation(request, actor)?;
        self.exit_requests.retain(|r| r.id != id);
        Ok(())
    }
}

/// Handle returned by [`OptimisticStore::dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

#[derive(Debug, Clone)]
struct PendingAction {
    id: ActionId,
    action: Action,
    at: DateTime<Utc>,
}

/// Confirmed state plus a queue of optimistic actions awaiting the backend
#[derive(Debug, Clone)]
pub struct OptimisticStore {
    actor: Actor,
    confirmed: Snapshot,
    pending: Vec<PendingAction>,
    view: Snapshot,
    next_id: u64,
}

impl OptimisticStore {
    pub fn new(confirmed: Snapshot, actor: Actor) -> Self {
        Self {
            actor,
            view: confirmed.clone(),
            confirmed,
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// State shown to the user: confirmed state with pending actions replayed
    pub fn view(&self) -> &Snapshot {
        &self.view
    }

    pub fn confirmed(&self) -> &Snapshot {
        &self.confirmed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply an action optimistically; invalid actions are refused outright
    pub fn dispatch(&mut self, action: Action, at: DateTime<Utc>) -> WorkflowResult<ActionId> {
        self.view = self.view.apply(&action, &self.actor, at)?;
        let id = ActionId(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingAction { id, action, at });
        Ok(id)
    }

    /// The backend accepted the action: fold it into the confirmed state
    pub fn confirm(&mut self, id: ActionId) -> WorkflowResult<()> {
        let position = self
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| WorkflowError::not_found("Pending action"))?;
        let pending = self.pending.remove(position);
        let result = self
            .confirmed
            .apply(&pending.action, &self.actor, pending.at)
            .map(|confirmed| self.confirmed = confirmed);
        self.rebuild();
        result
    }

    /// The backend refused the action: drop it and recompute the view
    ///
    /// Returns the ids of later pending actions that no longer apply and were
    /// dropped as well.
    pub fn revert(&mut self, id: ActionId) -> WorkflowResult<Vec<ActionId>> {
        let position = self
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| WorkflowError::not_found("Pending action"))?;
        self.pending.remove(position);
        Ok(self.rebuild())
    }

    /// Replace the confirmed state with a fresh backend read
    pub fn refresh(&mut self, confirmed: Snapshot) -> Vec<ActionId> {
        self.confirmed = confirmed;
        self.rebuild()
    }

    fn rebuild(&mut self) -> Vec<ActionId> {
        let mut view = self.confirmed.clone();
        let mut dropped = Vec::new();
        self.pending.retain(|pending| match view.apply(&pending.action, &self.actor, pending.at) {
            Ok(next) => {
                view = next;
                true
            }
            Err(_) => {
                dropped.push(pending.id);
                false
            }
        });
        self.view = view;
        dropped
    }
}
