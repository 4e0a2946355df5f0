//! Stock ledger derivation and workflow transition planning
//!
//! Every state transition that touches stock is computed here as a plan:
//! the resulting product stock, the ledger entry to append, and any side
//! records. The backend applies a plan inside one database transaction and the
//! client-side store applies the same plan to its snapshot, so both agree on
//! what a transition means.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    discrepancy_reason, is_discrepancy_reason, Actor, ExitRequest, ExitRequestStatus,
    InventoryCount, MovementType, NewExitRequest, NewMovement, NewOrder, NewProduct, Order,
    OrderStatus, PendingExit, Product, ProductPatch,
};
use crate::validation::{check_input, validate_stock_levels, validate_thresholds};

pub const INITIAL_STOCK_REASON: &str = "Initial stock";
pub const MANUAL_UPDATE_REASON: &str = "Manual stock update";
pub const ORDER_RECEIVED_REASON: &str = "Order received";

/// Whether approvals may drive stock below zero
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockPolicy {
    pub allow_negative_stock: bool,
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self {
            allow_negative_stock: true,
        }
    }
}

impl StockPolicy {
    pub fn strict() -> Self {
        Self {
            allow_negative_stock: false,
        }
    }

    fn check(&self, product: &Product, resulting: Decimal) -> WorkflowResult<()> {
        if !self.allow_negative_stock && resulting < Decimal::ZERO {
            return Err(WorkflowError::InsufficientStock {
                product_id: product.id,
                available: product.current_stock,
                resulting,
            });
        }
        Ok(())
    }
}

/// Movement type and positive quantity for a stock change; `None` when unchanged
pub fn classify_stock_change(previous: Decimal, new: Decimal) -> Option<(MovementType, Decimal)> {
    let delta = new - previous;
    if delta > Decimal::ZERO {
        Some((MovementType::Entry, delta))
    } else if delta < Decimal::ZERO {
        Some((MovementType::Exit, -delta))
    } else {
        None
    }
}

#[allow(clippy::too_many_arguments)]
fn movement(
    product: &Product,
    actor: &Actor,
    movement_type: MovementType,
    quantity: Decimal,
    previous_stock: Decimal,
    new_stock: Decimal,
    reason: String,
    notes: Option<String>,
) -> NewMovement {
    NewMovement {
        product_id: product.id,
        product_reference: product.reference.clone(),
        product_designation: product.designation.clone(),
        movement_type,
        quantity,
        previous_stock,
        new_stock,
        user_id: actor.user_id,
        user_name: actor.name.clone(),
        reason,
        notes,
    }
}

/// The `initial` entry written when a product is created
pub fn initial_movement(product: &Product, actor: &Actor) -> NewMovement {
    movement(
        product,
        actor,
        MovementType::Initial,
        product.current_stock,
        Decimal::ZERO,
        product.current_stock,
        INITIAL_STOCK_REASON.to_string(),
        None,
    )
}

/// A new product with its initial ledger entry
#[derive(Debug, Clone)]
pub struct ProductCreationPlan {
    pub product: Product,
    pub movement: NewMovement,
}

pub fn plan_product_creation(
    id: Uuid,
    reference: String,
    input: &NewProduct,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkflowResult<ProductCreationPlan> {
    check_input(input)?;

    let product = Product {
        id,
        reference,
        designation: input.designation.trim().to_string(),
        category_id: input.category_id,
        unit_id: input.unit_id,
        storage_zone_id: input.storage_zone_id,
        shelf: input.shelf.clone(),
        position: input.position.clone(),
        current_stock: input.current_stock,
        min_stock: input.min_stock,
        max_stock: input.max_stock,
        unit_price: input.unit_price,
        photo_reference: None,
        supplier_links: input.supplier_links.clone(),
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };
    let movement = initial_movement(&product, actor);

    Ok(ProductCreationPlan { product, movement })
}

/// A patched product and the ledger entry its stock change requires
#[derive(Debug, Clone)]
pub struct ProductUpdatePlan {
    pub product: Product,
    pub movement: Option<NewMovement>,
}

/// Plan a partial product update
///
/// With `skip_movement` the caller records its own, more specific, ledger
/// entry. Without it, a stock change yields one `entry` or `exit` row and an
/// unchanged stock yields none.
pub fn plan_product_update(
    product: &Product,
    patch: &ProductPatch,
    skip_movement: bool,
    actor: &Actor,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> WorkflowResult<ProductUpdatePlan> {
    if product.is_deleted() {
        return Err(WorkflowError::not_found("Product"));
    }
    check_input(patch)?;

    let updated = patch.apply_to(product, now);
    // stock left negative by a permissive approval must not block threshold edits
    if patch.current_stock.is_some() {
        validate_stock_levels(updated.current_stock, updated.min_stock, updated.max_stock)
            .map_err(|msg| WorkflowError::validation("current_stock", msg))?;
    } else if patch.min_stock.is_some() || patch.max_stock.is_some() {
        validate_thresholds(updated.min_stock, updated.max_stock)
            .map_err(|msg| WorkflowError::validation("min_stock", msg))?;
    }

    let movement = if skip_movement {
        None
    } else {
        classify_stock_change(product.current_stock, updated.current_stock).map(
            |(movement_type, quantity)| {
                movement(
                    &updated,
                    actor,
                    movement_type,
                    quantity,
                    product.current_stock,
                    updated.current_stock,
                    reason.unwrap_or(MANUAL_UPDATE_REASON).to_string(),
                    None,
                )
            },
        )
    };

    Ok(ProductUpdatePlan {
        product: updated,
        movement,
    })
}

/// Plan a new pending exit request
///
/// Stock is not checked here; discrepancy requests carry an absolute count
/// and may therefore be zero.
pub fn plan_exit_request(
    id: Uuid,
    product: &Product,
    input: &NewExitRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkflowResult<ExitRequest> {
    if product.is_deleted() {
        return Err(WorkflowError::not_found("Product"));
    }
    check_input(input)?;

    let discrepancy = is_discrepancy_reason(&input.reason);
    if input.quantity < Decimal::ZERO || (!discrepancy && input.quantity.is_zero()) {
        return Err(WorkflowError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    Ok(ExitRequest {
        id,
        product_id: product.id,
        product_reference: product.reference.clone(),
        product_designation: product.designation.clone(),
        product_photo: product.photo_reference.clone(),
        quantity: input.quantity,
        requested_by: actor.user_id,
        requested_by_name: actor.name.clone(),
        requested_at: now,
        status: ExitRequestStatus::Pending,
        approved_by: None,
        approved_at: None,
        reason: input.reason.trim().to_string(),
        notes: input.notes.clone(),
    })
}

/// Turn a physical count into a pending discrepancy request
pub fn plan_inventory_count(
    id: Uuid,
    product: &Product,
    count: &InventoryCount,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkflowResult<ExitRequest> {
    check_input(count)?;
    let input = NewExitRequest {
        product_id: count.product_id,
        quantity: count.counted_quantity,
        reason: discrepancy_reason(count.notes.as_deref()),
        notes: count.notes.clone(),
    };
    plan_exit_request(id, product, &input, actor, now)
}

/// Everything an approval writes
#[derive(Debug, Clone)]
pub struct ExitApprovalPlan {
    pub request: ExitRequest,
    pub new_stock: Decimal,
    pub movement: NewMovement,
    pub pending_exit: PendingExit,
}

/// Plan the approval of an exit request
///
/// A discrepancy request sets stock to its quantity and is recorded as an
/// `adjustment` of the absolute difference; a normal request subtracts its
/// quantity and is recorded as an `exit`.
pub fn plan_exit_approval(
    product: &Product,
    request: &ExitRequest,
    actor: &Actor,
    policy: StockPolicy,
    location: String,
    now: DateTime<Utc>,
) -> WorkflowResult<ExitApprovalPlan> {
    if !request.status.can_transition_to(ExitRequestStatus::Approved) {
        return Err(WorkflowError::InvalidTransition {
            from: request.status.to_string(),
            to: ExitRequestStatus::Approved.to_string(),
        });
    }
    if product.id != request.product_id || product.is_deleted() {
        return Err(WorkflowError::not_found("Product"));
    }

    let previous = product.current_stock;
    let (new_stock, movement_type, quantity, reason) = if request.is_discrepancy() {
        (
            request.quantity,
            MovementType::Adjustment,
            (previous - request.quantity).abs(),
            request.reason.clone(),
        )
    } else {
        let reason = if request.reason.is_empty() {
            format!("Exit request from {}", request.requested_by_name)
        } else {
            format!("Exit request from {}: {}", request.requested_by_name, request.reason)
        };
        (previous - request.quantity, MovementType::Exit, request.quantity, reason)
    };
    policy.check(product, new_stock)?;

    let mut approved = request.clone();
    approved.status = ExitRequestStatus::Approved;
    approved.approved_by = Some(actor.user_id);
    approved.approved_at = Some(now);

    let movement = movement(
        product,
        actor,
        movement_type,
        quantity,
        previous,
        new_stock,
        reason,
        request.notes.clone(),
    );

    let pending_exit = PendingExit {
        id: pending_exit_id(request.id),
        exit_request_id: request.id,
        product_id: product.id,
        product_reference: product.reference.clone(),
        product_designation: product.designation.clone(),
        location,
        quantity: request.quantity,
        requested_by: request.requested_by,
        requested_by_name: request.requested_by_name.clone(),
        approved_at: now,
        processed_at: None,
    };

    Ok(ExitApprovalPlan {
        request: approved,
        new_stock,
        movement,
        pending_exit,
    })
}

/// Pick-list row id, derived from the request so replays agree on it
pub fn pending_exit_id(exit_request_id: Uuid) -> Uuid {
    Uuid::new_v5(&exit_request_id, b"pending-exit")
}

/// Plan a rejection; stock and ledger are untouched
pub fn plan_exit_rejection(
    request: &ExitRequest,
    actor: &Actor,
    reason: &str,
    now: DateTime<Utc>,
) -> WorkflowResult<ExitRequest> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::validation("reason", "A rejection reason is required"));
    }
    if !request.status.can_transition_to(ExitRequestStatus::Rejected) {
        return Err(WorkflowError::InvalidTransition {
            from: request.status.to_string(),
            to: ExitRequestStatus::Rejected.to_string(),
        });
    }

    let mut rejected = request.clone();
    rejected.status = ExitRequestStatus::Rejected;
    rejected.approved_by = Some(actor.user_id);
    rejected.approved_at = Some(now);
    rejected.notes = Some(reason.trim().to_string());
    Ok(rejected)
}

pub fn plan_awaiting_reception(request: &ExitRequest) -> WorkflowResult<ExitRequest> {
    if !request.status.can_transition_to(ExitRequestStatus::AwaitingReception) {
        return Err(WorkflowError::InvalidTransition {
            from: request.status.to_string(),
            to: ExitRequestStatus::AwaitingReception.to_string(),
        });
    }
    let mut waiting = request.clone();
    waiting.status = ExitRequestStatus::AwaitingReception;
    Ok(waiting)
}

/// Only pending requests can be withdrawn, by their requester or a manager
pub fn check_exit_cancellation(request: &ExitRequest, actor: &Actor) -> WorkflowResult<()> {
    if request.status != ExitRequestStatus::Pending {
        return Err(WorkflowError::InvalidTransition {
            from: request.status.to_string(),
            to: "cancelled".to_string(),
        });
    }
    if request.requested_by != actor.user_id && !actor.is_manager() {
        return Err(WorkflowError::validation(
            "requested_by",
            "Only the requester or a manager can cancel a request",
        ));
    }
    Ok(())
}

pub fn plan_order(
    id: Uuid,
    product: &Product,
    input: &NewOrder,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkflowResult<Order> {
    if product.is_deleted() {
        return Err(WorkflowError::not_found("Product"));
    }
    check_input(input)?;
    if input.quantity <= Decimal::ZERO {
        return Err(WorkflowError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    Ok(Order {
        id,
        product_id: product.id,
        product_reference: product.reference.clone(),
        product_designation: product.designation.clone(),
        quantity: input.quantity,
        ordered_by: actor.user_id,
        ordered_by_name: actor.name.clone(),
        ordered_at: now,
        status: OrderStatus::Pending,
        received_at: None,
        notes: input.notes.clone(),
    })
}

/// Everything a receipt writes
#[derive(Debug, Clone)]
pub struct OrderReceiptPlan {
    pub order: Order,
    pub new_stock: Decimal,
    pub movement: NewMovement,
}

/// Plan the receipt of an order: stock grows by the ordered quantity
pub fn plan_order_receipt(
    product: &Product,
    order: &Order,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkflowResult<OrderReceiptPlan> {
    if !order.status.can_transition_to(OrderStatus::Received) {
        return Err(WorkflowError::InvalidTransition {
            from: order.status.as_str().to_string(),
            to: OrderStatus::Received.as_str().to_string(),
        });
    }
    if product.id != order.product_id {
        return Err(WorkflowError::not_found("Product"));
    }

    let previous = product.current_stock;
    let new_stock = previous + order.quantity;

    let mut received = order.clone();
    received.status = OrderStatus::Received;
    received.received_at = Some(now);

    let movement = movement(
        product,
        actor,
        MovementType::Entry,
        order.quantity,
        previous,
        new_stock,
        ORDER_RECEIVED_REASON.to_string(),
        order.notes.clone(),
    );

    Ok(OrderReceiptPlan {
        order: received,
        new_stock,
        movement,
    })
}

pub fn plan_order_cancellation(order: &Order) -> WorkflowResult<Order> {
    if !order.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(WorkflowError::InvalidTransition {
            from: order.status.as_str().to_string(),
            to: OrderStatus::Cancelled.as_str().to_string(),
        });
    }
    let mut cancelled = order.clone();
    cancelled.status = OrderStatus::Cancelled;
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_classify_stock_change() {
        assert_eq!(
            classify_stock_change(dec(10), dec(14)),
            Some((MovementType::Entry, dec(4)))
        );
        assert_eq!(
            classify_stock_change(dec(10), dec(3)),
            Some((MovementType::Exit, dec(7)))
        );
        assert_eq!(classify_stock_change(dec(10), dec(10)), None);
    }

    #[test]
    fn test_strict_policy_rejects_negative_result() {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            reference: "RF00001".to_string(),
            designation: "Joint torique".to_string(),
            category_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            storage_zone_id: None,
            shelf: None,
            position: None,
            current_stock: dec(2),
            min_stock: dec(1),
            max_stock: dec(10),
            unit_price: None,
            photo_reference: None,
            supplier_links: vec![],
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let result = StockPolicy::strict().check(&product, dec(-1));
        assert!(matches!(result, Err(WorkflowError::InsufficientStock { .. })));
        assert!(StockPolicy::default().check(&product, dec(-1)).is_ok());
    }
}
