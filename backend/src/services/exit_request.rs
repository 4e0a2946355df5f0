//! Exit request workflow service
//!
//! Every transition runs in its own transaction with the request and product
//! rows locked, and is computed by the planners in `shared::ledger`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    check_exit_cancellation, group_into_baskets, plan_awaiting_reception, plan_exit_approval,
    plan_exit_rejection, plan_exit_request, plan_inventory_count, require_manager, Actor, Basket,
    BasketKey, BasketOperation, BasketOutcome, ExitRequest, ExitRequestStatus, InventoryCount,
    NewExitRequest, StockPolicy,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::insert_movement;
use crate::services::pending_exit::insert_pending_exit;
use crate::services::product::{fetch_product, location_of, lock_product, set_stock};

const EXIT_REQUEST_COLUMNS: &str = "id, product_id, product_reference, \
    product_designation, product_photo, quantity, requested_by, requested_by_name, requested_at, \
    status, approved_by, approved_at, reason, notes";

#[derive(Debug, FromRow)]
struct ExitRequestRow {
    id: Uuid,
    product_id: Uuid,
    product_reference: String,
    product_designation: String,
    product_photo: Option<String>,
    quantity: Decimal,
    requested_by: Uuid,
    requested_by_name: String,
    requested_at: DateTime<Utc>,
    status: String,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    reason: String,
    notes: Option<String>,
}

impl TryFrom<ExitRequestRow> for ExitRequest {
    type Error = AppError;

    fn try_from(row: ExitRequestRow) -> Result<Self, Self::Error> {
        Ok(ExitRequest {
            id: row.id,
            product_id: row.product_id,
            product_reference: row.product_reference,
            product_designation: row.product_designation,
            product_photo: row.product_photo,
            quantity: row.quantity,
            requested_by: row.requested_by,
            requested_by_name: row.requested_by_name,
            requested_at: row.requested_at,
            status: row.status.parse().map_err(AppError::Internal)?,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            reason: row.reason,
            notes: row.notes,
        })
    }
}

pub(crate) async fn insert_exit_request(
    conn: &mut PgConnection,
    request: &ExitRequest,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO exit_requests (
            id, product_id, product_reference, product_designation, product_photo, quantity,
            requested_by, requested_by_name, requested_at, status, approved_by, approved_at,
            reason, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(request.id)
    .bind(request.product_id)
    .bind(&request.product_reference)
    .bind(&request.product_designation)
    .bind(&request.product_photo)
    .bind(request.quantity)
    .bind(request.requested_by)
    .bind(&request.requested_by_name)
    .bind(request.requested_at)
    .bind(request.status.as_str())
    .bind(request.approved_by)
    .bind(request.approved_at)
    .bind(&request.reason)
    .bind(&request.notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_status(conn: &mut PgConnection, request: &ExitRequest) -> AppResult<()> {
    sqlx::query(
        "UPDATE exit_requests SET status = $2, approved_by = $3, approved_at = $4, notes = $5 \
         WHERE id = $1",
    )
    .bind(request.id)
    .bind(request.status.as_str())
    .bind(request.approved_by)
    .bind(request.approved_at)
    .bind(&request.notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn lock_request(conn: &mut PgConnection, id: Uuid) -> AppResult<ExitRequest> {
    let query = format!(
        "SELECT {} FROM exit_requests WHERE id = $1 FOR UPDATE",
        EXIT_REQUEST_COLUMNS
    );
    sqlx::query_as::<_, ExitRequestRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Exit request".to_string()))?
        .try_into()
}

/// Query-string filter of the request list
#[derive(Debug, Default, Deserialize)]
pub struct ExitRequestQuery {
    pub status: Option<ExitRequestStatus>,
    pub requested_by: Option<Uuid>,
}

/// Exit request service
#[derive(Clone)]
pub struct ExitRequestService {
    db: PgPool,
    policy: StockPolicy,
}

impl ExitRequestService {
    pub fn new(db: PgPool, policy: StockPolicy) -> Self {
        Self { db, policy }
    }

    /// Submit one pending request
    pub async fn create(&self, actor: &Actor, input: NewExitRequest) -> AppResult<ExitRequest> {
        let mut conn = self.db.acquire().await?;
        let product = fetch_product(&mut conn, input.product_id).await?;
        let request = plan_exit_request(Uuid::new_v4(), &product, &input, actor, Utc::now())?;
        insert_exit_request(&mut conn, &request).await?;

        tracing::info!(
            request_id = %request.id,
            product_id = %request.product_id,
            quantity = %request.quantity,
            "Exit request submitted"
        );
        Ok(request)
    }

    /// Turn a physical count into a pending discrepancy request
    pub async fn submit_inventory_count(
        &self,
        actor: &Actor,
        count: InventoryCount,
    ) -> AppResult<ExitRequest> {
        let mut conn = self.db.acquire().await?;
        let product = fetch_product(&mut conn, count.product_id).await?;
        let request = plan_inventory_count(Uuid::new_v4(), &product, &count, actor, Utc::now())?;
        insert_exit_request(&mut conn, &request).await?;

        tracing::info!(
            request_id = %request.id,
            product_id = %request.product_id,
            counted = %request.quantity,
            recorded = %product.current_stock,
            "Inventory count submitted"
        );
        Ok(request)
    }

    /// Requests newest first; non-managers only see their own
    pub async fn list(&self, actor: &Actor, query: &ExitRequestQuery) -> AppResult<Vec<ExitRequest>> {
        let requested_by = if actor.is_manager() {
            query.requested_by
        } else {
            Some(actor.user_id)
        };
        self.fetch(query.status, requested_by).await
    }

    /// Every request still waiting for a decision
    pub(crate) async fn pending(&self) -> AppResult<Vec<ExitRequest>> {
        self.fetch(Some(ExitRequestStatus::Pending), None).await
    }

    async fn fetch(
        &self,
        status: Option<ExitRequestStatus>,
        requested_by: Option<Uuid>,
    ) -> AppResult<Vec<ExitRequest>> {
        let sql = format!(
            r#"
            SELECT {} FROM exit_requests
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR requested_by = $2)
            ORDER BY requested_at DESC, id
            "#,
            EXIT_REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, ExitRequestRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(requested_by)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(ExitRequest::try_from).collect()
    }

    /// Approve: stock change, ledger row, pick-list row and status in one transaction
    pub async fn approve(&self, actor: &Actor, id: Uuid) -> AppResult<ExitRequest> {
        require_manager(actor)?;

        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        let product = lock_product(&mut tx, request.product_id).await?;
        let location = location_of(&mut tx, &product).await?;

        let now = Utc::now();
        let plan = plan_exit_approval(&product, &request, actor, self.policy, location, now)?;

        set_stock(&mut tx, product.id, plan.new_stock, now).await?;
        let movement = insert_movement(&mut tx, plan.movement, now).await?;
        insert_pending_exit(&mut tx, &plan.pending_exit).await?;
        save_status(&mut tx, &plan.request).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %id,
            product_id = %product.id,
            movement_type = %movement.movement_type,
            previous_stock = %movement.previous_stock,
            new_stock = %movement.new_stock,
            approved_by = %actor.user_id,
            "Exit request approved"
        );
        if plan.new_stock < Decimal::ZERO {
            tracing::warn!(product_id = %product.id, stock = %plan.new_stock, "Stock went negative");
        }
        Ok(plan.request)
    }

    /// Reject with a reason; stock and ledger are untouched
    pub async fn reject(&self, actor: &Actor, id: Uuid, reason: &str) -> AppResult<ExitRequest> {
        require_manager(actor)?;

        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        let rejected = plan_exit_rejection(&request, actor, reason, Utc::now())?;
        save_status(&mut tx, &rejected).await?;
        tx.commit().await?;

        tracing::info!(request_id = %id, rejected_by = %actor.user_id, "Exit request rejected");
        Ok(rejected)
    }

    /// Park a pending request until goods arrive
    pub async fn await_reception(&self, actor: &Actor, id: Uuid) -> AppResult<ExitRequest> {
        require_manager(actor)?;

        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        let waiting = plan_awaiting_reception(&request)?;
        save_status(&mut tx, &waiting).await?;
        tx.commit().await?;

        tracing::info!(request_id = %id, "Exit request awaiting reception");
        Ok(waiting)
    }

    /// Withdraw a pending request; the row is removed
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        check_exit_cancellation(&request, actor)?;

        sqlx::query("DELETE FROM exit_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(request_id = %id, cancelled_by = %actor.user_id, "Exit request cancelled");
        Ok(())
    }

    /// Requests grouped by requester and submission minute, newest basket first
    pub async fn baskets(&self, actor: &Actor, query: &ExitRequestQuery) -> AppResult<Vec<Basket>> {
        let requests = self.list(actor, query).await?;
        Ok(group_into_baskets(&requests))
    }

    /// Apply an operation to each pending member of a basket
    ///
    /// Members are processed in submission order, each in its own transaction;
    /// a failing member does not undo the ones before it.
    pub async fn apply_to_basket(
        &self,
        actor: &Actor,
        key: BasketKey,
        operation: BasketOperation,
    ) -> AppResult<BasketOutcome> {
        if !matches!(operation, BasketOperation::Cancel) {
            require_manager(actor)?;
        }
        let key = BasketKey::new(key.requested_by, key.minute);

        let members = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM exit_requests
            WHERE requested_by = $1
              AND requested_at >= $2 AND requested_at < $3
              AND status = 'pending'
            ORDER BY requested_at, id
            "#,
        )
        .bind(key.requested_by)
        .bind(key.minute)
        .bind(key.minute + Duration::minutes(1))
        .fetch_all(&self.db)
        .await?;

        if members.is_empty() {
            return Err(AppError::NotFound("Pending basket requests".to_string()));
        }

        let mut outcome = BasketOutcome::default();
        for id in members {
            let result = match &operation {
                BasketOperation::Approve => self.approve(actor, id).await.map(|_| ()),
                BasketOperation::Reject { reason } => {
                    self.reject(actor, id, reason).await.map(|_| ())
                }
                BasketOperation::Cancel => self.cancel(actor, id).await,
            };
            outcome.record(id, result);
        }

        if !outcome.failed.is_empty() {
            tracing::warn!(
                basket = %key,
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Basket operation partially failed"
            );
        } else {
            tracing::info!(basket = %key, members = outcome.succeeded.len(), "Basket processed");
        }
        Ok(outcome)
    }
}
