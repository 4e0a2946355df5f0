//! Purchase order service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    plan_order, plan_order_cancellation, plan_order_receipt, require_manager, Actor, NewOrder,
    Order, OrderStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::insert_movement;
use crate::services::product::{fetch_product, lock_product, set_stock};

const ORDER_COLUMNS: &str = "id, product_id, product_reference, product_designation, quantity, \
    ordered_by, ordered_by_name, ordered_at, status, received_at, notes";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    product_id: Uuid,
    product_reference: String,
    product_designation: String,
    quantity: Decimal,
    ordered_by: Uuid,
    ordered_by_name: String,
    ordered_at: DateTime<Utc>,
    status: String,
    received_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            product_id: row.product_id,
            product_reference: row.product_reference,
            product_designation: row.product_designation,
            quantity: row.quantity,
            ordered_by: row.ordered_by,
            ordered_by_name: row.ordered_by_name,
            ordered_at: row.ordered_at,
            status: row.status.parse().map_err(AppError::Internal)?,
            received_at: row.received_at,
            notes: row.notes,
        })
    }
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<Order> {
    let query = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
    sqlx::query_as::<_, OrderRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?
        .try_into()
}

async fn save_status(conn: &mut PgConnection, order: &Order) -> AppResult<()> {
    sqlx::query("UPDATE orders SET status = $2, received_at = $3 WHERE id = $1")
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.received_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub product_id: Option<Uuid>,
}

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, actor: &Actor, input: NewOrder) -> AppResult<Order> {
        require_manager(actor)?;

        let mut conn = self.db.acquire().await?;
        let product = fetch_product(&mut conn, input.product_id).await?;
        let order = plan_order(Uuid::new_v4(), &product, &input, actor, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, product_id, product_reference, product_designation, quantity, ordered_by,
                ordered_by_name, ordered_at, status, received_at, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id)
        .bind(order.product_id)
        .bind(&order.product_reference)
        .bind(&order.product_designation)
        .bind(order.quantity)
        .bind(order.ordered_by)
        .bind(&order.ordered_by_name)
        .bind(order.ordered_at)
        .bind(order.status.as_str())
        .bind(order.received_at)
        .bind(&order.notes)
        .execute(&mut *conn)
        .await?;

        tracing::info!(order_id = %order.id, product_id = %order.product_id, quantity = %order.quantity, "Order placed");
        Ok(order)
    }

    /// Orders newest first
    pub async fn list(&self, query: &OrderQuery) -> AppResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR product_id = $2)
            ORDER BY ordered_at DESC, id
            "#,
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.product_id)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    /// Receive: stock increment, `entry` ledger row and status in one transaction
    pub async fn receive(&self, actor: &Actor, id: Uuid) -> AppResult<Order> {
        require_manager(actor)?;

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, id).await?;
        let product = lock_product(&mut tx, order.product_id).await?;

        let now = Utc::now();
        let plan = plan_order_receipt(&product, &order, actor, now)?;

        set_stock(&mut tx, product.id, plan.new_stock, now).await?;
        insert_movement(&mut tx, plan.movement, now).await?;
        save_status(&mut tx, &plan.order).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            product_id = %product.id,
            previous_stock = %product.current_stock,
            new_stock = %plan.new_stock,
            "Order received"
        );
        Ok(plan.order)
    }

    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> AppResult<Order> {
        require_manager(actor)?;

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, id).await?;
        let cancelled = plan_order_cancellation(&order)?;
        save_status(&mut tx, &cancelled).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, "Order cancelled");
        Ok(cancelled)
    }

    /// Received orders, for delivery statistics
    pub(crate) async fn received(&self) -> AppResult<Vec<Order>> {
        self.list(&OrderQuery {
            status: Some(OrderStatus::Received),
            product_id: None,
        })
        .await
    }
}
