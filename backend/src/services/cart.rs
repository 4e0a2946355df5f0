//! Per-user cart of draft exit lines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    check_input, plan_exit_request, validate_positive_quantity, Actor, CartItem, CartLineInput,
    ExitRequest, NewExitRequest,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::exit_request::insert_exit_request;
use crate::services::product::fetch_product;

const CART_COLUMNS: &str = "id, user_id, product_id, quantity, reason, added_at";

#[derive(Debug, FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    reason: String,
    added_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            reason: row.reason,
            added_at: row.added_at,
        }
    }
}

fn check_line(input: &CartLineInput) -> AppResult<()> {
    check_input(input)?;
    validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
        field: "quantity".to_string(),
        message: msg.to_string(),
        message_fr: "La quantité doit être supérieure à zéro".to_string(),
    })
}

/// Cart service
#[derive(Clone)]
pub struct CartService {
    db: PgPool,
}

impl CartService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        let query = format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY added_at, id",
            CART_COLUMNS
        );
        let rows = sqlx::query_as::<_, CartRow>(&query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn ensure_active_product(&self, product_id: Uuid) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        let product = fetch_product(&mut conn, product_id).await?;
        if product.is_deleted() {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    /// Add a line; adding a product already in the cart increases its quantity
    pub async fn add(&self, user_id: Uuid, input: CartLineInput) -> AppResult<CartItem> {
        check_line(&input)?;
        self.ensure_active_product(input.product_id).await?;

        let query = format!(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, reason)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                          reason = EXCLUDED.reason
            RETURNING {}
            "#,
            CART_COLUMNS
        );
        let row = sqlx::query_as::<_, CartRow>(&query)
            .bind(user_id)
            .bind(input.product_id)
            .bind(input.quantity)
            .bind(input.reason.trim())
            .fetch_one(&self.db)
            .await?;
        Ok(row.into())
    }

    /// Replace the quantity of a line
    pub async fn set(&self, user_id: Uuid, input: CartLineInput) -> AppResult<CartItem> {
        check_line(&input)?;

        let query = format!(
            "UPDATE cart_items SET quantity = $3, reason = $4 \
             WHERE user_id = $1 AND product_id = $2 RETURNING {}",
            CART_COLUMNS
        );
        sqlx::query_as::<_, CartRow>(&query)
            .bind(user_id)
            .bind(input.product_id)
            .bind(input.quantity)
            .bind(input.reason.trim())
            .fetch_optional(&self.db)
            .await?
            .map(CartItem::from)
            .ok_or_else(|| AppError::NotFound("Cart line".to_string()))
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Cart line".to_string()));
        }
        Ok(())
    }

    pub async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Turn every line into a pending request sharing one submission time
    ///
    /// The requests therefore form exactly one basket. The cart is emptied in
    /// the same transaction.
    pub async fn submit(&self, actor: &Actor) -> AppResult<Vec<ExitRequest>> {
        let mut tx = self.db.begin().await?;

        let query = format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY added_at, id FOR UPDATE",
            CART_COLUMNS
        );
        let lines = sqlx::query_as::<_, CartRow>(&query)
            .bind(actor.user_id)
            .fetch_all(&mut *tx)
            .await?;

        if lines.is_empty() {
            return Err(AppError::Validation {
                field: "cart".to_string(),
                message: "Cart is empty".to_string(),
                message_fr: "Le panier est vide".to_string(),
            });
        }

        let now = Utc::now();
        let mut requests = Vec::with_capacity(lines.len());
        for line in lines {
            let product = fetch_product(&mut tx, line.product_id).await?;
            let input = NewExitRequest {
                product_id: line.product_id,
                quantity: line.quantity,
                reason: line.reason,
                notes: None,
            };
            let request = plan_exit_request(Uuid::new_v4(), &product, &input, actor, now)?;
            insert_exit_request(&mut tx, &request).await?;
            requests.push(request);
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(actor.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %actor.user_id,
            lines = requests.len(),
            "Cart submitted as one basket"
        );
        Ok(requests)
    }
}
