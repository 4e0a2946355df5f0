//! Stock ledger service
//!
//! The ledger is append-only: rows are inserted by the workflow services inside
//! their transactions and never updated or deleted.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    MovementFilter, MovementType, NewMovement, PaginatedResponse, Pagination, PaginationMeta,
    StockMovement,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MOVEMENT_COLUMNS: &str = "id, product_id, product_reference, product_designation, \
    movement_type, quantity, previous_stock, new_stock, user_id, user_name, reason, notes, \
    recorded_at";

const MOVEMENT_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR product_id = $1)
      AND ($2::uuid IS NULL OR user_id = $2)
      AND ($3::text IS NULL OR movement_type = $3)
      AND ($4::timestamptz IS NULL OR recorded_at >= $4)
      AND ($5::timestamptz IS NULL OR recorded_at <= $5)
"#;

#[derive(Debug, FromRow)]
pub(crate) struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    product_reference: String,
    product_designation: String,
    movement_type: String,
    quantity: Decimal,
    previous_stock: Decimal,
    new_stock: Decimal,
    user_id: Uuid,
    user_name: String,
    reason: String,
    notes: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            id: row.id,
            product_id: row.product_id,
            product_reference: row.product_reference,
            product_designation: row.product_designation,
            movement_type: row.movement_type.parse().map_err(AppError::Internal)?,
            quantity: row.quantity,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            user_id: row.user_id,
            user_name: row.user_name,
            reason: row.reason,
            notes: row.notes,
            timestamp: row.recorded_at,
        })
    }
}

/// Append one ledger row
pub(crate) async fn insert_movement(
    conn: &mut PgConnection,
    movement: NewMovement,
    now: DateTime<Utc>,
) -> AppResult<StockMovement> {
    let query = format!(
        r#"
        INSERT INTO stock_movements (
            id, product_id, product_reference, product_designation, movement_type, quantity,
            previous_stock, new_stock, user_id, user_name, reason, notes, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    );

    let row = sqlx::query_as::<_, MovementRow>(&query)
        .bind(Uuid::new_v4())
        .bind(movement.product_id)
        .bind(&movement.product_reference)
        .bind(&movement.product_designation)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.previous_stock)
        .bind(movement.new_stock)
        .bind(movement.user_id)
        .bind(&movement.user_name)
        .bind(&movement.reason)
        .bind(&movement.notes)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    row.try_into()
}

/// Query-string form of a ledger filter
#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl MovementQuery {
    /// Filter with the default trailing window applied when no range is given
    pub fn filter(&self, window_days: u32, now: DateTime<Utc>) -> MovementFilter {
        let from = match (self.from, self.to) {
            (None, None) => Some(now - Duration::days(i64::from(window_days))),
            (from, _) => from,
        };
        MovementFilter {
            product_id: self.product_id,
            user_id: self.user_id,
            movement_type: self.movement_type,
            from,
            to: self.to,
        }
    }

    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(default.page),
            per_page: self.per_page.unwrap_or(default.per_page),
        }
    }
}

/// Ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Ledger rows matching the filter, newest first
    pub async fn list(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let count_query = format!("SELECT COUNT(*) FROM stock_movements {}", MOVEMENT_FILTER);
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(filter.product_id)
            .bind(filter.user_id)
            .bind(filter.movement_type.map(|t| t.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&self.db)
            .await?;

        let query = format!(
            "SELECT {} FROM stock_movements {} ORDER BY recorded_at DESC, id LIMIT $6 OFFSET $7",
            MOVEMENT_COLUMNS, MOVEMENT_FILTER
        );
        let rows = sqlx::query_as::<_, MovementRow>(&query)
            .bind(filter.product_id)
            .bind(filter.user_id)
            .bind(filter.movement_type.map(|t| t.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        let data = rows
            .into_iter()
            .map(StockMovement::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total.max(0) as u64),
        })
    }

    /// Every matching row, newest first, for exports
    pub async fn export(&self, filter: &MovementFilter) -> AppResult<Vec<StockMovement>> {
        let query = format!(
            "SELECT {} FROM stock_movements {} ORDER BY recorded_at DESC, id",
            MOVEMENT_COLUMNS, MOVEMENT_FILTER
        );
        let rows = sqlx::query_as::<_, MovementRow>(&query)
            .bind(filter.product_id)
            .bind(filter.user_id)
            .bind(filter.movement_type.map(|t| t.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }

    /// Full history of one product, soft-deleted products included
    pub async fn for_product(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        self.export(&MovementFilter::for_product(product_id)).await
    }

    /// Rows of the trailing window, optionally restricted to one type
    pub(crate) async fn since(
        &self,
        since: DateTime<Utc>,
        movement_type: Option<MovementType>,
        product_id: Option<Uuid>,
    ) -> AppResult<Vec<StockMovement>> {
        let filter = MovementFilter {
            product_id,
            movement_type,
            from: Some(since),
            ..Default::default()
        };
        self.export(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_window_applies_without_range() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let filter = MovementQuery::default().filter(30, now);
        assert_eq!(filter.from, Some(now - Duration::days(30)));
        assert_eq!(filter.to, None);
    }

    #[test]
    fn test_explicit_range_kept() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let to = now - Duration::days(60);
        let query = MovementQuery {
            to: Some(to),
            ..Default::default()
        };
        let filter = query.filter(30, now);
        assert_eq!(filter.from, None);
        assert_eq!(filter.to, Some(to));
    }
}
