//! Pick list of approved exits awaiting physical removal

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{require_manager, Actor, PendingExit};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const PENDING_EXIT_COLUMNS: &str = "id, exit_request_id, product_id, product_reference, \
    product_designation, location, quantity, requested_by, requested_by_name, approved_at, \
    processed_at";

#[derive(Debug, FromRow)]
struct PendingExitRow {
    id: Uuid,
    exit_request_id: Uuid,
    product_id: Uuid,
    product_reference: String,
    product_designation: String,
    location: String,
    quantity: Decimal,
    requested_by: Uuid,
    requested_by_name: String,
    approved_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<PendingExitRow> for PendingExit {
    fn from(row: PendingExitRow) -> Self {
        PendingExit {
            id: row.id,
            exit_request_id: row.exit_request_id,
            product_id: row.product_id,
            product_reference: row.product_reference,
            product_designation: row.product_designation,
            location: row.location,
            quantity: row.quantity,
            requested_by: row.requested_by,
            requested_by_name: row.requested_by_name,
            approved_at: row.approved_at,
            processed_at: row.processed_at,
        }
    }
}

pub(crate) async fn insert_pending_exit(conn: &mut PgConnection, exit: &PendingExit) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_exits (
            id, exit_request_id, product_id, product_reference, product_designation, location,
            quantity, requested_by, requested_by_name, approved_at, processed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(exit.id)
    .bind(exit.exit_request_id)
    .bind(exit.product_id)
    .bind(&exit.product_reference)
    .bind(&exit.product_designation)
    .bind(&exit.location)
    .bind(exit.quantity)
    .bind(exit.requested_by)
    .bind(&exit.requested_by_name)
    .bind(exit.approved_at)
    .bind(exit.processed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingExitQuery {
    #[serde(default)]
    pub include_processed: bool,
}

/// Pending exit service
#[derive(Clone)]
pub struct PendingExitService {
    db: PgPool,
}

impl PendingExitService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Oldest approval first
    pub async fn list(&self, include_processed: bool) -> AppResult<Vec<PendingExit>> {
        let query = format!(
            "SELECT {} FROM pending_exits WHERE ($1 OR processed_at IS NULL) \
             ORDER BY approved_at, product_reference",
            PENDING_EXIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PendingExitRow>(&query)
            .bind(include_processed)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(PendingExit::from).collect())
    }

    /// Mark goods as physically removed
    pub async fn mark_processed(&self, actor: &Actor, id: Uuid) -> AppResult<PendingExit> {
        require_manager(actor)?;

        let query = format!(
            "UPDATE pending_exits SET processed_at = NOW() \
             WHERE id = $1 AND processed_at IS NULL RETURNING {}",
            PENDING_EXIT_COLUMNS
        );
        let row = sqlx::query_as::<_, PendingExitRow>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                tracing::info!(pending_exit_id = %id, "Pending exit processed");
                Ok(row.into())
            }
            None => {
                let exists =
                    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM pending_exits WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.db)
                        .await?;
                if exists {
                    Err(AppError::InvalidStateTransition(
                        "processed -> processed".to_string(),
                    ))
                } else {
                    Err(AppError::NotFound("Pending exit".to_string()))
                }
            }
        }
    }
}
