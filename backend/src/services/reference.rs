//! Reference data service: categories, units and storage zones
//!
//! The three tables share one shape, so one service serves them all keyed by
//! [`ReferenceKind`]. Table and column names come from the kind, never from
//! request input.

use chrono::{DateTime, Utc};
use shared::{check_input, ReferenceEntry, ReferenceInput, ReferenceKind};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{is_violation, map_unique_violation, AppError, AppResult};

/// Validated name, trimmed; blank names are refused
fn checked_name(input: &ReferenceInput) -> AppResult<&str> {
    check_input(input)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation {
            field: "name".to_string(),
            message: "Name is required".to_string(),
            message_fr: "Le nom est obligatoire".to_string(),
        });
    }
    Ok(name)
}

#[derive(Debug, FromRow)]
struct ReferenceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReferenceRow> for ReferenceEntry {
    fn from(row: ReferenceRow) -> Self {
        ReferenceEntry {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Fail with `NotFound` unless the reference row exists
pub(crate) async fn ensure_reference_exists(
    conn: &mut PgConnection,
    kind: ReferenceKind,
    id: Uuid,
) -> AppResult<()> {
    let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", kind.table());
    let exists = sqlx::query_scalar::<_, bool>(&query)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(kind.label().to_string()))
    }
}

/// Reference data service
#[derive(Clone)]
pub struct ReferenceService {
    db: PgPool,
}

impl ReferenceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, kind: ReferenceKind) -> AppResult<Vec<ReferenceEntry>> {
        let query = format!(
            "SELECT id, name, description, created_at FROM {} ORDER BY name",
            kind.table()
        );
        let rows = sqlx::query_as::<_, ReferenceRow>(&query)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ReferenceEntry::from).collect())
    }

    pub async fn create(&self, kind: ReferenceKind, input: ReferenceInput) -> AppResult<ReferenceEntry> {
        let name = checked_name(&input)?;

        let query = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) \
             RETURNING id, name, description, created_at",
            kind.table()
        );
        let row = sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(name)
            .bind(&input.description)
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, "name"))?;

        tracing::info!(kind = kind.table(), id = %row.id, name = %row.name, "Reference created");
        Ok(row.into())
    }

    /// Rename a row; products hold ids so no cascade is needed
    pub async fn update(
        &self,
        kind: ReferenceKind,
        id: Uuid,
        input: ReferenceInput,
    ) -> AppResult<ReferenceEntry> {
        let name = checked_name(&input)?;

        let query = format!(
            "UPDATE {} SET name = $2, description = $3 WHERE id = $1 \
             RETURNING id, name, description, created_at",
            kind.table()
        );
        let row = sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(id)
            .bind(name)
            .bind(&input.description)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, "name"))?
            .ok_or_else(|| AppError::NotFound(kind.label().to_string()))?;

        Ok(row.into())
    }

    /// Delete a row nobody uses
    pub async fn delete(&self, kind: ReferenceKind, id: Uuid) -> AppResult<()> {
        let in_use_query = format!(
            "SELECT EXISTS(SELECT 1 FROM products WHERE {} = $1 AND deleted_at IS NULL)",
            kind.product_column()
        );
        let in_use = sqlx::query_scalar::<_, bool>(&in_use_query)
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        if in_use {
            return Err(AppError::Conflict {
                resource: kind.table().to_string(),
                message: format!("{} is still used by at least one product", kind.label()),
                message_fr: "Encore utilisé par au moins un produit".to_string(),
            });
        }

        let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                // Archived products keep their foreign keys
                if is_violation(&e, "23503") {
                    AppError::Conflict {
                        resource: kind.table().to_string(),
                        message: format!("{} is still used by archived products", kind.label()),
                        message_fr: "Encore utilisé par des produits archivés".to_string(),
                    }
                } else {
                    AppError::DatabaseError(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(kind.label().to_string()));
        }

        tracing::info!(kind = kind.table(), %id, "Reference deleted");
        Ok(())
    }
}
