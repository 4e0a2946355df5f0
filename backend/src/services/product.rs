//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    check_input, classify_stock, compose_location, next_reference, plan_product_creation,
    plan_product_update, Actor, NewProduct, Product, ProductFilter, ProductPatch, ProductView,
    ReferenceKind, SupplierLink,
};
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{map_unique_violation, AppError, AppResult};
use crate::services::ledger::insert_movement;
use crate::services::reference::ensure_reference_exists;

/// Columns selected into [`ProductRow`]
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.reference, p.designation, p.category_id, \
    p.unit_id, p.storage_zone_id, p.shelf, p.position, p.current_stock, p.min_stock, \
    p.max_stock, p.unit_price, p.photo_reference, p.supplier_links, p.deleted_at, \
    p.created_at, p.updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    reference: String,
    designation: String,
    category_id: Uuid,
    unit_id: Uuid,
    storage_zone_id: Option<Uuid>,
    shelf: Option<String>,
    position: Option<String>,
    current_stock: Decimal,
    min_stock: Decimal,
    max_stock: Decimal,
    unit_price: Option<Decimal>,
    photo_reference: Option<String>,
    supplier_links: Json<Vec<SupplierLink>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            reference: row.reference,
            designation: row.designation,
            category_id: row.category_id,
            unit_id: row.unit_id,
            storage_zone_id: row.storage_zone_id,
            shelf: row.shelf,
            position: row.position,
            current_stock: row.current_stock,
            min_stock: row.min_stock,
            max_stock: row.max_stock,
            unit_price: row.unit_price,
            photo_reference: row.photo_reference,
            supplier_links: row.supplier_links.0,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Product joined with its reference names
#[derive(Debug, FromRow)]
struct ProductViewRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: Option<String>,
    unit_name: Option<String>,
    zone_name: Option<String>,
}

/// Fetch a product, soft-deleted ones included
pub(crate) async fn fetch_product(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    let query = format!("SELECT {} FROM products p WHERE p.id = $1", PRODUCT_COLUMNS);
    sqlx::query_as::<_, ProductRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Fetch and lock a product row for the rest of the transaction
pub(crate) async fn lock_product(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    let query = format!(
        "SELECT {} FROM products p WHERE p.id = $1 FOR UPDATE",
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, ProductRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

pub(crate) async fn set_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    stock: Decimal,
    now: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query("UPDATE products SET current_stock = $2, updated_at = $3 WHERE id = $1")
        .bind(product_id)
        .bind(stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Display location `zone.shelf.position` of a product
pub(crate) async fn location_of(conn: &mut PgConnection, product: &Product) -> AppResult<String> {
    let zone = match product.storage_zone_id {
        Some(zone_id) => {
            sqlx::query_scalar::<_, String>("SELECT name FROM storage_zones WHERE id = $1")
                .bind(zone_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };
    Ok(compose_location(
        zone.as_deref(),
        product.shelf.as_deref(),
        product.position.as_deref(),
    ))
}

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    photo_base_url: String,
}

impl ProductService {
    pub fn new(db: PgPool, photo_base_url: String) -> Self {
        Self { db, photo_base_url }
    }

    fn to_view(&self, row: ProductViewRow) -> ProductView {
        let product = Product::from(row.product);
        ProductView {
            location: compose_location(
                row.zone_name.as_deref(),
                product.shelf.as_deref(),
                product.position.as_deref(),
            ),
            photo_url: product
                .photo_reference
                .as_ref()
                .map(|key| format!("{}/{}", self.photo_base_url.trim_end_matches('/'), key)),
            alert: classify_stock(product.current_stock, product.min_stock),
            category: row.category_name.unwrap_or_default(),
            unit: row.unit_name.unwrap_or_default(),
            storage_zone: row.zone_name,
            product,
        }
    }

    fn view_query(where_clause: &str) -> String {
        format!(
            r#"
            SELECT {}, c.name AS category_name, u.name AS unit_name, z.name AS zone_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            LEFT JOIN units u ON u.id = p.unit_id
            LEFT JOIN storage_zones z ON z.id = p.storage_zone_id
            {}
            "#,
            PRODUCT_COLUMNS, where_clause
        )
    }

    /// List products ordered by reference
    pub async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<ProductView>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let query = Self::view_query(
            r#"
            WHERE ($1::uuid IS NULL OR p.category_id = $1)
              AND ($2::uuid IS NULL OR p.storage_zone_id = $2)
              AND ($3::text IS NULL OR p.reference ILIKE $3 OR p.designation ILIKE $3)
              AND ($4 OR p.deleted_at IS NULL)
            ORDER BY p.reference
            "#,
        );

        let rows = sqlx::query_as::<_, ProductViewRow>(&query)
            .bind(filter.category_id)
            .bind(filter.storage_zone_id)
            .bind(search)
            .bind(filter.include_deleted)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| self.to_view(row))
            .filter(|view| !filter.alert_only || view.alert.is_some())
            .collect())
    }

    /// Get one product; soft-deleted products stay readable by id
    pub async fn get(&self, id: Uuid) -> AppResult<ProductView> {
        let query = Self::view_query("WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductViewRow>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        Ok(self.to_view(row))
    }

    /// Create a product and its `initial` ledger entry in one transaction
    pub async fn create(&self, actor: &Actor, input: NewProduct) -> AppResult<ProductView> {
        check_input(&input)?;

        let mut tx = self.db.begin().await?;

        ensure_reference_exists(&mut tx, ReferenceKind::Category, input.category_id).await?;
        ensure_reference_exists(&mut tx, ReferenceKind::Unit, input.unit_id).await?;
        if let Some(zone_id) = input.storage_zone_id {
            ensure_reference_exists(&mut tx, ReferenceKind::StorageZone, zone_id).await?;
        }

        let reference = match &input.reference {
            Some(reference) => reference.trim().to_string(),
            None => {
                let existing = sqlx::query_scalar::<_, String>(
                    "SELECT reference FROM products WHERE reference LIKE 'RF%'",
                )
                .fetch_all(&mut *tx)
                .await?;
                next_reference(existing.iter().map(String::as_str))
            }
        };

        let now = Utc::now();
        let plan = plan_product_creation(Uuid::new_v4(), reference, &input, actor, now)?;
        let product = &plan.product;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, reference, designation, category_id, unit_id, storage_zone_id, shelf,
                position, current_stock, min_stock, max_stock, unit_price, photo_reference,
                supplier_links, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(product.id)
        .bind(&product.reference)
        .bind(&product.designation)
        .bind(product.category_id)
        .bind(product.unit_id)
        .bind(product.storage_zone_id)
        .bind(&product.shelf)
        .bind(&product.position)
        .bind(product.current_stock)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.unit_price)
        .bind(&product.photo_reference)
        .bind(Json(&product.supplier_links))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "reference"))?;

        insert_movement(&mut tx, plan.movement, now).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            reference = %product.reference,
            initial_stock = %product.current_stock,
            "Product created"
        );

        self.get(plan.product.id).await
    }

    /// Apply a partial update
    ///
    /// A stock change writes one ledger row unless `skip_movement` is set.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: ProductPatch,
        skip_movement: bool,
    ) -> AppResult<ProductView> {
        let mut tx = self.db.begin().await?;

        if let Some(category_id) = patch.category_id {
            ensure_reference_exists(&mut tx, ReferenceKind::Category, category_id).await?;
        }
        if let Some(unit_id) = patch.unit_id {
            ensure_reference_exists(&mut tx, ReferenceKind::Unit, unit_id).await?;
        }
        if let Some(zone_id) = patch.storage_zone_id {
            ensure_reference_exists(&mut tx, ReferenceKind::StorageZone, zone_id).await?;
        }

        let product = lock_product(&mut tx, id).await?;
        let now = Utc::now();
        let plan = plan_product_update(&product, &patch, skip_movement, actor, None, now)?;
        let updated = &plan.product;

        sqlx::query(
            r#"
            UPDATE products SET
                designation = $2, category_id = $3, unit_id = $4, storage_zone_id = $5,
                shelf = $6, position = $7, current_stock = $8, min_stock = $9, max_stock = $10,
                unit_price = $11, photo_reference = $12, supplier_links = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(updated.id)
        .bind(&updated.designation)
        .bind(updated.category_id)
        .bind(updated.unit_id)
        .bind(updated.storage_zone_id)
        .bind(&updated.shelf)
        .bind(&updated.position)
        .bind(updated.current_stock)
        .bind(updated.min_stock)
        .bind(updated.max_stock)
        .bind(updated.unit_price)
        .bind(&updated.photo_reference)
        .bind(Json(&updated.supplier_links))
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(movement) = plan.movement {
            insert_movement(&mut tx, movement, now).await?;
        }

        tx.commit().await?;

        if product.current_stock != updated.current_stock {
            tracing::info!(
                product_id = %id,
                previous_stock = %product.current_stock,
                new_stock = %updated.current_stock,
                skip_movement,
                "Product stock updated"
            );
        }

        self.get(id).await
    }

    /// Record the object key of an uploaded photo
    pub async fn set_photo(&self, id: Uuid, photo_reference: &str) -> AppResult<ProductView> {
        let result = sqlx::query(
            "UPDATE products SET photo_reference = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(photo_reference)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        self.get(id).await
    }

    /// Ensure an active product exists before uploading its photo
    pub async fn ensure_active(&self, id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Product".to_string()))
        }
    }

    /// Hide a product from the catalog; its ledger history is kept
    pub async fn soft_delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        shared::require_manager(actor)?;

        let result = sqlx::query(
            "UPDATE products SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(product_id = %id, "Soft delete of unknown or deleted product");
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(product_id = %id, deleted_by = %actor.user_id, "Product soft-deleted");
        Ok(())
    }
}
