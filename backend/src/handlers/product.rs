//! HTTP handlers for the product catalog

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{NewProduct, ProductFilter, ProductPatch, ProductView, StockMovement};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::photo_storage::photo_object_key;
use crate::middleware::CurrentUser;
use crate::services::{LedgerService, ProductService};
use crate::AppState;

fn product_service(state: &AppState) -> ProductService {
    ProductService::new(state.db.clone(), state.photos.public_base_url())
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<ProductView>>> {
    let products = product_service(&state).list(&filter).await?;
    Ok(Json(products))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductView>> {
    let product = product_service(&state).get(product_id).await?;
    Ok(Json(product))
}

/// Create a product with its initial stock entry
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewProduct>,
) -> AppResult<Json<ProductView>> {
    let product = product_service(&state)
        .create(&current_user.0.actor(), input)
        .await?;
    Ok(Json(product))
}

/// PATCH body: product fields plus the ledger switch
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(flatten)]
    pub patch: ProductPatch,
    #[serde(default)]
    pub skip_movement: bool,
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> AppResult<Json<ProductView>> {
    let product = product_service(&state)
        .update(&current_user.0.actor(), product_id, body.patch, body.skip_movement)
        .await?;
    Ok(Json(product))
}

/// Soft-delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    product_service(&state)
        .soft_delete(&current_user.0.actor(), product_id)
        .await?;
    Ok(Json(()))
}

/// Upload a product photo (multipart field `photo`)
///
/// The product is only updated once the upload succeeded.
pub async fn upload_product_photo(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ProductView>> {
    let service = product_service(&state);
    service.ensure_active(product_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("photo") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation {
                field: "photo".to_string(),
                message: "Photo must be an image".to_string(),
                message_fr: "La photo doit être une image".to_string(),
            });
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Invalid photo upload: {}", e)))?;
        upload = Some((content_type, file_name, bytes));
        break;
    }

    let (content_type, file_name, bytes) = upload.ok_or_else(|| AppError::Validation {
        field: "photo".to_string(),
        message: "Missing photo field".to_string(),
        message_fr: "Photo manquante".to_string(),
    })?;

    let key = photo_object_key(product_id, file_name.as_deref());
    let key = state
        .photos
        .upload(&key, &content_type, bytes.to_vec())
        .await
        .map_err(|e| {
            tracing::warn!(product_id = %product_id, error = %e, "Photo upload failed");
            e
        })?;

    let product = service.set_photo(product_id, &key).await?;
    Ok(Json(product))
}

/// Full ledger history of a product
pub async fn get_product_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = LedgerService::new(state.db);
    let movements = service.for_product(product_id).await?;
    Ok(Json(movements))
}
