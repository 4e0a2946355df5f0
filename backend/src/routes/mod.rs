//! Route definitions for the Stock Manager API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Extension, Router,
};
use shared::ReferenceKind;

use crate::{handlers, middleware::auth_middleware, AppState};

/// Largest accepted photo upload
const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Everything else requires a verified token
        .merge(protected_routes())
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_me))
        .nest("/categories", reference_routes(ReferenceKind::Category))
        .nest("/units", reference_routes(ReferenceKind::Unit))
        .nest("/zones", reference_routes(ReferenceKind::StorageZone))
        .nest("/products", product_routes())
        .nest("/movements", movement_routes())
        .nest("/exit-requests", exit_request_routes())
        .nest("/cart", cart_routes())
        .route("/inventory-counts", post(handlers::submit_inventory_count))
        .nest("/pending-exits", pending_exit_routes())
        .nest("/orders", order_routes())
        .nest("/stats", stats_routes())
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Categories, units and zones share handlers keyed by kind
fn reference_routes(kind: ReferenceKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_references).post(handlers::create_reference),
        )
        .route(
            "/:id",
            put(handlers::update_reference).delete(handlers::delete_reference),
        )
        .layer(Extension(kind))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/photo",
            post(handlers::upload_product_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES)),
        )
        .route("/:product_id/movements", get(handlers::get_product_movements))
}

fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_movements))
        .route("/export", get(handlers::export_movements))
}

fn exit_request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_exit_requests).post(handlers::create_exit_request),
        )
        .route("/baskets", get(handlers::list_baskets))
        .route("/baskets/approve", post(handlers::approve_basket))
        .route("/baskets/reject", post(handlers::reject_basket))
        .route("/baskets/cancel", post(handlers::cancel_basket))
        .route("/:request_id", delete(handlers::cancel_exit_request))
        .route("/:request_id/approve", post(handlers::approve_exit_request))
        .route("/:request_id/reject", post(handlers::reject_exit_request))
        .route("/:request_id/await-reception", post(handlers::await_reception))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_cart)
                .post(handlers::add_cart_line)
                .put(handlers::set_cart_line)
                .delete(handlers::clear_cart),
        )
        .route("/submit", post(handlers::submit_cart))
        .route("/:product_id", delete(handlers::remove_cart_line))
}

fn pending_exit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_pending_exits))
        .route("/export", get(handlers::export_pending_exits))
        .route("/:pending_exit_id/processed", post(handlers::mark_exit_processed))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id/receive", post(handlers::receive_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
}

fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(handlers::get_stock_alerts))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/consumption/:product_id", get(handlers::get_consumption))
        .route("/delivery-time", get(handlers::get_delivery_time))
}
