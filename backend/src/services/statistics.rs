//! Read-side statistics service
//!
//! Loads rows and hands them to the pure derivations in `shared`.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    average_delivery_days, consumption_stats, dashboard_stats, stock_alerts, ConsumptionStats,
    window_start, DashboardStats, MovementType, OrderStatus, Product, StockAlert,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::exit_request::ExitRequestService;
use crate::services::ledger::LedgerService;
use crate::services::order::{OrderQuery, OrderService};
use crate::services::product::{fetch_product, ProductRow, PRODUCT_COLUMNS};

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryTimeStats {
    pub average_days: Decimal,
    pub received_orders: usize,
}

/// Statistics service
#[derive(Clone)]
pub struct StatisticsService {
    db: PgPool,
}

impl StatisticsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn active_products(&self) -> AppResult<Vec<Product>> {
        let query = format!(
            "SELECT {} FROM products p WHERE p.deleted_at IS NULL ORDER BY p.reference",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Products at or under their minimum, lowest percentage first
    pub async fn alerts(&self) -> AppResult<Vec<StockAlert>> {
        let products = self.active_products().await?;
        Ok(stock_alerts(&products))
    }

    pub async fn dashboard(&self, window_days: u32) -> AppResult<DashboardStats> {
        let now = Utc::now();
        let products = self.active_products().await?;

        let pending_requests = ExitRequestService::new(self.db.clone(), Default::default())
            .pending()
            .await?;

        let pending_orders = OrderService::new(self.db.clone())
            .list(&OrderQuery {
                status: Some(OrderStatus::Pending),
                product_id: None,
            })
            .await?;

        let movements = LedgerService::new(self.db.clone())
            .since(window_start(now, window_days), None, None)
            .await?;

        Ok(dashboard_stats(
            &products,
            &pending_requests,
            &pending_orders,
            &movements,
            window_days,
            now,
        ))
    }

    /// Consumption over the trailing window and projected stock-out
    pub async fn consumption(&self, product_id: Uuid, window_days: u32) -> AppResult<ConsumptionStats> {
        let now = Utc::now();
        let mut conn = self.db.acquire().await?;
        let product = fetch_product(&mut conn, product_id).await?;
        drop(conn);

        let movements = LedgerService::new(self.db.clone())
            .since(
                window_start(now, window_days),
                Some(MovementType::Exit),
                Some(product_id),
            )
            .await?;

        Ok(consumption_stats(&product, &movements, window_days, now))
    }

    pub async fn delivery_time(&self) -> AppResult<DeliveryTimeStats> {
        let received = OrderService::new(self.db.clone()).received().await?;
        Ok(DeliveryTimeStats {
            average_days: average_delivery_days(&received),
            received_orders: received.len(),
        })
    }
}
