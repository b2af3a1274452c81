use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};

use reconciler_core::{
    AuditLogEntry, InventoryKey, InventoryStore, ItemOutcome, OrderId, OrderRecord, OrderStatus,
    OrderStore, ReconciliationReport, StoreError,
};

use crate::models::*;
use crate::schema::*;

type DbPool = Pool<AsyncPgConnection>;

/// Postgres-backed store. Per-item atomicity comes from a row lock on the
/// inventory record inside a single transaction; the finalize write is a
/// conditional update on a still-pending order.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn unavailable<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl OrderStore for PgStore {
    async fn fetch(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;

        let row = orders::table
            .find(order_id.as_str())
            .first::<OrderRow>(&mut conn)
            .await
            .optional()
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status = status_from_str(&row.status).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "order {} carries unknown status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(Some(OrderRecord {
            order_id: OrderId::from(row.id),
            status,
            reconciled_at: row.reconciled_at,
        }))
    }

    async fn finalize(&self, report: &ReconciliationReport) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let detail = serde_json::to_value(report).map_err(unavailable)?;

        let updated = diesel::update(
            orders::table
                .find(report.order_id.as_str())
                .filter(orders::status.eq(status_to_str(OrderStatus::Pending))),
        )
        .set((
            orders::status.eq(status_to_str(report.status)),
            orders::outcome.eq(Some(detail)),
            orders::reconciled_at.eq(Some(report.reconciled_at)),
            orders::updated_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)
        .await
        .map_err(unavailable)?;

        Ok(updated > 0)
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn apply_sale(
        &self,
        key: &InventoryKey,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<ItemOutcome, StoreError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let key = key.clone();
        let order_id = order_id.clone();

        conn.transaction::<ItemOutcome, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                let storage_key = key.storage_key();

                // Replay a prior application rather than decrementing twice.
                let prior = inventory_logs::table
                    .filter(inventory_logs::order_id.eq(order_id.as_str()))
                    .filter(inventory_logs::stock_key.eq(&storage_key))
                    .first::<InventoryLogRow>(conn)
                    .await
                    .optional()?;
                if let Some(log) = prior {
                    return Ok(ItemOutcome::Applied {
                        previous_stock: log.previous_stock as u32,
                        new_stock: log.new_stock as u32,
                    });
                }

                let record = inventory::table
                    .find(&storage_key)
                    .for_update()
                    .first::<InventoryRow>(conn)
                    .await
                    .optional()?;
                let Some(record) = record else {
                    return Ok(ItemOutcome::RecordNotFound);
                };

                if record.current_stock < i64::from(quantity) {
                    return Ok(ItemOutcome::InsufficientStock {
                        requested: quantity,
                        available: record.current_stock as u32,
                    });
                }
                let previous = record.current_stock as u32;
                let new_stock = previous - quantity;

                diesel::update(inventory::table.find(&storage_key))
                    .set((
                        inventory::current_stock.eq(i64::from(new_stock)),
                        inventory::updated_at.eq(Some(Utc::now())),
                    ))
                    .execute(conn)
                    .await?;

                diesel::insert_into(sales_counters::table)
                    .values((
                        sales_counters::product_id.eq(key.product_id.as_str()),
                        sales_counters::units_sold.eq(i64::from(quantity)),
                        sales_counters::updated_at.eq(Some(Utc::now())),
                    ))
                    .on_conflict(sales_counters::product_id)
                    .do_update()
                    .set((
                        sales_counters::units_sold
                            .eq(sales_counters::units_sold + i64::from(quantity)),
                        sales_counters::updated_at.eq(Some(Utc::now())),
                    ))
                    .execute(conn)
                    .await?;

                let entry =
                    AuditLogEntry::sale(key.clone(), order_id.clone(), quantity, previous, new_stock);
                diesel::insert_into(inventory_logs::table)
                    .values(NewInventoryLog::from_entry(&entry))
                    .execute(conn)
                    .await?;

                Ok(ItemOutcome::Applied {
                    previous_stock: previous,
                    new_stock,
                })
            })
        })
        .await
        .map_err(unavailable)
    }
}
