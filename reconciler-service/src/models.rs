use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use reconciler_core::{AuditLogEntry, OrderStatus, StockChangeReason};

#[derive(Debug, Clone, Queryable)]
pub struct OrderRow {
    pub id: String,
    pub customer_id: Option<String>,
    pub items: serde_json::Value,
    pub total_amount: BigDecimal,
    pub status: String,
    pub outcome: Option<serde_json::Value>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable)]
pub struct InventoryRow {
    pub stock_key: String,
    pub product_id: String,
    pub variant_key: Option<String>,
    pub current_stock: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable)]
pub struct InventoryLogRow {
    pub id: Uuid,
    pub stock_key: String,
    pub product_id: String,
    pub variant_key: Option<String>,
    pub quantity_delta: i64,
    pub reason: String,
    pub note: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub order_id: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inventory_logs)]
pub struct NewInventoryLog {
    pub id: Uuid,
    pub stock_key: String,
    pub product_id: String,
    pub variant_key: Option<String>,
    pub quantity_delta: i64,
    pub reason: String,
    pub note: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub order_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl NewInventoryLog {
    pub fn from_entry(entry: &AuditLogEntry) -> Self {
        Self {
            id: entry.entry_id,
            stock_key: entry.key.storage_key(),
            product_id: entry.key.product_id.to_string(),
            variant_key: entry.key.variant_key.clone(),
            quantity_delta: entry.quantity_delta,
            reason: reason_to_str(entry.reason).to_string(),
            note: entry.note.clone(),
            previous_stock: i64::from(entry.previous_stock),
            new_stock: i64::from(entry.new_stock),
            order_id: entry.order_id.to_string(),
            recorded_at: entry.recorded_at,
        }
    }
}

pub fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Reconciled => "reconciled",
        OrderStatus::PartiallyFailed => "partially_failed",
        OrderStatus::Failed => "failed",
    }
}

pub fn status_from_str(status: &str) -> Option<OrderStatus> {
    match status {
        "pending" => Some(OrderStatus::Pending),
        "reconciled" => Some(OrderStatus::Reconciled),
        "partially_failed" => Some(OrderStatus::PartiallyFailed),
        "failed" => Some(OrderStatus::Failed),
        _ => None,
    }
}

pub fn reason_to_str(reason: StockChangeReason) -> &'static str {
    match reason {
        StockChangeReason::Sale => "sale",
        StockChangeReason::Restock => "restock",
        StockChangeReason::Adjustment => "adjustment",
    }
}
