use async_trait::async_trait;

use crate::error::StoreError;
use crate::inventory::InventoryKey;
use crate::order::{ItemOutcome, OrderId, OrderRecord, ReconciliationReport};

/// Read and finalize access to order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch the projection the idempotency guard runs on.
    async fn fetch(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, StoreError>;

    /// Write the terminal status and per-item outcomes.
    ///
    /// Only a still-pending order may be updated. Returns `false` when a
    /// concurrent invocation finalized the order first; callers treat that
    /// as success.
    async fn finalize(&self, report: &ReconciliationReport) -> Result<bool, StoreError>;
}

/// Inventory, sales-counter, and audit-log access.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Atomically apply the sale of `quantity` units at `key` on behalf of
    /// `order_id`.
    ///
    /// In one atomic unit the implementation must: replay the recorded
    /// transition if an audit entry for (`order_id`, `key`) already exists;
    /// otherwise verify stock, decrement it, increment the product's sales
    /// counter, and append the audit entry together. Business failures come
    /// back as non-applied outcomes and leave no trace in the store.
    async fn apply_sale(
        &self,
        key: &InventoryKey,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<ItemOutcome, StoreError>;
}
