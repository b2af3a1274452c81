//! In-memory store for tests and local development.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::inventory::{AuditLogEntry, InventoryKey, ProductId};
use crate::order::{ItemOutcome, OrderId, OrderRecord, OrderStatus, ReconciliationReport};
use crate::store::{InventoryStore, OrderStore};

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, OrderRecord>,
    reports: HashMap<OrderId, ReconciliationReport>,
    stock: HashMap<String, u32>,
    sales: HashMap<ProductId, u64>,
    audit: Vec<AuditLogEntry>,
    unavailable: bool,
}

/// Store backed by process-local maps.
///
/// One mutex guards the whole state. The store contract only requires the
/// per-record apply and the conditional finalize to be individually atomic,
/// which the coarse lock satisfies.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store mutex poisoned")
    }

    /// Seed a pending order record, as the storefront would at checkout.
    pub fn insert_order(&self, order_id: OrderId) {
        let mut state = self.state();
        state.orders.insert(
            order_id.clone(),
            OrderRecord {
                order_id,
                status: OrderStatus::Pending,
                reconciled_at: None,
            },
        );
    }

    /// Seed an inventory record holding `stock` units.
    pub fn seed_stock(&self, key: &InventoryKey, stock: u32) {
        self.state().stock.insert(key.storage_key(), stock);
    }

    /// Simulate infrastructure failure for every subsequent call.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn stock_of(&self, key: &InventoryKey) -> Option<u32> {
        self.state().stock.get(&key.storage_key()).copied()
    }

    pub fn sales_of(&self, product_id: &ProductId) -> u64 {
        self.state().sales.get(product_id).copied().unwrap_or(0)
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state().audit.clone()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<OrderRecord> {
        self.state().orders.get(order_id).cloned()
    }

    /// The report persisted at finalization, if the order is terminal.
    pub fn report(&self, order_id: &OrderId) -> Option<ReconciliationReport> {
        self.state().reports.get(order_id).cloned()
    }

    fn check_available(state: &State) -> Result<(), StoreError> {
        if state.unavailable {
            return Err(StoreError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn fetch(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.orders.get(order_id).cloned())
    }

    async fn finalize(&self, report: &ReconciliationReport) -> Result<bool, StoreError> {
        let mut state = self.state();
        Self::check_available(&state)?;
        let Some(order) = state.orders.get_mut(&report.order_id) else {
            return Err(StoreError::Unavailable(format!(
                "order {} vanished mid-reconciliation",
                report.order_id
            )));
        };
        if order.status.is_terminal() {
            return Ok(false);
        }
        order.status = report.status;
        order.reconciled_at = Some(report.reconciled_at);
        state.reports.insert(report.order_id.clone(), report.clone());
        Ok(true)
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn apply_sale(
        &self,
        key: &InventoryKey,
        quantity: u32,
        order_id: &OrderId,
    ) -> Result<ItemOutcome, StoreError> {
        let mut state = self.state();
        Self::check_available(&state)?;

        // Replay a prior application rather than decrementing twice.
        if let Some(prior) = state
            .audit
            .iter()
            .find(|entry| &entry.order_id == order_id && &entry.key == key)
        {
            return Ok(ItemOutcome::Applied {
                previous_stock: prior.previous_stock,
                new_stock: prior.new_stock,
            });
        }

        let storage_key = key.storage_key();
        let previous = match state.stock.get(&storage_key) {
            None => return Ok(ItemOutcome::RecordNotFound),
            Some(&available) if available < quantity => {
                return Ok(ItemOutcome::InsufficientStock {
                    requested: quantity,
                    available,
                });
            }
            Some(&available) => available,
        };

        let new_stock = previous - quantity;
        state.stock.insert(storage_key, new_stock);
        *state.sales.entry(key.product_id.clone()).or_insert(0) += u64::from(quantity);
        state.audit.push(AuditLogEntry::sale(
            key.clone(),
            order_id.clone(),
            quantity,
            previous,
            new_stock,
        ));

        Ok(ItemOutcome::Applied {
            previous_stock: previous,
            new_stock,
        })
    }
}
