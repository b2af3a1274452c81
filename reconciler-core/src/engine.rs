use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{MalformedOrder, ReconcileError};
use crate::order::{
    ItemOutcome, ItemReconciliation, LineItem, OrderCreated, OrderStatus, ReconciliationReport,
};
use crate::store::{InventoryStore, OrderStore};

/// What a single invocation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// This invocation drove the order to a terminal status.
    Finalized(ReconciliationReport),
    /// The order was already terminal; nothing was touched.
    AlreadyFinalized(OrderStatus),
}

/// Orchestrates order reconciliation against an injected store.
///
/// Safe to invoke repeatedly and concurrently for the same order: the
/// order-status guard short-circuits sequential redeliveries, and the
/// per-item audit uniqueness makes overlapping invocations converge on a
/// single application.
pub struct ReconciliationEngine<S> {
    store: Arc<S>,
}

impl<S> ReconciliationEngine<S>
where
    S: OrderStore + InventoryStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run one order to a terminal state.
    ///
    /// Item-level failures (missing record, insufficient stock) are recorded
    /// and do not abort the batch; later items still get their chance.
    /// Infrastructure errors propagate so the delivery layer redelivers the
    /// whole invocation.
    pub async fn reconcile(
        &self,
        trigger: &OrderCreated,
    ) -> Result<Reconciliation, ReconcileError> {
        let order = self
            .store
            .fetch(&trigger.order_id)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound(trigger.order_id.clone()))?;

        if order.status.is_terminal() {
            info!(order_id = %trigger.order_id, status = ?order.status, "order already finalized, skipping");
            return Ok(Reconciliation::AlreadyFinalized(order.status));
        }

        if let Err(fault) = validate_items(&trigger.items) {
            warn!(order_id = %trigger.order_id, %fault, "rejecting malformed order");
            let report =
                ReconciliationReport::malformed(trigger.order_id.clone(), fault, Utc::now());
            self.store.finalize(&report).await?;
            return Ok(Reconciliation::Finalized(report));
        }

        let mut items = Vec::with_capacity(trigger.items.len());
        for item in &trigger.items {
            let key = item.inventory_key();
            let outcome = self
                .store
                .apply_sale(&key, item.quantity, &trigger.order_id)
                .await?;
            match &outcome {
                ItemOutcome::Applied {
                    previous_stock,
                    new_stock,
                } => {
                    debug!(order_id = %trigger.order_id, %key, previous_stock, new_stock, "stock decremented");
                }
                ItemOutcome::InsufficientStock {
                    requested,
                    available,
                } => {
                    warn!(order_id = %trigger.order_id, %key, requested, available, "insufficient stock");
                }
                ItemOutcome::RecordNotFound => {
                    warn!(order_id = %trigger.order_id, %key, "no inventory record for key");
                }
            }
            items.push(ItemReconciliation {
                key,
                quantity: item.quantity,
                outcome,
            });
        }

        let report = ReconciliationReport::aggregate(trigger.order_id.clone(), items, Utc::now());
        let finalized = self.store.finalize(&report).await?;
        if finalized {
            info!(order_id = %trigger.order_id, status = ?report.status, "order finalized");
        } else {
            info!(order_id = %trigger.order_id, "lost finalize race to a concurrent invocation");
        }
        Ok(Reconciliation::Finalized(report))
    }
}

fn validate_items(items: &[LineItem]) -> Result<(), MalformedOrder> {
    if items.is_empty() {
        return Err(MalformedOrder::NoItems);
    }
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(MalformedOrder::ZeroQuantity { index });
        }
    }
    Ok(())
}
