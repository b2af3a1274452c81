use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedOrder;
use crate::inventory::{InventoryKey, ProductId};

/// Opaque order identifier, assigned by the storefront at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order-created event payload, as published when the storefront persists a
/// new order. Delivery is at least once; the engine tolerates duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
}

/// One product+quantity entry within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_key: Option<String>,
    pub quantity: u32,
    /// Human-readable name some storefront clients still attach. Carried for
    /// decoding compatibility, never used to resolve inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name_hint: Option<String>,
}

impl LineItem {
    pub fn inventory_key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id.clone(), self.variant_key.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Reconciled,
    PartiallyFailed,
    Failed,
}

impl OrderStatus {
    /// Terminal statuses are never revisited; reconciliation runs at most
    /// once per order.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// The order store's projection of an order, as read by the idempotency
/// guard.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub reconciled_at: Option<DateTime<Utc>>,
}

/// Per-item result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemOutcome {
    /// Stock decremented, sales counter bumped, audit entry appended.
    #[serde(rename_all = "camelCase")]
    Applied { previous_stock: u32, new_stock: u32 },
    /// Requested quantity exceeds what is on hand; nothing changed.
    #[serde(rename_all = "camelCase")]
    InsufficientStock { requested: u32, available: u32 },
    /// No inventory record for the resolved key; nothing changed.
    RecordNotFound,
}

impl ItemOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ItemOutcome::Applied { .. })
    }
}

/// What happened to one line item, attached to the finalized order for
/// manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReconciliation {
    pub key: InventoryKey,
    pub quantity: u32,
    pub outcome: ItemOutcome,
}

/// Everything one invocation decided about an order, persisted at
/// finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<ItemReconciliation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malformed: Option<MalformedOrder>,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    /// Derive the terminal status from the per-item outcomes: all applied is
    /// `Reconciled`, none applied is `Failed`, anything else is
    /// `PartiallyFailed`.
    pub fn aggregate(
        order_id: OrderId,
        items: Vec<ItemReconciliation>,
        reconciled_at: DateTime<Utc>,
    ) -> Self {
        let applied = items.iter().filter(|item| item.outcome.is_applied()).count();
        let status = if applied == items.len() {
            OrderStatus::Reconciled
        } else if applied == 0 {
            OrderStatus::Failed
        } else {
            OrderStatus::PartiallyFailed
        };
        Self {
            order_id,
            status,
            items,
            malformed: None,
            reconciled_at,
        }
    }

    /// Report for an order rejected before any item was touched.
    pub fn malformed(
        order_id: OrderId,
        fault: MalformedOrder,
        reconciled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            status: OrderStatus::Failed,
            items: Vec::new(),
            malformed: Some(fault),
            reconciled_at,
        }
    }
}
