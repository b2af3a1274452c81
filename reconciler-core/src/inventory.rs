use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::OrderId;

/// Stable product identifier, as assigned by the catalog. Never a display
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolution key for one inventory record: a product plus its optional
/// variant. Storefronts used to look inventory up by a reconstructed display
/// name, which broke whenever a product was renamed; resolution here is by
/// identifier only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryKey {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_key: Option<String>,
}

impl InventoryKey {
    pub fn new(product_id: ProductId, variant_key: Option<String>) -> Self {
        Self {
            product_id,
            variant_key,
        }
    }

    /// Canonical text rendering used as the storage key: `P1` for a plain
    /// product, `P1#large` for a variant.
    pub fn storage_key(&self) -> String {
        match &self.variant_key {
            Some(variant) => format!("{}#{}", self.product_id, variant),
            None => self.product_id.to_string(),
        }
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Why a stock level changed. Reconciliation only ever writes `Sale`;
/// restocks and manual adjustments come from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StockChangeReason {
    Sale,
    Restock,
    Adjustment,
}

/// Append-only record of one stock transition. Entries are unique per
/// (`order_id`, key); that uniqueness is what makes re-applying an order a
/// no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub entry_id: Uuid,
    pub key: InventoryKey,
    pub quantity_delta: i64,
    pub reason: StockChangeReason,
    pub note: String,
    pub previous_stock: u32,
    pub new_stock: u32,
    pub order_id: OrderId,
    pub recorded_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Entry for a committed sale of `quantity` units.
    pub fn sale(
        key: InventoryKey,
        order_id: OrderId,
        quantity: u32,
        previous_stock: u32,
        new_stock: u32,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            note: format!("sale from order {order_id}"),
            key,
            quantity_delta: -i64::from(quantity),
            reason: StockChangeReason::Sale,
            previous_stock,
            new_stock,
            order_id,
            recorded_at: Utc::now(),
        }
    }
}
