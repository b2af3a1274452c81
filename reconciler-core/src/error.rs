use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::OrderId;

/// A structurally invalid order. Terminal: the order is finalized as
/// `Failed` immediately and the event is not retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MalformedOrder {
    #[error("order has no line items")]
    NoItems,
    #[error("line item {index} has zero quantity")]
    ZeroQuantity { index: usize },
}

/// Infrastructure failure talking to the backing store, unrelated to
/// business outcomes. Always retryable: the order-status guard and the
/// per-item audit uniqueness make redelivery safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Invocation-level failure, surfaced to the delivery layer so the whole
/// reconciliation is redelivered.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The order record is not visible yet; the event outran the store.
    #[error("order {0} not found in order store")]
    OrderNotFound(OrderId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
