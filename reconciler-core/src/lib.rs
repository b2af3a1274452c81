//! Order-inventory reconciliation for the storefront backend.
//!
//! When the storefront creates an order, an order-created event is delivered
//! (at least once) to this workflow. Per line item the engine verifies stock,
//! decrements it, bumps the product's sales counter, and appends an audit log
//! entry, all in one atomic unit, then writes a terminal status back to the
//! order record. Item-level failures are aggregated, never thrown; only
//! infrastructure failures escape the invocation so the delivery layer can
//! retry it.
//!
//! This crate holds the domain model, the store traits, the engine, and an
//! in-memory store. The Postgres-backed store and the Kafka consumer live in
//! `reconciler-service`.

mod engine;
mod error;
mod inventory;
mod memory;
mod order;
mod store;

pub use engine::{Reconciliation, ReconciliationEngine};
pub use error::{MalformedOrder, ReconcileError, StoreError};
pub use inventory::{AuditLogEntry, InventoryKey, ProductId, StockChangeReason};
pub use memory::MemoryStore;
pub use order::{
    ItemOutcome, ItemReconciliation, LineItem, OrderCreated, OrderId, OrderRecord, OrderStatus,
    ReconciliationReport,
};
pub use store::{InventoryStore, OrderStore};
