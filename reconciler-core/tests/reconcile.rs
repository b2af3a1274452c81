use std::sync::Arc;

use reconciler_core::{
    InventoryKey, ItemOutcome, LineItem, MalformedOrder, MemoryStore, OrderCreated, OrderId,
    OrderStatus, ProductId, ReconcileError, Reconciliation, ReconciliationEngine, StockChangeReason,
    StoreError,
};

fn setup() -> (Arc<MemoryStore>, ReconciliationEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = ReconciliationEngine::new(store.clone());
    (store, engine)
}

fn item(product: &str, quantity: u32) -> LineItem {
    LineItem {
        product_id: ProductId::new(product),
        variant_key: None,
        quantity,
        display_name_hint: None,
    }
}

fn variant_item(product: &str, variant: &str, quantity: u32) -> LineItem {
    LineItem {
        product_id: ProductId::new(product),
        variant_key: Some(variant.to_string()),
        quantity,
        display_name_hint: None,
    }
}

fn order(id: &str, items: Vec<LineItem>) -> OrderCreated {
    OrderCreated {
        order_id: OrderId::new(id),
        items,
    }
}

fn key(product: &str) -> InventoryKey {
    InventoryKey::new(ProductId::new(product), None)
}

fn variant_key(product: &str, variant: &str) -> InventoryKey {
    InventoryKey::new(ProductId::new(product), Some(variant.to_string()))
}

fn finalized(result: Reconciliation) -> reconciler_core::ReconciliationReport {
    match result {
        Reconciliation::Finalized(report) => report,
        Reconciliation::AlreadyFinalized(status) => {
            panic!("expected a fresh finalization, order was already {status:?}")
        }
    }
}

#[tokio::test]
async fn applies_single_item_and_records_audit() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O1"));
    store.seed_stock(&key("P1"), 5);

    // The hint names something else entirely; resolution must ignore it.
    let mut line = item("P1", 2);
    line.display_name_hint = Some("Deluxe Gift Box (Large)".to_string());
    let report = finalized(engine.reconcile(&order("O1", vec![line])).await.unwrap());

    assert_eq!(report.status, OrderStatus::Reconciled);
    assert_eq!(store.stock_of(&key("P1")), Some(3));
    assert_eq!(store.sales_of(&ProductId::new("P1")), 2);

    let audit = store.audit_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].quantity_delta, -2);
    assert_eq!(audit[0].previous_stock, 5);
    assert_eq!(audit[0].new_stock, 3);
    assert_eq!(audit[0].reason, StockChangeReason::Sale);
    assert_eq!(audit[0].order_id, OrderId::new("O1"));

    let record = store.order(&OrderId::new("O1")).unwrap();
    assert_eq!(record.status, OrderStatus::Reconciled);
    assert!(record.reconciled_at.is_some());
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O2"));
    store.seed_stock(&key("P2"), 1);

    let report = finalized(
        engine
            .reconcile(&order("O2", vec![item("P2", 10)]))
            .await
            .unwrap(),
    );

    assert_eq!(report.status, OrderStatus::Failed);
    assert_eq!(
        report.items[0].outcome,
        ItemOutcome::InsufficientStock {
            requested: 10,
            available: 1
        }
    );
    assert_eq!(store.stock_of(&key("P2")), Some(1));
    assert_eq!(store.sales_of(&ProductId::new("P2")), 0);
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn partial_progress_commits_independent_items() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O3"));
    store.seed_stock(&key("A"), 5);
    store.seed_stock(&key("B"), 1);

    let report = finalized(
        engine
            .reconcile(&order("O3", vec![item("A", 2), item("B", 10)]))
            .await
            .unwrap(),
    );

    assert_eq!(report.status, OrderStatus::PartiallyFailed);
    assert_eq!(store.stock_of(&key("A")), Some(3));
    assert_eq!(store.stock_of(&key("B")), Some(1));
    assert_eq!(store.sales_of(&ProductId::new("A")), 2);
    assert_eq!(store.sales_of(&ProductId::new("B")), 0);
    assert_eq!(store.audit_entries().len(), 1);
}

#[tokio::test]
async fn missing_record_is_a_per_item_failure_not_an_abort() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O4"));
    store.seed_stock(&key("A"), 5);

    let report = finalized(
        engine
            .reconcile(&order("O4", vec![item("ghost", 1), item("A", 1)]))
            .await
            .unwrap(),
    );

    assert_eq!(report.status, OrderStatus::PartiallyFailed);
    assert_eq!(report.items[0].outcome, ItemOutcome::RecordNotFound);
    assert!(report.items[1].outcome.is_applied());
    assert_eq!(store.stock_of(&key("A")), Some(4));
}

#[tokio::test]
async fn empty_order_is_finalized_as_failed() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O5"));

    let report = finalized(engine.reconcile(&order("O5", vec![])).await.unwrap());

    assert_eq!(report.status, OrderStatus::Failed);
    assert_eq!(report.malformed, Some(MalformedOrder::NoItems));
    assert!(store.audit_entries().is_empty());
    assert!(store.order(&OrderId::new("O5")).unwrap().status.is_terminal());
}

#[tokio::test]
async fn zero_quantity_item_rejects_the_whole_order() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O6"));
    store.seed_stock(&key("P1"), 5);

    let report = finalized(
        engine
            .reconcile(&order("O6", vec![item("P1", 0), item("P1", 1)]))
            .await
            .unwrap(),
    );

    assert_eq!(report.status, OrderStatus::Failed);
    assert_eq!(report.malformed, Some(MalformedOrder::ZeroQuantity { index: 0 }));
    // Nothing was applied, not even the well-formed item.
    assert_eq!(store.stock_of(&key("P1")), Some(5));
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn reinvocation_of_a_finalized_order_is_a_noop() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O1"));
    store.seed_stock(&key("P1"), 5);
    let trigger = order("O1", vec![item("P1", 2)]);

    let first = engine.reconcile(&trigger).await.unwrap();
    assert!(matches!(first, Reconciliation::Finalized(_)));

    let second = engine.reconcile(&trigger).await.unwrap();
    assert_eq!(
        second,
        Reconciliation::AlreadyFinalized(OrderStatus::Reconciled)
    );
    assert_eq!(store.stock_of(&key("P1")), Some(3));
    assert_eq!(store.audit_entries().len(), 1);
    assert_eq!(store.sales_of(&ProductId::new("P1")), 2);
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_decrement_once() {
    let store = Arc::new(MemoryStore::new());
    store.insert_order(OrderId::new("O1"));
    store.seed_stock(&key("P1"), 5);
    let trigger = order("O1", vec![item("P1", 2)]);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = ReconciliationEngine::new(store.clone());
        let trigger = trigger.clone();
        handles.push(tokio::spawn(
            async move { engine.reconcile(&trigger).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.stock_of(&key("P1")), Some(3));
    assert_eq!(store.audit_entries().len(), 1);
    assert_eq!(store.sales_of(&ProductId::new("P1")), 2);
    assert_eq!(
        store.order(&OrderId::new("O1")).unwrap().status,
        OrderStatus::Reconciled
    );
}

#[tokio::test]
async fn concurrent_orders_never_oversell() {
    let store = Arc::new(MemoryStore::new());
    store.seed_stock(&key("P1"), 10);

    let mut handles = Vec::new();
    for n in 0..8 {
        let order_id = format!("O{n}");
        store.insert_order(OrderId::new(order_id.clone()));
        let engine = ReconciliationEngine::new(store.clone());
        handles.push(tokio::spawn(async move {
            engine.reconcile(&order(&order_id, vec![item("P1", 3)])).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        let report = finalized(handle.await.unwrap().unwrap());
        if report.status == OrderStatus::Reconciled {
            applied += 1;
        } else {
            assert_eq!(report.status, OrderStatus::Failed);
        }
    }

    // 10 units serve exactly three orders of three; the fourth sees 1 left.
    assert_eq!(applied, 3);
    assert_eq!(store.stock_of(&key("P1")), Some(1));
    assert_eq!(store.sales_of(&ProductId::new("P1")), 9);

    let audit = store.audit_entries();
    assert_eq!(audit.len(), 3);
    let decremented: i64 = audit.iter().map(|entry| -entry.quantity_delta).sum();
    assert_eq!(decremented, 9);
}

#[tokio::test]
async fn transient_store_error_propagates_and_retry_succeeds() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O1"));
    store.seed_stock(&key("P1"), 5);
    let trigger = order("O1", vec![item("P1", 2)]);

    store.set_unavailable(true);
    let err = engine.reconcile(&trigger).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Store(StoreError::Unavailable(_))
    ));
    assert!(store.audit_entries().is_empty());

    // Redelivery after the store recovers completes normally.
    store.set_unavailable(false);
    let report = finalized(engine.reconcile(&trigger).await.unwrap());
    assert_eq!(report.status, OrderStatus::Reconciled);
    assert_eq!(store.stock_of(&key("P1")), Some(3));
}

#[tokio::test]
async fn variants_are_distinct_records_sharing_one_sales_counter() {
    let (store, engine) = setup();
    store.insert_order(OrderId::new("O1"));
    store.seed_stock(&variant_key("P1", "small"), 5);
    store.seed_stock(&variant_key("P1", "large"), 5);

    let report = finalized(
        engine
            .reconcile(&order(
                "O1",
                vec![
                    variant_item("P1", "small", 1),
                    variant_item("P1", "large", 2),
                ],
            ))
            .await
            .unwrap(),
    );

    assert_eq!(report.status, OrderStatus::Reconciled);
    assert_eq!(store.stock_of(&variant_key("P1", "small")), Some(4));
    assert_eq!(store.stock_of(&variant_key("P1", "large")), Some(3));
    assert_eq!(store.sales_of(&ProductId::new("P1")), 3);
    assert_eq!(store.audit_entries().len(), 2);
}

#[tokio::test]
async fn order_missing_from_store_is_an_invocation_error() {
    let (_store, engine) = setup();

    let err = engine
        .reconcile(&order("unknown", vec![item("P1", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::OrderNotFound(_)));
}
