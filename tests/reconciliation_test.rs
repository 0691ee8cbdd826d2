mod common;

use {
    common::{MemLedger, MemOrders, MemTransactions, MockGateway, order},
    healthpay_gateway::domain::{
        error::GatewayError,
        event::WebhookNotice,
        gateway::RemoteStatus,
        id::{ReferenceId, TransactionId},
        ledger::LedgerKind,
        money::MoneyAmount,
        order::OrderStatus,
        stores::OrderStore,
        transaction::{TransactionKind, TransactionStatus},
    },
    healthpay_gateway::services::reconciliation::{
        InitiateOutcome, ReconcileOutcome, ReconciliationEngine,
    },
    healthpay_gateway::services::wallet::WalletService,
    std::sync::Arc,
};

fn engine(
    orders: Arc<MemOrders>,
    ledger: Arc<MemLedger>,
    transactions: Arc<MemTransactions>,
) -> ReconciliationEngine {
    ReconciliationEngine::new(orders, ledger, transactions)
}

fn success_notice(reference: &str, transaction_id: &str) -> WebhookNotice {
    WebhookNotice::parse(
        serde_json::json!({
            "event": "payment.success",
            "referenceId": reference,
            "transactionId": transaction_id,
        }),
        "sig".into(),
    )
    .unwrap()
    .unwrap()
}

fn refund_notice(reference: &str) -> WebhookNotice {
    WebhookNotice::parse(
        serde_json::json!({
            "event": "refund.completed",
            "referenceId": reference,
            "transactionId": "txn_refund",
        }),
        "sig".into(),
    )
    .unwrap()
    .unwrap()
}

#[tokio::test]
async fn full_payment_round_trip() {
    let orders = MemOrders::with_order(order(42, 7, 10_000, OrderStatus::Unpaid));
    let ledger = Arc::new(MemLedger::default());
    let transactions = Arc::new(MemTransactions::default());
    let engine = engine(orders.clone(), ledger.clone(), transactions.clone());
    let gateway = MockGateway::default();

    let outcome = engine.initiate_payment(&gateway, 42).await.unwrap();
    let InitiateOutcome::Redirect {
        order_id,
        payment_url,
    } = outcome
    else {
        panic!("expected redirect");
    };
    assert_eq!(order_id, 42);
    assert!(payment_url.starts_with("https://"));
    assert_eq!(orders.get(42).unwrap().reference_id.as_deref(), Some("hp_42"));

    // Processor reports success; the return leg reconciles against it.
    gateway.set_status("hp_42", RemoteStatus::Success);
    let outcome = engine
        .reconcile_inbound(
            &gateway,
            &TransactionId::new("hp_42").unwrap(),
            &ReferenceId::new("hp_42").unwrap(),
            "return",
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed(42));
    assert_eq!(orders.get(42).unwrap().status, OrderStatus::Paid);

    let entries = ledger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, LedgerKind::Income);
    assert_eq!(entries[0].amount, 10_000);
    assert_eq!(entries[0].user_id, 7);
    assert_eq!(entries[0].order_id, 42);
}

#[tokio::test]
async fn duplicate_success_webhook_writes_one_ledger_entry() {
    let orders = MemOrders::with_order(order(1, 5, 2_500, OrderStatus::Unpaid));
    orders.set_reference(1, "hp_1").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let notice = success_notice("hp_1", "txn_1");
    let first = engine.reconcile_webhook(&notice).await.unwrap();
    let second = engine.reconcile_webhook(&notice).await.unwrap();

    assert_eq!(first, ReconcileOutcome::Completed(1));
    assert_eq!(second, ReconcileOutcome::AlreadyPaid(1));
    assert_eq!(ledger.entries().len(), 1);
    assert_eq!(orders.get(1).unwrap().status, OrderStatus::Paid);
}

#[tokio::test]
async fn failure_never_downgrades_a_paid_order() {
    let orders = MemOrders::with_order(order(3, 5, 1_000, OrderStatus::Paid));
    orders.set_reference(3, "hp_3").await.unwrap();
    let engine = engine(
        orders.clone(),
        Arc::new(MemLedger::default()),
        Arc::new(MemTransactions::default()),
    );

    let notice = WebhookNotice::parse(
        serde_json::json!({ "event": "payment.failed", "referenceId": "hp_3" }),
        "sig".into(),
    )
    .unwrap()
    .unwrap();
    let outcome = engine.reconcile_webhook(&notice).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Ignored(3));
    assert_eq!(orders.get(3).unwrap().status, OrderStatus::Paid);
}

#[tokio::test]
async fn failed_order_can_still_be_paid_later() {
    let orders = MemOrders::with_order(order(4, 5, 1_000, OrderStatus::Failed));
    orders.set_reference(4, "hp_4").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let outcome = engine
        .reconcile_webhook(&success_notice("hp_4", "txn_4"))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Completed(4));
    assert_eq!(orders.get(4).unwrap().status, OrderStatus::Paid);
    assert_eq!(ledger.entries().len(), 1);
}

#[tokio::test]
async fn refund_of_paid_order_writes_expense_once() {
    let orders = MemOrders::with_order(order(9, 7, 10_000, OrderStatus::Paid));
    orders.set_reference(9, "hp_9").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let first = engine.reconcile_webhook(&refund_notice("hp_9")).await.unwrap();
    let second = engine.reconcile_webhook(&refund_notice("hp_9")).await.unwrap();

    assert_eq!(
        first,
        ReconcileOutcome::Refunded {
            order_id: 9,
            ledgered: true
        }
    );
    assert_eq!(second, ReconcileOutcome::Ignored(9));
    assert_eq!(orders.get(9).unwrap().status, OrderStatus::Refunded);

    let entries = ledger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, LedgerKind::Expense);
    assert_eq!(entries[0].amount, -10_000);
}

#[tokio::test]
async fn refund_of_unpaid_order_skips_the_ledger() {
    let orders = MemOrders::with_order(order(10, 7, 10_000, OrderStatus::Unpaid));
    orders.set_reference(10, "hp_10").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let outcome = engine.reconcile_webhook(&refund_notice("hp_10")).await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Refunded {
            order_id: 10,
            ledgered: false
        }
    );
    assert_eq!(orders.get(10).unwrap().status, OrderStatus::Refunded);
    assert!(ledger.entries().is_empty());
}

#[tokio::test]
async fn success_event_for_refunded_order_is_ignored() {
    let orders = MemOrders::with_order(order(11, 7, 10_000, OrderStatus::Refunded));
    orders.set_reference(11, "hp_11").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let outcome = engine
        .reconcile_webhook(&success_notice("hp_11", "txn_11"))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Ignored(11));
    assert_eq!(orders.get(11).unwrap().status, OrderStatus::Refunded);
    assert!(ledger.entries().is_empty());
}

#[tokio::test]
async fn cancelled_remote_status_fails_the_order() {
    let orders = MemOrders::with_order(order(12, 7, 5_000, OrderStatus::Unpaid));
    orders.set_reference(12, "hp_12").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));
    let gateway = MockGateway::default();
    gateway.set_status("hp_12", RemoteStatus::Cancelled);

    let outcome = engine
        .reconcile_inbound(
            &gateway,
            &TransactionId::new("hp_12").unwrap(),
            &ReferenceId::new("hp_12").unwrap(),
            "callback",
        )
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Failed(12));
    assert_eq!(orders.get(12).unwrap().status, OrderStatus::Failed);
    assert!(ledger.entries().is_empty());
}

#[tokio::test]
async fn initiation_without_payment_url_leaves_order_untouched() {
    let orders = MemOrders::with_order(order(20, 7, 5_000, OrderStatus::Unpaid));
    let engine = engine(
        orders.clone(),
        Arc::new(MemLedger::default()),
        Arc::new(MemTransactions::default()),
    );
    let gateway = MockGateway::without_payment_url();

    let err = engine.initiate_payment(&gateway, 20).await.unwrap_err();

    assert!(matches!(err, GatewayError::Initiation(_)));
    assert!(orders.get(20).unwrap().reference_id.is_none());
    assert_eq!(orders.get(20).unwrap().status, OrderStatus::Unpaid);
}

#[tokio::test]
async fn initiation_of_paid_order_is_a_noop() {
    let orders = MemOrders::with_order(order(21, 7, 5_000, OrderStatus::Paid));
    let engine = engine(
        orders.clone(),
        Arc::new(MemLedger::default()),
        Arc::new(MemTransactions::default()),
    );

    let outcome = engine
        .initiate_payment(&MockGateway::default(), 21)
        .await
        .unwrap();

    assert!(matches!(outcome, InitiateOutcome::AlreadyPaid(21)));
    assert!(orders.get(21).unwrap().reference_id.is_none());
}

#[tokio::test]
async fn unknown_order_reference_is_an_error() {
    let engine = engine(
        Arc::new(MemOrders::default()),
        Arc::new(MemLedger::default()),
        Arc::new(MemTransactions::default()),
    );
    let gateway = MockGateway::default();
    gateway.set_status("hp_x", RemoteStatus::Success);

    let err = engine
        .reconcile_inbound(
            &gateway,
            &TransactionId::new("hp_x").unwrap(),
            &ReferenceId::new("hp_x").unwrap(),
            "return",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::OrderNotFound(_)));
}

#[tokio::test]
async fn reference_match_wins_over_order_id_fallback() {
    // Order 8's processor reference is the digit string "9", colliding with
    // order 9's numeric id. A delivery carrying "9" must settle order 8.
    let orders = MemOrders::with_order(order(8, 7, 3_000, OrderStatus::Unpaid));
    orders.insert(order(9, 7, 4_000, OrderStatus::Unpaid));
    orders.set_reference(8, "9").await.unwrap();
    let ledger = Arc::new(MemLedger::default());
    let engine = engine(orders.clone(), ledger.clone(), Arc::new(MemTransactions::default()));

    let outcome = engine.reconcile_webhook(&success_notice("9", "txn_8")).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Completed(8));
    assert_eq!(orders.get(8).unwrap().status, OrderStatus::Paid);
    assert_eq!(orders.get(9).unwrap().status, OrderStatus::Unpaid);
    assert_eq!(ledger.entries().len(), 1);
    assert_eq!(ledger.entries()[0].amount, 3_000);
}

#[tokio::test]
async fn wallet_operations_land_in_the_transaction_log() {
    let transactions = Arc::new(MemTransactions::default());
    let wallet = WalletService::new(transactions.clone());
    let gateway = MockGateway::default();

    let amount = MoneyAmount::new(5_000).unwrap();
    let receipt = wallet
        .debit(&gateway, 7, amount, 42, "consultation fee")
        .await
        .unwrap();
    assert!(receipt.success);
    wallet
        .credit(&gateway, 7, amount, 42, "consultation fee reversal")
        .await
        .unwrap();

    let rows = transactions.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].kind, TransactionKind::WalletDeduct);
    assert_eq!(rows[1].kind, TransactionKind::WalletAdd);
    assert!(rows.iter().all(|r| r.status == TransactionStatus::Success));
}

#[test]
fn blank_ids_are_rejected_before_any_lookup() {
    assert!(TransactionId::new("").is_err());
    assert!(TransactionId::new("   ").is_err());
    assert!(ReferenceId::new("").is_err());
}
