use {
    crate::domain::error::GatewayError,
    crate::domain::event::{WebhookEventKind, WebhookNotice},
    crate::domain::gateway::{PaymentGateway, RemoteStatus, RemoteTransaction},
    crate::domain::id::{ReferenceId, TransactionId},
    crate::domain::ledger::NewLedgerEntry,
    crate::domain::money::Money,
    crate::domain::order::{Order, OrderStatus, PostPaymentHook},
    crate::domain::stores::{LedgerStore, OrderStore, TransactionLogStore},
    crate::domain::transaction::{NewTransaction, TransactionKind, TransactionStatus},
    std::collections::HashMap,
    std::sync::{Arc, Mutex},
};

/// Outcome of a payment initiation.
#[derive(Debug, Clone)]
pub enum InitiateOutcome {
    /// Attempt created; send the user to the processor's payment page.
    Redirect { order_id: i64, payment_url: String },
    /// Order was already paid — nothing to initiate.
    AlreadyPaid(i64),
}

/// Outcome of reconciling one inbound event against an order. Duplicate
/// deliveries of the same real-world outcome converge on `AlreadyPaid` /
/// `Ignored` rather than repeating side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Order transitioned to paid; one income ledger entry written.
    Completed(i64),
    /// Success re-delivery for an order that is already paid. No-op.
    AlreadyPaid(i64),
    /// Order transitioned to failed.
    Failed(i64),
    /// Order transitioned to refunded. `ledgered` is true only for the
    /// paid→refunded transition that wrote the expense entry.
    Refunded { order_id: i64, ledgered: bool },
    /// Event carried no applicable transition (e.g. a failure notice for an
    /// order that already settled). Acknowledged, state untouched.
    Ignored(i64),
}

/// Per-reference mutual exclusion for the status-check-and-apply sequence.
/// Serializes concurrent handlers in this process; the conditional store
/// writes remain the guard across processes.
#[derive(Default)]
struct LockMap {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    fn entry(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("lock map poisoned");
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Evict the entry once no task holds a clone any more, so the map does
    /// not grow with every reference ever reconciled. A strong count above
    /// one means another task still owns the mutex and the entry must stay.
    fn release(&self, key: &str) {
        let mut map = self.inner.lock().expect("lock map poisoned");
        if let Some(lock) = map.get(key)
            && Arc::strong_count(lock) == 1
        {
            map.remove(key);
        }
    }
}

/// The reconciliation core: converges browser returns, server callbacks and
/// signed webhooks about one payment into a final order state, with exactly
/// one ledger entry per real money movement.
pub struct ReconciliationEngine {
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn LedgerStore>,
    transactions: Arc<dyn TransactionLogStore>,
    hook: Option<Arc<dyn PostPaymentHook>>,
    locks: LockMap,
}

impl ReconciliationEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn LedgerStore>,
        transactions: Arc<dyn TransactionLogStore>,
    ) -> Self {
        Self {
            orders,
            ledger,
            transactions,
            hook: None,
            locks: LockMap::default(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostPaymentHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Create a payment attempt for an order that is not already paid.
    /// The order is left untouched unless the processor returned a usable
    /// payment URL.
    pub async fn initiate_payment(
        &self,
        gateway: &dyn PaymentGateway,
        order_id: i64,
    ) -> Result<InitiateOutcome, GatewayError> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| GatewayError::OrderNotFound(format!("order {order_id}")))?;

        if order.is_paid() {
            tracing::info!(order_id, "initiation skipped, order already paid");
            return Ok(InitiateOutcome::AlreadyPaid(order_id));
        }

        let money = Money::egp(order.amount);
        let description = format!("Payment for order #{order_id}");
        let created = gateway
            .create_payment_request(order.id, money.clone(), order.user_id, &description)
            .await?;

        let payment_url = created
            .payment_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Initiation("payment URL not received from processor".into())
            })?;

        self.orders
            .set_reference(order.id, &created.processor_id)
            .await?;

        let entry = NewTransaction::new(
            order.id,
            order.user_id,
            money,
            TransactionStatus::Pending,
            TransactionKind::Payment,
        )
        .with_transaction_id(&created.processor_id)
        .with_reference_id(&created.processor_id)
        .with_description(description)
        .with_request(serde_json::json!({
            "orderId": order.id,
            "userId": order.user_id,
            "amount": order.amount.to_major_units(),
        }))
        .with_response(created.raw.clone())
        .with_payment_url(&payment_url);
        self.log_transaction(entry).await;

        tracing::info!(order_id, processor_id = %created.processor_id, "payment initiated");
        Ok(InitiateOutcome::Redirect {
            order_id,
            payment_url,
        })
    }

    /// Shared reconcile for the return and callback channels. Client-supplied
    /// status is never trusted: the authoritative state comes from an active
    /// status query against the processor.
    pub async fn reconcile_inbound(
        &self,
        gateway: &dyn PaymentGateway,
        transaction_id: &TransactionId,
        reference_id: &ReferenceId,
        channel: &'static str,
    ) -> Result<ReconcileOutcome, GatewayError> {
        let lock = self.locks.entry(reference_id.as_str());
        let result = async {
            let _guard = lock.lock().await;
            let remote = gateway.transaction_status(transaction_id.as_str()).await?;
            let order = self.resolve_order(reference_id.as_str()).await?;
            self.apply_remote(order, &remote, channel).await
        }
        .await;
        drop(lock);
        self.locks.release(reference_id.as_str());
        result
    }

    /// Reconcile a signature-verified webhook push. The signed payload is
    /// authoritative, so no status query is made.
    pub async fn reconcile_webhook(
        &self,
        notice: &WebhookNotice,
    ) -> Result<ReconcileOutcome, GatewayError> {
        let lock = self.locks.entry(notice.reference_id.as_str());
        let result = async {
            let _guard = lock.lock().await;
            let order = self.resolve_order(notice.reference_id.as_str()).await?;

            match notice.kind {
                WebhookEventKind::PaymentSuccess => {
                    self.apply_success(
                        order,
                        notice.transaction_id.as_deref(),
                        notice.raw.clone(),
                        Some(&notice.signature),
                        "webhook",
                    )
                    .await
                }
                WebhookEventKind::PaymentFailed => {
                    self.apply_failure(
                        order,
                        notice.transaction_id.as_deref(),
                        TransactionStatus::Failed,
                        notice.raw.clone(),
                        Some(&notice.signature),
                    )
                    .await
                }
                WebhookEventKind::RefundCompleted => {
                    self.apply_refund(
                        order,
                        notice.transaction_id.as_deref(),
                        notice.raw.clone(),
                        Some(&notice.signature),
                    )
                    .await
                }
            }
        }
        .await;
        drop(lock);
        self.locks.release(notice.reference_id.as_str());
        result
    }

    async fn resolve_order(&self, reference: &str) -> Result<Order, GatewayError> {
        self.orders
            .find_by_reference_or_id(reference)
            .await?
            .ok_or_else(|| GatewayError::OrderNotFound(format!("reference {reference}")))
    }

    async fn apply_remote(
        &self,
        order: Order,
        remote: &RemoteTransaction,
        channel: &'static str,
    ) -> Result<ReconcileOutcome, GatewayError> {
        match remote.status {
            RemoteStatus::Success => {
                self.apply_success(
                    order,
                    Some(&remote.transaction_id),
                    remote.raw.clone(),
                    None,
                    channel,
                )
                .await
            }
            RemoteStatus::Cancelled => {
                self.apply_failure(
                    order,
                    Some(&remote.transaction_id),
                    TransactionStatus::Cancelled,
                    remote.raw.clone(),
                    None,
                )
                .await
            }
            RemoteStatus::Pending | RemoteStatus::Failed | RemoteStatus::Unknown => {
                self.apply_failure(
                    order,
                    Some(&remote.transaction_id),
                    TransactionStatus::Failed,
                    remote.raw.clone(),
                    None,
                )
                .await
            }
        }
    }

    async fn apply_success(
        &self,
        order: Order,
        transaction_id: Option<&str>,
        snapshot: serde_json::Value,
        signature: Option<&str>,
        channel: &'static str,
    ) -> Result<ReconcileOutcome, GatewayError> {
        if order.status == OrderStatus::Refunded {
            tracing::warn!(order_id = order.id, "success event for refunded order, ignoring");
            return Ok(ReconcileOutcome::Ignored(order.id));
        }

        let transitioned = self.orders.mark_paid(order.id, &snapshot).await?;
        if !transitioned {
            tracing::info!(order_id = order.id, channel, "duplicate success delivery, already paid");
            return Ok(ReconcileOutcome::AlreadyPaid(order.id));
        }

        // Ledger write is tied to the conditional transition above, so a
        // re-delivered success can never produce a second income row.
        let description = match channel {
            "webhook" => format!("Payment for order #{} via HealthPay (webhook)", order.id),
            _ => format!("Payment for order #{} via HealthPay", order.id),
        };
        self.ledger
            .append(&NewLedgerEntry::income(
                order.user_id,
                order.amount.piastres(),
                order.id,
                description,
            ))
            .await?;

        let mut entry = NewTransaction::new(
            order.id,
            order.user_id,
            Money::egp(order.amount),
            TransactionStatus::Success,
            TransactionKind::Payment,
        )
        .with_response(snapshot);
        if let Some(id) = transaction_id {
            entry = entry.with_transaction_id(id);
        }
        if let Some(reference) = order.reference_id.as_deref() {
            entry = entry.with_reference_id(reference);
        }
        if let Some(sig) = signature {
            entry = entry.with_webhook_signature(sig);
        }
        self.log_transaction(entry).await;

        if let Some(hook) = &self.hook {
            hook.handle_successful_payment(&order).await;
        }

        tracing::info!(order_id = order.id, channel, "payment success reconciled");
        Ok(ReconcileOutcome::Completed(order.id))
    }

    async fn apply_failure(
        &self,
        order: Order,
        transaction_id: Option<&str>,
        status: TransactionStatus,
        snapshot: serde_json::Value,
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, GatewayError> {
        let changed = self.orders.mark_failed(order.id).await?;
        if !changed {
            tracing::info!(
                order_id = order.id,
                status = %order.status,
                "failure event for settled order, ignoring"
            );
            return Ok(ReconcileOutcome::Ignored(order.id));
        }

        let mut entry = NewTransaction::new(
            order.id,
            order.user_id,
            Money::egp(order.amount),
            status,
            TransactionKind::Payment,
        )
        .with_response(snapshot);
        if let Some(id) = transaction_id {
            entry = entry.with_transaction_id(id);
        }
        if let Some(reference) = order.reference_id.as_deref() {
            entry = entry.with_reference_id(reference);
        }
        if let Some(sig) = signature {
            entry = entry.with_webhook_signature(sig);
        }
        self.log_transaction(entry).await;

        tracing::info!(order_id = order.id, "payment failure reconciled");
        Ok(ReconcileOutcome::Failed(order.id))
    }

    async fn apply_refund(
        &self,
        order: Order,
        transaction_id: Option<&str>,
        snapshot: serde_json::Value,
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, GatewayError> {
        let Some(prior) = self.orders.mark_refunded(order.id).await? else {
            tracing::info!(order_id = order.id, "duplicate refund delivery, already refunded");
            return Ok(ReconcileOutcome::Ignored(order.id));
        };

        // Expense entry only for the paid→refunded transition. The processor
        // can send a refund for an order we never saw paid; the order state
        // follows the processor, but double-refund bookkeeping must not.
        let ledgered = prior == OrderStatus::Paid;
        if ledgered {
            self.ledger
                .append(&NewLedgerEntry::expense(
                    order.user_id,
                    order.amount.piastres(),
                    order.id,
                    format!("Refund for order #{} via HealthPay", order.id),
                ))
                .await?;
        } else {
            tracing::warn!(
                order_id = order.id,
                prior_status = %prior,
                "refund for order not in paid state; marked refunded without ledger entry"
            );
        }

        let mut entry = NewTransaction::new(
            order.id,
            order.user_id,
            Money::egp(order.amount),
            TransactionStatus::Refunded,
            TransactionKind::Refund,
        )
        .with_response(snapshot);
        if let Some(id) = transaction_id {
            entry = entry.with_transaction_id(id);
        }
        if let Some(reference) = order.reference_id.as_deref() {
            entry = entry.with_reference_id(reference);
        }
        if let Some(sig) = signature {
            entry = entry.with_webhook_signature(sig);
        }
        self.log_transaction(entry).await;

        tracing::info!(order_id = order.id, ledgered, "refund reconciled");
        Ok(ReconcileOutcome::Refunded {
            order_id: order.id,
            ledgered,
        })
    }

    /// Audit logging never aborts the payment flow: order and ledger
    /// mutations take priority over the transaction log.
    async fn log_transaction(&self, entry: NewTransaction) {
        if let Err(e) = self.transactions.upsert(&entry).await {
            tracing::error!(
                order_id = entry.order_id,
                transaction_id = ?entry.transaction_id,
                error = %e,
                "failed to record transaction log entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::MoneyAmount;
    use crate::domain::transaction::TransactionRecord;
    use async_trait::async_trait;

    struct SingleOrder(Mutex<Order>);

    #[async_trait]
    impl OrderStore for SingleOrder {
        async fn find(&self, order_id: i64) -> Result<Option<Order>, GatewayError> {
            let order = self.0.lock().unwrap().clone();
            Ok((order.id == order_id).then_some(order))
        }

        async fn find_by_reference_or_id(
            &self,
            reference: &str,
        ) -> Result<Option<Order>, GatewayError> {
            let order = self.0.lock().unwrap().clone();
            Ok((order.reference_id.as_deref() == Some(reference)).then_some(order))
        }

        async fn set_reference(
            &self,
            _order_id: i64,
            reference_id: &str,
        ) -> Result<(), GatewayError> {
            self.0.lock().unwrap().reference_id = Some(reference_id.to_string());
            Ok(())
        }

        async fn mark_paid(
            &self,
            _order_id: i64,
            payment_data: &serde_json::Value,
        ) -> Result<bool, GatewayError> {
            let mut order = self.0.lock().unwrap();
            if !order.status.can_transition_to(&OrderStatus::Paid) {
                return Ok(false);
            }
            order.status = OrderStatus::Paid;
            order.payment_data = Some(payment_data.clone());
            Ok(true)
        }

        async fn mark_failed(&self, _order_id: i64) -> Result<bool, GatewayError> {
            let mut order = self.0.lock().unwrap();
            if order.status != OrderStatus::Unpaid {
                return Ok(false);
            }
            order.status = OrderStatus::Failed;
            Ok(true)
        }

        async fn mark_refunded(&self, _order_id: i64) -> Result<Option<OrderStatus>, GatewayError> {
            let mut order = self.0.lock().unwrap();
            if order.status == OrderStatus::Refunded {
                return Ok(None);
            }
            let prior = order.status;
            order.status = OrderStatus::Refunded;
            Ok(Some(prior))
        }
    }

    struct NullLedger;

    #[async_trait]
    impl LedgerStore for NullLedger {
        async fn append(&self, _entry: &NewLedgerEntry) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    struct NullLog;

    #[async_trait]
    impl TransactionLogStore for NullLog {
        async fn upsert(&self, _entry: &NewTransaction) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn find_by_transaction_id(
            &self,
            _transaction_id: &str,
        ) -> Result<Option<TransactionRecord>, GatewayError> {
            Ok(None)
        }
    }

    fn unpaid_order() -> Order {
        Order {
            id: 1,
            user_id: 1,
            amount: MoneyAmount::new(1_000).unwrap(),
            status: OrderStatus::Unpaid,
            reference_id: Some("hp_1".into()),
            payment_data: None,
        }
    }

    #[tokio::test]
    async fn lock_map_entries_are_evicted_after_use() {
        let engine = ReconciliationEngine::new(
            Arc::new(SingleOrder(Mutex::new(unpaid_order()))),
            Arc::new(NullLedger),
            Arc::new(NullLog),
        );

        let notice = WebhookNotice::parse(
            serde_json::json!({ "event": "payment.success", "referenceId": "hp_1" }),
            "sig".into(),
        )
        .unwrap()
        .unwrap();
        engine.reconcile_webhook(&notice).await.unwrap();

        assert!(engine.locks.inner.lock().unwrap().is_empty());
    }
}
