use {
    super::error::GatewayError,
    super::ledger::NewLedgerEntry,
    super::order::{Order, OrderStatus},
    super::settings::GatewaySettings,
    super::transaction::{NewTransaction, TransactionRecord},
    async_trait::async_trait,
};

/// Host-platform order persistence. The conditional mutations return whether
/// the transition actually happened, which is what makes re-delivered events
/// converge without duplicate side effects.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find(&self, order_id: i64) -> Result<Option<Order>, GatewayError>;

    /// Resolves by stored reference id first, then by order id equality —
    /// processors echo back either value.
    async fn find_by_reference_or_id(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, GatewayError>;

    async fn set_reference(&self, order_id: i64, reference_id: &str)
    -> Result<(), GatewayError>;

    /// Paid transition guarded by current status: returns true iff the row
    /// moved to paid in this call. An already-paid order is a no-op false.
    async fn mark_paid(
        &self,
        order_id: i64,
        payment_data: &serde_json::Value,
    ) -> Result<bool, GatewayError>;

    /// Failure applies only while the order is unpaid; paid and refunded
    /// rows are never downgraded. Returns true iff changed.
    async fn mark_failed(&self, order_id: i64) -> Result<bool, GatewayError>;

    /// Marks refunded unless already refunded. Returns the status the order
    /// had before the call, or None when it was already refunded (no-op).
    async fn mark_refunded(&self, order_id: i64) -> Result<Option<OrderStatus>, GatewayError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: &NewLedgerEntry) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait TransactionLogStore: Send + Sync {
    /// Upsert keyed by transaction id; falls back to (order_id, pending)
    /// when the processor has not assigned one yet.
    async fn upsert(&self, entry: &NewTransaction) -> Result<(), GatewayError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, GatewayError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Option<GatewaySettings>, GatewayError>;

    /// Explicit startup step replacing the lazily-materialized singleton:
    /// creates the disabled-sandbox row when none exists.
    async fn ensure_defaults(&self) -> Result<GatewaySettings, GatewayError>;

    async fn save(&self, settings: &GatewaySettings) -> Result<(), GatewayError>;

    async fn mark_tested(&self, valid: bool) -> Result<(), GatewayError>;
}
