#![allow(dead_code)]

use {
    async_trait::async_trait,
    chrono::Utc,
    healthpay_gateway::domain::{
        error::GatewayError,
        gateway::{
            CreatedPayment, PaymentGateway, RefundOutcome, RemoteStatus, RemoteTransaction,
            WalletActivity, WalletBalance, WalletReceipt,
        },
        ledger::NewLedgerEntry,
        money::{Money, MoneyAmount},
        order::{Order, OrderStatus},
        settings::GatewaySettings,
        stores::{LedgerStore, OrderStore, SettingsStore, TransactionLogStore},
        transaction::{NewTransaction, TransactionRecord},
    },
    std::collections::HashMap,
    std::sync::{Arc, Mutex},
};

pub fn order(id: i64, user_id: i64, piastres: i64, status: OrderStatus) -> Order {
    Order {
        id,
        user_id,
        amount: MoneyAmount::new(piastres).unwrap(),
        status,
        reference_id: None,
        payment_data: None,
    }
}

// ── in-memory stores ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemOrders {
    inner: Mutex<HashMap<i64, Order>>,
}

impl MemOrders {
    pub fn with_order(order: Order) -> Arc<Self> {
        let store = Self::default();
        store.inner.lock().unwrap().insert(order.id, order);
        Arc::new(store)
    }

    pub fn insert(&self, order: Order) {
        self.inner.lock().unwrap().insert(order.id, order);
    }

    pub fn get(&self, id: i64) -> Option<Order> {
        self.inner.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl OrderStore for MemOrders {
    async fn find(&self, order_id: i64) -> Result<Option<Order>, GatewayError> {
        Ok(self.get(order_id))
    }

    async fn find_by_reference_or_id(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, GatewayError> {
        let map = self.inner.lock().unwrap();
        if let Some(order) = map
            .values()
            .find(|o| o.reference_id.as_deref() == Some(reference))
        {
            return Ok(Some(order.clone()));
        }
        Ok(reference
            .parse::<i64>()
            .ok()
            .and_then(|id| map.get(&id).cloned()))
    }

    async fn set_reference(
        &self,
        order_id: i64,
        reference_id: &str,
    ) -> Result<(), GatewayError> {
        if let Some(order) = self.inner.lock().unwrap().get_mut(&order_id) {
            order.reference_id = Some(reference_id.to_string());
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        order_id: i64,
        payment_data: &serde_json::Value,
    ) -> Result<bool, GatewayError> {
        let mut map = self.inner.lock().unwrap();
        let Some(order) = map.get_mut(&order_id) else {
            return Ok(false);
        };
        if !order.status.can_transition_to(&OrderStatus::Paid) {
            return Ok(false);
        }
        order.status = OrderStatus::Paid;
        order.payment_data = Some(payment_data.clone());
        Ok(true)
    }

    async fn mark_failed(&self, order_id: i64) -> Result<bool, GatewayError> {
        let mut map = self.inner.lock().unwrap();
        let Some(order) = map.get_mut(&order_id) else {
            return Ok(false);
        };
        if order.status != OrderStatus::Unpaid {
            return Ok(false);
        }
        order.status = OrderStatus::Failed;
        Ok(true)
    }

    async fn mark_refunded(&self, order_id: i64) -> Result<Option<OrderStatus>, GatewayError> {
        let mut map = self.inner.lock().unwrap();
        let Some(order) = map.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.status == OrderStatus::Refunded {
            return Ok(None);
        }
        let prior = order.status;
        order.status = OrderStatus::Refunded;
        Ok(Some(prior))
    }
}

#[derive(Default)]
pub struct MemLedger {
    entries: Mutex<Vec<NewLedgerEntry>>,
}

impl MemLedger {
    pub fn entries(&self) -> Vec<NewLedgerEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerStore for MemLedger {
    async fn append(&self, entry: &NewLedgerEntry) -> Result<(), GatewayError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemTransactions {
    rows: Mutex<Vec<NewTransaction>>,
}

impl MemTransactions {
    pub fn rows(&self) -> Vec<NewTransaction> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionLogStore for MemTransactions {
    async fn upsert(&self, entry: &NewTransaction) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.iter_mut().find(|row| {
            entry.transaction_id.is_some() && row.transaction_id == entry.transaction_id
        });
        match existing {
            Some(row) => {
                row.status = entry.status;
                row.response_data = entry.response_data.clone();
                if row.webhook_signature.is_none() {
                    row.webhook_signature = entry.webhook_signature.clone();
                }
                if row.completed_at.is_none() {
                    row.completed_at = entry.completed_at;
                }
            }
            None => rows.push(entry.clone()),
        }
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, GatewayError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|row| row.transaction_id.as_deref() == Some(transaction_id))
            .map(|row| TransactionRecord {
                id: row.id,
                order_id: row.order_id,
                user_id: row.user_id,
                transaction_id: row.transaction_id.clone(),
                reference_id: row.reference_id.clone(),
                money: row.money.clone(),
                status: row.status,
                kind: row.kind,
                description: row.description.clone(),
                request_data: row.request_data.clone(),
                response_data: row.response_data.clone(),
                payment_url: row.payment_url.clone(),
                webhook_signature: row.webhook_signature.clone(),
                completed_at: row.completed_at,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
    }
}

#[derive(Default)]
pub struct MemSettings {
    inner: Mutex<Option<GatewaySettings>>,
}

impl MemSettings {
    pub fn with_settings(settings: GatewaySettings) -> Arc<Self> {
        let store = Self::default();
        *store.inner.lock().unwrap() = Some(settings);
        Arc::new(store)
    }
}

#[async_trait]
impl SettingsStore for MemSettings {
    async fn load(&self) -> Result<Option<GatewaySettings>, GatewayError> {
        Ok(self.inner.lock().unwrap().clone())
    }

    async fn ensure_defaults(&self) -> Result<GatewaySettings, GatewayError> {
        let mut slot = self.inner.lock().unwrap();
        let settings = slot
            .get_or_insert_with(GatewaySettings::disabled_sandbox)
            .clone();
        Ok(settings)
    }

    async fn save(&self, settings: &GatewaySettings) -> Result<(), GatewayError> {
        *self.inner.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    async fn mark_tested(&self, valid: bool) -> Result<(), GatewayError> {
        if let Some(settings) = self.inner.lock().unwrap().as_mut() {
            settings.last_tested_at = Some(Utc::now());
            settings.credentials_valid = valid;
        }
        Ok(())
    }
}

// ── scripted processor ──────────────────────────────────────────────────────

/// Stand-in for the remote processor. Payment creation returns `hp_<order>`
/// as the processor id; transaction statuses are scripted per id.
pub struct MockGateway {
    payment_url: Option<String>,
    statuses: Mutex<HashMap<String, RemoteStatus>>,
    pub status_calls: Mutex<usize>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            payment_url: Some("https://portal.beta.healthpay.tech/pay/hp".into()),
            statuses: Mutex::default(),
            status_calls: Mutex::new(0),
        }
    }
}

impl MockGateway {
    pub fn without_payment_url() -> Self {
        Self {
            payment_url: None,
            ..Self::default()
        }
    }

    pub fn set_status(&self, transaction_id: &str, status: RemoteStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_request(
        &self,
        order_id: i64,
        _amount: Money,
        _user_id: i64,
        _description: &str,
    ) -> Result<CreatedPayment, GatewayError> {
        let processor_id = format!("hp_{order_id}");
        Ok(CreatedPayment {
            processor_id: processor_id.clone(),
            status: RemoteStatus::Pending,
            payment_url: self.payment_url.clone(),
            raw: serde_json::json!({ "id": processor_id, "status": "PENDING" }),
        })
    }

    async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<RemoteTransaction, GatewayError> {
        *self.status_calls.lock().unwrap() += 1;
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(transaction_id)
            .copied()
            .unwrap_or(RemoteStatus::Unknown);
        Ok(RemoteTransaction {
            transaction_id: transaction_id.to_string(),
            status,
            money: Money::egp(MoneyAmount::new(10_000).unwrap()),
            reference_id: None,
            raw: serde_json::json!({ "id": transaction_id, "status": status.as_str() }),
        })
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<MoneyAmount>,
        _reason: &str,
    ) -> Result<RefundOutcome, GatewayError> {
        Ok(RefundOutcome {
            success: true,
            refund_id: Some(format!("rf_{transaction_id}")),
            amount,
            message: None,
            raw: serde_json::Value::Null,
        })
    }

    async fn wallet_debit(
        &self,
        _user_id: i64,
        amount: MoneyAmount,
        _order_id: i64,
        _description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        Ok(WalletReceipt {
            success: true,
            transaction_id: Some("wt_debit".into()),
            balance_after: Some(amount),
            message: None,
            raw: serde_json::Value::Null,
        })
    }

    async fn wallet_credit(
        &self,
        _user_id: i64,
        amount: MoneyAmount,
        _order_id: i64,
        _description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        Ok(WalletReceipt {
            success: true,
            transaction_id: Some("wt_credit".into()),
            balance_after: Some(amount),
            message: None,
            raw: serde_json::Value::Null,
        })
    }

    async fn user_balance(&self, _user_id: i64) -> Result<WalletBalance, GatewayError> {
        let zero = MoneyAmount::new(0).expect("zero is valid");
        Ok(WalletBalance {
            balance: zero,
            available: zero,
        })
    }

    async fn transaction_history(
        &self,
        _user_id: i64,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<WalletActivity>, GatewayError> {
        Ok(Vec::new())
    }

    async fn validate_credentials(&self) -> bool {
        true
    }
}
