use {
    super::error::GatewayError,
    super::money::Money,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lifecycle: pending → {success | failed | cancelled} → [refunded].
    pub fn can_transition_to(&self, next: &TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Success)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
                | (TransactionStatus::Pending, TransactionStatus::Cancelled)
                | (TransactionStatus::Success, TransactionStatus::Refunded)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(GatewayError::MalformedRequest(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Payment,
    Refund,
    WalletDeduct,
    WalletAdd,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::WalletDeduct => "wallet_deduct",
            Self::WalletAdd => "wallet_add",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "payment" => Ok(Self::Payment),
            "refund" => Ok(Self::Refund),
            "wallet_deduct" => Ok(Self::WalletDeduct),
            "wallet_add" => Ok(Self::WalletAdd),
            other => Err(GatewayError::MalformedRequest(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

/// One audit row per payment attempt, keyed by the processor transaction id.
/// Rows are upserted as authoritative status arrives, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub order_id: i64,
    pub user_id: i64,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub money: Money,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub request_data: serde_json::Value,
    pub response_data: serde_json::Value,
    pub payment_url: Option<String>,
    pub webhook_signature: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For upsert — id generated in Rust via `Uuid::now_v7()`. `transaction_id`
/// is None only at initiation time, before the processor has assigned one;
/// the upsert then falls back to (order_id, pending) as the key.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub order_id: i64,
    pub user_id: i64,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub money: Money,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub request_data: serde_json::Value,
    pub response_data: serde_json::Value,
    pub payment_url: Option<String>,
    pub webhook_signature: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(
        order_id: i64,
        user_id: i64,
        money: Money,
        status: TransactionStatus,
        kind: TransactionKind,
    ) -> Self {
        let completed_at = status.is_terminal().then(Utc::now);
        Self {
            id: Uuid::now_v7(),
            order_id,
            user_id,
            transaction_id: None,
            reference_id: None,
            money,
            status,
            kind,
            description: None,
            request_data: serde_json::Value::Null,
            response_data: serde_json::Value::Null,
            payment_url: None,
            webhook_signature: None,
            completed_at,
        }
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_reference_id(mut self, id: impl Into<String>) -> Self {
        self.reference_id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_request(mut self, snapshot: serde_json::Value) -> Self {
        self.request_data = snapshot;
        self
    }

    pub fn with_response(mut self, snapshot: serde_json::Value) -> Self {
        self.response_data = snapshot;
        self
    }

    pub fn with_payment_url(mut self, url: impl Into<String>) -> Self {
        self.payment_url = Some(url.into());
        self
    }

    pub fn with_webhook_signature(mut self, signature: impl Into<String>) -> Self {
        self.webhook_signature = Some(signature.into());
        self
    }
}
