use {
    super::error::GatewayError,
    super::money::{Money, MoneyAmount},
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Authoritative transaction state as reported by the processor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Success,
    Pending,
    Failed,
    Cancelled,
    Unknown,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Wire statuses we have not seen before map to Unknown rather than
    /// failing the whole reconciliation.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "SUCCESS" => Self::Success,
            "PENDING" => Self::Pending,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of `createPaymentRequest`. `payment_url` being absent is an
/// initiation failure — the attempt is aborted, not retried.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    pub processor_id: String,
    pub status: RemoteStatus,
    pub payment_url: Option<String>,
    pub raw: serde_json::Value,
}

/// Authoritative snapshot from the `transaction` status query.
#[derive(Debug, Clone)]
pub struct RemoteTransaction {
    pub transaction_id: String,
    pub status: RemoteStatus,
    pub money: Money,
    pub reference_id: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub success: bool,
    pub refund_id: Option<String>,
    pub amount: Option<MoneyAmount>,
    pub message: Option<String>,
    pub raw: serde_json::Value,
}

/// Wallet debit/credit acknowledgement.
#[derive(Debug, Clone)]
pub struct WalletReceipt {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub balance_after: Option<MoneyAmount>,
    pub message: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct WalletBalance {
    pub balance: MoneyAmount,
    pub available: MoneyAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletActivity {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

/// Stateless client seam for the remote processor. Every call is one
/// authenticated request/response unit; no retries at this layer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_request(
        &self,
        order_id: i64,
        amount: Money,
        user_id: i64,
        description: &str,
    ) -> Result<CreatedPayment, GatewayError>;

    async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<RemoteTransaction, GatewayError>;

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<MoneyAmount>,
        reason: &str,
    ) -> Result<RefundOutcome, GatewayError>;

    async fn wallet_debit(
        &self,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError>;

    async fn wallet_credit(
        &self,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError>;

    async fn user_balance(&self, user_id: i64) -> Result<WalletBalance, GatewayError>;

    async fn transaction_history(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletActivity>, GatewayError>;

    /// Lightweight identity probe used by the admin "test connection"
    /// action. Returns false on any failure instead of propagating.
    async fn validate_credentials(&self) -> bool;
}
