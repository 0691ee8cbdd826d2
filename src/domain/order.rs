use {
    super::error::GatewayError,
    super::money::MoneyAmount,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// `paid` is terminal for success re-delivery; `refunded` is final.
    /// A failed order may still be paid on a later attempt.
    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Unpaid, OrderStatus::Paid)
                | (OrderStatus::Unpaid, OrderStatus::Failed)
                | (OrderStatus::Failed, OrderStatus::Paid)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(GatewayError::MalformedRequest(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Order row as owned by the host platform. The engine only ever mutates
/// status, reference_id and payment_data.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub amount: MoneyAmount,
    pub status: OrderStatus,
    pub reference_id: Option<String>,
    pub payment_data: Option<serde_json::Value>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// Optional capability the host platform may install to run order-specific
/// side effects (enrolment, notifications) after a payment succeeds. Invoked
/// at most once per order, after the paid transition and the ledger write.
#[async_trait]
pub trait PostPaymentHook: Send + Sync {
    async fn handle_successful_payment(&self, order: &Order);
}
