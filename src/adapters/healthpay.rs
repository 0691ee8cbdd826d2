use {
    crate::domain::error::GatewayError,
    crate::domain::gateway::{
        CreatedPayment, PaymentGateway, RefundOutcome, RemoteStatus, RemoteTransaction,
        WalletActivity, WalletBalance, WalletReceipt,
    },
    crate::domain::money::{Money, MoneyAmount},
    crate::domain::settings::Mode,
    crate::services::credentials::ResolvedCredentials,
    async_trait::async_trait,
    serde::Deserialize,
    std::time::{Duration, Instant},
    tokio::sync::RwLock,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_TTL: Duration = Duration::from_secs(3600);

// ── GraphQL documents ───────────────────────────────────────────────────────
// Field names and shapes are the wire contract; they must match the live
// processor exactly.

const CREATE_PAYMENT_REQUEST: &str = r#"
mutation CreatePaymentRequest($input: PaymentRequestInput!) {
    createPaymentRequest(input: $input) {
        id
        status
        amount
        referenceId
        paymentUrl
        createdAt
    }
}"#;

const GET_TRANSACTION: &str = r#"
query GetTransaction($id: ID!) {
    transaction(id: $id) {
        id
        status
        amount
        currency
        referenceId
        userId
        createdAt
        updatedAt
    }
}"#;

const GET_USER_BALANCE: &str = r#"
query GetUserBalance($userId: ID!) {
    user(id: $userId) {
        id
        wallet {
            balance
            currency
            availableBalance
        }
    }
}"#;

const DEDUCT_FROM_WALLET: &str = r#"
mutation DeductFromWallet($input: WalletDeductInput!) {
    deductFromWallet(input: $input) {
        success
        transactionId
        remainingBalance
        message
    }
}"#;

const ADD_TO_WALLET: &str = r#"
mutation AddToWallet($input: WalletAddInput!) {
    addToWallet(input: $input) {
        success
        transactionId
        newBalance
        message
    }
}"#;

const GET_TRANSACTION_HISTORY: &str = r#"
query GetTransactionHistory($userId: ID!, $limit: Int, $offset: Int) {
    user(id: $userId) {
        transactions(limit: $limit, offset: $offset) {
            id
            amount
            currency
            status
            type
            description
            createdAt
        }
    }
}"#;

const REFUND_TRANSACTION: &str = r#"
mutation RefundTransaction($input: RefundInput!) {
    refundTransaction(input: $input) {
        success
        refundId
        amount
        message
    }
}"#;

const VALIDATE_CREDENTIALS: &str = r#"
query ValidateCredentials {
    me {
        id
        email
        status
    }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

struct CachedToken {
    token: String,
    mode: Mode,
    expires_at: Instant,
}

/// Thin, stateless wrapper over the processor's GraphQL endpoint. Every
/// operation is one authenticated request/response unit with a 30 s ceiling
/// and no retries; the only state is the bounded-TTL auth token cache.
pub struct HealthPayClient {
    http: reqwest::Client,
    creds: ResolvedCredentials,
    /// Return/callback/webhook URLs handed to the processor are built from
    /// this host's public base URL.
    public_base_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl HealthPayClient {
    pub fn new(
        creds: ResolvedCredentials,
        public_base_url: String,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("failed to initialize HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            creds,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Token derivation is currently key-as-token, cached per mode for an
    /// hour so it is not re-derived on every call.
    async fn auth_token(&self) -> String {
        {
            let cached = self.token.read().await;
            if let Some(t) = cached.as_ref()
                && t.mode == self.creds.mode
                && t.expires_at > Instant::now()
            {
                return t.token.clone();
            }
        }

        let token = self.creds.api_key.clone();
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            mode: self.creds.mode,
            expires_at: Instant::now() + TOKEN_TTL,
        });
        token
    }

    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        if self.creds.api_key.is_empty() {
            return Err(GatewayError::Configuration(
                "gateway credentials not configured".into(),
            ));
        }

        let token = self.auth_token().await;
        let response = self
            .http
            .post(&self.creds.base_url)
            .bearer_auth(token)
            .header("X-API-Key", &self.creds.api_key)
            .json(&serde_json::json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Remote(format!("processor request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GatewayError::Remote(format!("HTTP {status}: {body}")));
        }

        let envelope: GraphQlEnvelope = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Remote(format!("invalid processor response: {e}")))?;

        if let Some(errors) = envelope.errors
            && let Some(first) = errors.first()
        {
            tracing::error!(message = %first.message, "processor reported an error");
            return Err(GatewayError::Remote(first.message.clone()));
        }

        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    }

    fn route(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url)
    }
}

fn field_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn field_amount(value: &serde_json::Value, key: &str) -> Result<MoneyAmount, GatewayError> {
    let raw = value
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| GatewayError::Remote(format!("processor response missing {key}")))?;
    MoneyAmount::from_major_units(raw)
}

#[async_trait]
impl PaymentGateway for HealthPayClient {
    async fn create_payment_request(
        &self,
        order_id: i64,
        amount: Money,
        user_id: i64,
        description: &str,
    ) -> Result<CreatedPayment, GatewayError> {
        let variables = serde_json::json!({
            "input": {
                "amount": amount.amount().to_major_units(),
                "currency": amount.currency().as_str(),
                "referenceId": order_id.to_string(),
                "userId": user_id.to_string(),
                "description": description,
                "callbackUrl": self.route("/callback"),
                "returnUrl": self.route("/return"),
                "webhookUrl": self.route("/webhook"),
            }
        });

        let data = self.execute(CREATE_PAYMENT_REQUEST, variables).await?;
        let payload = data
            .get("createPaymentRequest")
            .cloned()
            .ok_or_else(|| GatewayError::Remote("createPaymentRequest returned no data".into()))?;

        let processor_id = field_str(&payload, "id")
            .ok_or_else(|| GatewayError::Remote("payment request id missing".into()))?;
        let status = field_str(&payload, "status")
            .map(|s| RemoteStatus::from_wire(&s))
            .unwrap_or(RemoteStatus::Pending);

        Ok(CreatedPayment {
            processor_id,
            status,
            payment_url: field_str(&payload, "paymentUrl"),
            raw: payload,
        })
    }

    async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<RemoteTransaction, GatewayError> {
        let data = self
            .execute(GET_TRANSACTION, serde_json::json!({"id": transaction_id}))
            .await?;
        let payload = data
            .get("transaction")
            .cloned()
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                GatewayError::Remote(format!("transaction {transaction_id} not found"))
            })?;

        let status = field_str(&payload, "status")
            .map(|s| RemoteStatus::from_wire(&s))
            .unwrap_or(RemoteStatus::Unknown);
        let amount = field_amount(&payload, "amount")?;

        Ok(RemoteTransaction {
            transaction_id: field_str(&payload, "id").unwrap_or_else(|| transaction_id.to_string()),
            status,
            money: Money::egp(amount),
            reference_id: field_str(&payload, "referenceId"),
            raw: payload,
        })
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<MoneyAmount>,
        reason: &str,
    ) -> Result<RefundOutcome, GatewayError> {
        let variables = serde_json::json!({
            "input": {
                "transactionId": transaction_id,
                "amount": amount.map(|a| a.to_major_units()),
                "reason": reason,
            }
        });

        let data = self.execute(REFUND_TRANSACTION, variables).await?;
        let payload = data
            .get("refundTransaction")
            .cloned()
            .ok_or_else(|| GatewayError::Remote("refundTransaction returned no data".into()))?;

        Ok(RefundOutcome {
            success: payload.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
            refund_id: field_str(&payload, "refundId"),
            amount: payload
                .get("amount")
                .and_then(|v| v.as_f64())
                .map(MoneyAmount::from_major_units)
                .transpose()?,
            message: field_str(&payload, "message"),
            raw: payload,
        })
    }

    async fn wallet_debit(
        &self,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        let variables = serde_json::json!({
            "input": {
                "userId": user_id.to_string(),
                "amount": amount.to_major_units(),
                "referenceId": order_id.to_string(),
                "description": description,
            }
        });

        let data = self.execute(DEDUCT_FROM_WALLET, variables).await?;
        let payload = data
            .get("deductFromWallet")
            .cloned()
            .ok_or_else(|| GatewayError::Remote("deductFromWallet returned no data".into()))?;

        Ok(WalletReceipt {
            success: payload.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
            transaction_id: field_str(&payload, "transactionId"),
            balance_after: payload
                .get("remainingBalance")
                .and_then(|v| v.as_f64())
                .map(MoneyAmount::from_major_units)
                .transpose()?,
            message: field_str(&payload, "message"),
            raw: payload,
        })
    }

    async fn wallet_credit(
        &self,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        let variables = serde_json::json!({
            "input": {
                "userId": user_id.to_string(),
                "amount": amount.to_major_units(),
                "referenceId": order_id.to_string(),
                "description": description,
            }
        });

        let data = self.execute(ADD_TO_WALLET, variables).await?;
        let payload = data
            .get("addToWallet")
            .cloned()
            .ok_or_else(|| GatewayError::Remote("addToWallet returned no data".into()))?;

        Ok(WalletReceipt {
            success: payload.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
            transaction_id: field_str(&payload, "transactionId"),
            balance_after: payload
                .get("newBalance")
                .and_then(|v| v.as_f64())
                .map(MoneyAmount::from_major_units)
                .transpose()?,
            message: field_str(&payload, "message"),
            raw: payload,
        })
    }

    async fn user_balance(&self, user_id: i64) -> Result<WalletBalance, GatewayError> {
        let data = self
            .execute(
                GET_USER_BALANCE,
                serde_json::json!({"userId": user_id.to_string()}),
            )
            .await?;
        let wallet = data
            .get("user")
            .and_then(|u| u.get("wallet"))
            .cloned()
            .ok_or_else(|| GatewayError::Remote("user wallet not found".into()))?;

        Ok(WalletBalance {
            balance: field_amount(&wallet, "balance")?,
            available: field_amount(&wallet, "availableBalance")?,
        })
    }

    async fn transaction_history(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletActivity>, GatewayError> {
        let variables = serde_json::json!({
            "userId": user_id.to_string(),
            "limit": limit,
            "offset": offset,
        });

        let data = self.execute(GET_TRANSACTION_HISTORY, variables).await?;
        let transactions = data
            .get("user")
            .and_then(|u| u.get("transactions"))
            .cloned()
            .unwrap_or(serde_json::Value::Array(Vec::new()));

        serde_json::from_value(transactions)
            .map_err(|e| GatewayError::Remote(format!("invalid transaction history: {e}")))
    }

    async fn validate_credentials(&self) -> bool {
        match self.execute(VALIDATE_CREDENTIALS, serde_json::json!({})).await {
            Ok(data) => data
                .get("me")
                .map(|me| !me.is_null())
                .unwrap_or(false),
            Err(e) => {
                tracing::debug!(error = %e, "credential probe failed");
                false
            }
        }
    }
}
