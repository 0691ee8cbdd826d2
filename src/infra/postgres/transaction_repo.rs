use {
    crate::domain::error::GatewayError,
    crate::domain::money::{Currency, Money, MoneyAmount},
    crate::domain::stores::TransactionLogStore,
    crate::domain::transaction::{NewTransaction, TransactionKind, TransactionRecord, TransactionStatus},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// Audit log over `healthpay_transactions`. Upserts key on the processor
/// transaction id; `completed_at` sticks to its first value.
pub struct PgTransactionLogStore {
    pool: PgPool,
}

impl PgTransactionLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    order_id: i64,
    user_id: i64,
    transaction_id: Option<String>,
    reference_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[sqlx(rename = "type")]
    kind: String,
    description: Option<String>,
    request_data: serde_json::Value,
    response_data: serde_json::Value,
    payment_url: Option<String>,
    webhook_signature: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = GatewayError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(TransactionRecord {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            transaction_id: row.transaction_id,
            reference_id: row.reference_id,
            money: Money::new(
                MoneyAmount::new(row.amount)?,
                Currency::try_from(row.currency.as_str())?,
            ),
            status: TransactionStatus::try_from(row.status.as_str())?,
            kind: TransactionKind::try_from(row.kind.as_str())?,
            description: row.description,
            request_data: row.request_data,
            response_data: row.response_data,
            payment_url: row.payment_url,
            webhook_signature: row.webhook_signature,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl TransactionLogStore for PgTransactionLogStore {
    async fn upsert(&self, entry: &NewTransaction) -> Result<(), GatewayError> {
        let amount = entry.money.amount().piastres();
        let currency = entry.money.currency().as_str();

        match entry.transaction_id.as_deref() {
            Some(transaction_id) => {
                sqlx::query(
                    "INSERT INTO healthpay_transactions \
                     (id, order_id, user_id, transaction_id, reference_id, amount, currency, \
                      status, type, description, request_data, response_data, payment_url, \
                      webhook_signature, completed_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
                     ON CONFLICT (transaction_id) DO UPDATE SET \
                        status = EXCLUDED.status, \
                        response_data = EXCLUDED.response_data, \
                        reference_id = COALESCE(EXCLUDED.reference_id, healthpay_transactions.reference_id), \
                        description = COALESCE(EXCLUDED.description, healthpay_transactions.description), \
                        payment_url = COALESCE(healthpay_transactions.payment_url, EXCLUDED.payment_url), \
                        webhook_signature = COALESCE(EXCLUDED.webhook_signature, healthpay_transactions.webhook_signature), \
                        completed_at = COALESCE(healthpay_transactions.completed_at, EXCLUDED.completed_at), \
                        updated_at = now()",
                )
                .bind(entry.id)
                .bind(entry.order_id)
                .bind(entry.user_id)
                .bind(transaction_id)
                .bind(entry.reference_id.as_deref())
                .bind(amount)
                .bind(currency)
                .bind(entry.status.as_str())
                .bind(entry.kind.as_str())
                .bind(entry.description.as_deref())
                .bind(&entry.request_data)
                .bind(&entry.response_data)
                .bind(entry.payment_url.as_deref())
                .bind(entry.webhook_signature.as_deref())
                .bind(entry.completed_at)
                .execute(&self.pool)
                .await?;
            }
            None => {
                // No processor id yet: settle the pending attempt row for
                // this order, or open a fresh one.
                let updated = sqlx::query(
                    "UPDATE healthpay_transactions SET \
                        status = $2, \
                        response_data = $3, \
                        webhook_signature = COALESCE($4, webhook_signature), \
                        completed_at = COALESCE(completed_at, $5), \
                        updated_at = now() \
                     WHERE order_id = $1 AND status = 'pending'",
                )
                .bind(entry.order_id)
                .bind(entry.status.as_str())
                .bind(&entry.response_data)
                .bind(entry.webhook_signature.as_deref())
                .bind(entry.completed_at)
                .execute(&self.pool)
                .await?;

                if updated.rows_affected() == 0 {
                    sqlx::query(
                        "INSERT INTO healthpay_transactions \
                         (id, order_id, user_id, reference_id, amount, currency, status, type, \
                          description, request_data, response_data, payment_url, \
                          webhook_signature, completed_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
                    )
                    .bind(entry.id)
                    .bind(entry.order_id)
                    .bind(entry.user_id)
                    .bind(entry.reference_id.as_deref())
                    .bind(amount)
                    .bind(currency)
                    .bind(entry.status.as_str())
                    .bind(entry.kind.as_str())
                    .bind(entry.description.as_deref())
                    .bind(&entry.request_data)
                    .bind(&entry.response_data)
                    .bind(entry.payment_url.as_deref())
                    .bind(entry.webhook_signature.as_deref())
                    .bind(entry.completed_at)
                    .execute(&self.pool)
                    .await?;
                }
            }
        }
        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, GatewayError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT id, order_id, user_id, transaction_id, reference_id, amount, currency, \
                    status, type, description, request_data, response_data, payment_url, \
                    webhook_signature, completed_at, created_at, updated_at \
             FROM healthpay_transactions WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRecord::try_from).transpose()
    }
}
