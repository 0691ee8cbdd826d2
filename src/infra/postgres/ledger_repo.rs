use {
    crate::domain::error::GatewayError,
    crate::domain::ledger::NewLedgerEntry,
    crate::domain::stores::LedgerStore,
    async_trait::async_trait,
    sqlx::PgPool,
};

/// Append-only adapter over the host platform's `accounting` table.
/// Amounts land as signed BIGINT piastres.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn append(&self, entry: &NewLedgerEntry) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO accounting \
             (user_id, amount, type, account_type, order_id, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), now())",
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.account_type)
        .bind(entry.order_id)
        .bind(&entry.description)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            order_id = entry.order_id,
            amount = entry.amount,
            kind = entry.kind.as_str(),
            "ledger entry appended"
        );
        Ok(())
    }
}
