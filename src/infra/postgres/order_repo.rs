use {
    crate::domain::error::GatewayError,
    crate::domain::money::MoneyAmount,
    crate::domain::order::{Order, OrderStatus},
    crate::domain::stores::OrderStore,
    async_trait::async_trait,
    sqlx::PgPool,
};

/// Adapter over the host platform's `orders` table. Amounts are BIGINT
/// piastres; only status, reference_id and payment_data are ever written.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type OrderRow = (
    i64,
    i64,
    i64,
    String,
    Option<String>,
    Option<serde_json::Value>,
);

fn into_order(row: OrderRow) -> Result<Order, GatewayError> {
    let (id, user_id, amount, status, reference_id, payment_data) = row;
    Ok(Order {
        id,
        user_id,
        amount: MoneyAmount::new(amount)?,
        status: OrderStatus::try_from(status.as_str())?,
        reference_id,
        payment_data,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find(&self, order_id: i64) -> Result<Option<Order>, GatewayError> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, user_id, amount, status, reference_id, payment_data \
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_order).transpose()
    }

    async fn find_by_reference_or_id(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, GatewayError> {
        // Processors echo back either our numeric order id or the stored
        // processor reference; a non-numeric reference never matches on id.
        // A reference match always wins over the id fallback, even when one
        // order's reference collides with another order's numeric id.
        let as_id: i64 = reference.parse().unwrap_or(-1);
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, user_id, amount, status, reference_id, payment_data \
             FROM orders WHERE reference_id = $1 OR id = $2 \
             ORDER BY (reference_id = $1) DESC NULLS LAST \
             LIMIT 1",
        )
        .bind(reference)
        .bind(as_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_order).transpose()
    }

    async fn set_reference(
        &self,
        order_id: i64,
        reference_id: &str,
    ) -> Result<(), GatewayError> {
        sqlx::query("UPDATE orders SET reference_id = $2, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .bind(reference_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_paid(
        &self,
        order_id: i64,
        payment_data: &serde_json::Value,
    ) -> Result<bool, GatewayError> {
        // Status guard in the WHERE clause makes the transition atomic:
        // concurrent deliveries race on the row, exactly one wins.
        let result = sqlx::query(
            "UPDATE orders SET status = 'paid', payment_data = $2, updated_at = now() \
             WHERE id = $1 AND status IN ('unpaid', 'failed')",
        )
        .bind(order_id)
        .bind(payment_data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, order_id: i64) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'failed', updated_at = now() \
             WHERE id = $1 AND status = 'unpaid'",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_refunded(&self, order_id: i64) -> Result<Option<OrderStatus>, GatewayError> {
        // Self-join against the pre-update row so the caller learns which
        // status the refund displaced.
        let prior: Option<String> = sqlx::query_scalar(
            "UPDATE orders o SET status = 'refunded', updated_at = now() \
             FROM (SELECT id, status FROM orders WHERE id = $1 FOR UPDATE) prev \
             WHERE o.id = prev.id AND prev.status <> 'refunded' \
             RETURNING prev.status",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        prior
            .as_deref()
            .map(OrderStatus::try_from)
            .transpose()
    }
}
