use {
    crate::domain::error::GatewayError,
    crate::domain::gateway::{PaymentGateway, WalletReceipt},
    crate::domain::money::{Money, MoneyAmount},
    crate::domain::stores::TransactionLogStore,
    crate::domain::transaction::{NewTransaction, TransactionKind, TransactionStatus},
    std::sync::Arc,
};

/// Wallet debits and credits on behalf of the host platform. Each operation
/// lands in the transaction log next to the payment rows, so the audit trail
/// covers every money movement the gateway performs.
pub struct WalletService {
    transactions: Arc<dyn TransactionLogStore>,
}

impl WalletService {
    pub fn new(transactions: Arc<dyn TransactionLogStore>) -> Self {
        Self { transactions }
    }

    pub async fn debit(
        &self,
        gateway: &dyn PaymentGateway,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        let receipt = gateway
            .wallet_debit(user_id, amount, order_id, description)
            .await?;
        self.record(
            user_id,
            amount,
            order_id,
            description,
            TransactionKind::WalletDeduct,
            &receipt,
        )
        .await;
        Ok(receipt)
    }

    pub async fn credit(
        &self,
        gateway: &dyn PaymentGateway,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
    ) -> Result<WalletReceipt, GatewayError> {
        let receipt = gateway
            .wallet_credit(user_id, amount, order_id, description)
            .await?;
        self.record(
            user_id,
            amount,
            order_id,
            description,
            TransactionKind::WalletAdd,
            &receipt,
        )
        .await;
        Ok(receipt)
    }

    async fn record(
        &self,
        user_id: i64,
        amount: MoneyAmount,
        order_id: i64,
        description: &str,
        kind: TransactionKind,
        receipt: &WalletReceipt,
    ) {
        let status = if receipt.success {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        };
        let mut entry = NewTransaction::new(order_id, user_id, Money::egp(amount), status, kind)
            .with_description(description)
            .with_response(receipt.raw.clone());
        if let Some(id) = receipt.transaction_id.as_deref() {
            entry = entry.with_transaction_id(id);
        }

        if let Err(e) = self.transactions.upsert(&entry).await {
            tracing::error!(order_id, error = %e, "failed to record wallet operation");
        }
    }
}
