mod ledger_repo;
mod order_repo;
mod settings_repo;
mod transaction_repo;

pub use ledger_repo::PgLedgerStore;
pub use order_repo::PgOrderStore;
pub use settings_repo::PgSettingsStore;
pub use transaction_repo::PgTransactionLogStore;
