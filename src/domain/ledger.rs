use serde::Serialize;

/// Accounting side of a money movement. Income rows carry a positive amount,
/// expense rows a negative one.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Income,
    Expense,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// New row for the host platform's accounting table. Created by the engine
/// exactly once per unpaid→paid transition (income) and once per
/// paid→refunded transition (expense).
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: i64,
    /// Signed piastres: positive income, negative expense.
    pub amount: i64,
    pub kind: LedgerKind,
    pub account_type: String,
    pub order_id: i64,
    pub description: String,
}

impl NewLedgerEntry {
    pub fn income(user_id: i64, amount: i64, order_id: i64, description: String) -> Self {
        Self {
            user_id,
            amount,
            kind: LedgerKind::Income,
            account_type: "asset".to_string(),
            order_id,
            description,
        }
    }

    pub fn expense(user_id: i64, amount: i64, order_id: i64, description: String) -> Self {
        Self {
            user_id,
            amount: -amount,
            kind: LedgerKind::Expense,
            account_type: "asset".to_string(),
            order_id,
            description,
        }
    }
}
