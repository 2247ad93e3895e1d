//! Statement domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of ledger operation a statement records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Deposit,
    Withdraw,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "deposit",
            OperationType::Withdraw => "withdraw",
        }
    }

    /// Parse the stored column value back into the enum
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(OperationType::Deposit),
            "withdraw" => Some(OperationType::Withdraw),
            _ => None,
        }
    }
}

/// A single immutable ledger record for one user
///
/// Statements are append-only: once recorded they are never edited or
/// deleted, and the balance is always recomputed from them rather than
/// stored anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub operation: OperationType,
    /// Always positive; the sign comes from `operation`
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Statement {
    /// Create a new statement with a freshly generated id
    pub fn new(
        user_id: Uuid,
        operation: OperationType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            operation,
            amount,
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount with the operation's sign applied (deposits positive,
    /// withdrawals negative)
    pub fn signed_amount(&self) -> Decimal {
        match self.operation {
            OperationType::Deposit => self.amount,
            OperationType::Withdraw => -self.amount,
        }
    }

    /// Validate statement data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.amount <= Decimal::ZERO {
            return Err("amount must be positive");
        }
        if self.description.trim().is_empty() {
            return Err("description cannot be empty");
        }
        Ok(())
    }
}
