//! Derived balance model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Statement;

/// Balance view for one user, optionally carrying the statements it was
/// derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Vec<Statement>>,
}

/// Signed sum of a statement sequence.
///
/// The balance is never stored; this fold over the ledger is the only
/// definition of it anywhere in the system.
pub fn compute_balance(statements: &[Statement]) -> Decimal {
    statements
        .iter()
        .fold(Decimal::ZERO, |acc, st| acc + st.signed_amount())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::OperationType;

    fn st(user_id: Uuid, op: OperationType, cents: i64) -> Statement {
        Statement::new(user_id, op, Decimal::new(cents, 2), "test entry")
    }

    #[test]
    fn test_empty_ledger_is_zero() {
        assert_eq!(compute_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_signed_sum() {
        let user_id = Uuid::new_v4();
        let statements = vec![
            st(user_id, OperationType::Deposit, 20000),
            st(user_id, OperationType::Withdraw, 5000),
            st(user_id, OperationType::Deposit, 1050),
            st(user_id, OperationType::Withdraw, 1050),
        ];
        assert_eq!(compute_balance(&statements), Decimal::new(15000, 2));
    }

    #[test]
    fn test_exact_decimal_arithmetic() {
        // 0.1 + 0.2 style sums that drift under binary floats
        let user_id = Uuid::new_v4();
        let statements = vec![
            st(user_id, OperationType::Deposit, 10),
            st(user_id, OperationType::Deposit, 20),
            st(user_id, OperationType::Withdraw, 30),
        ];
        assert_eq!(compute_balance(&statements), Decimal::ZERO);
    }

    #[test]
    fn test_balance_sheet_omits_statements_when_absent() {
        let sheet = BalanceSheet {
            balance: Decimal::new(10000, 2),
            statements: None,
        };
        let json = serde_json::to_value(&sheet).unwrap();
        assert!(json.get("statements").is_none());
    }
}
