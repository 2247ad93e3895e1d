//! Balance service - derived balance reads
//!
//! Balance is always computed from the statement sequence; nothing here
//! reads or writes a stored total.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{compute_balance, BalanceSheet};
use crate::ports::{StatementRepository, UserRepository};

/// Balance service for derived balance reads
pub struct BalanceService {
    users: Arc<dyn UserRepository>,
    statements: Arc<dyn StatementRepository>,
}

impl BalanceService {
    pub fn new(users: Arc<dyn UserRepository>, statements: Arc<dyn StatementRepository>) -> Self {
        Self { users, statements }
    }

    /// Current balance for a user, optionally with the ordered statement list
    ///
    /// When statements are requested, the balance is folded from the very
    /// list returned, so the two always agree.
    pub async fn get_balance(&self, user_id: Uuid, include_statements: bool) -> Result<BalanceSheet> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound)?;

        if include_statements {
            let statements = self.statements.get_statements(user_id).await?;
            let balance = compute_balance(&statements);
            Ok(BalanceSheet {
                balance,
                statements: Some(statements),
            })
        } else {
            let balance = self.statements.get_balance(user_id).await?;
            Ok(BalanceSheet {
                balance,
                statements: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::domain::{OperationType, Statement, User};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn service_with_user() -> (BalanceService, Arc<MemoryRepository>, Uuid) {
        let repo = Arc::new(MemoryRepository::new());
        let user = User::new(
            "Ana".to_string(),
            "ana@example.com".to_string(),
            "$argon2id$stub".to_string(),
        );
        repo.create_user(&user).await.unwrap();
        let service = BalanceService::new(repo.clone(), repo.clone());
        (service, repo, user.id)
    }

    #[tokio::test]
    async fn test_fresh_account_is_zero() {
        let (service, _repo, user_id) = service_with_user().await;

        let sheet = service.get_balance(user_id, false).await.unwrap();
        assert_eq!(sheet.balance, Decimal::ZERO);
        assert!(sheet.statements.is_none());
    }

    #[tokio::test]
    async fn test_statements_come_back_in_insertion_order() {
        let (service, repo, user_id) = service_with_user().await;

        for (amount, description) in [(dec!(200), "salary"), (dec!(50), "gift"), (dec!(30), "tips")]
        {
            let statement = Statement::new(
                user_id,
                OperationType::Deposit,
                amount,
                description.to_string(),
            );
            repo.create_statement(&statement).await.unwrap();
        }

        let sheet = service.get_balance(user_id, true).await.unwrap();
        assert_eq!(sheet.balance, dec!(280));

        let statements = sheet.statements.unwrap();
        let descriptions: Vec<&str> = statements.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["salary", "gift", "tips"]);
    }

    #[tokio::test]
    async fn test_balance_agrees_with_and_without_statements() {
        let (service, repo, user_id) = service_with_user().await;

        let deposit = Statement::new(
            user_id,
            OperationType::Deposit,
            dec!(100.10),
            "salary".to_string(),
        );
        repo.create_statement(&deposit).await.unwrap();
        let withdrawal = Statement::new(
            user_id,
            OperationType::Withdraw,
            dec!(0.10),
            "fee".to_string(),
        );
        repo.create_statement(&withdrawal).await.unwrap();

        let bare = service.get_balance(user_id, false).await.unwrap();
        let full = service.get_balance(user_id, true).await.unwrap();

        assert_eq!(bare.balance, dec!(100.00));
        assert_eq!(full.balance, bare.balance);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (service, _repo, _user_id) = service_with_user().await;

        let result = service.get_balance(Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(Error::UserNotFound)));
    }
}
