//! Statement service - ledger appends and operation lookup

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{OperationType, Statement};
use crate::ports::{StatementRepository, UserRepository};

/// Statement service for deposits, withdrawals and operation lookup
pub struct StatementService {
    users: Arc<dyn UserRepository>,
    statements: Arc<dyn StatementRepository>,
}

impl StatementService {
    pub fn new(users: Arc<dyn UserRepository>, statements: Arc<dyn StatementRepository>) -> Self {
        Self { users, statements }
    }

    /// Append a statement to a user's ledger
    ///
    /// Withdrawals go through the repository's conditional append: the
    /// funds check and the insert are one atomic unit, and a refused
    /// withdrawal leaves nothing behind.
    pub async fn create(
        &self,
        user_id: Uuid,
        operation: OperationType,
        amount: Decimal,
        description: &str,
    ) -> Result<Statement> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound)?;

        let statement = Statement::new(user_id, operation, amount, description.to_string());
        statement.validate().map_err(Error::validation)?;

        match operation {
            OperationType::Deposit => {
                self.statements.create_statement(&statement).await?;
            }
            OperationType::Withdraw => {
                if !self.statements.create_withdrawal_if_funded(&statement).await? {
                    let balance = self.statements.get_balance(user_id).await?;
                    return Err(Error::InsufficientFunds {
                        balance,
                        required: amount,
                    });
                }
            }
        }

        Ok(statement)
    }

    /// Fetch one statement from a user's ledger
    ///
    /// A statement id belonging to a different user reads the same as an
    /// id that does not exist at all.
    pub async fn get_operation(&self, user_id: Uuid, statement_id: Uuid) -> Result<Statement> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound)?;

        self.statements
            .get_statement(user_id, statement_id)
            .await?
            .ok_or(Error::StatementNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::domain::User;
    use rust_decimal_macros::dec;

    async fn service_with_user() -> (StatementService, Arc<MemoryRepository>, Uuid) {
        let repo = Arc::new(MemoryRepository::new());
        let user = User::new(
            "Ana".to_string(),
            "ana@example.com".to_string(),
            "$argon2id$stub".to_string(),
        );
        repo.create_user(&user).await.unwrap();
        let service = StatementService::new(repo.clone(), repo.clone());
        (service, repo, user.id)
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw() {
        let (service, repo, user_id) = service_with_user().await;

        service
            .create(user_id, OperationType::Deposit, dec!(200), "salary")
            .await
            .unwrap();
        service
            .create(user_id, OperationType::Withdraw, dec!(100), "rent")
            .await
            .unwrap();

        assert_eq!(repo.get_balance(user_id).await.unwrap(), dec!(100));
        assert_eq!(repo.statement_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_overdraft_is_refused_and_nothing_persists() {
        let (service, repo, user_id) = service_with_user().await;

        service
            .create(user_id, OperationType::Deposit, dec!(100), "salary")
            .await
            .unwrap();
        let result = service
            .create(user_id, OperationType::Withdraw, dec!(150), "rent")
            .await;

        match result {
            Err(Error::InsufficientFunds { balance, required }) => {
                assert_eq!(balance, dec!(100));
                assert_eq!(required, dec!(150));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }

        // The refused withdrawal must not have touched the ledger
        assert_eq!(repo.get_balance(user_id).await.unwrap(), dec!(100));
        assert_eq!(repo.statement_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_to_exactly_zero_is_allowed() {
        let (service, repo, user_id) = service_with_user().await;

        service
            .create(user_id, OperationType::Deposit, dec!(75.50), "gift")
            .await
            .unwrap();
        service
            .create(user_id, OperationType::Withdraw, dec!(75.50), "spend it all")
            .await
            .unwrap();

        assert_eq!(repo.get_balance(user_id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_other_users_funds_do_not_count() {
        let (service, repo, ana) = service_with_user().await;

        let bruno = User::new(
            "Bruno".to_string(),
            "bruno@example.com".to_string(),
            "$argon2id$stub".to_string(),
        );
        repo.create_user(&bruno).await.unwrap();

        service
            .create(ana, OperationType::Deposit, dec!(500), "salary")
            .await
            .unwrap();

        let result = service
            .create(bruno.id, OperationType::Withdraw, dec!(1), "coffee")
            .await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(repo.get_balance(bruno.id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected_first() {
        let (service, _repo, _user_id) = service_with_user().await;

        let result = service
            .create(Uuid::new_v4(), OperationType::Deposit, dec!(10), "x")
            .await;
        assert!(matches!(result, Err(Error::UserNotFound)));
    }

    #[tokio::test]
    async fn test_invalid_statements_are_rejected() {
        let (service, repo, user_id) = service_with_user().await;

        let zero = service
            .create(user_id, OperationType::Deposit, Decimal::ZERO, "zero")
            .await;
        assert!(matches!(zero, Err(Error::Validation(_))));

        let negative = service
            .create(user_id, OperationType::Deposit, dec!(-5), "negative")
            .await;
        assert!(matches!(negative, Err(Error::Validation(_))));

        let blank = service
            .create(user_id, OperationType::Deposit, dec!(5), "   ")
            .await;
        assert!(matches!(blank, Err(Error::Validation(_))));

        assert_eq!(repo.statement_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_operation_is_scoped_to_owner() {
        let (service, repo, ana) = service_with_user().await;

        let bruno = User::new(
            "Bruno".to_string(),
            "bruno@example.com".to_string(),
            "$argon2id$stub".to_string(),
        );
        repo.create_user(&bruno).await.unwrap();

        let statement = service
            .create(ana, OperationType::Deposit, dec!(10), "salary")
            .await
            .unwrap();

        let own = service.get_operation(ana, statement.id).await.unwrap();
        assert_eq!(own.id, statement.id);

        // Someone else's statement id reads as not found, not as forbidden
        let foreign = service.get_operation(bruno.id, statement.id).await;
        assert!(matches!(foreign, Err(Error::StatementNotFound)));

        let missing = service.get_operation(ana, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(Error::StatementNotFound)));

        let no_user = service.get_operation(Uuid::new_v4(), statement.id).await;
        assert!(matches!(no_user, Err(Error::UserNotFound)));
    }
}
