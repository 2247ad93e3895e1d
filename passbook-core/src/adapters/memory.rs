//! In-memory repository implementation
//!
//! Backs the service unit tests and any embedder that wants the ledger
//! semantics without a database file. All operations take one lock over
//! the whole store, which is what makes the check-and-act pairs
//! (duplicate email, funded withdrawal) atomic here.

use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{compute_balance, Statement, User};
use crate::ports::{StatementRepository, UserRepository};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    statements: Vec<Statement>,
}

/// In-memory repository implementation
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        // Exact match, same as the unique index on the persistent side
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(Error::EmailAlreadyInUse);
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_count(&self) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state.users.len() as i64)
    }
}

#[async_trait]
impl StatementRepository for MemoryRepository {
    async fn create_statement(&self, statement: &Statement) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(statement.clone());
        Ok(())
    }

    async fn create_withdrawal_if_funded(&self, statement: &Statement) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        // Balance check and append under the same guard
        let owned: Vec<Statement> = state
            .statements
            .iter()
            .filter(|s| s.user_id == statement.user_id)
            .cloned()
            .collect();
        if compute_balance(&owned) < statement.amount {
            return Ok(false);
        }
        state.statements.push(statement.clone());
        Ok(true)
    }

    async fn get_statement(
        &self,
        user_id: Uuid,
        statement_id: Uuid,
    ) -> Result<Option<Statement>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .statements
            .iter()
            .find(|s| s.user_id == user_id && s.id == statement_id)
            .cloned())
    }

    async fn get_statements(&self, user_id: Uuid) -> Result<Vec<Statement>> {
        let state = self.state.lock().unwrap();
        // Vec push order is insertion order
        Ok(state
            .statements
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, user_id: Uuid) -> Result<Decimal> {
        let state = self.state.lock().unwrap();
        let owned: Vec<Statement> = state
            .statements
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(compute_balance(&owned))
    }

    async fn statement_count(&self) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state.statements.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationType;

    fn user(email: &str) -> User {
        User::new("Test User", email, "$argon2id$stub")
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user(&user("a@example.com")).await.unwrap();

        let err = repo.create_user(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::EmailAlreadyInUse));
        assert_eq!(repo.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let repo = MemoryRepository::new();
        repo.create_user(&user("a@example.com")).await.unwrap();

        // Stored exactly as given; a different casing is a different identity
        repo.create_user(&user("A@example.com")).await.unwrap();
        assert_eq!(repo.user_count().await.unwrap(), 2);
        assert!(repo
            .get_user_by_email("a@Example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_funded_withdrawal_check_is_scoped_to_user() {
        let repo = MemoryRepository::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        repo.create_statement(&Statement::new(
            alice,
            OperationType::Deposit,
            Decimal::new(50000, 2),
            "opening deposit",
        ))
        .await
        .unwrap();

        // Bob cannot draw against Alice's funds
        let recorded = repo
            .create_withdrawal_if_funded(&Statement::new(
                bob,
                OperationType::Withdraw,
                Decimal::new(100, 2),
                "coffee",
            ))
            .await
            .unwrap();
        assert!(!recorded);
        assert_eq!(repo.get_balance(bob).await.unwrap(), Decimal::ZERO);
        assert_eq!(repo.statement_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_withdrawal_to_exactly_zero_is_allowed() {
        let repo = MemoryRepository::new();
        let user_id = Uuid::new_v4();

        repo.create_statement(&Statement::new(
            user_id,
            OperationType::Deposit,
            Decimal::new(10000, 2),
            "deposit",
        ))
        .await
        .unwrap();

        let recorded = repo
            .create_withdrawal_if_funded(&Statement::new(
                user_id,
                OperationType::Withdraw,
                Decimal::new(10000, 2),
                "drain",
            ))
            .await
            .unwrap();
        assert!(recorded);
        assert_eq!(repo.get_balance(user_id).await.unwrap(), Decimal::ZERO);
    }
}
