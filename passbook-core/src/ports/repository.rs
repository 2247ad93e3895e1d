//! Repository ports - storage abstraction

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Statement, User};

/// User directory abstraction
///
/// Implementations (adapters) provide the actual storage access logic.
/// Email uniqueness is part of the contract: the duplicate check and the
/// insert must be a single logical operation so no concurrent pair of
/// registrations can both succeed.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user, failing with `EmailAlreadyInUse` if the email
    /// (compared exactly as stored) is taken
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Look up a user by exact email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up a user by id
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Total registered users
    async fn user_count(&self) -> Result<i64>;
}

/// Statement ledger abstraction
///
/// The ledger is append-only. `create_statement` performs no business
/// validation; overdraft policy is enforced either by the caller or by
/// `create_withdrawal_if_funded`, the atomic check-and-append primitive.
#[async_trait]
pub trait StatementRepository: Send + Sync {
    /// Append a statement unconditionally
    async fn create_statement(&self, statement: &Statement) -> Result<()>;

    /// Append a withdrawal only if the user's current balance covers it.
    /// Returns whether the statement was recorded. Check and append are
    /// one atomic unit at the storage layer.
    async fn create_withdrawal_if_funded(&self, statement: &Statement) -> Result<bool>;

    /// Look up one statement scoped to its owner. A statement id that
    /// exists under a different user yields `None`.
    async fn get_statement(
        &self,
        user_id: Uuid,
        statement_id: Uuid,
    ) -> Result<Option<Statement>>;

    /// All statements for a user, in insertion order
    async fn get_statements(&self, user_id: Uuid) -> Result<Vec<Statement>>;

    /// Derived balance: signed sum over the user's statements
    async fn get_balance(&self, user_id: Uuid) -> Result<Decimal>;

    /// Total recorded statements
    async fn statement_count(&self) -> Result<i64>;
}
