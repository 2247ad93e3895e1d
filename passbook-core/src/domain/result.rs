//! Error and result types used across the core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Everything that can go wrong inside the core library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("User not found")]
    UserNotFound,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Statement not found")]
    StatementNotFound,

    #[error("Insufficient funds: balance is {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    // Deliberately identical for unknown email and wrong password.
    #[error("Incorrect email or password")]
    IncorrectEmailOrPassword,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Stable variant name, safe for event logs
    ///
    /// Unlike Display output this carries no values, so it never leaks
    /// amounts or other personal data into the log database.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::EmailAlreadyInUse => "email_already_in_use",
            Self::StatementNotFound => "statement_not_found",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::IncorrectEmailOrPassword => "incorrect_email_or_password",
            Self::InvalidToken(_) => "invalid_token",
            Self::Validation(_) => "validation",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Crypto(_) => "crypto",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Shorthand result used by the core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_message_does_not_name_the_cause() {
        let msg = Error::IncorrectEmailOrPassword.to_string();
        assert!(!msg.to_lowercase().contains("user"));
        assert!(!msg.to_lowercase().contains("unknown"));
        assert_eq!(msg, "Incorrect email or password");
    }

    #[test]
    fn test_insufficient_funds_reports_both_sides() {
        let err = Error::InsufficientFunds {
            balance: Decimal::new(10000, 2),
            required: Decimal::new(15000, 2),
        };
        let msg = err.to_string();
        assert!(msg.contains("100.00"));
        assert!(msg.contains("150.00"));
    }

    #[test]
    fn test_duckdb_error_maps_to_database() {
        let err: Error = duckdb::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_kind_carries_no_values() {
        let err = Error::InsufficientFunds {
            balance: Decimal::new(10000, 2),
            required: Decimal::new(15000, 2),
        };
        assert_eq!(err.kind(), "insufficient_funds");
        assert!(!err.kind().contains("100"));
    }
}
