//! Auth service - login and token resolution

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::UserProfile;
use crate::ports::UserRepository;
use crate::services::{PasswordService, TokenService};

/// Auth service for session establishment
pub struct AuthService {
    repository: Arc<dyn UserRepository>,
    password: PasswordService,
    token: TokenService,
}

impl AuthService {
    pub fn new(repository: Arc<dyn UserRepository>, token: TokenService) -> Self {
        Self {
            repository,
            password: PasswordService::new(),
            token,
        }
    }

    /// Exchange email + password for a session
    ///
    /// Unknown email and wrong password fail with the same error value,
    /// so the response never reveals whether an email is registered.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = self
            .repository
            .get_user_by_email(email)
            .await?
            .ok_or(Error::IncorrectEmailOrPassword)?;

        if !self.password.verify(password, &user.password_hash)? {
            return Err(Error::IncorrectEmailOrPassword);
        }

        let token = self.token.issue(user.id)?;
        Ok(AuthSession {
            token,
            user: user.profile(),
        })
    }

    /// Resolve a session token to the user id it was issued for
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        self.token.verify(token)
    }
}

/// Successful login result: the session token plus a hash-free profile
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::services::UserService;
    use tempfile::TempDir;

    async fn service_with_user() -> (AuthService, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(MemoryRepository::new());

        let users = UserService::new(repo.clone());
        users
            .create_user("Ana", "ana@example.com", "s3cret")
            .await
            .unwrap();

        let token = TokenService::new(dir.path(), 60).unwrap();
        (AuthService::new(repo, token), dir)
    }

    #[tokio::test]
    async fn test_authenticate_returns_token_and_profile() {
        let (auth, _dir) = service_with_user().await;

        let session = auth.authenticate("ana@example.com", "s3cret").await.unwrap();

        assert!(!session.token.is_empty());
        assert_eq!(session.user.email, "ana@example.com");
        assert_eq!(auth.verify(&session.token).unwrap(), session.user.id);

        let json = serde_json::to_value(&session).unwrap();
        assert!(json["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_fail_identically() {
        let (auth, _dir) = service_with_user().await;

        let wrong_password = auth
            .authenticate("ana@example.com", "wrong")
            .await
            .unwrap_err();
        let unknown_email = auth
            .authenticate("nobody@example.com", "s3cret")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, Error::IncorrectEmailOrPassword));
        assert!(matches!(unknown_email, Error::IncorrectEmailOrPassword));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let (auth, _dir) = service_with_user().await;

        assert!(auth.verify("garbage").is_err());
    }
}
