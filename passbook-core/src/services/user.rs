//! User service - registration and profile lookup

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{User, UserProfile};
use crate::ports::UserRepository;
use crate::services::PasswordService;

/// User service for account registration
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    password: PasswordService,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self {
            repository,
            password: PasswordService::new(),
        }
    }

    /// Register a new user
    ///
    /// The email must not already be registered. The comparison is
    /// case-sensitive: the email is stored exactly as given.
    pub async fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        if password.is_empty() {
            return Err(Error::validation("password must not be empty"));
        }

        // Early duplicate check; the storage-level unique index closes the race
        if self.repository.get_user_by_email(email).await?.is_some() {
            return Err(Error::EmailAlreadyInUse);
        }

        let password_hash = self.password.hash(password)?;
        let user = User::new(name.to_string(), email.to_string(), password_hash);
        user.validate().map_err(Error::validation)?;

        self.repository.create_user(&user).await?;
        Ok(user)
    }

    /// Fetch the outward-facing profile for a user id
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self
            .repository
            .get_user_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound)?;
        Ok(user.profile())
    }
}
