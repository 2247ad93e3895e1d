//! User domain model

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account holder
///
/// The email is the login identity and is unique across the system,
/// compared exactly as stored (no case folding). `password_hash` is an
/// opaque PHC string and never serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outward projection of a user, safe to print or serialize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a freshly generated id
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check that a string looks like an email address.
    /// Shape check only, not RFC 5322.
    pub fn is_valid_email(email: &str) -> bool {
        let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
        email_re.is_match(email)
    }

    /// Validate user data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty");
        }
        if !Self::is_valid_email(&self.email) {
            return Err("email is not a valid address");
        }
        if self.password_hash.trim().is_empty() {
            return Err("password hash cannot be empty");
        }
        Ok(())
    }

    /// Projection with the credential stripped
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_validation() {
        let mut user = User::new("Maria Silva", "maria@example.com", "$argon2id$stub");
        assert!(user.validate().is_ok());

        user.name = "  ".to_string();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(User::is_valid_email("a@b.co"));
        assert!(User::is_valid_email("first.last+tag@mail.example.org"));
        assert!(!User::is_valid_email("no-at-sign"));
        assert!(!User::is_valid_email("spaces in@mail.com"));
        assert!(!User::is_valid_email("missing@tld"));
    }

    #[test]
    fn test_profile_excludes_hash() {
        let user = User::new("Maria Silva", "maria@example.com", "$argon2id$stub");
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "maria@example.com");
    }

    #[test]
    fn test_entity_serialization_skips_hash() {
        let user = User::new("Maria Silva", "maria@example.com", "$argon2id$stub");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
