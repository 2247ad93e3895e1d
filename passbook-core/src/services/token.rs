//! Token service - stateless signed session tokens
//!
//! Tokens are `<payload>.<signature>` where the payload is base64url JSON
//! claims and the signature is HMAC-SHA256 over the payload under a
//! per-installation secret. No server-side session state is kept.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::result::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed session tokens
pub struct TokenService {
    secret: Vec<u8>,
    ttl_minutes: i64,
}

impl TokenService {
    /// Load the signing secret and build the service.
    ///
    /// Secret resolution order: PASSBOOK_TOKEN_SECRET env var, then the
    /// hex-encoded `token.secret` file in the app directory. A missing
    /// file is generated from OS randomness and persisted.
    pub fn new(passbook_dir: &Path, ttl_minutes: i64) -> Result<Self> {
        let secret = match std::env::var("PASSBOOK_TOKEN_SECRET") {
            Ok(hex_secret) => hex::decode(hex_secret.trim())
                .map_err(|e| Error::crypto(format!("invalid PASSBOOK_TOKEN_SECRET: {}", e)))?,
            Err(_) => Self::load_or_create_secret(&Self::secret_file(passbook_dir))?,
        };

        if secret.is_empty() {
            return Err(Error::crypto("token secret is empty"));
        }

        Ok(Self {
            secret,
            ttl_minutes,
        })
    }

    fn secret_file(passbook_dir: &Path) -> PathBuf {
        passbook_dir.join("token.secret")
    }

    fn load_or_create_secret(path: &Path) -> Result<Vec<u8>> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            return hex::decode(content.trim())
                .map_err(|e| Error::crypto(format!("corrupt token secret file: {}", e)));
        }

        let secret: [u8; SECRET_LEN] = rand::thread_rng().gen();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, hex::encode(secret))?;
        Ok(secret.to_vec())
    }

    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::crypto(format!("bad signing key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Issue a token for a user, expiring after the configured TTL
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.ttl_minutes * 60,
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.sign(&payload)?;
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify a token and return the user id it was issued for
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| Error::invalid_token("malformed token"))?;

        let expected = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::invalid_token("malformed signature"))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::crypto(format!("bad signing key: {}", e)))?;
        mac.update(payload.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&expected)
            .map_err(|_| Error::invalid_token("signature mismatch"))?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Error::invalid_token("malformed payload"))?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| Error::invalid_token("unreadable claims"))?;

        if claims.exp < Utc::now().timestamp() {
            return Err(Error::invalid_token("token expired"));
        }

        Ok(claims.sub)
    }
}
