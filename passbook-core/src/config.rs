//! Settings persisted alongside the ledger.
//!
//! `settings.json` is shared with other frontends, so load and save must
//! round-trip fields this crate does not understand. Only the `auth`
//! section is managed here:
//!
//! ```json
//! { "auth": { "tokenTtlMinutes": 1440 } }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Session tokens live for a day unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 1440;

/// View of the settings this crate acts on.
#[derive(Debug, Clone)]
pub struct Config {
    pub token_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

impl Config {
    /// Read settings from the passbook directory.
    ///
    /// TTL resolution order: the PASSBOOK_TOKEN_TTL_MINUTES environment
    /// variable, then settings.json, then [`DEFAULT_TOKEN_TTL_MINUTES`].
    pub fn load(passbook_dir: &Path) -> Result<Self> {
        let stored = read_settings(&passbook_dir.join("settings.json"))?;
        Ok(Self {
            token_ttl_minutes: ttl_override().unwrap_or(stored.auth.token_ttl_minutes),
        })
    }

    /// Write the managed fields back to settings.json, leaving everything
    /// else in the file as it was.
    pub fn save(&self, passbook_dir: &Path) -> Result<()> {
        let settings_path = passbook_dir.join("settings.json");
        let mut stored = read_settings(&settings_path)?;
        stored.auth.token_ttl_minutes = self.token_ttl_minutes;
        std::fs::write(&settings_path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}

/// Environment override for the session TTL, used by CI and tests.
fn ttl_override() -> Option<i64> {
    let raw = std::env::var("PASSBOOK_TOKEN_TTL_MINUTES").ok()?;
    raw.trim().parse().ok()
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    // Malformed files parse as defaults
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

/// On-disk settings.json shape. Unknown keys land in the flattened maps
/// and survive a save untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default = "default_token_ttl")]
    token_ttl_minutes: i64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            other: HashMap::new(),
        }
    }
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_MINUTES
}
