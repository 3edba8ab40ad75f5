//! Company configuration.
//!
//! A static JSON record loaded once at process start and passed
//! explicitly to the parts that need it: default location and
//! responsible party for scanned assets, manually-declared assets
//! (cloud services, mail, anything the sweep cannot see), and the
//! administrative credentials that gate override commands. The engine
//! treats this as read-only input.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{CidScanError, CidScanResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub company: String,
    #[serde(default = "default_location")]
    pub default_location: String,
    #[serde(default = "default_responsible")]
    pub security_responsible: String,
    #[serde(default)]
    pub manual_assets: Vec<ManualAsset>,
    #[serde(default)]
    pub admin: Option<AdminCredentials>,
}

/// An asset declared by hand rather than discovered by the sweep.
/// Valued with the same CID pipeline as scanned hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAsset {
    /// Stable identifier; doubles as the uniqueness key in the store
    pub id: String,
    /// Must name a type in the CID weight table
    pub asset_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub security_responsible: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub risk_note: Option<String>,
    #[serde(default)]
    pub sensitivity: Option<String>,
}

/// Administrative credentials; the secret is stored as a SHA-256 hex
/// digest, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub user: String,
    pub password_sha256: String,
}

fn default_location() -> String {
    "Main office".to_string()
}

fn default_responsible() -> String {
    "IT administrator".to_string()
}

impl CompanyConfig {
    pub fn load(path: &Path) -> CidScanResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CidScanError::io(e, Some(path.to_path_buf())))?;
        let config: CompanyConfig = serde_json::from_str(&text)?;
        log::debug!(
            "Loaded configuration for '{}' ({} manual assets)",
            config.company,
            config.manual_assets.len()
        );
        Ok(config)
    }

    /// Check operator credentials against the configured admin entry.
    /// Returns false when no admin is configured.
    pub fn verify_admin(&self, user: &str, password: &str) -> bool {
        let Some(admin) = &self.admin else {
            return false;
        };
        if admin.user != user {
            return false;
        }
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        digest == admin.password_sha256.to_lowercase()
    }
}
