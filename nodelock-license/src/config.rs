//! Licensing configuration.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Passphrase protecting `private_key.pem` unless configured otherwise.
pub const DEFAULT_PASSPHRASE: &str = "nodelock-issuer-key";

/// Days an activation stays valid from the day it is issued.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Key locations, passphrase and validity window.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Issuer private key, relative to the working directory.
    pub private_key_path: PathBuf,
    /// Client public key, relative to the application resource root.
    pub public_key_path: PathBuf,
    /// Cached license record, relative to the working directory.
    pub license_path: PathBuf,
    /// Passphrase for the private key.
    pub passphrase: String,
    /// Validity window applied to every issued activation.
    pub validity_days: u32,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            private_key_path: PathBuf::from("private_key.pem"),
            public_key_path: PathBuf::from("public_key.pem"),
            license_path: PathBuf::from("license.json"),
            passphrase: DEFAULT_PASSPHRASE.to_string(),
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

impl std::fmt::Debug for LicenseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseConfig")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("license_path", &self.license_path)
            .field("passphrase", &"[REDACTED]")
            .field("validity_days", &self.validity_days)
            .finish()
    }
}

impl LicenseConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| LicenseError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make every issued code useless.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.validity_days == 0 {
            return Err(LicenseError::Config(
                "validity_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = path.into();
        self
    }

    #[must_use]
    pub fn with_public_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key_path = path.into();
        self
    }

    #[must_use]
    pub fn with_license_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.license_path = path.into();
        self
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    #[must_use]
    pub fn with_validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }
}
