//! Error types for the licensing module.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A PEM key file does not exist at the resolved path.
    #[error("key file not found: {}", .0.display())]
    KeyFileMissing(PathBuf),

    /// The key file exists but could not be decoded (wrong passphrase, corrupt PEM).
    #[error("failed to load key: {0}")]
    KeyLoad(String),

    /// Key pair generation or export failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// RSA-OAEP encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// RSA-OAEP decryption failed (not addressed to this key, or corrupted).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// RSA-PSS signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Activation code does not have the `<base64url>|<base64url>` shape.
    #[error("malformed activation code: {0}")]
    MalformedActivationCode(String),

    /// The expiry embedded in an activation code is not a `YYYY-MM-DD` date.
    #[error("invalid expiry date format: {0}")]
    InvalidExpiryFormat(String),

    /// Signature does not match the fingerprint and expiry.
    #[error("activation code signature invalid")]
    SignatureInvalid,

    /// License expired on the given date.
    #[error("license expired on {0}")]
    Expired(NaiveDate),

    /// The stored license record exists but cannot be read back.
    #[error("license record corrupt: {0}")]
    RecordCorrupt(String),

    /// Writing the license record failed.
    #[error("failed to persist license record: {0}")]
    Persist(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
