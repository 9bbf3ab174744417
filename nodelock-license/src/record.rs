//! Local license record storage.
//!
//! After a successful activation the code is cached in `license.json` so the
//! next start can verify offline without prompting.

use crate::error::{LicenseError, LicenseResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A persisted activation.
///
/// `expiry_date` is informational only: verification always re-derives the
/// expiry from the signed activation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Fingerprint of the machine the code was activated on.
    pub machine_id: String,
    /// The activation code as entered by the user.
    pub activation_code: String,
    /// Expiry decoded from the activation code (`YYYY-MM-DD`).
    pub expiry_date: NaiveDate,
}

impl LicenseRecord {
    /// Creates a new record.
    pub fn new(
        machine_id: impl Into<String>,
        activation_code: impl Into<String>,
        expiry_date: NaiveDate,
    ) -> Self {
        Self {
            machine_id: machine_id.into(),
            activation_code: activation_code.into(),
            expiry_date,
        }
    }
}

/// Reads and writes the license record file.
pub struct LicenseStore {
    /// Path to the record file.
    path: PathBuf,
}

impl LicenseStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the record file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves a record, replacing any previous one.
    ///
    /// Written as JSON with a 4-space indent.
    pub fn save(&self, record: &LicenseRecord) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LicenseError::Persist(e.to_string()))?;
        }

        let mut json = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut json, formatter);
        record.serialize(&mut ser)?;
        json.push(b'\n');

        std::fs::write(&self.path, json)
            .map_err(|e| LicenseError::Persist(format!("{}: {e}", self.path.display())))?;

        debug!("Saved license record to {}", self.path.display());
        Ok(())
    }

    /// Loads the stored record.
    ///
    /// Returns `Ok(None)` if no record exists and
    /// [`LicenseError::RecordCorrupt`] if the file exists but cannot be read
    /// or lacks a required field.
    pub fn load(&self) -> LicenseResult<Option<LicenseRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| LicenseError::RecordCorrupt(format!("{}: {e}", self.path.display())))?;

        let record: LicenseRecord = serde_json::from_str(&json)
            .map_err(|e| LicenseError::RecordCorrupt(e.to_string()))?;
        Ok(Some(record))
    }

    /// Checks if a record file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Deletes the stored record.
    pub fn clear(&self) -> LicenseResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| LicenseError::Persist(e.to_string()))?;
        }
        Ok(())
    }
}
