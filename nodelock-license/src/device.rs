//! Machine fingerprinting for license binding.
//!
//! The fingerprint is the primary network adapter's hardware address,
//! rendered as `AA:BB:CC:DD:EE:FF`. Hosts without a usable address fall
//! back to `HOSTNAME-OSNAME-ARCH` (uppercased).

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use tracing::debug;

const NULL_MAC: [u8; 6] = [0; 6];

/// Information about the current device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Operating system name.
    pub os_name: String,
    /// Hostname.
    pub hostname: String,
    /// CPU architecture.
    pub arch: String,
}

impl DeviceInfo {
    /// Collects information about the current device.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            hostname: get_hostname(),
            arch: env::consts::ARCH.to_string(),
        }
    }

    /// Returns the `HOSTNAME-OSNAME-ARCH` identifier used when no hardware
    /// address is available.
    #[must_use]
    pub fn fallback_id(&self) -> String {
        format!("{}-{}-{}", self.hostname, self.os_name, self.arch).to_uppercase()
    }
}

/// Where a fingerprint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintSource {
    /// Network adapter hardware address.
    Hardware,
    /// Hostname, OS and architecture.
    Fallback,
    /// Supplied by the caller.
    External,
}

/// A stable string that identifies this machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineFingerprint {
    id: String,
    source: FingerprintSource,
}

impl MachineFingerprint {
    /// Resolves the fingerprint of the current machine.
    ///
    /// Never fails: if the hardware address cannot be read, or is the null
    /// address, the hostname-based fallback is used.
    #[must_use]
    pub fn resolve() -> Self {
        if let Some(fp) = primary_mac().and_then(|mac| Self::from_mac(&mac)) {
            debug!("Machine fingerprint derived from hardware address");
            return fp;
        }

        debug!("No usable hardware address, using hostname fallback");
        Self {
            id: DeviceInfo::collect().fallback_id(),
            source: FingerprintSource::Fallback,
        }
    }

    /// Builds a fingerprint from a hardware address.
    ///
    /// Returns `None` for the null address `00:00:00:00:00:00`.
    #[must_use]
    pub fn from_mac(mac: &[u8; 6]) -> Option<Self> {
        if *mac == NULL_MAC {
            return None;
        }
        let id = mac
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        Some(Self {
            id,
            source: FingerprintSource::Hardware,
        })
    }

    /// Wraps a fingerprint string obtained elsewhere (e.g. decrypted by the issuer).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: FingerprintSource::External,
        }
    }

    /// Returns the fingerprint string.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns how the fingerprint was obtained.
    #[must_use]
    pub fn source(&self) -> FingerprintSource {
        self.source
    }
}

impl fmt::Display for MachineFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Returns the hardware address of the primary network adapter.
fn primary_mac() -> Option<[u8; 6]> {
    match mac_address::get_mac_address() {
        Ok(Some(mac)) => Some(mac.bytes()),
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to read hardware address: {e}");
            None
        }
    }
}
