//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use nodelock_license::{
    generate_key_pair, ActivationPrompt, DenialReason, ExitReason, IssuerKey, LicenseIssuer,
    LicenseVerifier,
};
use std::sync::OnceLock;

pub const FINGERPRINT: &str = "AA:BB:CC:DD:EE:FF";
pub const OTHER_FINGERPRINT: &str = "AA:BB:CC:DD:EE:00";

/// Returns a 2048-bit key pair, generated once per test binary.
pub fn test_key() -> &'static IssuerKey {
    static KEY: OnceLock<IssuerKey> = OnceLock::new();
    KEY.get_or_init(|| generate_key_pair(2048).unwrap())
}

/// Returns a second, unrelated key pair.
pub fn other_key() -> &'static IssuerKey {
    static KEY: OnceLock<IssuerKey> = OnceLock::new();
    KEY.get_or_init(|| generate_key_pair(2048).unwrap())
}

pub fn issuer() -> LicenseIssuer {
    LicenseIssuer::new(test_key().clone(), 365)
}

pub fn verifier() -> LicenseVerifier {
    LicenseVerifier::new(test_key().public_key())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fixed "today" used across tests.
pub fn test_today() -> NaiveDate {
    date(2025, 1, 1)
}

/// Prompt double that answers with a fixed response and records what it was shown.
#[derive(Default)]
pub struct ScriptedPrompt {
    pub response: Option<String>,
    pub shown: Vec<(String, DenialReason)>,
    pub rejections: Vec<ExitReason>,
}

impl ScriptedPrompt {
    pub fn answering(code: impl Into<String>) -> Self {
        Self {
            response: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn cancelling() -> Self {
        Self::default()
    }
}

impl ActivationPrompt for ScriptedPrompt {
    fn request_code(&mut self, encrypted_fingerprint: &str, reason: &DenialReason) -> Option<String> {
        self.shown
            .push((encrypted_fingerprint.to_string(), reason.clone()));
        self.response.take()
    }

    fn report_rejection(&mut self, reason: &ExitReason) {
        self.rejections.push(*reason);
    }
}
