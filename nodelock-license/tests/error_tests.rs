use chrono::NaiveDate;
use nodelock_license::LicenseError;
use std::path::PathBuf;

#[test]
fn error_display_key_file_missing() {
    let err = LicenseError::KeyFileMissing(PathBuf::from("public_key.pem"));
    let msg = format!("{err}");
    assert!(msg.contains("key file not found"));
    assert!(msg.contains("public_key.pem"));
}

#[test]
fn error_display_key_load() {
    let err = LicenseError::KeyLoad("wrong passphrase".into());
    assert!(format!("{err}").contains("failed to load key"));
}

#[test]
fn error_display_decryption() {
    let err = LicenseError::Decryption("invalid padding".into());
    let msg = format!("{err}");
    assert!(msg.contains("decryption failed"));
    assert!(msg.contains("invalid padding"));
}

#[test]
fn error_display_malformed_code() {
    let err = LicenseError::MalformedActivationCode("expected 2 fields".into());
    assert!(format!("{err}").contains("malformed activation code"));
}

#[test]
fn error_display_invalid_expiry() {
    let err = LicenseError::InvalidExpiryFormat("2026-1-1".into());
    let msg = format!("{err}");
    assert!(msg.contains("invalid expiry date format"));
    assert!(msg.contains("2026-1-1"));
}

#[test]
fn error_display_signature_invalid() {
    let err = LicenseError::SignatureInvalid;
    assert!(format!("{err}").contains("signature"));
}

#[test]
fn error_display_expired() {
    let err = LicenseError::Expired(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    assert_eq!(format!("{err}"), "license expired on 2025-01-01");
}

#[test]
fn error_display_record_corrupt() {
    let err = LicenseError::RecordCorrupt("missing field `activation_code`".into());
    assert!(format!("{err}").contains("license record corrupt"));
}

#[test]
fn error_display_persist() {
    let err = LicenseError::Persist("permission denied".into());
    assert!(format!("{err}").contains("failed to persist"));
}

#[test]
fn error_from_serde_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err: LicenseError = json_err.into();
    assert!(format!("{err}").contains("serialization error"));
}

#[test]
fn error_is_debug() {
    let err = LicenseError::Config("validity_days must be at least 1".into());
    let debug = format!("{err:?}");
    assert!(debug.contains("Config"));
}
