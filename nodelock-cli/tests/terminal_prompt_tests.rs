use std::io::{self, Cursor, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use nodelock_cli::{load_config, ConfigOverrides, TerminalPrompt};
use nodelock_license::{
    generate_key_pair, ActivationPrompt, DenialReason, ExitReason, GateOutcome, InvalidReason,
    LicenseError, LicenseIssuer, LicenseStore, LicenseVerifier, StartupGate,
};

fn prompt_with(input: &str) -> TerminalPrompt<Cursor<Vec<u8>>, Vec<u8>> {
    TerminalPrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

// ── Prompt IO ────────────────────────────────────────────────────

#[test]
fn shows_reason_and_machine_code() {
    let mut prompt = prompt_with("CODE\n");
    let answer = prompt.request_code("ENCRYPTED==", &DenialReason::NoRecord);
    assert_eq!(answer.as_deref(), Some("CODE\n"));

    let shown = String::from_utf8(prompt.into_output()).unwrap();
    assert!(shown.contains("this copy has not been activated"));
    assert!(shown.contains("    ENCRYPTED==\n"));
    assert!(shown.ends_with("Activation code: "));
}

#[test]
fn end_of_input_cancels() {
    let mut prompt = prompt_with("");
    assert_eq!(prompt.request_code("X", &DenialReason::MachineMismatch), None);
}

#[test]
fn blank_line_is_returned() {
    let mut prompt = prompt_with("\n");
    assert_eq!(
        prompt.request_code("X", &DenialReason::NoRecord).as_deref(),
        Some("\n")
    );
}

#[test]
fn rejection_is_reported() {
    let mut prompt = prompt_with("");
    prompt.report_rejection(&ExitReason::Rejected(InvalidReason::Signature));
    let shown = String::from_utf8(prompt.into_output()).unwrap();
    assert_eq!(
        shown,
        "Activation failed: the activation code is not valid for this machine.\n"
    );
}

/// Output stream that refuses every write, like a closed terminal.
struct ClosedOutput;

impl Write for ClosedOutput {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

#[test]
fn closed_output_cancels_and_reports_quietly() {
    let mut prompt = TerminalPrompt::new(Cursor::new(b"CODE\n".to_vec()), ClosedOutput);
    assert_eq!(prompt.request_code("X", &DenialReason::NoRecord), None);
    prompt.report_rejection(&ExitReason::EmptyInput);
}

#[test]
fn gate_through_terminal() {
    let key = generate_key_pair(2048).unwrap();
    let issuer = LicenseIssuer::new(key.clone(), 30);
    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let issued = issuer.issue_for("AA:BB:CC:DD:EE:FF", today).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("license.json");
    let gate = StartupGate::with_parts(
        LicenseVerifier::new(key.public_key()),
        LicenseStore::new(&path),
    );

    let mut prompt = prompt_with(&format!("{}\n", issued.code));
    let outcome = gate.run("AA:BB:CC:DD:EE:FF", today, &mut prompt).unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Licensed {
            expiry: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            activated: true
        }
    );
    assert!(path.exists());

    // Same code on another machine.
    let other = StartupGate::with_parts(
        LicenseVerifier::new(key.public_key()),
        LicenseStore::new(dir.path().join("other.json")),
    );
    let mut prompt = prompt_with(&format!("{}\n", issued.code));
    let outcome = other.run("11:22:33:44:55:66", today, &mut prompt).unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Exited(ExitReason::Rejected(InvalidReason::Signature))
    );
    let shown = String::from_utf8(prompt.into_output()).unwrap();
    assert!(shown.contains("Activation failed"));
}

// ── Config layering ──────────────────────────────────────────────

#[test]
fn defaults_without_file() {
    let config = load_config(None, ConfigOverrides::default()).unwrap();
    assert_eq!(config.license_path, PathBuf::from("license.json"));
    assert_eq!(config.validity_days, 365);
}

#[test]
fn overrides_beat_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodelock.json");
    std::fs::write(
        &path,
        r#"{"validity_days": 30, "license_path": "state/license.json"}"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        validity_days: Some(90),
        passphrase: Some("s3cret".into()),
        ..ConfigOverrides::default()
    };
    let config = load_config(Some(path.as_path()), overrides).unwrap();
    assert_eq!(config.validity_days, 90);
    assert_eq!(config.passphrase, "s3cret");
    assert_eq!(config.license_path, PathBuf::from("state/license.json"));
}

#[test]
fn zero_validity_override_rejected() {
    let overrides = ConfigOverrides {
        validity_days: Some(0),
        ..ConfigOverrides::default()
    };
    assert!(matches!(
        load_config(None, overrides),
        Err(LicenseError::Config(_))
    ));
}

#[test]
fn missing_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let result = load_config(Some(path.as_path()), ConfigOverrides::default());
    assert!(matches!(result, Err(LicenseError::Config(_))));
}
