//! Activation protocol: issuing codes, verifying them, and the startup gate.

use crate::code::{self, BASE64URL};
use crate::config::LicenseConfig;
use crate::device::MachineFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::keys::{self, ClientKey, IssuerKey};
use crate::record::{LicenseRecord, LicenseStore};
use base64::Engine;
use chrono::{Days, Local, NaiveDate};
use std::fmt;
use tracing::{debug, info, warn};

/// Today's date on the local clock.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Why an activation code was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The code could not be decoded.
    Format,
    /// The signature does not match this machine and expiry.
    Signature,
    /// The code is genuine but its expiry has passed.
    Expired(NaiveDate),
}

impl InvalidReason {
    /// Short machine-readable name: `format`, `signature` or `expired`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Signature => "signature",
            Self::Expired(_) => "expired",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => f.write_str("the activation code is not in the expected format"),
            Self::Signature => f.write_str("the activation code is not valid for this machine"),
            Self::Expired(on) => write!(f, "the license expired on {on}"),
        }
    }
}

/// Result of checking an activation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The code is genuine, bound to this machine and not expired.
    Valid {
        /// Last day of validity.
        expiry: NaiveDate,
    },
    /// The code was rejected.
    Invalid(InvalidReason),
}

impl Verdict {
    /// Returns true for [`Verdict::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the expiry of a valid code.
    #[must_use]
    pub fn expiry(&self) -> Option<NaiveDate> {
        match self {
            Self::Valid { expiry } => Some(*expiry),
            Self::Invalid(_) => None,
        }
    }

    /// Converts the verdict into a `Result` for callers that treat an
    /// invalid code as an error.
    pub fn into_result(self) -> LicenseResult<NaiveDate> {
        match self {
            Self::Valid { expiry } => Ok(expiry),
            Self::Invalid(InvalidReason::Format) => Err(LicenseError::MalformedActivationCode(
                "activation code could not be decoded".to_string(),
            )),
            Self::Invalid(InvalidReason::Signature) => Err(LicenseError::SignatureInvalid),
            Self::Invalid(InvalidReason::Expired(on)) => Err(LicenseError::Expired(on)),
        }
    }
}

/// An activation produced by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedActivation {
    /// Activation code to hand back to the user.
    pub code: String,
    /// Fingerprint the code is bound to.
    pub fingerprint: String,
    /// Last day of validity.
    pub expiry: NaiveDate,
}

/// Issuer side: turns encrypted fingerprints into signed activation codes.
pub struct LicenseIssuer {
    key: IssuerKey,
    validity_days: u32,
}

impl LicenseIssuer {
    /// Creates an issuer from a loaded private key.
    #[must_use]
    pub fn new(key: IssuerKey, validity_days: u32) -> Self {
        Self { key, validity_days }
    }

    /// Loads the private key named by `config`.
    pub fn from_config(config: &LicenseConfig) -> LicenseResult<Self> {
        config.validate()?;
        let key = keys::load_private_key(&config.private_key_path, &config.passphrase)?;
        Ok(Self::new(key, config.validity_days))
    }

    /// Returns the public key matching this issuer.
    #[must_use]
    pub fn public_key(&self) -> ClientKey {
        self.key.public_key()
    }

    /// Recovers the plaintext fingerprint from an encrypted one.
    ///
    /// # Errors
    ///
    /// [`LicenseError::Decryption`] if the input is not base64url, was not
    /// encrypted for this key, or does not decrypt to UTF-8.
    pub fn decrypt_fingerprint(&self, encrypted: &str) -> LicenseResult<String> {
        let ciphertext = BASE64URL
            .decode(encrypted.trim())
            .map_err(|e| LicenseError::Decryption(format!("invalid base64: {e}")))?;
        let plaintext = self.key.decrypt(&ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| LicenseError::Decryption("fingerprint is not valid UTF-8".to_string()))
    }

    /// Decrypts a client's fingerprint and signs a grant valid for the
    /// configured number of days from `today`.
    pub fn generate_activation(
        &self,
        encrypted_fingerprint: &str,
        today: NaiveDate,
    ) -> LicenseResult<IssuedActivation> {
        let fingerprint = self.decrypt_fingerprint(encrypted_fingerprint)?;
        self.issue_for(&fingerprint, today)
    }

    /// [`generate_activation`](Self::generate_activation) dated by the local clock.
    pub fn generate_activation_now(
        &self,
        encrypted_fingerprint: &str,
    ) -> LicenseResult<IssuedActivation> {
        self.generate_activation(encrypted_fingerprint, today())
    }

    /// Signs a grant for a fingerprint the operator already has in plaintext.
    pub fn issue_for(&self, fingerprint: &str, today: NaiveDate) -> LicenseResult<IssuedActivation> {
        let expiry = today
            .checked_add_days(Days::new(u64::from(self.validity_days)))
            .ok_or_else(|| LicenseError::Config("validity window exceeds the calendar".to_string()))?;

        let message = code::signed_message(fingerprint, expiry);
        let signature = self.key.sign(message.as_bytes())?;
        let code = code::encode(&code::format_expiry(expiry), &signature);

        info!("Issued activation for {fingerprint} valid until {expiry}");
        Ok(IssuedActivation {
            code,
            fingerprint: fingerprint.to_string(),
            expiry,
        })
    }
}

/// Client side: checks activation codes against the bundled public key.
pub struct LicenseVerifier {
    key: ClientKey,
}

impl LicenseVerifier {
    /// Creates a verifier from a loaded public key.
    #[must_use]
    pub fn new(key: ClientKey) -> Self {
        Self { key }
    }

    /// Loads the public key named by `config`.
    pub fn from_config(config: &LicenseConfig) -> LicenseResult<Self> {
        Ok(Self::new(keys::load_public_key(&config.public_key_path)?))
    }

    /// Encrypts a fingerprint for transfer to the issuer.
    pub fn encrypt_machine_id(&self, fingerprint: &str) -> LicenseResult<String> {
        let ciphertext = self.key.encrypt(fingerprint.as_bytes())?;
        Ok(BASE64URL.encode(ciphertext))
    }

    /// Checks `code` for `fingerprint` as of `today`.
    ///
    /// The signed message is rebuilt from the given fingerprint and the
    /// decoded expiry, so a code only verifies on the machine it was issued
    /// for. A code expiring today is still valid.
    #[must_use]
    pub fn verify(&self, fingerprint: &str, code: &str, today: NaiveDate) -> Verdict {
        let decoded = match code::decode(code) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Rejected activation code: {e}");
                return Verdict::Invalid(InvalidReason::Format);
            }
        };

        let message = code::signed_message(fingerprint, decoded.expiry);
        if !self.key.verify(message.as_bytes(), &decoded.signature).is_valid() {
            return Verdict::Invalid(InvalidReason::Signature);
        }

        if decoded.expiry < today {
            return Verdict::Invalid(InvalidReason::Expired(decoded.expiry));
        }

        Verdict::Valid {
            expiry: decoded.expiry,
        }
    }

    /// [`verify`](Self::verify) against the local clock.
    #[must_use]
    pub fn verify_now(&self, fingerprint: &str, code: &str) -> Verdict {
        self.verify(fingerprint, code, today())
    }
}

/// Why the gate is asking for an activation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// No license record is stored.
    NoRecord,
    /// The stored record could not be read.
    CorruptRecord(String),
    /// The stored record belongs to another machine.
    MachineMismatch,
    /// The stored activation code was rejected.
    Invalid(InvalidReason),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRecord => f.write_str("this copy has not been activated"),
            Self::CorruptRecord(_) => f.write_str("the stored license could not be read"),
            Self::MachineMismatch => f.write_str("the stored license belongs to a different machine"),
            Self::Invalid(reason) => write!(f, "{reason}"),
        }
    }
}

/// Why the gate ended without a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user dismissed the prompt.
    Cancelled,
    /// The user submitted an empty code.
    EmptyInput,
    /// The submitted code was rejected.
    Rejected(InvalidReason),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("activation was cancelled"),
            Self::EmptyInput => f.write_str("no activation code was entered"),
            Self::Rejected(reason) => write!(f, "{reason}"),
        }
    }
}

/// Final state of the startup gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The application may start.
    Licensed {
        /// Last day of validity.
        expiry: NaiveDate,
        /// Whether a new code was entered during this run.
        activated: bool,
    },
    /// The application must not start.
    Exited(ExitReason),
}

impl GateOutcome {
    /// Returns true if the application may start.
    #[must_use]
    pub fn is_licensed(&self) -> bool {
        matches!(self, Self::Licensed { .. })
    }
}

/// Asks the user for an activation code.
///
/// Implementations block until the user submits or dismisses the prompt.
pub trait ActivationPrompt {
    /// Shows `encrypted_fingerprint` (to send to the issuer) and the reason
    /// activation is needed, and returns the entered code, or `None` if the
    /// user cancelled.
    fn request_code(
        &mut self,
        encrypted_fingerprint: &str,
        reason: &DenialReason,
    ) -> Option<String>;

    /// Tells the user why the submitted code was not accepted.
    fn report_rejection(&mut self, _reason: &ExitReason) {}
}

/// Decides at startup whether the application may run.
///
/// A stored record is accepted if it belongs to this machine and its code
/// verifies; otherwise the user gets exactly one chance to enter a code.
pub struct StartupGate {
    verifier: LicenseVerifier,
    store: LicenseStore,
}

impl StartupGate {
    /// Builds a gate from `config`.
    ///
    /// # Errors
    ///
    /// [`LicenseError::KeyFileMissing`] if the public key is absent. Callers
    /// must not start the application in that case.
    pub fn new(config: &LicenseConfig) -> LicenseResult<Self> {
        Ok(Self::with_parts(
            LicenseVerifier::from_config(config)?,
            LicenseStore::new(&config.license_path),
        ))
    }

    /// Builds a gate from an existing verifier and store.
    #[must_use]
    pub fn with_parts(verifier: LicenseVerifier, store: LicenseStore) -> Self {
        Self { verifier, store }
    }

    /// Returns the verifier.
    #[must_use]
    pub fn verifier(&self) -> &LicenseVerifier {
        &self.verifier
    }

    /// Checks the stored record without prompting.
    ///
    /// The record's own `expiry_date` is not consulted; the expiry comes
    /// from the signed code.
    pub fn check(&self, fingerprint: &str, today: NaiveDate) -> Result<NaiveDate, DenialReason> {
        let record = match self.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => return Err(DenialReason::NoRecord),
            Err(e) => {
                warn!("Ignoring license record: {e}");
                return Err(DenialReason::CorruptRecord(e.to_string()));
            }
        };

        if record.machine_id != fingerprint {
            warn!(
                "License record was activated for {}, this machine is {fingerprint}",
                record.machine_id
            );
            return Err(DenialReason::MachineMismatch);
        }

        match self.verifier.verify(fingerprint, &record.activation_code, today) {
            Verdict::Valid { expiry } => Ok(expiry),
            Verdict::Invalid(reason) => {
                warn!("Stored activation code rejected: {}", reason.as_str());
                Err(DenialReason::Invalid(reason))
            }
        }
    }

    /// Runs the gate for `fingerprint` as of `today`.
    ///
    /// Returns `Err` only for failures that make licensing impossible
    /// (the fingerprint cannot be encrypted). A rejected or cancelled
    /// activation is an [`GateOutcome::Exited`].
    pub fn run(
        &self,
        fingerprint: &str,
        today: NaiveDate,
        prompt: &mut dyn ActivationPrompt,
    ) -> LicenseResult<GateOutcome> {
        let reason = match self.check(fingerprint, today) {
            Ok(expiry) => {
                info!("License valid until {expiry}");
                return Ok(GateOutcome::Licensed {
                    expiry,
                    activated: false,
                });
            }
            Err(reason) => reason,
        };

        info!("Activation required: {reason}");
        let encrypted = self.verifier.encrypt_machine_id(fingerprint)?;

        let Some(input) = prompt.request_code(&encrypted, &reason) else {
            info!("Activation cancelled by user");
            return Ok(GateOutcome::Exited(ExitReason::Cancelled));
        };

        let code = input.trim();
        if code.is_empty() {
            prompt.report_rejection(&ExitReason::EmptyInput);
            return Ok(GateOutcome::Exited(ExitReason::EmptyInput));
        }

        match self.verifier.verify(fingerprint, code, today) {
            Verdict::Valid { expiry } => {
                let record = LicenseRecord::new(fingerprint, code, expiry);
                if let Err(e) = self.store.save(&record) {
                    // The code is genuine; the next start will simply ask again.
                    warn!("Activation accepted but not saved: {e}");
                }
                info!("Activated until {expiry}");
                Ok(GateOutcome::Licensed {
                    expiry,
                    activated: true,
                })
            }
            Verdict::Invalid(reason) => {
                warn!("Submitted activation code rejected: {}", reason.as_str());
                let exit = ExitReason::Rejected(reason);
                prompt.report_rejection(&exit);
                Ok(GateOutcome::Exited(exit))
            }
        }
    }

    /// Runs the gate for this machine on today's date.
    pub fn run_now(&self, prompt: &mut dyn ActivationPrompt) -> LicenseResult<GateOutcome> {
        let fingerprint = MachineFingerprint::resolve();
        self.run(fingerprint.id(), today(), prompt)
    }
}

/// Checks the stored license for this machine without prompting.
///
/// # Errors
///
/// Only key problems ([`LicenseError::KeyFileMissing`],
/// [`LicenseError::KeyLoad`]); every licensing outcome is `Ok(bool)`.
pub fn verify_license(config: &LicenseConfig) -> LicenseResult<bool> {
    let gate = StartupGate::new(config)?;
    let fingerprint = MachineFingerprint::resolve();
    Ok(gate.check(fingerprint.id(), today()).is_ok())
}

/// Returns this machine's fingerprint encrypted for the issuer.
pub fn encrypt_machine_id(config: &LicenseConfig) -> LicenseResult<String> {
    let verifier = LicenseVerifier::from_config(config)?;
    verifier.encrypt_machine_id(MachineFingerprint::resolve().id())
}
