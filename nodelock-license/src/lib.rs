//! Offline, machine-bound license activation.
//!
//! This crate handles:
//! - Machine fingerprinting (network adapter address, hostname fallback)
//! - RSA-OAEP encryption of the fingerprint for transfer to the issuer
//! - RSA-PSS signed, time-limited activation codes
//! - Local license caching and the startup gate
//!
//! # Protocol
//!
//! 1. The client encrypts its fingerprint with the bundled public key and
//!    the user sends the result to the issuer by any channel.
//! 2. The issuer decrypts it and signs `"{fingerprint}|{expiry}"`.
//! 3. The user pastes the activation code back into the client, which
//!    verifies it against its own fingerprint and caches it.
//!
//! No server is involved; a code is only useful on the machine whose
//! fingerprint it was signed for.
//!
//! # Activation Code Format
//!
//! `base64url(expiry)|base64url(signature)`, where `expiry` is a `YYYY-MM-DD`
//! date.

mod code;
mod config;
mod device;
mod engine;
mod error;
mod keys;
mod record;

pub use code::{decode, encode, format_expiry, parse_expiry, signed_message, ActivationCode};
pub use config::{LicenseConfig, DEFAULT_PASSPHRASE, DEFAULT_VALIDITY_DAYS};
pub use device::{DeviceInfo, FingerprintSource, MachineFingerprint};
pub use engine::{
    encrypt_machine_id, today, verify_license, ActivationPrompt, DenialReason, ExitReason,
    GateOutcome, InvalidReason, IssuedActivation, LicenseIssuer, LicenseVerifier, StartupGate,
    Verdict,
};
pub use error::{LicenseError, LicenseResult};
pub use keys::{
    generate_key_pair, load_private_key, load_public_key, resolve_resource_path, write_key_pair,
    ClientKey, IssuerKey, SignatureCheck, DEFAULT_KEY_BITS, MIN_KEY_BITS,
};
pub use record::{LicenseRecord, LicenseStore};
