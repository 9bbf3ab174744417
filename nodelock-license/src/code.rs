//! Activation code encoding.
//!
//! An activation code is `base64url(expiry)|base64url(signature)`, where
//! `expiry` is the `YYYY-MM-DD` date string. Users copy
//! these by hand, so the format must stay stable.
//!
//! This module is purely structural: it never touches keys, so a garbled
//! code is reported separately from a code with a bad signature.

use crate::error::{LicenseError, LicenseResult};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::NaiveDate;

/// Separator between the two fields of an activation code.
pub const SEPARATOR: char = '|';

/// Date format of the embedded expiry.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// URL-safe base64 that emits padding but accepts tokens with or without it.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The decoded fields of an activation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCode {
    /// Last day on which the license is valid.
    pub expiry: NaiveDate,
    /// RSA-PSS signature over `"{fingerprint}|{expiry}"`.
    pub signature: Vec<u8>,
}

impl ActivationCode {
    /// Creates an activation code from its parts.
    #[must_use]
    pub fn new(expiry: NaiveDate, signature: Vec<u8>) -> Self {
        Self { expiry, signature }
    }

    /// Returns the expiry as the `YYYY-MM-DD` string that was signed.
    #[must_use]
    pub fn expiry_str(&self) -> String {
        format_expiry(self.expiry)
    }

    /// Encodes this code for transport.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.expiry_str(), &self.signature)
    }

    /// Parses a transported code. See [`decode`].
    pub fn parse(code: &str) -> LicenseResult<Self> {
        decode(code)
    }
}

/// Formats a date the way it is embedded in codes and signed messages.
#[must_use]
pub fn format_expiry(date: NaiveDate) -> String {
    date.format(EXPIRY_FORMAT).to_string()
}

/// Builds the message that the issuer signs: `"{fingerprint}|{expiry}"`.
#[must_use]
pub fn signed_message(fingerprint: &str, expiry: NaiveDate) -> String {
    format!("{fingerprint}{SEPARATOR}{}", format_expiry(expiry))
}

/// Encodes an expiry string and signature into an activation code.
#[must_use]
pub fn encode(expiry: &str, signature: &[u8]) -> String {
    format!(
        "{}{SEPARATOR}{}",
        BASE64URL.encode(expiry.as_bytes()),
        BASE64URL.encode(signature)
    )
}

/// Decodes an activation code.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`LicenseError::MalformedActivationCode`] unless the code has exactly two
/// `|`-separated, base64url-decodable fields;
/// [`LicenseError::InvalidExpiryFormat`] if the first field is not a
/// `YYYY-MM-DD` date.
pub fn decode(code: &str) -> LicenseResult<ActivationCode> {
    let parts: Vec<&str> = code.trim().split(SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(LicenseError::MalformedActivationCode(format!(
            "expected 2 fields separated by '{SEPARATOR}', found {}",
            parts.len()
        )));
    }

    let expiry_bytes = BASE64URL.decode(parts[0]).map_err(|e| {
        LicenseError::MalformedActivationCode(format!("invalid expiry base64: {e}"))
    })?;
    let signature = BASE64URL.decode(parts[1]).map_err(|e| {
        LicenseError::MalformedActivationCode(format!("invalid signature base64: {e}"))
    })?;
    if signature.is_empty() {
        return Err(LicenseError::MalformedActivationCode(
            "empty signature".to_string(),
        ));
    }

    let expiry_str = String::from_utf8(expiry_bytes)
        .map_err(|_| LicenseError::InvalidExpiryFormat("expiry is not UTF-8".to_string()))?;

    Ok(ActivationCode {
        expiry: parse_expiry(&expiry_str)?,
        signature,
    })
}

/// Parses a strict `YYYY-MM-DD` date.
///
/// The date must be exactly the string [`format_expiry`] would produce, so
/// the expiry that was signed and the one that is checked cannot differ.
pub fn parse_expiry(s: &str) -> LicenseResult<NaiveDate> {
    // chrono skips leading whitespace and accepts signs and unpadded fields.
    NaiveDate::parse_from_str(s, EXPIRY_FORMAT)
        .ok()
        .filter(|date| format_expiry(*date) == s)
        .ok_or_else(|| LicenseError::InvalidExpiryFormat(s.to_string()))
}
