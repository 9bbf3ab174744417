//! Terminal front end for the nodelock licensing crate.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use nodelock_license::{ActivationPrompt, DenialReason, ExitReason, LicenseConfig, LicenseResult};
use tracing::warn;

/// Asks for an activation code on a text stream.
///
/// The reason and the encrypted fingerprint go to `output`; one line is read
/// from `input`. End of input counts as a cancel.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Returns the output stream, mainly for inspecting what was shown.
    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, encrypted_fingerprint: &str, reason: &DenialReason) -> std::io::Result<()> {
        writeln!(self.output, "Activation required: {reason}.")?;
        writeln!(self.output)?;
        writeln!(self.output, "Send this machine code to your license issuer:")?;
        writeln!(self.output)?;
        writeln!(self.output, "    {encrypted_fingerprint}")?;
        writeln!(self.output)?;
        write!(self.output, "Activation code: ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> ActivationPrompt for TerminalPrompt<R, W> {
    fn request_code(&mut self, encrypted_fingerprint: &str, reason: &DenialReason) -> Option<String> {
        if let Err(e) = self.show(encrypted_fingerprint, reason) {
            warn!("Could not write activation prompt: {e}");
            return None;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                warn!("Could not read activation code: {e}");
                None
            }
        }
    }

    fn report_rejection(&mut self, reason: &ExitReason) {
        if let Err(e) = writeln!(self.output, "Activation failed: {reason}.") {
            warn!("Could not write activation result: {e}");
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub private_key: Option<PathBuf>,
    pub public_key: Option<PathBuf>,
    pub license: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub validity_days: Option<u32>,
}

impl ConfigOverrides {
    /// Applies the overrides on top of `config`.
    pub fn apply(self, mut config: LicenseConfig) -> LicenseResult<LicenseConfig> {
        if let Some(path) = self.private_key {
            config.private_key_path = path;
        }
        if let Some(path) = self.public_key {
            config.public_key_path = path;
        }
        if let Some(path) = self.license {
            config.license_path = path;
        }
        if let Some(passphrase) = self.passphrase {
            config.passphrase = passphrase;
        }
        if let Some(days) = self.validity_days {
            config.validity_days = days;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Loads the config file, if any, and applies the overrides.
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> LicenseResult<LicenseConfig> {
    let base = match path {
        Some(path) => LicenseConfig::from_file(path)?,
        None => LicenseConfig::default(),
    };
    overrides.apply(base)
}
