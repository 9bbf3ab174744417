//! nodelock: offline license activation tool
//!
//! The same binary serves both sides of the exchange:
//! 1. Issuer: `keygen` once, then `issue` for every encrypted fingerprint received
//! 2. Client: `fingerprint` to obtain the code to send, `activate` to enter the reply
//!
//! Usage:
//!   nodelock keygen
//!   nodelock issue <ENCRYPTED>
//!   nodelock activate
//!
//! No network access is needed on either side.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use nodelock_cli::{load_config, ConfigOverrides, TerminalPrompt};
use nodelock_license::{
    generate_key_pair, write_key_pair, DeviceInfo, GateOutcome, LicenseConfig, LicenseIssuer,
    LicenseStore, LicenseVerifier, MachineFingerprint, StartupGate, Verdict, DEFAULT_KEY_BITS,
    today,
};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "nodelock", version)]
#[command(about = "Offline, machine-bound license activation")]
struct Args {
    /// JSON config file; command-line options override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Issuer private key (PEM)
    #[arg(long, global = true)]
    private_key: Option<PathBuf>,

    /// Client public key (PEM)
    #[arg(long, global = true)]
    public_key: Option<PathBuf>,

    /// License record file
    #[arg(long, global = true)]
    license: Option<PathBuf>,

    /// Days an issued activation stays valid
    #[arg(long, global = true)]
    validity_days: Option<u32>,

    /// Passphrase for the private key
    #[arg(long, env = "NODELOCK_PASSPHRASE", hide_env_values = true, global = true)]
    passphrase: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the issuer key pair
    Keygen {
        /// RSA modulus size
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,

        /// Replace existing key files
        #[arg(long)]
        force: bool,
    },
    /// Sign an activation code for a client
    #[command(group(ArgGroup::new("source").required(true).args(["encrypted", "fingerprint"])))]
    Issue {
        /// Encrypted fingerprint sent by the client
        encrypted: Option<String>,

        /// Plaintext fingerprint, when already known
        #[arg(long)]
        fingerprint: Option<String>,
    },
    /// Show this machine's fingerprint and the code to send to the issuer
    Fingerprint {
        /// Also show the device details used for the fallback fingerprint
        #[arg(long)]
        details: bool,
    },
    /// Check an activation code without storing it
    Verify {
        code: String,

        /// Check against this fingerprint instead of the current machine's
        #[arg(long)]
        fingerprint: Option<String>,
    },
    /// Check the stored license and prompt for a code if needed
    Activate,
    /// Delete the stored license record
    Reset,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let overrides = ConfigOverrides {
        private_key: args.private_key,
        public_key: args.public_key,
        license: args.license,
        passphrase: args.passphrase,
        validity_days: args.validity_days,
    };
    let config =
        load_config(args.config.as_deref(), overrides).context("Failed to load configuration")?;
    debug!("Using {config:?}");

    match args.command {
        Command::Keygen { bits, force } => keygen(&config, bits, force),
        Command::Issue {
            encrypted,
            fingerprint,
        } => issue(&config, encrypted, fingerprint),
        Command::Fingerprint { details } => show_fingerprint(&config, details),
        Command::Verify { code, fingerprint } => verify(&config, &code, fingerprint),
        Command::Activate => activate(&config),
        Command::Reset => reset(&config),
    }
}

fn keygen(config: &LicenseConfig, bits: usize, force: bool) -> Result<ExitCode> {
    info!("Generating {bits}-bit RSA key pair...");
    let key = generate_key_pair(bits).context("Failed to generate key pair")?;
    write_key_pair(
        &key,
        &config.private_key_path,
        &config.public_key_path,
        &config.passphrase,
        force,
    )
    .context("Failed to write key pair")?;

    println!("Private key: {}", config.private_key_path.display());
    println!("Public key:  {}", config.public_key_path.display());
    Ok(ExitCode::SUCCESS)
}

fn issue(
    config: &LicenseConfig,
    encrypted: Option<String>,
    fingerprint: Option<String>,
) -> Result<ExitCode> {
    let issuer = LicenseIssuer::from_config(config).context("Failed to load issuer key")?;
    let issued = match (encrypted, fingerprint) {
        (_, Some(fingerprint)) => issuer.issue_for(&fingerprint, today()),
        (Some(encrypted), None) => issuer.generate_activation_now(&encrypted),
        (None, None) => anyhow::bail!("an encrypted fingerprint or --fingerprint is required"),
    }
    .context("Failed to issue activation code")?;

    println!("Fingerprint: {}", issued.fingerprint);
    println!("Expires:     {}", issued.expiry);
    println!("Activation code:");
    println!("{}", issued.code);
    Ok(ExitCode::SUCCESS)
}

fn show_fingerprint(config: &LicenseConfig, details: bool) -> Result<ExitCode> {
    let fp = MachineFingerprint::resolve();
    let verifier = LicenseVerifier::from_config(config).context("Failed to load public key")?;
    let encrypted = verifier
        .encrypt_machine_id(fp.id())
        .context("Failed to encrypt fingerprint")?;

    println!("Fingerprint: {fp} ({:?})", fp.source());
    if details {
        let info = DeviceInfo::collect();
        println!("Hostname:    {}", info.hostname);
        println!("OS:          {}", info.os_name);
        println!("Arch:        {}", info.arch);
    }
    println!("Machine code:");
    println!("{encrypted}");
    Ok(ExitCode::SUCCESS)
}

fn verify(config: &LicenseConfig, code: &str, fingerprint: Option<String>) -> Result<ExitCode> {
    let verifier = LicenseVerifier::from_config(config).context("Failed to load public key")?;
    let fingerprint = fingerprint.unwrap_or_else(|| MachineFingerprint::resolve().id().to_string());

    match verifier.verify_now(&fingerprint, code) {
        Verdict::Valid { expiry } => {
            println!("valid until {expiry}");
            Ok(ExitCode::SUCCESS)
        }
        Verdict::Invalid(reason) => {
            println!("invalid ({}): {reason}", reason.as_str());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn activate(config: &LicenseConfig) -> Result<ExitCode> {
    let gate = StartupGate::new(config).context("Failed to load public key")?;
    let stdin = io::stdin();
    let mut prompt = TerminalPrompt::new(stdin.lock(), io::stderr());

    match gate.run_now(&mut prompt).context("Activation failed")? {
        GateOutcome::Licensed { expiry, activated } => {
            if activated {
                println!("Activated. License valid until {expiry}");
            } else {
                println!("License valid until {expiry}");
            }
            Ok(ExitCode::SUCCESS)
        }
        GateOutcome::Exited(reason) => {
            eprintln!("Not licensed: {reason}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn reset(config: &LicenseConfig) -> Result<ExitCode> {
    let store = LicenseStore::new(&config.license_path);
    if !store.exists() {
        println!("No license record at {}", store.path().display());
        return Ok(ExitCode::SUCCESS);
    }
    store.clear().context("Failed to delete license record")?;
    println!("Removed {}", store.path().display());
    Ok(ExitCode::SUCCESS)
}
