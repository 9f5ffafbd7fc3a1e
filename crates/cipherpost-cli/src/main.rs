//! cipherpost CLI
//!
//! Encrypted file upload client.

mod progress;
mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cipherpost_core::{
    IdentityFile, IdentityStore, Registration, Session, SessionState, TransferInfo,
};
use cipherpost_crypto::{KeyPair, encoding};
use progress::{TransferProgress, format_bytes};
use settings::Settings;
use zeroize::Zeroizing;

/// cipherpost - encrypted file upload with checksum verification
#[derive(Parser)]
#[command(name = "cipherpost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Settings file path (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, exchange keys and upload a file
    Send {
        /// File to upload instead of the one named in transfer.info
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Register with the server only
    Register,

    /// Show local identity and configuration
    Status,

    /// Generate an RSA keypair
    Keygen {
        /// Output file for the encoded private key
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load_or_default()?,
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    // Validate settings
    settings.validate()?;

    match cli.command {
        Commands::Send { file } => send_file(file, &settings),
        Commands::Register => register(&settings),
        Commands::Status => show_status(&settings),
        Commands::Keygen { output } => generate_keypair(output),
    }
}

fn load_info(settings: &Settings) -> anyhow::Result<TransferInfo> {
    let path = &settings.files.transfer_info;
    TransferInfo::load(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Upload a file
fn send_file(file: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    let mut info = load_info(settings)?;
    if let Some(file) = file {
        info.file_path = Some(file);
    }

    let path = info.require_file()?.to_path_buf();
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let file_size = std::fs::metadata(&path)?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    println!("File: {}", path.display());
    println!("Size: {}", format_bytes(file_size));
    println!("Server: {}", info.endpoint);
    println!("Client: {}", info.client_name);

    let store = IdentityFile::new(&settings.files.identity);
    let mut session = Session::connect(&info, &settings.transport_config(), store)?;

    let progress = TransferProgress::new(file_size, filename);
    session.set_observer(Box::new(progress.clone()));

    let result = session.run(&info);
    if let Err(e) = session.disconnect() {
        tracing::warn!("Disconnect failed: {}", e);
    }
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };

    match (report.state, report.transfer) {
        (SessionState::Done, Some(outcome)) => {
            progress.finish_with_message(format!(
                "Uploaded {} (checksum {}, {} attempt(s))",
                outcome.filename, outcome.server_checksum, outcome.attempts
            ));
            Ok(())
        }
        (SessionState::FinalFail, Some(outcome)) => {
            progress.abandon();
            anyhow::bail!(
                "Checksum mismatch after {} attempts (local {}, server {})",
                outcome.attempts,
                outcome.local_checksum,
                outcome.server_checksum
            )
        }
        (SessionState::RegistrationFailed, _) => {
            progress.abandon();
            anyhow::bail!("Registration refused and no stored identity to fall back on")
        }
        (SessionState::KeyExchangeFailed, _) => {
            progress.abandon();
            anyhow::bail!("Server refused the key exchange")
        }
        (state, _) => {
            progress.abandon();
            anyhow::bail!("Session stopped in state {:?}", state)
        }
    }
}

/// Register only
fn register(settings: &Settings) -> anyhow::Result<()> {
    let info = load_info(settings)?;
    let store = IdentityFile::new(&settings.files.identity);
    let mut session = Session::connect(&info, &settings.transport_config(), store)?;

    let result = session.register(&info.client_name);
    if let Err(e) = session.disconnect() {
        tracing::warn!("Disconnect failed: {}", e);
    }

    match result? {
        Registration::Accepted { identity, saved } => {
            println!("Registered as {}", identity.name);
            println!("Client ID: {}", identity.id);
            if saved {
                println!("Identity saved to {}", settings.files.identity.display());
            }
        }
        Registration::Rejected {
            returning: Some(identity),
        } => {
            println!("Name already registered; stored identity {}", identity.id);
        }
        Registration::Rejected { returning: None } => {
            anyhow::bail!("Registration refused for {}", info.client_name);
        }
    }

    Ok(())
}

/// Show local state without connecting
fn show_status(settings: &Settings) -> anyhow::Result<()> {
    println!("cipherpost Status");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Configuration ({}):", settings.files.transfer_info.display());
    match TransferInfo::load(&settings.files.transfer_info) {
        Ok(info) => {
            println!("  Server: {}", info.endpoint);
            println!("  Client name: {}", info.client_name);
            match &info.file_path {
                Some(path) => println!("  File: {}", path.display()),
                None => println!("  File: (none)"),
            }
        }
        Err(e) => println!("  unavailable: {e}"),
    }
    println!();

    println!("Identity ({}):", settings.files.identity.display());
    match IdentityFile::new(&settings.files.identity).load() {
        Ok(Some(record)) => {
            println!("  Name: {}", record.identity.name);
            println!("  Client ID: {}", record.identity.id);
            println!(
                "  Private key: {}",
                if record.private_key.is_some() {
                    "stored"
                } else {
                    "not stored"
                }
            );
        }
        Ok(None) => println!("  not registered"),
        Err(e) => println!("  unreadable: {e}"),
    }
    println!();

    let config = settings.transport_config();
    println!("Network:");
    println!("  Connect timeout: {:?}", config.connect_timeout);
    println!("  Read timeout: {:?}", config.read_timeout);
    println!("  Write timeout: {:?}", config.write_timeout);

    Ok(())
}

/// Generate a new RSA keypair
fn generate_keypair(output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Generating new RSA-1024 keypair...");

    let keypair = KeyPair::generate()?;
    let public_key = keypair.public_key().to_der()?;

    println!("Public key: {}", encoding::encode(&public_key));

    if let Some(output_path) = output {
        // Create parent directory if needed
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let private_der = keypair.to_pkcs8_der()?;
        let encoded = Zeroizing::new(encoding::encode(&private_der));
        std::fs::write(&output_path, encoded.as_bytes())?;

        println!("Private key saved to: {}", output_path.display());
        println!("\nKeep this file secure! It contains your private key.");
    } else {
        println!("\nPrivate key not saved (use --output to save)");
    }

    Ok(())
}
