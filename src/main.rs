//! photo-attest command line.
//!
//! ```text
//! photo-attest [--config attest.toml] attest <image>   full pipeline
//! photo-attest upload <image>                          unsigned upload
//! photo-attest hash <image>                            content hash only
//! photo-attest list | delete <id>                      stored photos
//! ```
//!
//! `<image>` is a file path or a `data:image/...;base64,` URL. The signing key
//! is read from `PHOTO_ATTEST_PRIVATE_KEY`.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;

use photo_attest::anchor::LedgerAnchorClient;
use photo_attest::attestation::{hash, CapturedImage, SignatureBundle};
use photo_attest::blockchain::{BlockchainClient, ConfirmationMonitor};
use photo_attest::config::{load_config, AttestConfig};
use photo_attest::identity::{IdentityProvider, LocalWallet};
use photo_attest::observability::logging::init_logging;
use photo_attest::pipeline::{AttestationPipeline, PipelineError, StaticChallenge};
use photo_attest::upload::UploadClient;

#[derive(Parser)]
#[command(name = "photo-attest")]
#[command(about = "Attest photos, store them and anchor the attestation on a ledger", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash, sign, upload and anchor an image
    Attest { image: String },
    /// Upload an image without an attestation
    Upload { image: String },
    /// Print an image's content hash
    Hash { image: String },
    /// List stored photos
    List,
    /// Delete a stored photo
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AttestConfig::default(),
    };

    init_logging(&config.observability);

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: AttestConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Hash { image } => {
            let image = read_image(&image)?;
            println!("{}", hash(image.bytes())?);
        }
        Commands::Upload { image } => {
            let image = read_image(&image)?;
            let uploader = UploadClient::new(&config.upload)?;
            let artifact = uploader.upload(&image, &SignatureBundle::Unsigned).await?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
        Commands::List => {
            let uploader = UploadClient::new(&config.upload)?;
            let photos = uploader.list_photos().await?;
            println!("{}", serde_json::to_string_pretty(&photos)?);
        }
        Commands::Delete { id } => {
            let uploader = UploadClient::new(&config.upload)?;
            uploader.delete_photo(id).await?;
            println!("Deleted photo {}", id);
        }
        Commands::Attest { image } => {
            let image = read_image(&image)?;
            return attest(image, &config).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn attest(image: CapturedImage, config: &AttestConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if config.anchor.contract_address.trim().is_empty() {
        return Err("anchor.contract_address must be set to attest".into());
    }
    let contract: Address = config.anchor.contract_address.trim().parse()?;

    let client = BlockchainClient::new(config.blockchain.clone()).await?;
    let wallet = LocalWallet::from_env(config.blockchain.chain_id)?.with_client(client.clone());
    let identity: Arc<dyn IdentityProvider> = Arc::new(wallet);

    let monitor = ConfirmationMonitor::new(
        client,
        Duration::from_millis(config.anchor.poll_interval_ms),
        Duration::from_secs(config.anchor.confirmation_timeout_secs),
    );
    let anchor = LedgerAnchorClient::new(identity.clone(), Arc::new(monitor), contract);
    let uploader = UploadClient::new(&config.upload)?;
    let challenges = Arc::new(StaticChallenge::new(config.challenge.value.clone()));

    let pipeline = AttestationPipeline::new(identity, uploader, anchor, challenges);

    let mut states = pipeline.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let message = states.borrow_and_update().status_message();
            eprintln!("{}", message);
        }
    });

    pipeline.capture(image)?;

    // Ctrl-C stops waiting; anything already submitted stays submitted.
    let result = pipeline
        .attest_with_cancel(interrupted(tokio::signal::ctrl_c()))
        .await;

    drop(pipeline);
    let _ = progress.await;

    match result {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Failed(error)) => {
            eprintln!("Error: {}", error.user_message());
            if let Some(artifact) = &error.artifact {
                eprintln!("The photo was stored at {} but is not anchored.", artifact.url());
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_image(source: &str) -> Result<CapturedImage, Box<dyn std::error::Error>> {
    let image = if source.starts_with("data:") {
        CapturedImage::from_data_url(source)?
    } else {
        CapturedImage::from_path(Path::new(source))?
    };
    Ok(image)
}

/// Resolves once `signal` fires. A handler that could not be installed
/// never fires, so the attempt runs to completion instead of being
/// abandoned at once.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable; attempt cannot be interrupted");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_fires_on_signal() {
        let fired = tokio::time::timeout(Duration::from_millis(100), interrupted(async { Ok(()) })).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_missing_handler_never_interrupts() {
        let failed = async { Err(std::io::Error::other("signal driver unavailable")) };
        let fired = tokio::time::timeout(Duration::from_millis(100), interrupted(failed)).await;
        assert!(fired.is_err());
    }
}
