//! SafeRelay command-line interface

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use saferelay::config::SafeRelayConfig;
use saferelay::detect::PatternDetector;
use saferelay::keystore::FileKeyStore;
use saferelay::message::MessageStore;
use saferelay::phishing::PhishingScanner;
use saferelay::relay::{SecureRelay, SendOutcome};
use saferelay::tokenize::Tokenizer;
use saferelay::transfer::{parse_transfer_id, FileSplitter, Reconstructor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "saferelay")]
#[command(about = "Data protection pipeline for secure messaging", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "SAFERELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect sensitive data in text
    Detect {
        /// Text to scan
        text: String,
    },

    /// Tokenize sensitive data and print the redacted text
    Tokenize {
        /// Text to tokenize
        text: String,
    },

    /// Scan text for phishing signals
    Scan {
        /// Text to scan
        text: String,

        /// Treat the argument as a single URL and print its verdict
        #[arg(long)]
        url: bool,
    },

    /// Split and encrypt a file for a two-channel transfer
    Split {
        /// File to split
        file: PathBuf,
    },

    /// Reconstruct a transfer from its primary part and secondary package
    Reconstruct {
        /// Primary part file
        primary: PathBuf,

        /// Secondary package file
        package: PathBuf,

        /// Transfer id (parsed from the package filename when omitted)
        #[arg(long)]
        transfer_id: Option<String>,
    },

    /// Send a message through the full protection pipeline
    Send {
        /// Message text
        text: String,
    },

    /// Print the active configuration
    Config {
        /// Print the built-in defaults instead of the loaded file
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saferelay=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saferelay=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect { text } => {
            let detector = PatternDetector::new()?;
            let findings = detector.detect(&text);
            if findings.is_empty() {
                println!("No sensitive data detected");
            }
            for finding in findings {
                println!(
                    "{:>6}  [{}..{}]  {}",
                    finding.kind.token_prefix(),
                    finding.span.start,
                    finding.span.end,
                    finding.value
                );
            }
        }

        Commands::Tokenize { text } => {
            let detector = Arc::new(PatternDetector::new()?);
            let key_store = FileKeyStore::new(config.storage.keys_dir.clone())?;
            let tokenizer = Tokenizer::new(detector, &key_store)?;
            let (redacted, tokens) = tokenizer.tokenize(&text);
            println!("{}", redacted);
            for (token, original) in &tokens {
                println!("  {} <- {}", token, original);
            }
        }

        Commands::Scan { text, url } => {
            let scanner = PhishingScanner::new()?;
            if url {
                println!("{:?}", scanner.scan_url(&text));
            } else {
                let findings = scanner.scan(&text);
                if findings.is_empty() {
                    println!("No phishing signals");
                }
                for finding in findings {
                    println!("  {}", finding);
                }
            }
        }

        Commands::Split { file } => {
            let splitter = FileSplitter::new(&config.transfer)?;
            let outcome = splitter.split_and_encrypt(&file).await?;
            println!("Transfer id: {}", outcome.transfer_id);
            println!("Primary part: {}", outcome.primary_part.display());
            println!("Secondary package: {}", outcome.secondary_package.display());
        }

        Commands::Reconstruct {
            primary,
            package,
            transfer_id,
        } => {
            let transfer_id = match transfer_id {
                Some(id) => id,
                None => {
                    let name = package
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    match parse_transfer_id(&name) {
                        Some(id) => id.to_string(),
                        None => bail!(
                            "cannot parse transfer id from '{}'; pass --transfer-id",
                            name
                        ),
                    }
                }
            };

            let package_bytes = tokio::fs::read(&package)
                .await
                .with_context(|| format!("reading {}", package.display()))?;
            let reconstructor = Reconstructor::new(config.transfer.output_dir.clone());
            let outcome = reconstructor
                .reconstruct(&transfer_id, &primary, &package_bytes)
                .await?;
            match outcome.path() {
                Some(path) => println!("Reconstructed: {}", path.display()),
                None => println!("Reconstruction already in flight"),
            }
        }

        Commands::Send { text } => {
            let key_store = FileKeyStore::new(config.storage.keys_dir.clone())?;
            let store = Arc::new(MessageStore::open(config.storage.messages_file.clone()).await?);
            let relay = SecureRelay::new(&config, &key_store, store)?;

            match relay.send_message(&text).await? {
                SendOutcome::Sent(record) => {
                    println!("Sent ({})", record.id);
                    if let Some(tokenized) = &record.tokenized_content {
                        println!("Redacted: {}", tokenized);
                    }
                }
                SendOutcome::PhishingSuspected(findings) => {
                    println!("Held: phishing signals");
                    for finding in findings {
                        println!("  {}", finding);
                    }
                }
                SendOutcome::SensitivePrompt(findings) => {
                    println!("Held: sensitive data found (auto-tokenize is off)");
                    for finding in findings {
                        println!("  {}: {}", finding.kind.token_prefix(), finding.value);
                    }
                }
            }
        }

        Commands::Config { default } => {
            let config = if default {
                SafeRelayConfig::default()
            } else {
                config
            };
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<SafeRelayConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(SafeRelayConfig::default()),
    }
}
