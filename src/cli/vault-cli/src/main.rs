//! vault-transit - Command line interface for Vault transit keys.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_client::{
    Client, ClientConfig, HashAlgorithm, KeyOptions, KeyType, SignOptions, VerifyOptions,
};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "vault-transit")]
#[command(about = "Create transit keys, sign and verify data through Vault")]
#[command(version)]
struct Cli {
    /// Vault server address
    #[arg(long, default_value = "http://127.0.0.1:8200", env = "VAULT_ADDR")]
    addr: String,

    /// Authentication token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "7", env = "VAULT_CLIENT_TIMEOUT")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transit engine commands
    Transit {
        #[command(subcommand)]
        command: TransitCommands,
    },
}

#[derive(Subcommand)]
enum TransitCommands {
    /// Create a key
    Create {
        /// Key name
        name: String,
        /// Key type (ed25519, ecdsa-p256, rsa-2048, aes256-gcm96, ...)
        #[arg(long = "type")]
        key_type: Option<KeyType>,
        /// Allow the key to be exported
        #[arg(long)]
        exportable: bool,
        /// Enable key derivation
        #[arg(long)]
        derived: bool,
        /// Extra key=value options sent as-is
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },
    /// Sign a message
    Sign {
        /// Key name
        key: String,
        #[command(flatten)]
        input: InputArgs,
        /// Hash algorithm (sha2-256, sha2-512, ...)
        #[arg(long)]
        hash_algorithm: Option<HashAlgorithm>,
        /// Key version to sign with
        #[arg(long)]
        key_version: Option<u32>,
    },
    /// Verify a signature
    Verify {
        /// Key name
        key: String,
        /// Signature returned by `sign`
        signature: String,
        #[command(flatten)]
        input: InputArgs,
        /// Hash algorithm used when signing
        #[arg(long)]
        hash_algorithm: Option<HashAlgorithm>,
    },
    /// Show key metadata
    Read {
        /// Key name
        name: String,
    },
    /// List key names
    List,
    /// Rotate a key to a new version
    Rotate {
        /// Key name
        name: String,
    },
    /// Delete a key (requires deletion_allowed)
    Delete {
        /// Key name
        name: String,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Message to process
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    message: Option<String>,
    /// Read the message from a file instead
    #[arg(long)]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn read(&self) -> Result<Vec<u8>> {
        match (&self.message, &self.file) {
            (Some(message), _) => Ok(message.as_bytes().to_vec()),
            (None, Some(path)) => std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, None) => bail!("A message or --file is required"),
        }
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_transit_create(
    client: &Client,
    name: &str,
    key_type: Option<KeyType>,
    exportable: bool,
    derived: bool,
    pairs: &[String],
) -> Result<()> {
    let mut options = KeyOptions {
        key_type,
        exportable: exportable.then_some(true),
        derived: derived.then_some(true),
        ..KeyOptions::default()
    };
    for pair in pairs {
        let (field, value) = parse_option(pair)?;
        options.extra.insert(field, value);
    }

    client
        .transit()
        .create_key(name, &options)
        .await
        .with_context(|| format!("Create key '{}' failed", name))?;

    println!("Key '{}' created", name);
    Ok(())
}

async fn cmd_transit_sign(
    client: &Client,
    key: &str,
    input: &InputArgs,
    hash_algorithm: Option<HashAlgorithm>,
    key_version: Option<u32>,
) -> Result<()> {
    let message = input.read()?;
    let options = SignOptions {
        hash_algorithm,
        key_version,
        ..SignOptions::default()
    };

    let signature = client
        .transit()
        .sign(key, &message, &options)
        .await
        .with_context(|| format!("Sign with key '{}' failed", key))?;

    println!("{}", signature);
    Ok(())
}

async fn cmd_transit_verify(
    client: &Client,
    key: &str,
    signature: &str,
    input: &InputArgs,
    hash_algorithm: Option<HashAlgorithm>,
) -> Result<bool> {
    let message = input.read()?;
    let options = VerifyOptions {
        hash_algorithm,
        ..VerifyOptions::default()
    };

    let valid = client
        .transit()
        .verify_signature(key, &message, signature, &options)
        .await
        .with_context(|| format!("Verify with key '{}' failed", key))?;

    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(valid)
}

async fn cmd_transit_read(client: &Client, name: &str) -> Result<()> {
    let info = client
        .transit()
        .read_key(name)
        .await
        .with_context(|| format!("Read key '{}' failed", name))?;

    println!("Key '{}':", info.name);
    println!("  Type:              {}", info.key_type);
    println!("  Latest version:    {}", info.latest_version);
    println!("  Min decryption:    {}", info.min_decryption_version);
    println!("  Min encryption:    {}", info.min_encryption_version);
    println!("  Supports signing:  {}", info.supports_signing);
    println!("  Exportable:        {}", info.exportable);
    println!("  Deletion allowed:  {}", info.deletion_allowed);

    Ok(())
}

async fn cmd_transit_list(client: &Client) -> Result<()> {
    let keys = client
        .transit()
        .list_keys()
        .await
        .context("List keys failed")?;

    if keys.is_empty() {
        println!("No keys found");
    } else {
        println!("Keys:");
        for key in &keys {
            println!("  {}", key);
        }
    }

    Ok(())
}

async fn cmd_transit_rotate(client: &Client, name: &str) -> Result<()> {
    client
        .transit()
        .rotate_key(name)
        .await
        .with_context(|| format!("Rotate key '{}' failed", name))?;
    println!("Key '{}' rotated", name);
    Ok(())
}

async fn cmd_transit_delete(client: &Client, name: &str) -> Result<()> {
    client
        .transit()
        .delete_key(name)
        .await
        .with_context(|| format!("Delete key '{}' failed", name))?;
    println!("Key '{}' deleted", name);
    Ok(())
}

/// Splits `field=value`; the value is read as JSON when it parses, else kept
/// as a string.
fn parse_option(pair: &str) -> Result<(String, Value)> {
    let Some((field, raw)) = pair.split_once('=') else {
        bail!("Invalid option: {}. Use format: key=value", pair);
    };
    if field.is_empty() {
        bail!("Invalid option: {}. Key cannot be empty", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let token = cli
        .token
        .context("Authentication token required. Set VAULT_TOKEN or use --token")?;

    let config = ClientConfig::new(cli.addr, token).with_timeout(Duration::from_secs(cli.timeout));
    let client = Client::new(config).context("Failed to create client")?;

    tracing::debug!(addr = client.address(), "client ready");

    let Commands::Transit { command } = cli.command;
    match command {
        TransitCommands::Create {
            name,
            key_type,
            exportable,
            derived,
            options,
        } => cmd_transit_create(&client, &name, key_type, exportable, derived, &options).await?,
        TransitCommands::Sign {
            key,
            input,
            hash_algorithm,
            key_version,
        } => cmd_transit_sign(&client, &key, &input, hash_algorithm, key_version).await?,
        TransitCommands::Verify {
            key,
            signature,
            input,
            hash_algorithm,
        } => {
            if !cmd_transit_verify(&client, &key, &signature, &input, hash_algorithm).await? {
                return Ok(ExitCode::FAILURE);
            }
        },
        TransitCommands::Read { name } => cmd_transit_read(&client, &name).await?,
        TransitCommands::List => cmd_transit_list(&client).await?,
        TransitCommands::Rotate { name } => cmd_transit_rotate(&client, &name).await?,
        TransitCommands::Delete { name } => cmd_transit_delete(&client, &name).await?,
    }

    Ok(ExitCode::SUCCESS)
}
