//! # Vault Client
//!
//! Client for the Vault v1 HTTP API, centred on the transit engine.
//!
//! ## Features
//!
//! - Generic resource verbs (get, create, update, list, delete) over `/v1`
//! - Transit keys: create, read, list, rotate, configure, delete
//! - Signing and signature verification; all cryptography stays server side
//!
//! ## Usage
//!
//! ```no_run
//! use vault_client::{Client, ClientConfig, KeyOptions, KeyType, SignOptions, VerifyOptions};
//!
//! # async fn run() -> vault_client::Result<()> {
//! let client = Client::new(ClientConfig::new("https://localhost:8200", "my-token"))?;
//! let transit = client.transit();
//!
//! transit.create_key("my-key", &KeyOptions::of_type(KeyType::Ed25519)).await?;
//!
//! let msg = b"Alas, poor Yorick";
//! let sig = transit.sign("my-key", msg, &SignOptions::default()).await?;
//! let valid = transit
//!     .verify_signature("my-key", msg, &sig.signature, &VerifyOptions::default())
//!     .await?;
//! assert!(valid);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod response;
pub mod transit;

pub use client::{Client, API_VERSION, LIBRARY_USER_AGENT, TOKEN_HEADER, VERSION};
pub use config::ClientConfig;
pub use error::{Result, VaultError};
pub use response::Envelope;
pub use transit::{
    HashAlgorithm, KeyConfigOptions, KeyInfo, KeyOptions, KeyType, SignOptions, Signature,
    Transit, VerifyOptions,
};

pub use reqwest::{Method, StatusCode};
