//! Transit secrets engine: named keys, signing and verification.
//!
//! Key material never leaves the server. The client only sends key names,
//! base64-encoded input and the option fields below.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::{Result, VaultError};
use crate::response::Envelope;

/// Collection path of transit keys.
pub const KEYS_PATH: &str = "/transit/keys";

/// Path prefix of the sign endpoint.
pub const SIGN_PATH: &str = "/transit/sign";

/// Path prefix of the verify endpoint.
pub const VERIFY_PATH: &str = "/transit/verify";

// ============================================================================
// Types
// ============================================================================

/// Key types understood by the transit engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// AES-128 GCM with a 96-bit nonce.
    #[serde(rename = "aes128-gcm96")]
    Aes128Gcm96,
    /// AES-256 GCM with a 96-bit nonce (server default).
    #[serde(rename = "aes256-gcm96")]
    Aes256Gcm96,
    /// ChaCha20-Poly1305.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
    /// Ed25519 signing key.
    #[serde(rename = "ed25519")]
    Ed25519,
    /// ECDSA over P-256.
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
    /// ECDSA over P-384.
    #[serde(rename = "ecdsa-p384")]
    EcdsaP384,
    /// ECDSA over P-521.
    #[serde(rename = "ecdsa-p521")]
    EcdsaP521,
    /// RSA 2048-bit.
    #[serde(rename = "rsa-2048")]
    Rsa2048,
    /// RSA 3072-bit.
    #[serde(rename = "rsa-3072")]
    Rsa3072,
    /// RSA 4096-bit.
    #[serde(rename = "rsa-4096")]
    Rsa4096,
    /// HMAC key.
    #[serde(rename = "hmac")]
    Hmac,
}

impl KeyType {
    const ALL: [KeyType; 11] = [
        Self::Aes128Gcm96,
        Self::Aes256Gcm96,
        Self::ChaCha20Poly1305,
        Self::Ed25519,
        Self::EcdsaP256,
        Self::EcdsaP384,
        Self::EcdsaP521,
        Self::Rsa2048,
        Self::Rsa3072,
        Self::Rsa4096,
        Self::Hmac,
    ];

    /// Wire name of the key type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128Gcm96 => "aes128-gcm96",
            Self::Aes256Gcm96 => "aes256-gcm96",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
            Self::Ed25519 => "ed25519",
            Self::EcdsaP256 => "ecdsa-p256",
            Self::EcdsaP384 => "ecdsa-p384",
            Self::EcdsaP521 => "ecdsa-p521",
            Self::Rsa2048 => "rsa-2048",
            Self::Rsa3072 => "rsa-3072",
            Self::Rsa4096 => "rsa-4096",
            Self::Hmac => "hmac",
        }
    }

    /// Whether keys of this type can sign.
    pub fn supports_signing(&self) -> bool {
        matches!(
            self,
            Self::Ed25519
                | Self::EcdsaP256
                | Self::EcdsaP384
                | Self::EcdsaP521
                | Self::Rsa2048
                | Self::Rsa3072
                | Self::Rsa4096
        )
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| VaultError::InvalidKeyType(s.to_string()))
    }
}

/// Hash algorithms accepted by sign and verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1.
    #[serde(rename = "sha1")]
    Sha1,
    /// SHA2-224.
    #[serde(rename = "sha2-224")]
    Sha2_224,
    /// SHA2-256 (server default).
    #[serde(rename = "sha2-256")]
    Sha2_256,
    /// SHA2-384.
    #[serde(rename = "sha2-384")]
    Sha2_384,
    /// SHA2-512.
    #[serde(rename = "sha2-512")]
    Sha2_512,
    /// SHA3-224.
    #[serde(rename = "sha3-224")]
    Sha3_224,
    /// SHA3-256.
    #[serde(rename = "sha3-256")]
    Sha3_256,
    /// SHA3-384.
    #[serde(rename = "sha3-384")]
    Sha3_384,
    /// SHA3-512.
    #[serde(rename = "sha3-512")]
    Sha3_512,
    /// No hashing; input is signed as given.
    #[serde(rename = "none")]
    None,
}

impl HashAlgorithm {
    const ALL: [HashAlgorithm; 10] = [
        Self::Sha1,
        Self::Sha2_224,
        Self::Sha2_256,
        Self::Sha2_384,
        Self::Sha2_512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::None,
    ];

    /// Wire name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha2_224 => "sha2-224",
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_384 => "sha2-384",
            Self::Sha2_512 => "sha2-512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::None => "none",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| VaultError::InvalidHashAlgorithm(s.to_string()))
    }
}

/// Options for creating a key. Unset fields take the server default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyOptions {
    /// Key type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<KeyType>,
    /// Allow the key to be exported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exportable: Option<bool>,
    /// Enable key derivation; operations then require a context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<bool>,
    /// Enable convergent encryption (requires `derived`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergent_encryption: Option<bool>,
    /// Allow plaintext backups of the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_plaintext_backup: Option<bool>,
    /// Automatic rotation period, e.g. `"24h"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rotate_period: Option<String>,
    /// Any other field, sent verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyOptions {
    /// Options for a key of the given type.
    pub fn of_type(key_type: KeyType) -> Self {
        Self {
            key_type: Some(key_type),
            ..Self::default()
        }
    }
}

/// Options for signing. Unset fields take the server default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignOptions {
    /// Key version to sign with (latest when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_version: Option<u32>,
    /// Hash applied to the input before signing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Base64 derivation context for derived keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// The input is already hashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prehashed: Option<bool>,
    /// RSA signature scheme, `pss` or `pkcs1v15`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
    /// ECDSA signature encoding, `asn1` or `jws`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marshaling_algorithm: Option<String>,
    /// Any other field, sent verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options for verification. Must match the options used to sign.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerifyOptions {
    /// Hash applied to the input before verifying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Base64 derivation context for derived keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// The input is already hashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prehashed: Option<bool>,
    /// RSA signature scheme, `pss` or `pkcs1v15`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
    /// ECDSA signature encoding, `asn1` or `jws`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marshaling_algorithm: Option<String>,
    /// Any other field, sent verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options for tuning an existing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyConfigOptions {
    /// Oldest version allowed to decrypt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_decryption_version: Option<u32>,
    /// Oldest version allowed to encrypt (0 means latest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_encryption_version: Option<u32>,
    /// Allow the key to be deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_allowed: Option<bool>,
    /// Allow the key to be exported. Cannot be disabled once enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exportable: Option<bool>,
    /// Allow plaintext backups of the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_plaintext_backup: Option<bool>,
    /// Automatic rotation period, e.g. `"24h"`; `"0"` disables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rotate_period: Option<String>,
    /// Any other field, sent verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! impl_passthrough {
    ($($options:ty),+) => {
        $(
            impl $options {
                /// Adds a field that has no typed counterpart.
                pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
                    self.extra.insert(field.into(), value.into());
                    self
                }
            }
        )+
    };
}

impl_passthrough!(KeyOptions, SignOptions, VerifyOptions, KeyConfigOptions);

/// A server-generated signature, e.g. `vault:v1:MEUCIQ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// The signature token, passed back unmodified to verify.
    pub signature: String,
}

impl Signature {
    /// Key version embedded in the `vault:v{N}:` prefix.
    pub fn key_version(&self) -> Option<u32> {
        let rest = self.signature.strip_prefix("vault:v")?;
        let (version, _) = rest.split_once(':')?;
        version.parse().ok()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Metadata returned when reading a key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyInfo {
    /// Key name.
    pub name: String,
    /// Wire name of the key type.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Latest (current) version.
    pub latest_version: u32,
    /// Oldest version still stored.
    pub min_available_version: u32,
    /// Oldest version allowed to decrypt.
    pub min_decryption_version: u32,
    /// Oldest version allowed to encrypt.
    pub min_encryption_version: u32,
    /// Whether the key can be deleted.
    pub deletion_allowed: bool,
    /// Whether the key can be exported.
    pub exportable: bool,
    /// Whether derivation is enabled.
    pub derived: bool,
    /// Whether plaintext backups are allowed.
    pub allow_plaintext_backup: bool,
    /// Whether the key can sign.
    pub supports_signing: bool,
    /// Whether the key can encrypt.
    pub supports_encryption: bool,
    /// Whether the key can decrypt.
    pub supports_decryption: bool,
    /// Whether the key supports derivation.
    pub supports_derivation: bool,
    /// Per-version data (creation time, public key for asymmetric keys).
    pub keys: Map<String, Value>,
}

impl KeyInfo {
    /// Parsed key type, `None` for types this crate does not know.
    pub fn parsed_type(&self) -> Option<KeyType> {
        self.key_type.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct Verification {
    valid: bool,
}

#[derive(Debug, Default, Deserialize)]
struct KeyList {
    #[serde(default)]
    keys: Vec<String>,
}

// ============================================================================
// Transit
// ============================================================================

/// Transit helpers bound to a [`Client`].
#[derive(Debug, Clone, Copy)]
pub struct Transit<'a> {
    client: &'a Client,
}

impl<'a> Transit<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Creates (or idempotently re-creates) the key `name`.
    ///
    /// # Errors
    ///
    /// Any transport, encoding or HTTP error.
    pub async fn create_key(&self, name: &str, options: &KeyOptions) -> Result<()> {
        self.client
            .update_resource::<_, IgnoredAny>(KEYS_PATH, name, options)
            .await?;
        debug!(key = name, "transit key created");
        Ok(())
    }

    /// Signs `input` with the key `key`. `input` is raw bytes; it is
    /// base64-encoded here.
    ///
    /// # Errors
    ///
    /// Any transport, encoding, HTTP or decoding error.
    pub async fn sign(&self, key: &str, input: &[u8], options: &SignOptions) -> Result<Signature> {
        let body = request_body(options, [("input", BASE64.encode(input))])?;
        let envelope: Envelope<Signature> =
            self.client.update_resource(SIGN_PATH, key, &body).await?;
        Ok(envelope.into_data())
    }

    /// Checks `signature` against `input` using the key `key`.
    ///
    /// Returns `Ok(false)` when the server reports the signature invalid.
    ///
    /// # Errors
    ///
    /// Any transport, encoding, HTTP or decoding error.
    pub async fn verify_signature(
        &self,
        key: &str,
        input: &[u8],
        signature: &str,
        options: &VerifyOptions,
    ) -> Result<bool> {
        let body = request_body(
            options,
            [
                ("signature", signature.to_string()),
                ("input", BASE64.encode(input)),
            ],
        )?;
        let envelope: Envelope<Verification> =
            self.client.update_resource(VERIFY_PATH, key, &body).await?;
        Ok(envelope.data.valid)
    }

    /// Reads the metadata of the key `name`.
    ///
    /// # Errors
    ///
    /// Any transport, HTTP or decoding error; a missing key is a 404.
    pub async fn read_key(&self, name: &str) -> Result<KeyInfo> {
        let envelope: Envelope<KeyInfo> = self.client.get_resource(KEYS_PATH, name).await?;
        Ok(envelope.into_data())
    }

    /// Lists key names. The server answers 404 with an empty `errors` array
    /// when no key exists, which is returned as an empty list.
    ///
    /// # Errors
    ///
    /// Any transport, HTTP or decoding error. A 404 carrying error messages,
    /// such as an unmounted engine, is returned as is.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        match self
            .client
            .list_resource::<_, Envelope<KeyList>>(KEYS_PATH, Some(&[("list", "true")]))
            .await
        {
            Ok(envelope) => Ok(envelope.data.keys),
            Err(err) if err.is_empty_listing() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Adds a new version to the key `name`.
    ///
    /// # Errors
    ///
    /// Any transport or HTTP error.
    pub async fn rotate_key(&self, name: &str) -> Result<()> {
        let path = format!("{KEYS_PATH}/{name}/rotate");
        self.client
            .make_request::<(), IgnoredAny>(Method::POST, &path, None)
            .await?;
        debug!(key = name, "transit key rotated");
        Ok(())
    }

    /// Updates the configuration of the key `name`.
    ///
    /// # Errors
    ///
    /// Any transport, encoding or HTTP error.
    pub async fn update_key_config(&self, name: &str, options: &KeyConfigOptions) -> Result<()> {
        self.client
            .update_resource::<_, IgnoredAny>(KEYS_PATH, &format!("{name}/config"), options)
            .await?;
        Ok(())
    }

    /// Deletes the key `name`. Deleting a missing key is not an error.
    /// The server refuses unless `deletion_allowed` was set on the key.
    ///
    /// # Errors
    ///
    /// Any transport error, or an HTTP error other than 404.
    pub async fn delete_key(&self, name: &str) -> Result<()> {
        self.client.delete_resource(KEYS_PATH, name).await
    }
}

/// Serializes `options` to a JSON object and sets `fields` on it, replacing
/// any passthrough value with the same name.
fn request_body<O, const N: usize>(
    options: &O,
    fields: [(&str, String); N],
) -> Result<Map<String, Value>>
where
    O: Serialize,
{
    let mut body = match serde_json::to_value(options).map_err(VaultError::Encode)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (field, value) in fields {
        body.insert(field.to_string(), Value::String(value));
    }
    Ok(body)
}
