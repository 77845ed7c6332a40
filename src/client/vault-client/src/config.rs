//! Client configuration.
//!
//! A [`ClientConfig`] is built by the caller and handed to
//! [`Client::new`](crate::Client::new); nothing is read from process-wide
//! state unless [`ClientConfig::from_env`] is called explicitly.

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// Default server address when `VAULT_ADDR` is unset.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8200";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7);

/// Environment variable holding the server address.
pub const ENV_ADDRESS: &str = "VAULT_ADDR";

/// Environment variable holding the token.
pub const ENV_TOKEN: &str = "VAULT_TOKEN";

/// Environment variable holding the timeout in seconds.
pub const ENV_TIMEOUT: &str = "VAULT_CLIENT_TIMEOUT";

/// Transport and authentication settings for a [`Client`](crate::Client).
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `https://vault.internal:8200`.
    pub address: String,
    /// Token sent as `X-Vault-Token`.
    pub token: Zeroizing<String>,
    /// Upper bound on a single request, connect through body.
    pub timeout: Duration,
    /// Caller product string appended after the library's own user agent.
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Creates a config with the default timeout and no extra user agent.
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: Zeroizing::new(token.into()),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the caller user agent, sent as `vault-go/<version> <user_agent>`.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Reads `VAULT_ADDR`, `VAULT_TOKEN` and `VAULT_CLIENT_TIMEOUT`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] when the token is missing or the
    /// timeout is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let address = lookup(ENV_ADDRESS)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let token = lookup(ENV_TOKEN)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| VaultError::Config(format!("{ENV_TOKEN} is not set")))?;

        let mut config = Self::new(address, token);

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                VaultError::Config(format!("{ENV_TIMEOUT} must be whole seconds, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
