//! The response envelope shared by every Vault endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outer JSON wrapper of a Vault response.
///
/// `data` is endpoint specific and decoded into `T` at each call site. The
/// remaining fields are metadata; any of them may be missing or `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Endpoint-specific payload.
    pub data: T,
    /// Server-assigned request id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_id: String,
    /// Whether the lease is renewable.
    #[serde(default, deserialize_with = "null_as_default")]
    pub renewable: bool,
    /// Lease id, empty when the response carries no lease.
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_id: String,
    /// Lease duration in seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_duration: u64,
    /// Response-wrapping information, passed through undecoded.
    #[serde(default)]
    pub wrap_info: Option<Value>,
    /// Server warnings, passed through undecoded.
    #[serde(default)]
    pub warnings: Option<Value>,
    /// Auth block for login endpoints, passed through undecoded.
    #[serde(default)]
    pub auth: Option<Value>,
}

impl<T> Envelope<T> {
    /// Discards the metadata and returns the payload.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Warning strings, when the server sent them as an array of strings.
    pub fn warning_messages(&self) -> Vec<&str> {
        match &self.warnings {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

fn null_as_default<'de, D, V>(deserializer: D) -> Result<V, D::Error>
where
    D: serde::Deserializer<'de>,
    V: Deserialize<'de> + Default,
{
    Ok(Option::<V>::deserialize(deserializer)?.unwrap_or_default())
}
