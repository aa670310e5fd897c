//! Service/operation key generation and handling.

use serde::{Deserialize, Serialize};

/// A key that uniquely identifies one rate limit policy and its runtime state.
///
/// Rendered as `"{service}.{operation}"`. The service name is everything
/// before the first `.`, so operations may themselves contain dots while
/// service names may not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ServiceKey {
    /// The external service (e.g. `openai`)
    pub service: String,
    /// The operation against that service (e.g. `chat_completion`)
    pub operation: String,
}

impl ServiceKey {
    /// Create a new key from a service and operation name.
    pub fn new(service: &str, operation: &str) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Parse a `"{service}.{operation}"` string.
    ///
    /// Returns `None` if either half is missing or empty.
    pub fn parse(key: &str) -> Option<Self> {
        let (service, operation) = key.split_once('.')?;
        if service.is_empty() || operation.is_empty() {
            return None;
        }
        Some(Self::new(service, operation))
    }

    /// Convert the key to its string representation.
    pub fn to_string_key(&self) -> String {
        format!("{}.{}", self.service, self.operation)
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.service, self.operation)
    }
}

impl From<ServiceKey> for String {
    fn from(key: ServiceKey) -> Self {
        key.to_string_key()
    }
}

impl TryFrom<String> for ServiceKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid service key '{}'", value))
    }
}
