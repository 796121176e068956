//! Aggregated configuration.

use serde::{Deserialize, Serialize};

use scopes_client::CacheConfig;
use scopes_store::StoreConfig;

use crate::error::Result;

/// Configuration for a [`ScopesPlatform`](crate::ScopesPlatform).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopesConfig {
    pub store: StoreConfig,
    /// Applied to the cache of every process context.
    pub cache: CacheConfig,
}

impl ScopesConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
