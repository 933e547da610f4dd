use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::TokenRequestSpec;

/// Chain-level settings of the selected blockchain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainConfig {
    #[serde(default = "BlockchainConfig::default_token_symbol")]
    pub token_symbol: String,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            token_symbol: Self::default_token_symbol(),
        }
    }
}

impl BlockchainConfig {
    fn default_token_symbol() -> String {
        "EOS".to_string()
    }

    pub fn is_wax(&self) -> bool {
        self.token_symbol == "WAX"
    }
}

/// How an HTTP server error during an availability check is read.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ServerErrorPolicy {
    /// A server error means the name is free. Wrong during partial outages.
    #[default]
    TreatAsAvailable,
    TreatAsFailure,
}

/// Read-only settings snapshot handed to every sync operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub blockchain: BlockchainConfig,
    #[serde(default = "SyncConfig::default_token_precision")]
    pub token_precision: u8,
    #[serde(default)]
    pub custom_tokens: Vec<TokenRequestSpec>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default = "SyncConfig::default_max_proxy_depth")]
    pub max_proxy_depth: usize,
    #[serde(default)]
    pub server_error_policy: ServerErrorPolicy,
    #[serde(default = "SyncConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node: None,
            blockchain: BlockchainConfig::default(),
            token_precision: Self::default_token_precision(),
            custom_tokens: Vec::new(),
            account: None,
            authorization: None,
            max_proxy_depth: Self::default_max_proxy_depth(),
            server_error_policy: ServerErrorPolicy::default(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

impl SyncConfig {
    const fn default_token_precision() -> u8 {
        4
    }

    const fn default_max_proxy_depth() -> usize {
        8
    }

    const fn default_request_timeout_secs() -> u64 {
        30
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
        serde_json::from_slice(&data).with_context(|| format!("failed to parse config in {:?}", path))
    }

    /// Configured node URL, ignoring blank values.
    pub fn node(&self) -> Option<&str> {
        self.node
            .as_deref()
            .map(str::trim)
            .filter(|node| !node.is_empty())
    }

    pub fn authorization(&self) -> &str {
        self.authorization.as_deref().unwrap_or("active")
    }

    pub fn is_active_account(&self, account: &str) -> bool {
        self.account.as_deref() == Some(account)
    }

    /// Tokens queried when the caller gives no explicit list: custom tokens
    /// first, then the chain's core token on `eosio.token`.
    pub fn default_token_specs(&self) -> Vec<TokenRequestSpec> {
        let mut specs = self.custom_tokens.clone();
        specs.push(TokenRequestSpec::new(
            "eosio.token",
            self.blockchain.token_symbol.clone(),
        ));
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.token_precision, 4);
        assert_eq!(config.authorization(), "active");
        assert_eq!(config.server_error_policy, ServerErrorPolicy::TreatAsAvailable);
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: SyncConfig = serde_json::from_str(
            r#"{
                "node": "https://wax.example",
                "blockchain": { "tokenSymbol": "WAX" },
                "tokenPrecision": 8,
                "customTokens": ["alien.worlds:TLM"],
                "account": "alice",
                "serverErrorPolicy": "treatAsFailure"
            }"#,
        )
        .unwrap();
        assert!(config.blockchain.is_wax());
        assert_eq!(config.token_precision, 8);
        assert_eq!(config.node(), Some("https://wax.example"));
        assert!(config.is_active_account("alice"));
        assert_eq!(config.server_error_policy, ServerErrorPolicy::TreatAsFailure);
        assert_eq!(
            config.default_token_specs(),
            vec![
                TokenRequestSpec::new("alien.worlds", "TLM"),
                TokenRequestSpec::new("eosio.token", "WAX"),
            ]
        );
    }

    #[test]
    fn blank_node_is_not_configured() {
        let config = SyncConfig {
            node: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.node(), None);
    }

    #[test]
    fn rejects_malformed_custom_token() {
        let parsed = serde_json::from_str::<SyncConfig>(r#"{ "customTokens": ["TLM"] }"#);
        assert!(parsed.is_err());
    }
}
