use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::error::ChainError;

/// Staked CPU/NET weights, each an `"amount SYMBOL"` asset string.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegatedBandwidth {
    pub cpu_weight: String,
    pub net_weight: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Governance state of an account.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct VoterInfo {
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default)]
    pub producers: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VoterInfo {
    /// Proxy account name, if a non-empty one is set.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().filter(|proxy| !proxy.is_empty())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyWeight {
    pub key: String,
    pub weight: u16,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitWeight {
    pub wait_sec: u32,
    pub weight: u16,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authority {
    pub threshold: u32,
    #[serde(default)]
    pub keys: Vec<KeyWeight>,
    #[serde(default)]
    pub accounts: Vec<PermissionLevelWeight>,
    #[serde(default)]
    pub waits: Vec<WaitWeight>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub perm_name: String,
    #[serde(default)]
    pub parent: String,
    pub required_auth: Authority,
}

/// Point-in-time view of one on-chain account, as returned by `get_account`.
///
/// Fields the sync layer does not interpret are kept in `extra` so the
/// snapshot serializes back to the node's shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_delegated_bandwidth: Option<DelegatedBandwidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter_info: Option<VoterInfo>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountSnapshot {
    pub fn proxy(&self) -> Option<&str> {
        self.voter_info.as_ref().and_then(VoterInfo::proxy)
    }
}

/// One historical action affecting an account.
///
/// Only the per-account sequence number is interpreted.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub account_action_seq: u64,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ActionRecord {
    pub fn new(account_action_seq: u64) -> Self {
        Self {
            account_action_seq,
            payload: Map::new(),
        }
    }
}

/// Ordered action list for one account, newest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionHistory {
    pub list: Vec<ActionRecord>,
}

/// Page returned by `/v1/history/get_actions`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionsPage {
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_irreversible_block: Option<u64>,
}

/// Balances of one account under one token contract.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BalanceRecord {
    pub tokens: BTreeMap<String, f64>,
    pub precision: BTreeMap<String, u8>,
}

impl BalanceRecord {
    /// Symbol-wise merge: entries in `update` replace existing ones.
    pub fn merge(&mut self, update: &TokenBalanceUpdate) {
        self.tokens
            .extend(update.tokens.iter().map(|(symbol, amount)| (symbol.clone(), *amount)));
        self.precision
            .extend(update.precision.iter().map(|(symbol, digits)| (symbol.clone(), *digits)));
    }
}

/// Result of one successful `contract:symbol` query.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenBalanceUpdate {
    pub account_name: String,
    pub contract: String,
    pub symbol: String,
    pub precision: BTreeMap<String, u8>,
    pub tokens: BTreeMap<String, f64>,
}

/// A `contract:symbol` balance query target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenRequestSpec {
    pub contract: String,
    pub symbol: String,
}

impl TokenRequestSpec {
    pub fn new(contract: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for TokenRequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract, self.symbol)
    }
}

impl FromStr for TokenRequestSpec {
    type Err = ChainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((contract, symbol))
                if !contract.is_empty() && !symbol.is_empty() && !symbol.contains(':') =>
            {
                Ok(Self::new(contract, symbol))
            }
            _ => Err(ChainError::validation(format!(
                "invalid token spec `{value}`, expected contract:symbol"
            ))),
        }
    }
}

impl Serialize for TokenRequestSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenRequestSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Row of the WAX `eosio` / `genesis` table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisBalance {
    #[serde(default)]
    pub account: String,
    pub balance: String,
    pub unclaimed_balance: String,
    pub last_claim_time: String,
    pub last_updated: String,
}

/// Accounts controlled by a public key.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyAccounts {
    #[serde(default)]
    pub account_names: Vec<String>,
}

/// Query for `/v1/chain/get_table_rows`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRowsQuery {
    pub json: bool,
    pub code: String,
    pub scope: String,
    pub table: String,
}

impl TableRowsQuery {
    pub fn new(code: impl Into<String>, scope: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            json: true,
            code: code.into(),
            scope: scope.into(),
            table: table.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: bool,
}

/// One action inside a transaction submitted through `transact`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChainAction {
    pub account: String,
    pub name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionOp {
    pub actions: Vec<ChainAction>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactOptions {
    pub broadcast: bool,
    pub blocks_behind: u32,
    pub expire_seconds: u32,
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            broadcast: true,
            blocks_behind: 3,
            expire_seconds: 120,
        }
    }
}

/// Receipt returned by a transact call; kept opaque apart from the id.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
