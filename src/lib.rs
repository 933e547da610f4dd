//! Account state synchronisation for EOS-family chains: snapshots, action
//! histories and token balances kept in a keyed cache.

pub mod config;
pub mod core;
pub mod events;
pub mod rpc;
pub mod store;
pub mod sync;
pub mod types;

pub use crate::config::{BlockchainConfig, ServerErrorPolicy, SyncConfig};
pub use crate::core::action_merger::HistoryMerge;
pub use crate::core::error::ChainError;
pub use crate::events::SyncEvent;
pub use crate::rpc::{ChainRpc, HttpChainRpc};
pub use crate::store::AccountStore;
pub use crate::sync::{AccountAvailability, AccountSync, BalanceOutcome, TokenQueryError};
pub use crate::types::{
    AccountSnapshot, ActionHistory, ActionRecord, BalanceRecord, GenesisBalance, KeyAccounts,
    TokenBalanceUpdate, TokenRequestSpec,
};
