//! Tagged records emitted by the sync layer, one request/success/failure
//! family per operation.

use serde::Serialize;

use crate::core::error::ChainError;
use crate::types::{
    AccountSnapshot, ActionRecord, GenesisBalance, KeyAccounts, TokenBalanceUpdate,
    TokenRequestSpec, TransactionReceipt,
};

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEvent {
    ClearAccountCache,
    ClearActionsCache,
    ClearBalanceCache,

    GetAccountRequest {
        account_name: String,
    },
    GetAccountSuccess {
        results: AccountSnapshot,
    },
    GetAccountFailure {
        account_name: String,
        err: ChainError,
    },

    GetActionsRequest {
        account_name: String,
    },
    GetActionsSuccess {
        account_name: String,
        no_change: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        list: Option<Vec<ActionRecord>>,
    },
    GetActionsFailure {
        account_name: String,
        err: ChainError,
    },

    GetAccountBalanceRequest {
        account_name: String,
        tokens: Vec<TokenRequestSpec>,
    },
    GetAccountBalanceSuccess(TokenBalanceUpdate),
    GetAccountBalanceFailure {
        account_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<TokenRequestSpec>,
        err: ChainError,
    },

    GetGenesisBalanceRequest {
        account_name: String,
    },
    GetGenesisBalanceSuccess(GenesisBalance),
    GetGenesisBalanceFailure {
        account_name: String,
        err: ChainError,
    },

    AccountAvailablePending {
        account_name: String,
    },
    AccountAvailableResult {
        account_name: String,
        available: bool,
    },
    AccountAvailableFailure {
        account_name: String,
        err: ChainError,
    },

    AccountExistsPending {
        account_name: String,
    },
    AccountExistsSuccess {
        account_name: String,
    },
    AccountExistsFailure {
        account_name: String,
        err: ChainError,
    },

    AccountByKeyPending {
        key: String,
    },
    AccountByKeySuccess {
        key: String,
        accounts: KeyAccounts,
    },
    AccountByKeyFailure {
        key: String,
        err: ChainError,
    },
    AccountByKeyClear,

    RefundPending,
    RefundSuccess {
        tx: TransactionReceipt,
    },
    RefundFailure {
        err: ChainError,
    },

    ClaimGenesisPending,
    ClaimGenesisSuccess {
        tx: TransactionReceipt,
    },
    ClaimGenesisFailure {
        err: ChainError,
    },

    ClaimVotingPending,
    ClaimVotingSuccess {
        tx: TransactionReceipt,
    },
    ClaimVotingFailure {
        err: ChainError,
    },
}

impl SyncEvent {
    /// Whether this record reports a failed operation.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::GetAccountFailure { .. }
                | Self::GetActionsFailure { .. }
                | Self::GetAccountBalanceFailure { .. }
                | Self::GetGenesisBalanceFailure { .. }
                | Self::AccountAvailableFailure { .. }
                | Self::AccountExistsFailure { .. }
                | Self::AccountByKeyFailure { .. }
                | Self::RefundFailure { .. }
                | Self::ClaimGenesisFailure { .. }
                | Self::ClaimVotingFailure { .. }
        )
    }
}
