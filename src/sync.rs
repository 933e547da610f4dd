//! Account state synchronisation against a chain node.
//!
//! Each operation returns its outcome and also emits the matching
//! [`SyncEvent`]s on the channel handed out by [`AccountSync::new`]. Store
//! writes happen before the success event is sent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::{ServerErrorPolicy, SyncConfig};
use crate::core::account_normalizer::{normalize_snapshot, NormalizedAccount};
use crate::core::action_merger::{reconcile, HistoryMerge};
use crate::core::balance_formatter::{format_balances, format_precisions};
use crate::core::error::ChainError;
use crate::core::keys::is_valid_private_key;
use crate::events::SyncEvent;
use crate::rpc::{ChainRpc, HttpChainRpc};
use crate::store::AccountStore;
use crate::types::{
    AccountSnapshot, ActionHistory, ChainAction, GenesisBalance, KeyAccounts, PermissionLevel,
    TableRowsQuery, TokenBalanceUpdate, TokenRequestSpec, TransactOptions, TransactionOp,
    TransactionReceipt,
};

const SYSTEM_ACCOUNT: &str = "eosio";

/// Result of a name availability check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccountAvailability {
    Available,
    Taken,
}

/// A single failed `contract:symbol` query.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenQueryError {
    pub token: TokenRequestSpec,
    pub err: ChainError,
}

pub type BalanceOutcome = Result<TokenBalanceUpdate, TokenQueryError>;

pub struct AccountSync<R> {
    rpc: Arc<R>,
    store: Arc<AccountStore>,
    events: UnboundedSender<SyncEvent>,
}

impl<R> Clone for AccountSync<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
            store: Arc::clone(&self.store),
            events: self.events.clone(),
        }
    }
}

impl AccountSync<HttpChainRpc> {
    /// Build a sync handle talking to the configured node over HTTP.
    pub fn connect(
        config: &SyncConfig,
    ) -> Result<(Self, UnboundedReceiver<SyncEvent>), ChainError> {
        let node = config.node().ok_or(ChainError::NotConfigured)?;
        let rpc = HttpChainRpc::new(node, Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(rpc))
    }
}

fn require_target(config: &SyncConfig, target: &str) -> Result<(), ChainError> {
    if config.node().is_none() {
        return Err(ChainError::NotConfigured);
    }
    if target.trim().is_empty() {
        return Err(ChainError::validation("empty account name"));
    }
    Ok(())
}

fn system_action(
    name: &str,
    actor: &str,
    permission: &str,
    data: serde_json::Value,
) -> TransactionOp {
    TransactionOp {
        actions: vec![ChainAction {
            account: SYSTEM_ACCOUNT.to_string(),
            name: name.to_string(),
            authorization: vec![PermissionLevel {
                actor: actor.to_string(),
                permission: permission.to_string(),
            }],
            data,
        }],
    }
}

impl<R: ChainRpc> AccountSync<R> {
    pub fn new(rpc: R) -> (Self, UnboundedReceiver<SyncEvent>) {
        Self::with_store(rpc, Arc::new(AccountStore::new()))
    }

    pub fn with_store(
        rpc: R,
        store: Arc<AccountStore>,
    ) -> (Self, UnboundedReceiver<SyncEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let sync = Self {
            rpc: Arc::new(rpc),
            store,
            events,
        };
        (sync, rx)
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }

    pub fn clear_account_cache(&self) {
        self.store.clear_accounts();
        tracing::info!("account cache cleared");
        self.emit(SyncEvent::ClearAccountCache);
    }

    pub fn clear_balance_cache(&self) {
        self.store.clear_balances();
        tracing::info!("balance cache cleared");
        self.emit(SyncEvent::ClearBalanceCache);
    }

    pub fn clear_actions_cache(&self) {
        self.store.clear_actions();
        tracing::info!("actions cache cleared");
        self.emit(SyncEvent::ClearActionsCache);
    }

    pub fn clear_account_by_key(&self) {
        self.store.clear_key_lookup();
        self.emit(SyncEvent::AccountByKeyClear);
    }

    /// Fetch, normalize and cache one account, then chase its voter proxy.
    ///
    /// For the configured active account the balances (and the genesis
    /// balance on WAX) are refreshed as well. Follow-up failures are reported
    /// through their own events and never fail this call.
    pub async fn get_account(
        &self,
        config: &SyncConfig,
        account: &str,
    ) -> Result<AccountSnapshot, ChainError> {
        let normalized = self.fetch_account(config, account).await?;

        if config.is_active_account(account) {
            self.refresh_active_account(config, account).await;
        }
        if let Some(proxy) = normalized.proxy.as_deref() {
            self.resolve_proxy_chain(config, account, proxy).await;
        }
        Ok(normalized.snapshot)
    }

    pub async fn get_accounts(
        &self,
        config: &SyncConfig,
        accounts: &[String],
    ) -> Vec<Result<AccountSnapshot, ChainError>> {
        join_all(
            accounts
                .iter()
                .map(|account| self.get_account(config, account)),
        )
        .await
    }

    async fn fetch_account(
        &self,
        config: &SyncConfig,
        account: &str,
    ) -> Result<NormalizedAccount, ChainError> {
        self.emit(SyncEvent::GetAccountRequest {
            account_name: account.to_string(),
        });

        let fetched = async {
            require_target(config, account)?;
            let raw = self.rpc.get_account(account).await?;
            Ok::<_, ChainError>(normalize_snapshot(&raw, config))
        }
        .await;

        match fetched {
            Ok(normalized) => {
                self.store.put_account(normalized.snapshot.clone());
                self.emit(SyncEvent::GetAccountSuccess {
                    results: normalized.snapshot.clone(),
                });
                Ok(normalized)
            }
            Err(err) => {
                tracing::debug!(account, %err, "account fetch failed");
                self.emit(SyncEvent::GetAccountFailure {
                    account_name: account.to_string(),
                    err: err.clone(),
                });
                Err(err)
            }
        }
    }

    async fn refresh_active_account(&self, config: &SyncConfig, account: &str) {
        if let Err(err) = self.get_currency_balance(config, account, None).await {
            tracing::warn!(account, %err, "balance refresh failed");
        }
        if config.blockchain.is_wax() {
            if let Err(err) = self.get_genesis_balance(config, account).await {
                tracing::warn!(account, %err, "genesis balance refresh failed");
            }
        }
    }

    /// Fetch the proxy chain starting at `first`, stopping on a cycle or
    /// after `max_proxy_depth` fetches.
    async fn resolve_proxy_chain(&self, config: &SyncConfig, origin: &str, first: &str) {
        let mut visited = HashSet::from([origin.to_string()]);
        let mut next = Some(first.to_string());
        let mut depth = 0;

        while let Some(proxy) = next.take() {
            if depth >= config.max_proxy_depth {
                tracing::debug!(origin, proxy, depth, "proxy chain depth limit reached");
                break;
            }
            if !visited.insert(proxy.clone()) {
                tracing::debug!(origin, proxy, "proxy cycle detected");
                break;
            }
            depth += 1;
            match self.fetch_account(config, &proxy).await {
                Ok(normalized) => next = normalized.proxy,
                Err(err) => {
                    tracing::warn!(origin, proxy, %err, "proxy fetch failed");
                }
            }
        }
    }

    /// Fetch one page of actions and merge it into the cached history.
    pub async fn get_actions(
        &self,
        config: &SyncConfig,
        account: &str,
        pos: i64,
        offset: i64,
    ) -> Result<HistoryMerge, ChainError> {
        self.emit(SyncEvent::GetActionsRequest {
            account_name: account.to_string(),
        });

        let fetched = async {
            require_target(config, account)?;
            self.rpc.get_actions(account, pos, offset).await
        }
        .await;

        let page = match fetched {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!(account, %err, "actions fetch failed");
                self.emit(SyncEvent::GetActionsFailure {
                    account_name: account.to_string(),
                    err: err.clone(),
                });
                return Err(err);
            }
        };

        let cached = self.store.actions(account);
        let merge = reconcile(&cached.list, &page.actions);
        match &merge {
            HistoryMerge::NoChange => {
                self.emit(SyncEvent::GetActionsSuccess {
                    account_name: account.to_string(),
                    no_change: true,
                    list: None,
                });
            }
            HistoryMerge::Updated(list) => {
                self.store
                    .put_actions(account, ActionHistory { list: list.clone() });
                self.emit(SyncEvent::GetActionsSuccess {
                    account_name: account.to_string(),
                    no_change: false,
                    list: Some(list.clone()),
                });
            }
        }
        Ok(merge)
    }

    /// Query every requested token independently.
    ///
    /// `requested` replaces the configured list when given. Each completion is
    /// merged into the store and reported on its own, in completion order; one
    /// failing token never holds back the others. The returned outcomes are
    /// in that same order.
    pub async fn get_currency_balance(
        &self,
        config: &SyncConfig,
        account: &str,
        requested: Option<&[TokenRequestSpec]>,
    ) -> Result<Vec<BalanceOutcome>, ChainError> {
        if let Err(err) = require_target(config, account) {
            self.emit(SyncEvent::GetAccountBalanceFailure {
                account_name: account.to_string(),
                token: None,
                err: err.clone(),
            });
            return Err(err);
        }

        let specs = requested
            .map(<[TokenRequestSpec]>::to_vec)
            .unwrap_or_else(|| config.default_token_specs());
        self.emit(SyncEvent::GetAccountBalanceRequest {
            account_name: account.to_string(),
            tokens: specs.clone(),
        });

        let rpc = &self.rpc;
        let mut pending: FuturesUnordered<_> = specs
            .into_iter()
            .map(|spec| async move {
                let result = rpc
                    .get_currency_balance(&spec.contract, account, &spec.symbol)
                    .await;
                (spec, result)
            })
            .collect();

        let mut outcomes = Vec::new();
        while let Some((spec, result)) = pending.next().await {
            match result {
                Ok(raw) => {
                    let update = TokenBalanceUpdate {
                        account_name: account.to_string(),
                        precision: format_precisions(&raw),
                        tokens: format_balances(&raw, Some(&spec.symbol)),
                        contract: spec.contract,
                        symbol: spec.symbol,
                    };
                    self.store.merge_balance(&update);
                    self.emit(SyncEvent::GetAccountBalanceSuccess(update.clone()));
                    outcomes.push(Ok(update));
                }
                Err(err) => {
                    tracing::warn!(account, token = %spec, %err, "balance query failed");
                    self.emit(SyncEvent::GetAccountBalanceFailure {
                        account_name: account.to_string(),
                        token: Some(spec.clone()),
                        err: err.clone(),
                    });
                    outcomes.push(Err(TokenQueryError { token: spec, err }));
                }
            }
        }
        Ok(outcomes)
    }

    pub async fn refresh_account_balances(
        &self,
        config: &SyncConfig,
        account: &str,
        requested: Option<&[TokenRequestSpec]>,
    ) -> Result<Vec<BalanceOutcome>, ChainError> {
        self.get_currency_balance(config, account, requested).await
    }

    /// Read the WAX genesis allocation row for `account`.
    pub async fn get_genesis_balance(
        &self,
        config: &SyncConfig,
        account: &str,
    ) -> Result<GenesisBalance, ChainError> {
        self.emit(SyncEvent::GetGenesisBalanceRequest {
            account_name: account.to_string(),
        });

        let fetched = async {
            require_target(config, account)?;
            let query = TableRowsQuery::new(SYSTEM_ACCOUNT, account, "genesis");
            let rows = self.rpc.get_table_rows(&query).await?;
            let row = rows
                .rows
                .into_iter()
                .next()
                .ok_or_else(|| ChainError::not_found(format!("genesis row for {account}")))?;
            let mut balance: GenesisBalance = serde_json::from_value(row)?;
            balance.account = account.to_string();
            Ok::<_, ChainError>(balance)
        }
        .await;

        match fetched {
            Ok(balance) => {
                self.store.put_genesis(balance.clone());
                self.emit(SyncEvent::GetGenesisBalanceSuccess(balance.clone()));
                Ok(balance)
            }
            Err(err) => {
                self.emit(SyncEvent::GetGenesisBalanceFailure {
                    account_name: account.to_string(),
                    err: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// Check whether an account name is still free.
    ///
    /// How a server error is read is governed by
    /// [`SyncConfig::server_error_policy`].
    pub async fn check_account_availability(
        &self,
        config: &SyncConfig,
        account: &str,
    ) -> Result<AccountAvailability, ChainError> {
        self.emit(SyncEvent::AccountAvailablePending {
            account_name: account.to_string(),
        });

        let checked = async {
            require_target(config, account)?;
            match self.rpc.get_account(account).await {
                Ok(_) => Ok(AccountAvailability::Taken),
                Err(ChainError::NotFound { .. }) => Ok(AccountAvailability::Available),
                Err(err @ ChainError::Server { .. }) => match config.server_error_policy {
                    ServerErrorPolicy::TreatAsAvailable => {
                        tracing::warn!(account, %err, "server error read as available");
                        Ok(AccountAvailability::Available)
                    }
                    ServerErrorPolicy::TreatAsFailure => Err(err),
                },
                Err(err) => Err(err),
            }
        }
        .await;

        match checked {
            Ok(availability) => {
                self.emit(SyncEvent::AccountAvailableResult {
                    account_name: account.to_string(),
                    available: availability == AccountAvailability::Available,
                });
                Ok(availability)
            }
            Err(err) => {
                self.emit(SyncEvent::AccountAvailableFailure {
                    account_name: account.to_string(),
                    err: err.clone(),
                });
                Err(err)
            }
        }
    }

    pub async fn check_account_exists(
        &self,
        config: &SyncConfig,
        account: &str,
    ) -> Result<(), ChainError> {
        self.emit(SyncEvent::AccountExistsPending {
            account_name: account.to_string(),
        });

        let checked = async {
            require_target(config, account)?;
            self.rpc.get_account(account).await.map(|_| ())
        }
        .await;

        match checked {
            Ok(()) => {
                self.emit(SyncEvent::AccountExistsSuccess {
                    account_name: account.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                self.emit(SyncEvent::AccountExistsFailure {
                    account_name: account.to_string(),
                    err: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// Look up the accounts controlled by a public key and fetch each of them.
    ///
    /// Private keys are refused before any network call.
    pub async fn get_account_by_key(
        &self,
        config: &SyncConfig,
        key: &str,
    ) -> Result<KeyAccounts, ChainError> {
        // never echo a private key back out
        let private = is_valid_private_key(key);
        let shown_key = if private { String::new() } else { key.to_string() };
        self.emit(SyncEvent::AccountByKeyPending {
            key: shown_key.clone(),
        });

        let fetched = async {
            if private {
                return Err(ChainError::validation(
                    "a private key was given where a public key is required",
                ));
            }
            if config.node().is_none() {
                return Err(ChainError::NotConfigured);
            }
            if key.trim().is_empty() {
                return Err(ChainError::validation("empty public key"));
            }
            self.rpc.get_key_accounts(key).await
        }
        .await;

        let accounts = match fetched {
            Ok(accounts) => accounts,
            Err(err) => {
                self.emit(SyncEvent::AccountByKeyFailure {
                    key: shown_key,
                    err: err.clone(),
                });
                return Err(err);
            }
        };

        self.store.put_key_lookup(key, accounts.clone());
        self.get_accounts(config, &accounts.account_names).await;
        self.emit(SyncEvent::AccountByKeySuccess {
            key: key.to_string(),
            accounts: accounts.clone(),
        });
        Ok(accounts)
    }

    /// Reclaim matured unstaked tokens, then reload the owner's state.
    pub async fn claim_unstaked(
        &self,
        config: &SyncConfig,
        owner: &str,
    ) -> Result<TransactionReceipt, ChainError> {
        self.emit(SyncEvent::RefundPending);
        let op = system_action("refund", owner, config.authorization(), json!({ "owner": owner }));

        match self.submit(config, owner, &op).await {
            Ok(tx) => {
                self.emit(SyncEvent::RefundSuccess { tx: tx.clone() });
                if let Err(err) = self.get_account(config, owner).await {
                    tracing::warn!(owner, %err, "account reload after refund failed");
                }
                if let Err(err) = self.get_currency_balance(config, owner, None).await {
                    tracing::warn!(owner, %err, "balance reload after refund failed");
                }
                Ok(tx)
            }
            Err(err) => {
                self.emit(SyncEvent::RefundFailure { err: err.clone() });
                Err(err)
            }
        }
    }

    /// Claim the WAX genesis reward for the active account.
    pub async fn claim_genesis_rewards(
        &self,
        config: &SyncConfig,
    ) -> Result<TransactionReceipt, ChainError> {
        self.emit(SyncEvent::ClaimGenesisPending);
        let account = config.account.clone().unwrap_or_default();
        let op = system_action(
            "claimgenesis",
            &account,
            config.authorization(),
            json!({ "claimer": account }),
        );

        match self.submit(config, &account, &op).await {
            Ok(tx) => {
                self.emit(SyncEvent::ClaimGenesisSuccess { tx: tx.clone() });
                Ok(tx)
            }
            Err(err) => {
                self.emit(SyncEvent::ClaimGenesisFailure { err: err.clone() });
                Err(err)
            }
        }
    }

    /// Claim the WAX voting reward for the active account.
    pub async fn claim_voting_rewards(
        &self,
        config: &SyncConfig,
    ) -> Result<TransactionReceipt, ChainError> {
        self.emit(SyncEvent::ClaimVotingPending);
        let account = config.account.clone().unwrap_or_default();
        let op = system_action(
            "claimgbmvote",
            &account,
            config.authorization(),
            json!({ "owner": account }),
        );

        match self.submit(config, &account, &op).await {
            Ok(tx) => {
                self.emit(SyncEvent::ClaimVotingSuccess { tx: tx.clone() });
                Ok(tx)
            }
            Err(err) => {
                self.emit(SyncEvent::ClaimVotingFailure { err: err.clone() });
                Err(err)
            }
        }
    }

    async fn submit(
        &self,
        config: &SyncConfig,
        actor: &str,
        op: &TransactionOp,
    ) -> Result<TransactionReceipt, ChainError> {
        require_target(config, actor)?;
        tracing::debug!(actor, actions = op.actions.len(), "submitting transaction");
        self.rpc.transact(op, &TransactOptions::default()).await
    }
}
