//! Keyed in-memory cache of synced account state.
//!
//! Every section is keyed by account name and written last-write-wins; a slow
//! response can overwrite a newer one.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{
    AccountSnapshot, ActionHistory, BalanceRecord, GenesisBalance, KeyAccounts,
    TokenBalanceUpdate,
};

#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, AccountSnapshot>>,
    actions: RwLock<HashMap<String, ActionHistory>>,
    /// account -> contract -> balances
    balances: RwLock<HashMap<String, HashMap<String, BalanceRecord>>>,
    genesis: RwLock<HashMap<String, GenesisBalance>>,
    key_lookup: RwLock<Option<(String, KeyAccounts)>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, name: &str) -> Option<AccountSnapshot> {
        self.accounts.read().get(name).cloned()
    }

    pub fn account_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.accounts.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn put_account(&self, snapshot: AccountSnapshot) {
        self.accounts
            .write()
            .insert(snapshot.account_name.clone(), snapshot);
    }

    pub fn actions(&self, name: &str) -> ActionHistory {
        self.actions.read().get(name).cloned().unwrap_or_default()
    }

    pub fn put_actions(&self, name: &str, history: ActionHistory) {
        self.actions.write().insert(name.to_string(), history);
    }

    pub fn balances(&self, name: &str, contract: &str) -> Option<BalanceRecord> {
        self.balances
            .read()
            .get(name)
            .and_then(|contracts| contracts.get(contract))
            .cloned()
    }

    /// Every contract's balances for an account.
    pub fn all_balances(&self, name: &str) -> HashMap<String, BalanceRecord> {
        self.balances.read().get(name).cloned().unwrap_or_default()
    }

    pub fn merge_balance(&self, update: &TokenBalanceUpdate) {
        self.balances
            .write()
            .entry(update.account_name.clone())
            .or_default()
            .entry(update.contract.clone())
            .or_default()
            .merge(update);
    }

    pub fn genesis(&self, name: &str) -> Option<GenesisBalance> {
        self.genesis.read().get(name).cloned()
    }

    pub fn put_genesis(&self, balance: GenesisBalance) {
        self.genesis.write().insert(balance.account.clone(), balance);
    }

    pub fn key_lookup(&self) -> Option<(String, KeyAccounts)> {
        self.key_lookup.read().clone()
    }

    pub fn put_key_lookup(&self, key: &str, accounts: KeyAccounts) {
        *self.key_lookup.write() = Some((key.to_string(), accounts));
    }

    pub fn clear_accounts(&self) {
        self.accounts.write().clear();
    }

    pub fn clear_actions(&self) {
        self.actions.write().clear();
    }

    pub fn clear_balances(&self) {
        self.balances.write().clear();
        self.genesis.write().clear();
    }

    pub fn clear_key_lookup(&self) {
        *self.key_lookup.write() = None;
    }
}
