#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use eos_account_sync::types::{
    ActionsPage, TableRows, TableRowsQuery, TransactOptions, TransactionOp, TransactionReceipt,
};
use eos_account_sync::{
    AccountSnapshot, ActionRecord, BlockchainConfig, ChainError, ChainRpc, KeyAccounts, SyncConfig,
    SyncEvent,
};
use tokio::sync::mpsc::UnboundedReceiver;

type BalanceKey = (String, String);

/// Scripted chain node: answers from tables filled by the test, records calls.
#[derive(Default)]
pub struct MockChain {
    accounts: Mutex<HashMap<String, Result<AccountSnapshot, ChainError>>>,
    actions: Mutex<HashMap<String, Result<ActionsPage, ChainError>>>,
    balances: Mutex<HashMap<BalanceKey, Result<Vec<String>, ChainError>>>,
    balance_delays: Mutex<HashMap<BalanceKey, Duration>>,
    key_accounts: Mutex<HashMap<String, KeyAccounts>>,
    tables: Mutex<HashMap<(String, String), TableRows>>,
    transact_result: Mutex<Option<Result<TransactionReceipt, ChainError>>>,
    transactions: Mutex<Vec<TransactionOp>>,
    calls: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, raw: Value) -> Self {
        let snapshot: AccountSnapshot = serde_json::from_value(raw).expect("account fixture");
        self.accounts
            .lock()
            .insert(snapshot.account_name.clone(), Ok(snapshot));
        self
    }

    pub fn with_named_account(self, name: &str, proxy: Option<&str>) -> Self {
        let mut raw = serde_json::json!({ "account_name": name, "permissions": [] });
        if let Some(proxy) = proxy {
            raw["voter_info"] = serde_json::json!({ "owner": name, "proxy": proxy, "producers": [] });
        }
        self.with_account(raw)
    }

    pub fn with_account_error(self, name: &str, err: ChainError) -> Self {
        self.accounts.lock().insert(name.to_string(), Err(err));
        self
    }

    pub fn with_actions(self, name: &str, seqs: &[u64]) -> Self {
        let page = ActionsPage {
            actions: seqs.iter().copied().map(ActionRecord::new).collect(),
            last_irreversible_block: None,
        };
        self.actions.lock().insert(name.to_string(), Ok(page));
        self
    }

    pub fn with_actions_page(self, name: &str, raw: Value) -> Self {
        let page: ActionsPage = serde_json::from_value(raw).expect("actions fixture");
        self.actions.lock().insert(name.to_string(), Ok(page));
        self
    }

    pub fn with_actions_error(self, name: &str, err: ChainError) -> Self {
        self.actions.lock().insert(name.to_string(), Err(err));
        self
    }

    pub fn with_balance(self, contract: &str, symbol: &str, raw: &[&str]) -> Self {
        self.balances.lock().insert(
            (contract.to_string(), symbol.to_string()),
            Ok(raw.iter().map(|entry| entry.to_string()).collect()),
        );
        self
    }

    pub fn with_balance_error(self, contract: &str, symbol: &str, err: ChainError) -> Self {
        self.balances
            .lock()
            .insert((contract.to_string(), symbol.to_string()), Err(err));
        self
    }

    pub fn with_balance_delay(self, contract: &str, symbol: &str, delay: Duration) -> Self {
        self.balance_delays
            .lock()
            .insert((contract.to_string(), symbol.to_string()), delay);
        self
    }

    pub fn with_key_accounts(self, key: &str, names: &[&str]) -> Self {
        self.key_accounts.lock().insert(
            key.to_string(),
            KeyAccounts {
                account_names: names.iter().map(|name| name.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_table_row(self, scope: &str, table: &str, row: Value) -> Self {
        self.tables.lock().insert(
            (scope.to_string(), table.to_string()),
            TableRows {
                rows: vec![row],
                more: false,
            },
        );
        self
    }

    pub fn with_transact(self, result: Result<TransactionReceipt, ChainError>) -> Self {
        *self.transact_result.lock() = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn transactions(&self) -> Vec<TransactionOp> {
        self.transactions.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn get_account(&self, account: &str) -> Result<AccountSnapshot, ChainError> {
        self.record(format!("get_account:{account}"));
        self.accounts
            .lock()
            .get(account)
            .cloned()
            .unwrap_or_else(|| Err(ChainError::not_found(format!("account {account}"))))
    }

    async fn get_actions(
        &self,
        account: &str,
        pos: i64,
        offset: i64,
    ) -> Result<ActionsPage, ChainError> {
        self.record(format!("get_actions:{account}:{pos}:{offset}"));
        self.actions
            .lock()
            .get(account)
            .cloned()
            .unwrap_or_else(|| Ok(ActionsPage::default()))
    }

    async fn get_currency_balance(
        &self,
        contract: &str,
        account: &str,
        symbol: &str,
    ) -> Result<Vec<String>, ChainError> {
        self.record(format!("get_currency_balance:{contract}:{account}:{symbol}"));
        let key = (contract.to_string(), symbol.to_string());
        let delay = self.balance_delays.lock().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.balances
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_key_accounts(&self, public_key: &str) -> Result<KeyAccounts, ChainError> {
        self.record(format!("get_key_accounts:{public_key}"));
        Ok(self
            .key_accounts
            .lock()
            .get(public_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_table_rows(&self, query: &TableRowsQuery) -> Result<TableRows, ChainError> {
        self.record(format!(
            "get_table_rows:{}:{}:{}",
            query.code, query.scope, query.table
        ));
        Ok(self
            .tables
            .lock()
            .get(&(query.scope.clone(), query.table.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn transact(
        &self,
        op: &TransactionOp,
        options: &TransactOptions,
    ) -> Result<TransactionReceipt, ChainError> {
        let names: Vec<&str> = op.actions.iter().map(|action| action.name.as_str()).collect();
        self.record(format!(
            "transact:{}:{}:{}",
            names.join(","),
            options.blocks_behind,
            options.expire_seconds
        ));
        self.transactions.lock().push(op.clone());
        self.transact_result
            .lock()
            .clone()
            .unwrap_or(Err(ChainError::Unsupported("no transact script")))
    }
}

pub fn eos_config() -> SyncConfig {
    SyncConfig {
        node: Some("http://127.0.0.1:8888".to_string()),
        ..Default::default()
    }
}

pub fn wax_config(account: Option<&str>) -> SyncConfig {
    SyncConfig {
        node: Some("http://127.0.0.1:8888".to_string()),
        blockchain: BlockchainConfig {
            token_symbol: "WAX".to_string(),
        },
        token_precision: 8,
        account: account.map(str::to_string),
        ..Default::default()
    }
}

pub fn load_fixture(name: &str) -> Result<Value> {
    let path = format!("tests/fixtures/{name}");
    let data = fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {path}"))
}

pub fn drain(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event type tags in emission order, e.g. `GET_ACCOUNT_REQUEST`.
pub fn event_types(events: &[SyncEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| {
            serde_json::to_value(event).expect("event serializes")["type"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
