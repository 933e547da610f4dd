use crate::config::SyncConfig;
use crate::core::balance_formatter::zero_asset;
use crate::types::{AccountSnapshot, DelegatedBandwidth};

/// Normalized copy of a fetched snapshot plus the proxy it points at.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedAccount {
    pub snapshot: AccountSnapshot,
    pub proxy: Option<String>,
}

/// Fill in a zero delegation record when the node omits it.
///
/// Works on a copy; `raw` is left untouched.
pub fn normalize_snapshot(raw: &AccountSnapshot, config: &SyncConfig) -> NormalizedAccount {
    let mut snapshot = raw.clone();
    if snapshot.self_delegated_bandwidth.is_none() {
        let zero = zero_asset(config.token_precision, &config.blockchain.token_symbol);
        snapshot.self_delegated_bandwidth = Some(DelegatedBandwidth {
            cpu_weight: zero.clone(),
            net_weight: zero,
            ..Default::default()
        });
    }
    let proxy = snapshot.proxy().map(str::to_string);
    NormalizedAccount { snapshot, proxy }
}
