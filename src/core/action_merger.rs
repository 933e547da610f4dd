//! Incremental reconciliation of per-account action histories.

use std::collections::HashSet;

use crate::types::ActionRecord;

/// Outcome of reconciling a fetched page against the cached history.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryMerge {
    /// The page brings nothing newer than what is cached.
    NoChange,
    Updated(Vec<ActionRecord>),
}

/// Reconcile a freshly fetched page with the cached history.
///
/// The page's newest action is its highest sequence id (RPC pages come back
/// oldest first, but either order is accepted) while the cache keeps the
/// newest action first. A page made only of already cached actions is also
/// reported as unchanged.
pub fn reconcile(existing: &[ActionRecord], batch: &[ActionRecord]) -> HistoryMerge {
    let fetched_newest = batch.iter().map(|action| action.account_action_seq).max();
    let cached_newest = existing.first().map(|action| action.account_action_seq);
    if fetched_newest == cached_newest || is_subset(batch, existing) {
        return HistoryMerge::NoChange;
    }
    HistoryMerge::Updated(merge_action_lists(existing, batch))
}

fn is_subset(batch: &[ActionRecord], existing: &[ActionRecord]) -> bool {
    let known: HashSet<u64> = existing
        .iter()
        .map(|action| action.account_action_seq)
        .collect();
    batch
        .iter()
        .all(|action| known.contains(&action.account_action_seq))
}

/// Union of both lists, first occurrence of each sequence id kept, newest first.
pub fn merge_action_lists(existing: &[ActionRecord], batch: &[ActionRecord]) -> Vec<ActionRecord> {
    let mut seen = HashSet::with_capacity(existing.len() + batch.len());
    let mut merged: Vec<ActionRecord> = existing
        .iter()
        .chain(batch.iter())
        .filter(|action| seen.insert(action.account_action_seq))
        .cloned()
        .collect();
    merged.sort_by(|a, b| b.account_action_seq.cmp(&a.account_action_seq));
    merged
}
