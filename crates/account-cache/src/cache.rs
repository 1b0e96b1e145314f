//! Balances/allowances per `(owner, token)`, invalidated by transfer and
//! approval events (§4.6 "Account Cache (C8)").
//!
//! Sharded with `dashmap::DashMap` rather than one global `Mutex`, giving
//! per-bucket locking for free — the same per-address-locking trade the
//! spec's `CutoffCache`/`AccountCache` make (§5 "Shared resources", §9
//! "Account cache sharding").

use {
    dashmap::DashMap,
    primitive_types::{H160, U256},
    std::{
        collections::HashSet,
        time::{Duration, Instant},
    },
};

/// Default TTL fallback in case an invalidating event is missed, e.g. due
/// to the extractor's confirmation lag (§4.6).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: U256,
    fetched_at: Instant,
}

pub struct AccountCache {
    balances: DashMap<(H160, H160), Entry>,
    allowances: DashMap<(H160, H160, H160), Entry>,
    ttl: Duration,
    /// Contracts authorized to move user tokens (Glossary "Delegate");
    /// approvals to unknown spenders are not relayed, matching the ABI
    /// processor's "known delegate" rule (§4.1).
    delegates: HashSet<H160>,
}

impl AccountCache {
    pub fn new(ttl: Duration, delegates: HashSet<H160>) -> Self {
        Self {
            balances: DashMap::new(),
            allowances: DashMap::new(),
            ttl,
            delegates,
        }
    }

    pub fn is_delegate(&self, spender: H160) -> bool {
        self.delegates.contains(&spender)
    }

    pub fn get_balance(&self, owner: H160, token: H160) -> Option<U256> {
        self.get(&self.balances, (owner, token))
    }

    pub fn set_balance(&self, owner: H160, token: H160, balance: U256) {
        self.set(&self.balances, (owner, token), balance);
    }

    pub fn invalidate_balance(&self, owner: H160, token: H160) {
        self.balances.remove(&(owner, token));
    }

    pub fn get_allowance(&self, owner: H160, token: H160, spender: H160) -> Option<U256> {
        self.get(&self.allowances, (owner, token, spender))
    }

    pub fn set_allowance(&self, owner: H160, token: H160, spender: H160, allowance: U256) {
        self.set(&self.allowances, (owner, token, spender), allowance);
    }

    pub fn invalidate_allowance(&self, owner: H160, token: H160, spender: H160) {
        self.allowances.remove(&(owner, token, spender));
    }

    /// Drops every cached entry (§4.5 fork rollback ack): the cache holds
    /// no block-indexed history to roll back selectively, so a reorg just
    /// clears it and lets the next read repopulate from the chain.
    pub fn rollback(&self, _fork_block: u64, _detected_block: u64) {
        self.balances.clear();
        self.allowances.clear();
    }

    fn get<K: std::hash::Hash + Eq + Clone>(&self, map: &DashMap<K, Entry>, key: K) -> Option<U256> {
        let entry = map.get(&key)?;
        if entry.fetched_at.elapsed() > self.ttl {
            drop(entry);
            map.remove(&key);
            return None;
        }
        Some(entry.value)
    }

    fn set<K: std::hash::Hash + Eq + Clone>(&self, map: &DashMap<K, Entry>, key: K, value: U256) {
        map.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = AccountCache::new(DEFAULT_TTL, HashSet::new());
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        cache.set_balance(owner, token, U256::from(100));
        assert_eq!(cache.get_balance(owner, token), Some(U256::from(100)));
    }

    #[test]
    fn invalidate_clears_entry() {
        let cache = AccountCache::new(DEFAULT_TTL, HashSet::new());
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        cache.set_balance(owner, token, U256::from(100));
        cache.invalidate_balance(owner, token);
        assert_eq!(cache.get_balance(owner, token), None);
    }

    #[test]
    fn rollback_clears_balances_and_allowances() {
        let cache = AccountCache::new(DEFAULT_TTL, HashSet::new());
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        let spender = H160::repeat_byte(3);
        cache.set_balance(owner, token, U256::from(100));
        cache.set_allowance(owner, token, spender, U256::from(50));

        cache.rollback(10, 12);

        assert_eq!(cache.get_balance(owner, token), None);
        assert_eq!(cache.get_allowance(owner, token, spender), None);
    }

    #[test]
    fn ttl_expiry_evicts_entry() {
        let cache = AccountCache::new(Duration::from_millis(1), HashSet::new());
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        cache.set_balance(owner, token, U256::from(100));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get_balance(owner, token), None);
    }

    #[test]
    fn allowance_requires_known_delegate_to_matter_upstream() {
        let mut delegates = HashSet::new();
        let spender = H160::repeat_byte(9);
        delegates.insert(spender);
        let cache = AccountCache::new(DEFAULT_TTL, delegates);
        assert!(cache.is_delegate(spender));
        assert!(!cache.is_delegate(H160::repeat_byte(8)));
    }
}
