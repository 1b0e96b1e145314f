//! Per-`(protocol, owner)` and per-`(protocol, owner, pair)` cutoff
//! timestamp caches (§4.2.4), `dashmap`-sharded the same way the account
//! cache (C8) shards balances — per-key locking instead of one global
//! mutex (§5 "Shared resources", §9 "Account cache sharding").

use {dashmap::DashMap, domain::order::TokenPair, primitive_types::H160};

#[derive(Default)]
pub struct CutoffCache {
    all: DashMap<(H160, H160), u64>,
    pair: DashMap<(H160, H160, TokenPair), u64>,
}

impl CutoffCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard: only apply if `event.cutoffTime > cached` (§4.2.4). Returns
    /// whether the cache advanced.
    pub fn try_advance_all(&self, protocol: H160, owner: H160, cutoff_time: u64) -> bool {
        let mut advanced = false;
        self.all
            .entry((protocol, owner))
            .and_modify(|cached| {
                if cutoff_time > *cached {
                    *cached = cutoff_time;
                    advanced = true;
                }
            })
            .or_insert_with(|| {
                advanced = true;
                cutoff_time
            });
        advanced
    }

    pub fn try_advance_pair(
        &self,
        protocol: H160,
        owner: H160,
        token1: H160,
        token2: H160,
        cutoff_time: u64,
    ) -> bool {
        let pair = TokenPair::new(token1, token2);
        let mut advanced = false;
        self.pair
            .entry((protocol, owner, pair))
            .and_modify(|cached| {
                if cutoff_time > *cached {
                    *cached = cutoff_time;
                    advanced = true;
                }
            })
            .or_insert_with(|| {
                advanced = true;
                cutoff_time
            });
        advanced
    }

    pub fn cutoff_all(&self, protocol: H160, owner: H160) -> u64 {
        self.all.get(&(protocol, owner)).map(|v| *v).unwrap_or(0)
    }

    pub fn cutoff_pair(&self, protocol: H160, owner: H160, token1: H160, token2: H160) -> u64 {
        self.pair
            .get(&(protocol, owner, TokenPair::new(token1, token2)))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Reorg recovery drops cached cutoff timestamps entirely, since a
    /// forked cutoff transaction may no longer be canonical (§4.2.6).
    pub fn clear(&self) {
        self.all.clear();
        self.pair.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_only_advances_strictly_newer() {
        let cache = CutoffCache::new();
        let protocol = H160::repeat_byte(1);
        let owner = H160::repeat_byte(2);

        assert!(cache.try_advance_all(protocol, owner, 10));
        assert_eq!(cache.cutoff_all(protocol, owner), 10);

        assert!(!cache.try_advance_all(protocol, owner, 10));
        assert!(!cache.try_advance_all(protocol, owner, 5));
        assert_eq!(cache.cutoff_all(protocol, owner), 10);

        assert!(cache.try_advance_all(protocol, owner, 11));
        assert_eq!(cache.cutoff_all(protocol, owner), 11);
    }

    #[test]
    fn pair_cache_is_order_insensitive() {
        let cache = CutoffCache::new();
        let protocol = H160::repeat_byte(1);
        let owner = H160::repeat_byte(2);
        let t1 = H160::repeat_byte(3);
        let t2 = H160::repeat_byte(4);

        assert!(cache.try_advance_pair(protocol, owner, t1, t2, 10));
        assert_eq!(cache.cutoff_pair(protocol, owner, t2, t1), 10);
    }
}
