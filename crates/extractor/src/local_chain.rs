//! The extractor's own record of recently emitted block hashes: the
//! "locally stored block hash table" [`fork_coordinator::LocalBlockHashes`]
//! reads from (§4.5). Bounded so memory stays flat regardless of uptime;
//! the confirmation depth means a fork deeper than this window cannot be
//! resolved by local comparison alone, which is out of scope here.

use {
    async_trait::async_trait,
    fork_coordinator::LocalBlockHashes,
    primitive_types::H256,
    std::collections::BTreeMap,
    tokio::sync::RwLock,
};

/// How many trailing blocks to retain for reorg comparison. Generous
/// relative to typical confirmation depths (§4.4 `confirms`).
const WINDOW: u64 = 256;

#[derive(Default)]
pub struct LocalChain {
    hashes: RwLock<BTreeMap<u64, H256>>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, number: u64, hash: H256) {
        let mut hashes = self.hashes.write().await;
        hashes.insert(number, hash);
        while hashes.len() as u64 > WINDOW {
            let Some(&oldest) = hashes.keys().next() else {
                break;
            };
            hashes.remove(&oldest);
        }
    }

    pub async fn hash_of(&self, number: u64) -> Option<H256> {
        self.hashes.read().await.get(&number).copied()
    }

    /// Drops every recorded hash strictly after `fork_block`, so the next
    /// `record` calls rebuild the post-fork suffix from scratch (§4.2.6
    /// step 3, applied here to the extractor's own bookkeeping).
    pub async fn truncate_after(&self, fork_block: u64) {
        self.hashes.write().await.retain(|&n, _| n <= fork_block);
    }
}

#[async_trait]
impl LocalBlockHashes for LocalChain {
    async fn hash_at(&self, block_number: u64) -> Result<Option<H256>, fork_coordinator::Error> {
        Ok(self.hash_of(block_number).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncate_drops_only_the_forked_suffix() {
        let chain = LocalChain::new();
        for n in 90..=100 {
            chain.record(n, H256::repeat_byte(n as u8)).await;
        }
        chain.truncate_after(95).await;
        assert_eq!(chain.hash_of(95).await, Some(H256::repeat_byte(95)));
        assert_eq!(chain.hash_of(96).await, None);
        assert_eq!(chain.hash_of(100).await, None);
    }

    #[tokio::test]
    async fn window_bounds_memory() {
        let chain = LocalChain::new();
        for n in 0..(WINDOW * 2) {
            chain.record(n, H256::repeat_byte((n % 251) as u8)).await;
        }
        assert_eq!(chain.hashes.read().await.len() as u64, WINDOW);
    }
}
