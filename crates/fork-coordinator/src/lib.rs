//! Fork Coordinator (C7, §4.5): detects a chain reorganization and
//! orchestrates the rollback of order manager (C5), transaction manager
//! (C6) and account cache (C8) before letting the extractor (C4) resume.

use {
    async_trait::async_trait,
    event_bus::{Event, EventBus},
    futures::future::join_all,
    primitive_types::H256,
    std::sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("local block {0} has no stored hash; cannot find a common ancestor")]
    NoCommonAncestor(u64),
    #[error("upstream rpc error: {0}")]
    Upstream(String),
}

/// The locally stored block hash table the extractor has been appending
/// to (external collaborator per §1, consumed here read-only).
#[async_trait]
pub trait LocalBlockHashes: Send + Sync {
    async fn hash_at(&self, block_number: u64) -> Result<Option<H256>, Error>;
}

/// The upstream node, queried to find where it diverges from local state.
#[async_trait]
pub trait UpstreamBlockHashes: Send + Sync {
    async fn hash_at(&self, block_number: u64) -> Result<H256, Error>;
}

/// One of C5/C6/C8: rolls its own persisted or cached state back to the
/// fork point when a reorg is detected.
#[async_trait]
pub trait RollbackTarget: Send + Sync {
    async fn rollback(&self, fork_block: u64, detected_block: u64);
}

pub struct ForkCoordinator {
    bus: Arc<EventBus>,
    targets: Vec<Arc<dyn RollbackTarget>>,
}

impl ForkCoordinator {
    pub fn new(bus: Arc<EventBus>, targets: Vec<Arc<dyn RollbackTarget>>) -> Self {
        Self { bus, targets }
    }

    /// Linear-searches backward from `detected_block` until the locally
    /// stored hash matches the upstream hash at the same height; that
    /// block is the fork point (§4.5).
    pub async fn find_fork_block(
        &self,
        local: &dyn LocalBlockHashes,
        upstream: &dyn UpstreamBlockHashes,
        detected_block: u64,
    ) -> Result<u64, Error> {
        let mut candidate = detected_block;
        loop {
            let stored = local.hash_at(candidate).await?;
            let canonical = upstream.hash_at(candidate).await?;
            if stored == Some(canonical) {
                return Ok(candidate);
            }
            match candidate.checked_sub(1) {
                Some(next) => candidate = next,
                None => return Err(Error::NoCommonAncestor(detected_block)),
            }
        }
    }

    /// Publishes `ChainForkDetected`, runs every registered target's
    /// rollback concurrently, then publishes `ChainForkProcess` so the
    /// extractor resumes (§4.5, §5 "Fork handling takes a writer-latch
    /// ... that blocks new event handling for its duration").
    pub async fn coordinate_rollback(&self, fork_block: u64, detected_block: u64) {
        let event = domain::event::ChainForkDetected {
            fork_block,
            detected_block,
        };
        self.bus.publish(Event::ChainForkDetected(event)).await;

        join_all(
            self.targets
                .iter()
                .map(|target| target.rollback(fork_block, detected_block)),
        )
        .await;

        self.bus
            .publish(Event::ChainForkProcess(domain::event::ChainForkDetected {
                fork_block,
                detected_block,
            }))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocal(Vec<(u64, H256)>);

    #[async_trait]
    impl LocalBlockHashes for FixedLocal {
        async fn hash_at(&self, block_number: u64) -> Result<Option<H256>, Error> {
            Ok(self
                .0
                .iter()
                .find(|(n, _)| *n == block_number)
                .map(|(_, h)| *h))
        }
    }

    struct FixedUpstream(Vec<(u64, H256)>);

    #[async_trait]
    impl UpstreamBlockHashes for FixedUpstream {
        async fn hash_at(&self, block_number: u64) -> Result<H256, Error> {
            self.0
                .iter()
                .find(|(n, _)| *n == block_number)
                .map(|(_, h)| *h)
                .ok_or_else(|| Error::Upstream(format!("no block {block_number}")))
        }
    }

    #[tokio::test]
    async fn finds_common_ancestor_below_divergence() {
        let common = H256::repeat_byte(1);
        let local = FixedLocal(vec![
            (95, common),
            (96, H256::repeat_byte(2)),
            (97, H256::repeat_byte(3)),
        ]);
        let upstream = FixedUpstream(vec![
            (95, common),
            (96, H256::repeat_byte(20)),
            (97, H256::repeat_byte(30)),
        ]);

        let coordinator = ForkCoordinator::new(Arc::new(EventBus::new()), Vec::new());
        let fork_block = coordinator
            .find_fork_block(&local, &upstream, 97)
            .await
            .unwrap();
        assert_eq!(fork_block, 95);
    }

    struct CountingTarget(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl RollbackTarget for CountingTarget {
        async fn rollback(&self, _fork_block: u64, _detected_block: u64) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn coordinate_rollback_runs_every_target() {
        let target = Arc::new(CountingTarget(std::sync::atomic::AtomicUsize::new(0)));
        let coordinator = ForkCoordinator::new(
            Arc::new(EventBus::new()),
            vec![target.clone() as Arc<dyn RollbackTarget>],
        );
        coordinator.coordinate_rollback(10, 12).await;
        assert_eq!(target.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
