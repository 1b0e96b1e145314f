//! Adapts [`order_manager::OrderManager`] and [`tx_manager::TxManager`] to
//! [`fork_coordinator::RollbackTarget`] (§4.2.6, §4.3 "Fork handling"): the
//! coordinator's barrier only knows how to await a fallible-free
//! `rollback()`, so each adapter here swallows its manager's `Result` into
//! a logged warning, matching the ABI processor's "log and drop" posture
//! for everything that isn't the extractor's own control flow (§7).

use {
    account_cache::AccountCache, async_trait::async_trait, fork_coordinator::RollbackTarget,
    order_manager::OrderManager, prometheus::IntCounter, std::sync::Arc, tx_manager::TxManager,
};

pub struct AccountCacheRollback(pub Arc<AccountCache>);

#[async_trait]
impl RollbackTarget for AccountCacheRollback {
    async fn rollback(&self, fork_block: u64, detected_block: u64) {
        self.0.rollback(fork_block, detected_block);
    }
}

pub struct OrderManagerRollback(pub Arc<OrderManager>);

#[async_trait]
impl RollbackTarget for OrderManagerRollback {
    async fn rollback(&self, fork_block: u64, detected_block: u64) {
        if let Err(err) = self.0.rollback(fork_block, detected_block).await {
            tracing::error!(%err, fork_block, detected_block, "order manager rollback failed");
        }
    }
}

pub struct TxManagerRollback(pub Arc<TxManager>);

#[async_trait]
impl RollbackTarget for TxManagerRollback {
    async fn rollback(&self, fork_block: u64, detected_block: u64) {
        if let Err(err) = self.0.rollback(fork_block, detected_block).await {
            tracing::error!(%err, fork_block, detected_block, "tx manager rollback failed");
        }
    }
}

/// Not a real component: only here so the fork counter increments exactly
/// once per detected fork, alongside the stateful targets rather than
/// inside the extractor's control-flow loop.
pub struct ForkCounter(pub IntCounter);

#[async_trait]
impl RollbackTarget for ForkCounter {
    async fn rollback(&self, _fork_block: u64, _detected_block: u64) {
        self.0.inc();
    }
}
