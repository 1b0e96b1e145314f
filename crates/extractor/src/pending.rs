//! The pending-transaction pool poller (§4.4 "Pending pool"): a parallel
//! path to the confirmed-block loop, publishing mempool transactions with
//! `status = PENDING` and no associated logs.

use {
    crate::source::BlockSource,
    abi_processor::{AbiProcessor, BlockContext, TxStatus},
    event_bus::{Event, EventBus, PendingTransactionEvent},
    std::{sync::Arc, time::Duration},
};

pub struct PendingPool {
    source: Arc<dyn BlockSource>,
    processor: Arc<AbiProcessor>,
    bus: Arc<EventBus>,
    poll_interval: Duration,
}

impl PendingPool {
    pub fn new(
        source: Arc<dyn BlockSource>,
        processor: Arc<AbiProcessor>,
        bus: Arc<EventBus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            processor,
            bus,
            poll_interval,
        }
    }

    /// Runs forever on its own task; a transient RPC error just waits for
    /// the next tick rather than taking down the loop (pending txs are a
    /// best-effort feed, not the authoritative one).
    pub async fn run(&self) -> ! {
        loop {
            match self.source.pending_transactions().await {
                Ok(txs) => {
                    for tx in txs {
                        self.bus
                            .publish(Event::PendingTransaction(PendingTransactionEvent {
                                tx_hash: tx.hash,
                                raw_from: tx.from,
                                nonce: tx.nonce,
                            }))
                            .await;
                        let ctx = BlockContext {
                            block_number: 0,
                            block_time: 0,
                        };
                        self.processor.process(&tx, None, ctx, TxStatus::Pending).await;
                    }
                }
                Err(err) => tracing::warn!(%err, "pending pool poll failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
