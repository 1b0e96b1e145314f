//! The blockchain RPC client, consumed as a sequence of `(block, [tx],
//! [receipt], [log])` tuples (§1 "Out of scope: external collaborators").
//! This crate only defines the shape it needs from that client.

use {
    abi_processor::{RawReceipt, RawTransaction},
    async_trait::async_trait,
    primitive_types::H256,
};

/// A fetched block: its own identity plus every transaction paired with
/// its receipt (`None` only ever occurs for pending-pool entries, which
/// never reach [`BlockSource::block`]).
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub timestamp: u64,
    pub transactions: Vec<(RawTransaction, RawReceipt)>,
}

/// External collaborator per §1: the node client, reduced to exactly the
/// shape the extractor (C4) drives it through.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// The highest block number the node currently reports.
    async fn tip(&self) -> Result<u64, crate::Error>;

    /// Fetches block `number` with every transaction object and receipt.
    /// `None` means the node does not (yet, or any longer) have this
    /// block, which the caller treats the same as "not confirmed yet".
    async fn block(&self, number: u64) -> Result<Option<RawBlock>, crate::Error>;

    /// Transactions sitting in the node's mempool, not yet in a block
    /// (§4.4 "Pending pool").
    async fn pending_transactions(&self) -> Result<Vec<RawTransaction>, crate::Error>;
}
