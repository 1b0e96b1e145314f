//! The chain-shaped inputs the extractor (C4) hands to [`crate::AbiProcessor`].
//! The RPC client and the ABI decoder themselves are external collaborators
//! (§1); this crate only consumes their already-fetched, already-classified
//! output.

use primitive_types::{H160, H256, U256};

pub use domain::event::TxStatus;

/// One entry of a transaction receipt's log array.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub address: H160,
    /// `topics[0]` is the event id; `topics[1..]` are the indexed fields.
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
    pub log_index: u64,
}

#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub hash: H256,
    pub from: H160,
    pub to: Option<H160>,
    /// `input[0..4]` is the method selector when present.
    pub input: Vec<u8>,
    pub value: U256,
    pub nonce: u64,
    pub gas: U256,
    pub gas_price: U256,
}

impl RawTransaction {
    pub fn selector(&self) -> Option<[u8; 4]> {
        if self.input.len() < 4 {
            return None;
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&self.input[..4]);
        Some(sel)
    }
}

#[derive(Debug, Clone)]
pub struct RawReceipt {
    pub status: TxStatus,
    pub gas_used: U256,
    pub logs: Vec<RawLog>,
}

/// Block-level context threaded through every decoded event (§4.1 `TxInfo`).
#[derive(Debug, Clone, Copy)]
pub struct BlockContext {
    pub block_number: u64,
    pub block_time: u64,
}
