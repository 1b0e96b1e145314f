//! Typed domain events produced by the ABI processor (C3) and consumed by
//! the order manager, transaction manager and account cache (§3, §4.1).

use primitive_types::{H160, H256, U256};

/// Where in the chain an event originated; carried alongside every event so
/// handlers can dedupe, order, and (on fork) range-delete by block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventIndex {
    pub block_number: u64,
    pub log_index: u64,
}

/// `RingMined(ringHash, ringIndex, ...)`. Fans out to one `RingMined` row
/// plus N `OrderFilled` events from a single decode call (§9).
#[derive(Debug, Clone)]
pub struct RingMinedEvent {
    pub index: EventIndex,
    pub ring_hash: H256,
    pub ring_index: U256,
    pub tx_hash: H256,
}

/// One order's fill inside a ring (§4.2.2). Idempotency key: `(ring_hash,
/// order_hash)`.
#[derive(Debug, Clone)]
pub struct FillEvent {
    pub index: EventIndex,
    pub ring_hash: H256,
    pub order_hash: H256,
    pub amount_s: U256,
    pub amount_b: U256,
    pub split_s: U256,
    pub split_b: U256,
    pub lrc_fee: U256,
    pub tx_hash: H256,
}

/// `OrderCancelled(orderHash, amountCancelled)` (§4.2.3). Idempotency key:
/// `(order_hash, tx_hash)`.
///
/// `owner`/`raw_from`/`nonce` are the outer transaction's sender and nonce,
/// not anything carried by the log itself — the transaction journal (C6)
/// needs them to journal the cancel against the account that sent it.
#[derive(Debug, Clone)]
pub struct CancelEvent {
    pub index: EventIndex,
    pub order_hash: H256,
    pub amount_cancelled: U256,
    pub tx_hash: H256,
    pub owner: H160,
    pub raw_from: H160,
    pub nonce: u64,
}

/// `AllOrdersCancelled(owner, cutoff)`. Idempotency key: `tx_hash`.
#[derive(Debug, Clone)]
pub struct CutoffAllEvent {
    pub index: EventIndex,
    pub protocol: H160,
    pub owner: H160,
    pub cutoff_time: u64,
    pub tx_hash: H256,
}

/// `OrdersCancelled(owner, token1, token2, cutoff)`. Idempotency key:
/// `tx_hash`.
#[derive(Debug, Clone)]
pub struct CutoffPairEvent {
    pub index: EventIndex,
    pub protocol: H160,
    pub owner: H160,
    pub token1: H160,
    pub token2: H160,
    pub cutoff_time: u64,
    pub tx_hash: H256,
}

#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub index: EventIndex,
    pub token: H160,
    pub from: H160,
    pub to: H160,
    pub value: U256,
    pub tx_hash: H256,
    /// Raw sender of the outer transaction, used by the transaction
    /// journal's `(rawFrom, nonce)` reconciliation key.
    pub raw_from: H160,
    pub nonce: u64,
}

#[derive(Debug, Clone)]
pub struct ApprovalEvent {
    pub index: EventIndex,
    pub token: H160,
    pub owner: H160,
    pub spender: H160,
    pub value: U256,
    pub tx_hash: H256,
    pub raw_from: H160,
    pub nonce: u64,
}

#[derive(Debug, Clone)]
pub struct TokenRegisteredEvent {
    pub index: EventIndex,
    pub token: H160,
    pub symbol: String,
}

/// `deposit()` / `withdraw()` method calls on the WETH contract (S7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WethMethod {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone)]
pub struct WethEvent {
    pub index: EventIndex,
    pub method: WethMethod,
    pub owner: H160,
    pub weth: H160,
    pub value: U256,
    pub tx_hash: H256,
    pub raw_from: H160,
    pub nonce: u64,
    pub status: TxStatus,
}

/// A plain value transfer, or a zero-value call into a contract the
/// registration table does not recognize (S8).
#[derive(Debug, Clone)]
pub struct EthTransferEvent {
    pub index: EventIndex,
    pub from: H160,
    pub to: H160,
    pub value: U256,
    pub tx_hash: H256,
    pub raw_from: H160,
    pub nonce: u64,
    pub status: TxStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

/// Upstream chain reorganized; §4.5/§4.2.6/§4.3 "Fork handling".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainForkDetected {
    pub fork_block: u64,
    pub detected_block: u64,
}
