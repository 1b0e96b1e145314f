//! Decoded payload shapes and the decoder seam (§1 "the ABI decoder... is
//! consumed as `decode(schema, bytes) -> typed struct`"). This crate owns
//! the registration table that maps a topic-0 / selector to one of these
//! kinds; turning the raw bytes into fields is the decoder's job.

use primitive_types::{H160, H256, U256};

#[derive(Debug, thiserror::Error)]
#[error("abi decode error: {0}")]
pub struct DecodeError(pub String);

/// Which registered log this topic-0 identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    RingMined,
    OrderCancelled,
    CutoffAll,
    CutoffPair,
    Transfer,
    Approval,
    TokenRegistered,
}

/// Which registered method this 4-byte selector identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    SubmitRing,
    CancelOrder,
    CutoffAll,
    CutoffPair,
    Approve,
    WethDeposit,
    WethWithdrawal,
}

/// One order's dealt fields out of a `RingMined` log, before the order
/// manager attaches `tokenS`/`tokenB`/`owner` by loading the order (§4.1
/// "RingMined ... fan-out to OrderFilled").
#[derive(Debug, Clone)]
pub struct DecodedFill {
    pub order_hash: H256,
    pub amount_s: U256,
    pub amount_b: U256,
    pub split_s: U256,
    pub split_b: U256,
    pub lrc_fee: U256,
}

#[derive(Debug, Clone)]
pub struct DecodedRingMined {
    pub ring_hash: H256,
    pub ring_index: U256,
    pub fills: Vec<DecodedFill>,
}

#[derive(Debug, Clone)]
pub struct DecodedOrderCancelled {
    pub order_hash: H256,
    pub amount_cancelled: U256,
}

#[derive(Debug, Clone)]
pub struct DecodedCutoffAll {
    pub owner: H160,
    pub cutoff_time: u64,
}

#[derive(Debug, Clone)]
pub struct DecodedCutoffPair {
    pub owner: H160,
    pub token1: H160,
    pub token2: H160,
    pub cutoff_time: u64,
}

#[derive(Debug, Clone)]
pub struct DecodedTransfer {
    pub from: H160,
    pub to: H160,
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct DecodedApproval {
    pub owner: H160,
    pub spender: H160,
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct DecodedTokenRegistered {
    pub token: H160,
    pub symbol: String,
}

#[derive(Debug, Clone)]
pub struct DecodedCutoffAllMethod {
    pub cutoff_time: u64,
}

#[derive(Debug, Clone)]
pub struct DecodedCutoffPairMethod {
    pub token1: H160,
    pub token2: H160,
    pub cutoff_time: u64,
}

#[derive(Debug, Clone)]
pub struct DecodedApproveMethod {
    pub spender: H160,
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct DecodedWethWithdrawalMethod {
    pub value: U256,
}

/// Classifies and decodes logs emitted by registered protocol / token
/// contracts. Implementations own the actual ABI schemas.
pub trait LogDecoder: Send + Sync {
    fn classify(&self, topic0: H256) -> Option<LogKind>;
    fn decode_ring_mined(&self, log: &crate::raw::RawLog) -> Result<DecodedRingMined, DecodeError>;
    fn decode_order_cancelled(
        &self,
        log: &crate::raw::RawLog,
    ) -> Result<DecodedOrderCancelled, DecodeError>;
    fn decode_cutoff_all(&self, log: &crate::raw::RawLog) -> Result<DecodedCutoffAll, DecodeError>;
    fn decode_cutoff_pair(
        &self,
        log: &crate::raw::RawLog,
    ) -> Result<DecodedCutoffPair, DecodeError>;
    fn decode_transfer(&self, log: &crate::raw::RawLog) -> Result<DecodedTransfer, DecodeError>;
    fn decode_approval(&self, log: &crate::raw::RawLog) -> Result<DecodedApproval, DecodeError>;
    fn decode_token_registered(
        &self,
        log: &crate::raw::RawLog,
    ) -> Result<DecodedTokenRegistered, DecodeError>;
}

/// Classifies and decodes method calls by selector.
pub trait MethodDecoder: Send + Sync {
    fn classify(&self, selector: [u8; 4]) -> Option<MethodKind>;
    fn decode_cutoff_all_method(
        &self,
        input: &[u8],
    ) -> Result<DecodedCutoffAllMethod, DecodeError>;
    fn decode_cutoff_pair_method(
        &self,
        input: &[u8],
    ) -> Result<DecodedCutoffPairMethod, DecodeError>;
    fn decode_approve_method(&self, input: &[u8]) -> Result<DecodedApproveMethod, DecodeError>;
    fn decode_weth_withdrawal_method(
        &self,
        input: &[u8],
    ) -> Result<DecodedWethWithdrawalMethod, DecodeError>;
}
