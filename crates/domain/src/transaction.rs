//! The user-facing transaction journal (§3 "TransactionView", §4.3).
//!
//! One on-chain event can expand to multiple rows: a transfer yields a
//! SEND row for the sender and a RECEIVE row for the receiver (Testable
//! Property 8); a WETH deposit/withdrawal yields a CONVERT_OUTCOME/INCOME
//! pair under both the WETH and native-ETH symbols (S7); an unsupported
//! zero-value contract call yields a single `UnsupportedContract` row
//! (S8).

use primitive_types::{H160, H256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TxType {
    Send,
    Receive,
    ConvertIncome,
    ConvertOutcome,
    CancelOrder,
    CutoffAll,
    CutoffPair,
    Approve,
    UnsupportedContract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

/// A single user-visible transaction row. Identity is `(tx_hash, log_index,
/// type, owner)` (§3); `(raw_from, nonce)` is the reconciliation key used
/// to delete a pending row once its mined counterpart lands (§4.3).
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub tx_hash: H256,
    pub log_index: u64,
    pub tx_type: TxType,
    pub owner: H160,

    pub protocol: H160,
    pub symbol: String,
    pub from: H160,
    pub to: H160,
    pub raw_from: H160,
    pub nonce: u64,
    pub value: primitive_types::U256,

    pub block_number: u64,
    pub block_time: u64,
    pub status: TxStatus,
}

impl TransactionView {
    pub fn identity(&self) -> (H256, u64, TxType, H160) {
        (self.tx_hash, self.log_index, self.tx_type, self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransactionView {
        TransactionView {
            tx_hash: H256::repeat_byte(1),
            log_index: 0,
            tx_type: TxType::Send,
            owner: H160::repeat_byte(2),
            protocol: H160::zero(),
            symbol: "ETH".to_string(),
            from: H160::repeat_byte(2),
            to: H160::repeat_byte(3),
            raw_from: H160::repeat_byte(2),
            nonce: 7,
            value: primitive_types::U256::from(1),
            block_number: 10,
            block_time: 0,
            status: TxStatus::Pending,
        }
    }

    #[test]
    fn identity_is_the_four_tuple() {
        let view = sample();
        assert_eq!(
            view.identity(),
            (view.tx_hash, view.log_index, view.tx_type, view.owner)
        );
    }
}
