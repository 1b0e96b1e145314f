//! The relay's concrete [`LogDecoder`]/[`MethodDecoder`]: the registration
//! table of §4.1, wired to real bytes via [`crate::words`] and
//! [`crate::selectors`].
//!
//! Layout (documented once here rather than per-field): every log's
//! `topics[1..]` carry its `indexed` fields in declaration order; every
//! log's `data` and every method's `input[4..]` are read as a flat
//! sequence of right-aligned 32-byte words, since spec.md intentionally
//! elides the exact non-ERC20 argument lists (`keccak("RingMined(...)")`).
//! `RingMined`'s fill list is `[count, then count * (orderHash, amountS,
//! amountB, splitS, splitB, lrcFee)]`.

use {
    crate::{
        decode::{
            DecodeError, DecodedApproval, DecodedApproveMethod, DecodedCutoffAll,
            DecodedCutoffAllMethod, DecodedCutoffPair, DecodedCutoffPairMethod, DecodedFill,
            DecodedOrderCancelled, DecodedRingMined, DecodedTokenRegistered, DecodedTransfer,
            DecodedWethWithdrawalMethod, LogDecoder, LogKind, MethodDecoder, MethodKind,
        },
        raw::RawLog,
        selectors::{method_selector, topic0},
        words,
    },
    primitive_types::H256,
};

pub struct LoopringSchema {
    ring_mined: H256,
    order_cancelled: H256,
    cutoff_all: H256,
    cutoff_pair: H256,
    transfer: H256,
    approval: H256,
    token_registered: H256,

    submit_ring: [u8; 4],
    cancel_order: [u8; 4],
    cancel_all_orders: [u8; 4],
    cancel_all_orders_by_trading_pair: [u8; 4],
    approve: [u8; 4],
    deposit: [u8; 4],
    withdraw: [u8; 4],
}

impl Default for LoopringSchema {
    fn default() -> Self {
        Self {
            ring_mined: topic0("RingMined(uint256,bytes32,uint256,bytes32[])"),
            order_cancelled: topic0("OrderCancelled(bytes32,uint256)"),
            cutoff_all: topic0("AllOrdersCancelled(address,uint256)"),
            cutoff_pair: topic0("OrdersCancelled(address,address,address,uint256)"),
            transfer: topic0("Transfer(address,address,uint256)"),
            approval: topic0("Approval(address,address,uint256)"),
            token_registered: topic0("TokenRegistered(address,bytes32)"),

            submit_ring: method_selector("submitRing(uint8[],bytes32[],uint256[])"),
            cancel_order: method_selector("cancelOrder(uint256[7],uint8,bytes32,bytes32)"),
            cancel_all_orders: method_selector("cancelAllOrders(uint256)"),
            cancel_all_orders_by_trading_pair: method_selector(
                "cancelAllOrdersByTradingPair(address,address,uint256)",
            ),
            approve: method_selector("approve(address,uint256)"),
            deposit: method_selector("deposit()"),
            withdraw: method_selector("withdraw(uint256)"),
        }
    }
}

impl LoopringSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn indexed(log: &RawLog, position: usize) -> Result<H256, DecodeError> {
        log.topics
            .get(position)
            .copied()
            .ok_or_else(|| DecodeError(format!("missing indexed topic {position}")))
    }
}

impl LogDecoder for LoopringSchema {
    fn classify(&self, topic0: H256) -> Option<LogKind> {
        match topic0 {
            t if t == self.ring_mined => Some(LogKind::RingMined),
            t if t == self.order_cancelled => Some(LogKind::OrderCancelled),
            t if t == self.cutoff_all => Some(LogKind::CutoffAll),
            t if t == self.cutoff_pair => Some(LogKind::CutoffPair),
            t if t == self.transfer => Some(LogKind::Transfer),
            t if t == self.approval => Some(LogKind::Approval),
            t if t == self.token_registered => Some(LogKind::TokenRegistered),
            _ => None,
        }
    }

    fn decode_ring_mined(&self, log: &RawLog) -> Result<DecodedRingMined, DecodeError> {
        let ring_hash = Self::indexed(log, 1)?;
        let ring_index = words::u256(&log.data, 0)?;
        let fill_count = words::u64(&log.data, 1)? as usize;
        let mut fills = Vec::with_capacity(fill_count);
        for i in 0..fill_count {
            let base = 2 + i * 6;
            fills.push(DecodedFill {
                order_hash: words::hash32(&log.data, base)?,
                amount_s: words::u256(&log.data, base + 1)?,
                amount_b: words::u256(&log.data, base + 2)?,
                split_s: words::u256(&log.data, base + 3)?,
                split_b: words::u256(&log.data, base + 4)?,
                lrc_fee: words::u256(&log.data, base + 5)?,
            });
        }
        Ok(DecodedRingMined {
            ring_hash,
            ring_index,
            fills,
        })
    }

    fn decode_order_cancelled(&self, log: &RawLog) -> Result<DecodedOrderCancelled, DecodeError> {
        Ok(DecodedOrderCancelled {
            order_hash: Self::indexed(log, 1)?,
            amount_cancelled: words::u256(&log.data, 0)?,
        })
    }

    fn decode_cutoff_all(&self, log: &RawLog) -> Result<DecodedCutoffAll, DecodeError> {
        Ok(DecodedCutoffAll {
            owner: words::address(&[Self::indexed(log, 1)?.as_bytes(), &[]].concat(), 0)?,
            cutoff_time: words::u64(&log.data, 0)?,
        })
    }

    fn decode_cutoff_pair(&self, log: &RawLog) -> Result<DecodedCutoffPair, DecodeError> {
        let owner_topic = Self::indexed(log, 1)?;
        Ok(DecodedCutoffPair {
            owner: words::address(owner_topic.as_bytes(), 0)?,
            token1: words::address(&log.data, 0)?,
            token2: words::address(&log.data, 1)?,
            cutoff_time: words::u64(&log.data, 2)?,
        })
    }

    fn decode_transfer(&self, log: &RawLog) -> Result<DecodedTransfer, DecodeError> {
        let from_topic = Self::indexed(log, 1)?;
        let to_topic = Self::indexed(log, 2)?;
        Ok(DecodedTransfer {
            from: words::address(from_topic.as_bytes(), 0)?,
            to: words::address(to_topic.as_bytes(), 0)?,
            value: words::u256(&log.data, 0)?,
        })
    }

    fn decode_approval(&self, log: &RawLog) -> Result<DecodedApproval, DecodeError> {
        let owner_topic = Self::indexed(log, 1)?;
        let spender_topic = Self::indexed(log, 2)?;
        Ok(DecodedApproval {
            owner: words::address(owner_topic.as_bytes(), 0)?,
            spender: words::address(spender_topic.as_bytes(), 0)?,
            value: words::u256(&log.data, 0)?,
        })
    }

    fn decode_token_registered(&self, log: &RawLog) -> Result<DecodedTokenRegistered, DecodeError> {
        let token_topic = Self::indexed(log, 1)?;
        Ok(DecodedTokenRegistered {
            token: words::address(token_topic.as_bytes(), 0)?,
            symbol: words::symbol(&log.data, 0)?,
        })
    }
}

impl MethodDecoder for LoopringSchema {
    fn classify(&self, selector: [u8; 4]) -> Option<MethodKind> {
        match selector {
            s if s == self.submit_ring => Some(MethodKind::SubmitRing),
            s if s == self.cancel_order => Some(MethodKind::CancelOrder),
            s if s == self.cancel_all_orders => Some(MethodKind::CutoffAll),
            s if s == self.cancel_all_orders_by_trading_pair => Some(MethodKind::CutoffPair),
            s if s == self.approve => Some(MethodKind::Approve),
            s if s == self.deposit => Some(MethodKind::WethDeposit),
            s if s == self.withdraw => Some(MethodKind::WethWithdrawal),
            _ => None,
        }
    }

    fn decode_cutoff_all_method(&self, input: &[u8]) -> Result<DecodedCutoffAllMethod, DecodeError> {
        let body = &input[4.min(input.len())..];
        Ok(DecodedCutoffAllMethod {
            cutoff_time: words::u64(body, 0)?,
        })
    }

    fn decode_cutoff_pair_method(
        &self,
        input: &[u8],
    ) -> Result<DecodedCutoffPairMethod, DecodeError> {
        let body = &input[4.min(input.len())..];
        Ok(DecodedCutoffPairMethod {
            token1: words::address(body, 0)?,
            token2: words::address(body, 1)?,
            cutoff_time: words::u64(body, 2)?,
        })
    }

    fn decode_approve_method(&self, input: &[u8]) -> Result<DecodedApproveMethod, DecodeError> {
        let body = &input[4.min(input.len())..];
        Ok(DecodedApproveMethod {
            spender: words::address(body, 0)?,
            value: words::u256(body, 1)?,
        })
    }

    fn decode_weth_withdrawal_method(
        &self,
        input: &[u8],
    ) -> Result<DecodedWethWithdrawalMethod, DecodeError> {
        let body = &input[4.min(input.len())..];
        Ok(DecodedWethWithdrawalMethod {
            value: words::u256(body, 0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, primitive_types::H160, std::iter};

    fn word_from_address(addr: H160) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..32].copy_from_slice(addr.as_bytes());
        word
    }

    fn word_from_u256(v: u64) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[24..32].copy_from_slice(&v.to_be_bytes());
        word
    }

    #[test]
    fn classifies_real_erc20_transfer_topic() {
        let schema = LoopringSchema::new();
        assert_eq!(
            schema.classify(topic0("Transfer(address,address,uint256)")),
            Some(LogKind::Transfer)
        );
    }

    #[test]
    fn decodes_transfer_log_from_topics_and_data() {
        let schema = LoopringSchema::new();
        let from = H160::repeat_byte(0xA);
        let to = H160::repeat_byte(0xB);
        let log = RawLog {
            address: H160::repeat_byte(9),
            topics: vec![
                topic0("Transfer(address,address,uint256)"),
                H256::from(word_from_address(from)),
                H256::from(word_from_address(to)),
            ],
            data: word_from_u256(1_000).to_vec(),
            log_index: 0,
        };
        let decoded = schema.decode_transfer(&log).unwrap();
        assert_eq!(decoded.from, from);
        assert_eq!(decoded.to, to);
        assert_eq!(decoded.value, primitive_types::U256::from(1_000));
    }

    #[test]
    fn decodes_ring_mined_with_two_fills() {
        let schema = LoopringSchema::new();
        let ring_hash = H256::repeat_byte(7);
        let order_hash_a = H256::repeat_byte(0x11);
        let order_hash_b = H256::repeat_byte(0x22);
        let mut data = Vec::new();
        data.extend_from_slice(&word_from_u256(1)); // ring_index
        data.extend_from_slice(&word_from_u256(2)); // fill_count
        for (hash, amt) in [(order_hash_a, 40u64), (order_hash_b, 60u64)] {
            data.extend_from_slice(hash.as_bytes());
            data.extend_from_slice(&word_from_u256(amt)); // amount_s
            data.extend_from_slice(&word_from_u256(amt * 10)); // amount_b
            data.extend_from_slice(&[0u8; 32]); // split_s
            data.extend_from_slice(&[0u8; 32]); // split_b
            data.extend_from_slice(&[0u8; 32]); // lrc_fee
        }
        let log = RawLog {
            address: H160::repeat_byte(9),
            topics: vec![topic0("RingMined(uint256,bytes32,uint256,bytes32[])"), ring_hash],
            data,
            log_index: 0,
        };
        let decoded = schema.decode_ring_mined(&log).unwrap();
        assert_eq!(decoded.ring_hash, ring_hash);
        assert_eq!(decoded.fills.len(), 2);
        assert_eq!(decoded.fills[0].order_hash, order_hash_a);
        assert_eq!(decoded.fills[1].amount_s, primitive_types::U256::from(60));
    }

    #[test]
    fn decode_approve_method_reads_selector_body() {
        let schema = LoopringSchema::new();
        let spender = H160::repeat_byte(0xC);
        let mut input = method_selector("approve(address,uint256)").to_vec();
        input.extend_from_slice(&word_from_address(spender));
        input.extend_from_slice(&word_from_u256(500));
        let decoded = schema.decode_approve_method(&input).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.value, primitive_types::U256::from(500));
    }

    #[test]
    fn truncated_data_is_a_decode_error_not_a_panic() {
        let schema = LoopringSchema::new();
        let log = RawLog {
            address: H160::repeat_byte(9),
            topics: vec![
                topic0("Transfer(address,address,uint256)"),
                H256::from(word_from_address(H160::repeat_byte(1))),
                H256::from(word_from_address(H160::repeat_byte(2))),
            ],
            data: iter::repeat(0u8).take(4).collect(),
            log_index: 0,
        };
        assert!(schema.decode_transfer(&log).is_err());
    }
}
