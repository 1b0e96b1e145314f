//! Canonical order hash (I3, §9 "Order hash").
//!
//! `hash = keccak256(protocol ++ owner ++ tokenS ++ tokenB ++ amountS ++
//! amountB ++ validSince ++ validUntil ++ lrcFee ++ buyNoMoreThanAmountB ++
//! marginSplitPercentage)`, each field encoded big-endian at its natural
//! width. Recomputed on every load; a mismatch against the stored hash is
//! an `InvariantViolation`, never silently repaired.

use {
    primitive_types::{H160, H256, U256},
    sha3::{Digest, Keccak256},
};

#[allow(clippy::too_many_arguments)]
pub fn order_hash(
    protocol: H160,
    owner: H160,
    token_s: H160,
    token_b: H160,
    amount_s: U256,
    amount_b: U256,
    valid_since: u64,
    valid_until: u64,
    lrc_fee: U256,
    buy_no_more_than_amount_b: bool,
    margin_split_percentage: u8,
) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(protocol.as_bytes());
    hasher.update(owner.as_bytes());
    hasher.update(token_s.as_bytes());
    hasher.update(token_b.as_bytes());

    let mut buf = [0u8; 32];
    amount_s.to_big_endian(&mut buf);
    hasher.update(buf);
    amount_b.to_big_endian(&mut buf);
    hasher.update(buf);

    hasher.update(valid_since.to_be_bytes());
    hasher.update(valid_until.to_be_bytes());

    lrc_fee.to_big_endian(&mut buf);
    hasher.update(buf);

    hasher.update([u8::from(buy_no_more_than_amount_b)]);
    hasher.update([margin_split_percentage]);

    H256::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_sensitive_to_every_field() {
        let base = order_hash(
            H160::repeat_byte(1),
            H160::repeat_byte(2),
            H160::repeat_byte(3),
            H160::repeat_byte(4),
            U256::from(100),
            U256::from(1000),
            10,
            20,
            U256::from(5),
            false,
            0,
        );
        let same = order_hash(
            H160::repeat_byte(1),
            H160::repeat_byte(2),
            H160::repeat_byte(3),
            H160::repeat_byte(4),
            U256::from(100),
            U256::from(1000),
            10,
            20,
            U256::from(5),
            false,
            0,
        );
        assert_eq!(base, same);

        let flipped_flag = order_hash(
            H160::repeat_byte(1),
            H160::repeat_byte(2),
            H160::repeat_byte(3),
            H160::repeat_byte(4),
            U256::from(100),
            U256::from(1000),
            10,
            20,
            U256::from(5),
            true,
            0,
        );
        assert_ne!(base, flipped_flag);

        let different_margin = order_hash(
            H160::repeat_byte(1),
            H160::repeat_byte(2),
            H160::repeat_byte(3),
            H160::repeat_byte(4),
            U256::from(100),
            U256::from(1000),
            10,
            20,
            U256::from(5),
            false,
            1,
        );
        assert_ne!(base, different_margin);
    }
}
