//! The order entity (§3) and its invariants (I1-I5).

use {
    crate::{error::Error, hash::order_hash},
    num::{bigint::Sign, rational::Ratio, BigInt},
    primitive_types::{H160, H256, U256},
};

/// `amountS / amountB`, bounded to `[1e-16, 1e12]`.
pub type Price = Ratio<BigInt>;

fn price_floor() -> Price {
    Ratio::new(BigInt::from(1), BigInt::from(10).pow(16))
}

fn price_ceiling() -> Price {
    Ratio::from_integer(BigInt::from(10).pow(12))
}

/// Computes `amountS / amountB`, clamped to the legal price band. Division
/// by zero (an unfillable order) clamps to the floor rather than panicking.
pub fn derive_price(amount_s: U256, amount_b: U256) -> Price {
    if amount_b.is_zero() {
        return price_floor();
    }
    let price = Ratio::new(u256_to_bigint(amount_s), u256_to_bigint(amount_b));
    price.clamp(price_floor(), price_ceiling())
}

fn u256_to_bigint(value: U256) -> BigInt {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigInt::from_bytes_be(Sign::Plus, &bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Partial,
    Finished,
    Cancel,
    Cutoff,
    Expired,
    Unknown,
}

impl OrderStatus {
    /// Terminal statuses never transition again; later fill/cancel/cutoff
    /// events are journaled but do not mutate amounts (I5).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Finished | OrderStatus::Cancel | OrderStatus::Cutoff
        )
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub hash: H256,
    pub owner: H160,
    pub protocol: H160,

    pub token_s: H160,
    pub token_b: H160,
    pub amount_s: U256,
    pub amount_b: U256,
    pub buy_no_more_than_amount_b: bool,
    pub margin_split_percentage: u8,
    pub lrc_fee: U256,

    pub timestamp: u64,
    pub ttl: u64,
    pub salt: u64,
    pub valid_since: u64,
    pub valid_until: u64,

    pub v: u8,
    pub r: H256,
    pub s: H256,

    pub dealt_amount_s: U256,
    pub dealt_amount_b: U256,
    pub split_amount_s: U256,
    pub split_amount_b: U256,
    pub cancelled_amount_s: U256,
    pub cancelled_amount_b: U256,
    pub status: OrderStatus,
    pub updated_block: u64,
    /// Block number at which the miner feed last proposed this order; used
    /// for the soft-lock delay window (§4.2.5).
    pub miner_block_mark: u64,
    pub broadcast_time: u64,
}

impl Order {
    pub fn price(&self) -> Price {
        derive_price(self.amount_s, self.amount_b)
    }

    /// The axis fill/cancel pressure accumulates on: `B` when the order
    /// insists on buying no more than `amountB`, else `S`.
    pub fn economic_axis_is_buy(&self) -> bool {
        self.buy_no_more_than_amount_b
    }

    /// I3: recompute the canonical hash and compare against the stored one.
    pub fn verify_hash(&self) -> Result<(), Error> {
        let recomputed = order_hash(
            self.protocol,
            self.owner,
            self.token_s,
            self.token_b,
            self.amount_s,
            self.amount_b,
            self.valid_since,
            self.valid_until,
            self.lrc_fee,
            self.buy_no_more_than_amount_b,
            self.margin_split_percentage,
        );
        if recomputed != self.hash {
            return Err(Error::InvariantViolation(format!(
                "order hash mismatch: stored {:?} recomputed {:?}",
                self.hash, recomputed
            )));
        }
        Ok(())
    }

    /// I1/I2: dealt/cancelled amounts never exceed the order's own amounts
    /// on the relevant axis, and the two together never exceed it either.
    pub fn check_amount_invariants(&self) -> Result<(), Error> {
        if self.dealt_amount_s > self.amount_s || self.dealt_amount_b > self.amount_b {
            return Err(Error::InvariantViolation(format!(
                "dealt amount exceeds order amount for order {:?}",
                self.hash
            )));
        }
        let (cancelled, dealt, total) = if self.economic_axis_is_buy() {
            (self.cancelled_amount_b, self.dealt_amount_b, self.amount_b)
        } else {
            (self.cancelled_amount_s, self.dealt_amount_s, self.amount_s)
        };
        if cancelled.saturating_add(dealt) > total {
            return Err(Error::InvariantViolation(format!(
                "cancelled + dealt exceeds order amount on economic axis for order {:?}",
                self.hash
            )));
        }
        Ok(())
    }

    /// Whether `now` has passed `timestamp + ttl`. EXPIRED is computed on
    /// read, never persisted (§4.2.1).
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.timestamp.saturating_add(self.ttl)
    }
}

/// `(protocol, owner)` or `(protocol, owner, pair)` -> cutoff timestamp
/// (§3 CutoffRecord). Cutoff pairs are order-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenPair(H160, H160);

impl TokenPair {
    /// `pair(a, b) == pair(b, a)` (Testable Property 5, pair symmetry).
    pub fn new(t1: H160, t2: H160) -> Self {
        if t1 <= t2 {
            TokenPair(t1, t2)
        } else {
            TokenPair(t2, t1)
        }
    }

    pub fn tokens(&self) -> (H160, H160) {
        (self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_insensitive() {
        let a = H160::repeat_byte(1);
        let b = H160::repeat_byte(2);
        assert_eq!(TokenPair::new(a, b), TokenPair::new(b, a));
    }

    #[test]
    fn price_clamps_to_band() {
        let p = derive_price(U256::from(1), U256::MAX);
        assert!(p >= price_floor());
        let p = derive_price(U256::MAX, U256::from(1));
        assert!(p <= price_ceiling());
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Finished.is_terminal());
        assert!(OrderStatus::Cancel.is_terminal());
        assert!(OrderStatus::Cutoff.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Partial.is_terminal());
        assert!(!OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn amount_invariant_catches_overflow() {
        let mut order = sample_order();
        order.dealt_amount_s = order.amount_s + U256::from(1);
        assert!(order.check_amount_invariants().is_err());
    }

    fn sample_order() -> Order {
        Order {
            hash: H256::zero(),
            owner: H160::repeat_byte(1),
            protocol: H160::repeat_byte(2),
            token_s: H160::repeat_byte(3),
            token_b: H160::repeat_byte(4),
            amount_s: U256::from(100),
            amount_b: U256::from(1000),
            buy_no_more_than_amount_b: false,
            margin_split_percentage: 0,
            lrc_fee: U256::from(1),
            timestamp: 0,
            ttl: 0,
            salt: 0,
            valid_since: 0,
            valid_until: 0,
            v: 27,
            r: H256::zero(),
            s: H256::zero(),
            dealt_amount_s: U256::zero(),
            dealt_amount_b: U256::zero(),
            split_amount_s: U256::zero(),
            split_amount_b: U256::zero(),
            cancelled_amount_s: U256::zero(),
            cancelled_amount_b: U256::zero(),
            status: OrderStatus::New,
            updated_block: 0,
            miner_block_mark: 0,
            broadcast_time: 0,
        }
    }
}
