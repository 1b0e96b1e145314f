//! `U256` <-> `BigDecimal` conversions for the `varchar(30)` decimal-text
//! columns backing every order amount (§9 "Big integers").

use {primitive_types::U256, sqlx::types::BigDecimal, std::str::FromStr};

/// `amountS`'s documented ceiling in the source is `10^30`; `varchar(30)`
/// decimal text comfortably holds any `U256` up to that bound.
pub fn u256_to_big_decimal(value: U256) -> BigDecimal {
    // U256's Display impl prints base-10 digits; BigDecimal::from_str never
    // fails on a plain non-negative integer literal.
    BigDecimal::from_str(&value.to_string()).expect("U256 decimal string is always valid")
}

#[derive(Debug, thiserror::Error)]
#[error("amount out of range for U256: {0}")]
pub struct OutOfRangeError(BigDecimal);

pub fn big_decimal_to_u256(value: &BigDecimal) -> Result<U256, OutOfRangeError> {
    if value.is_negative() {
        return Err(OutOfRangeError(value.clone()));
    }
    let digits = value.with_scale(0).to_string();
    U256::from_dec_str(&digits).map_err(|_| OutOfRangeError(value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for value in [U256::zero(), U256::one(), U256::MAX / 2, U256::from(10u64).pow(30.into())]
        {
            let decimal = u256_to_big_decimal(value);
            assert_eq!(big_decimal_to_u256(&decimal).unwrap(), value);
        }
    }

    #[test]
    fn rejects_negative() {
        let negative = BigDecimal::from_str("-1").unwrap();
        assert!(big_decimal_to_u256(&negative).is_err());
    }
}
