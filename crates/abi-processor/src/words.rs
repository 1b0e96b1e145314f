//! Flat, fixed-stride word reading over ABI-encoded `data`/`input` bytes
//! (§9 "Dynamic dispatch by id... no runtime type reflection"). This
//! relay's protocol-specific logs/methods are read as a sequence of
//! right-aligned 32-byte words rather than full dynamic-offset ABI
//! decoding, since spec.md elides the exact argument list for those
//! signatures; `Transfer`/`Approval`/`approve`/WETH calls use the real,
//! fixed-arity ERC20/WETH9 layout either way.

use {
    crate::decode::DecodeError,
    primitive_types::{H160, H256, U256},
};

const WORD: usize = 32;

fn word(data: &[u8], index: usize) -> Result<&[u8; 32], DecodeError> {
    let start = index * WORD;
    data.get(start..start + WORD)
        .map(|slice| slice.try_into().expect("slice is exactly 32 bytes"))
        .ok_or_else(|| DecodeError(format!("missing word {index} ({} bytes available)", data.len())))
}

pub fn u256(data: &[u8], index: usize) -> Result<U256, DecodeError> {
    Ok(U256::from_big_endian(word(data, index)?))
}

pub fn u64(data: &[u8], index: usize) -> Result<u64, DecodeError> {
    let value = u256(data, index)?;
    if value > U256::from(u64::MAX) {
        return Err(DecodeError(format!("word {index} overflows u64")));
    }
    Ok(value.as_u64())
}

pub fn address(data: &[u8], index: usize) -> Result<H160, DecodeError> {
    Ok(H160::from_slice(&word(data, index)?[12..32]))
}

pub fn hash32(data: &[u8], index: usize) -> Result<H256, DecodeError> {
    Ok(H256::from_slice(word(data, index)?))
}

/// Trims the trailing zero padding left-over-right ASCII/UTF8 is packed
/// into a single word with (ERC20 `symbol()`-style convention used by the
/// spec's `TokenRegistered` log).
pub fn symbol(data: &[u8], index: usize) -> Result<String, DecodeError> {
    let raw = word(data, index)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_address_from_right_aligned_word() {
        let mut data = vec![0u8; 32];
        data[12..32].copy_from_slice(&[0xAB; 20]);
        assert_eq!(address(&data, 0).unwrap(), H160::repeat_byte(0xAB));
    }

    #[test]
    fn missing_word_is_a_decode_error() {
        let data = vec![0u8; 16];
        assert!(u256(&data, 0).is_err());
    }

    #[test]
    fn symbol_trims_null_padding() {
        let mut data = vec![0u8; 32];
        data[0..3].copy_from_slice(b"LRC");
        assert_eq!(symbol(&data, 0).unwrap(), "LRC");
    }
}
