//! Computes the topic-0 / method-selector identifiers the registration
//! table (§4.1) is keyed by. `Transfer`/`Approval`/`approve`/WETH
//! `deposit`/`withdraw` are real, widely deployed ERC20/WETH9 signatures;
//! the protocol-specific ring/order/cutoff signatures are this relay's own
//! schema, since spec.md elides the exact argument list
//! (`keccak("RingMined(...)")`) and no ABI json for the original contract
//! is in scope (§1 "the ABI decoder... is consumed as decode(schema,
//! bytes)").

use {
    primitive_types::H256,
    sha3::{Digest, Keccak256},
};

pub fn topic0(signature: &str) -> H256 {
    H256::from_slice(&Keccak256::digest(signature.as_bytes()))
}

pub fn method_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_erc20_transfer_topic() {
        // keccak256("Transfer(address,address,uint256)")
        assert_eq!(
            hex::encode(topic0("Transfer(address,address,uint256)").as_bytes()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
        );
    }

    #[test]
    fn well_known_weth_deposit_selector() {
        assert_eq!(method_selector("deposit()"), [0xd0, 0xe3, 0x0d, 0xb0]);
    }

    #[test]
    fn well_known_erc20_approve_selector() {
        assert_eq!(
            method_selector("approve(address,uint256)"),
            [0x09, 0x5e, 0xa7, 0xb3]
        );
    }
}
