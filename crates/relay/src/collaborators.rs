//! Stand-ins for the collaborators spec.md §1 places out of scope (price
//! discovery, order submission, account unlocking, token metadata). The
//! composition root wires these in place of the real services so the
//! binary runs end to end; a production deployment swaps them for the
//! real clients without touching C5/C6/C8.

use {
    async_trait::async_trait,
    domain::order::Price,
    num::{rational::Ratio, BigInt},
    order_manager::{MarketCapProvider, WhiteList},
    primitive_types::{H160, U256},
    tx_manager::{AccountManager, TokenSymbols},
};

/// Treats one unit of any token as one unit of legal currency. Until a real
/// price oracle is wired in, this makes the dust floor apply to raw token
/// amounts rather than their market value.
pub struct UnitMarketCap;

#[async_trait]
impl MarketCapProvider for UnitMarketCap {
    async fn legal_currency_value(&self, _token: H160, amount: U256) -> Price {
        Ratio::from_integer(BigInt::from(amount.as_u128()))
    }
}

/// No owner denylist configured: every owner is eligible for the miner
/// feed.
pub struct AllowAllWhiteList;

#[async_trait]
impl WhiteList for AllowAllWhiteList {
    async fn is_whitelisted(&self, _owner: H160) -> bool {
        true
    }
}

/// No unlock registry configured: every owner's transfer/WETH legs are
/// journaled.
pub struct AlwaysUnlocked;

#[async_trait]
impl AccountManager for AlwaysUnlocked {
    async fn is_unlocked(&self, _owner: H160) -> bool {
        true
    }
}

/// No token-metadata service configured: journals the token's address in
/// place of a human-readable symbol.
pub struct HexFallbackSymbols;

#[async_trait]
impl TokenSymbols for HexFallbackSymbols {
    async fn symbol(&self, token: H160) -> String {
        format!("{token:#x}")
    }
}
