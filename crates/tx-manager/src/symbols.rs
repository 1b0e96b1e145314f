//! Token symbol lookup (§3 "TransactionView.symbol"): an external
//! collaborator, since neither the transfer/approval logs nor the WETH
//! method calls carry a human-readable symbol themselves.

use {async_trait::async_trait, primitive_types::H160};

/// The native-asset pseudo-symbol used for plain ETH legs of a WETH
/// deposit/withdrawal or an unsupported-contract transfer (S7, S8).
pub const ETH_SYMBOL: &str = "ETH";

#[async_trait]
pub trait TokenSymbols: Send + Sync {
    async fn symbol(&self, token: H160) -> String;
}
