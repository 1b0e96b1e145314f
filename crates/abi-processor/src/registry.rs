//! Which contract addresses this relay instance actually watches (§4.1
//! "if known and the contract address is a registered protocol").
//! Token transfer/approval logs are not protocol-gated: any ERC20 log is
//! decoded, since the system must track balances for every token a user
//! holds, not just protocol-registered ones.

use primitive_types::H160;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Exchange protocol contract addresses: only these emit RingMined,
    /// OrderCancelled, AllOrdersCancelled, OrdersCancelled logs and accept
    /// submitRing/cancelOrder/cancelAllOrders(ByTradingPair) calls.
    pub protocols: HashSet<H160>,
    /// Addresses authorized to move user tokens via `transferFrom`;
    /// approvals to any other spender are not relayed (glossary
    /// "Delegate / spender").
    pub delegates: HashSet<H160>,
}

impl Registry {
    pub fn new(protocols: HashSet<H160>, delegates: HashSet<H160>) -> Self {
        Self {
            protocols,
            delegates,
        }
    }

    pub fn is_protocol(&self, address: H160) -> bool {
        self.protocols.contains(&address)
    }

    pub fn is_delegate(&self, address: H160) -> bool {
        self.delegates.contains(&address)
    }
}
