//! Transaction Manager (C6, §4.3): journals per-owner transaction views
//! from transfer, WETH, approve and order-control events, performing
//! exactly-once recording across the pending/mined lifecycle and reorg
//! rollback.

pub mod error;
pub mod handler;
pub mod manager;
pub mod symbols;
pub mod unlock;

pub use {
    error::Error,
    handler::{
        ApproveHandler, EthTransferHandler, TransferHandler, TxCancelHandler, TxCutoffAllHandler,
        TxCutoffPairHandler, WethDepositHandler, WethWithdrawalHandler,
    },
    manager::TxManager,
    symbols::TokenSymbols,
    unlock::AccountManager,
};
