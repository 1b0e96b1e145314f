//! Order Manager (C5, §4.2): derives order status from fill, cancel and
//! cutoff events, serves the miner feed, and recomputes affected orders on
//! reorg. Grounded on `ordermanager/ordermanager.go`'s handler shapes.

pub mod cutoff_cache;
pub mod error;
pub mod handler;
pub mod manager;
pub mod market_cap;
pub mod settle;
pub mod whitelist;

pub use {
    error::Error,
    handler::{CancelHandler, CutoffAllHandler, CutoffPairHandler, FillHandler, NewOrderHandler},
    manager::OrderManager,
    market_cap::MarketCapProvider,
    whitelist::WhiteList,
};
