//! Extractor (C4, §4.4): pulls confirmed blocks, dispatches every log and
//! method call through the ABI processor, and polls the pending-tx pool in
//! parallel. Hands reorg detection off to the fork coordinator (C7).

pub mod error;
pub mod extractor;
pub mod local_chain;
pub mod pending;
pub mod source;

pub use {
    error::Error,
    extractor::Extractor,
    local_chain::LocalChain,
    pending::PendingPool,
    source::{BlockSource, RawBlock},
};
