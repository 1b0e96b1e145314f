//! Account balance/allowance cache (C8, §4.6).

pub mod cache;
pub mod handler;

pub use {
    cache::{AccountCache, DEFAULT_TTL},
    handler::{ApprovalInvalidation, TransferInvalidation},
};
