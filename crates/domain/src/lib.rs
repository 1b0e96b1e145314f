//! Core types shared by every relay component: the order entity, its
//! lifecycle events, the transaction journal, and the canonical order hash.
//!
//! This crate holds no I/O. Conversions between on-wire, persisted and
//! in-core forms live at the edges (`database`, `abi-processor`).

pub mod error;
pub mod event;
pub mod hash;
pub mod order;
pub mod transaction;

pub use {
    error::Error,
    order::{Order, OrderStatus},
    transaction::{TransactionView, TxStatus, TxType},
};
