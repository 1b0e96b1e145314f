//! Maps log topic-0 and method-selector to decoder + handler pairs and
//! emits typed domain events onto the event bus (C3, §4.1).

pub mod decode;
pub mod processor;
pub mod raw;
pub mod registry;
pub mod schema;
pub mod selectors;
pub mod words;

pub use {
    decode::{DecodeError, LogDecoder, LogKind, MethodDecoder, MethodKind},
    processor::AbiProcessor,
    raw::{BlockContext, RawLog, RawReceipt, RawTransaction, TxStatus},
    registry::Registry,
    schema::LoopringSchema,
};
