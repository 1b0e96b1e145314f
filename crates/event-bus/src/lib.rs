//! The event bus (C1): named-topic pub/sub sitting between the extractor
//! and the order manager / transaction manager / account cache (§2).

pub mod bus;
pub mod event;

pub use {
    bus::{Dispatch, Error, EventBus, Handler, SubscriptionHandle},
    event::{Event, MinerSubmitRingResult, PendingTransactionEvent, Topic},
};
