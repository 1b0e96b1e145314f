//! The error taxonomy shared across the relay's core components (§7).
//!
//! Each crate boundary wraps this (or a crate-local superset of it) with
//! `thiserror`; `anyhow::Result` takes over at the composition root.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Idempotent duplicate; callers should treat this as a normal no-op.
    #[error("stale event: {0}")]
    StaleEvent(String),
    /// Control-flow signal, not a failure: propagated up to the extractor
    /// loop, which halts until the fork coordinator completes (§4.5).
    #[error("fork detected: fork_block={fork_block} detected_block={detected_block}")]
    ForkDetected {
        fork_block: u64,
        detected_block: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
