//! Extractor error taxonomy (§7): RPC failures bubble up as control-flow
//! signals, everything ABI-processor-side is already swallowed per §4.1.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error(transparent)]
    Fork(#[from] fork_coordinator::Error),
}
