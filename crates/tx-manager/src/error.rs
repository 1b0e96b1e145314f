//! Transaction Manager error taxonomy (§7), layered over the shared
//! domain kinds with this crate's repository-boundary errors.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Domain(#[from] domain::Error),
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}
