//! Order Manager error taxonomy, layered over the shared domain kinds with
//! the repository-boundary errors this crate's handlers can hit (§7).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Domain(#[from] domain::Error),
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("order row failed to convert: {0}")]
    Conversion(#[from] database::orders::ConversionError),
}
