//! The market-cap oracle: converts a residual token amount into the legal
//! currency the dust floor is denominated in (§4.2.1 `settle`). An external
//! collaborator per §1; this crate only consumes it.

use {
    async_trait::async_trait,
    domain::order::Price,
    primitive_types::{H160, U256},
};

#[async_trait]
pub trait MarketCapProvider: Send + Sync {
    async fn legal_currency_value(&self, token: H160, amount: U256) -> Price;
}
