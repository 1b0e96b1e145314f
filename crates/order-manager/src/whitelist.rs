//! The owner white-list the miner feed filters against (Glossary
//! "White-list"); an external collaborator per §1, queried read-only here.

use {async_trait::async_trait, primitive_types::H160};

#[async_trait]
pub trait WhiteList: Send + Sync {
    async fn is_whitelisted(&self, owner: H160) -> bool;
}
