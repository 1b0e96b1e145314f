//! The "unlocked" account registry (§4.3 "Validation"): an external
//! collaborator per §1, consulted per row before it is persisted.

use {async_trait::async_trait, primitive_types::H160};

#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn is_unlocked(&self, owner: H160) -> bool;
}
