//! Wires the cache to the event bus: a `Transfer` invalidates both sides
//! of the moved token; an `Approval` invalidates the `(owner, spender)`
//! allowance, but only when the spender is a known delegate (§4.6).

use {
    crate::cache::AccountCache,
    async_trait::async_trait,
    event_bus::{Error, Event, Handler},
    std::sync::Arc,
};

pub struct TransferInvalidation {
    pub cache: Arc<AccountCache>,
}

#[async_trait]
impl Handler for TransferInvalidation {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::Transfer(transfer) = event else {
            return Ok(());
        };
        self.cache.invalidate_balance(transfer.from, transfer.token);
        self.cache.invalidate_balance(transfer.to, transfer.token);
        Ok(())
    }
}

pub struct ApprovalInvalidation {
    pub cache: Arc<AccountCache>,
}

#[async_trait]
impl Handler for ApprovalInvalidation {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::Approve(approval) = event else {
            return Ok(());
        };
        if !self.cache.is_delegate(approval.spender) {
            return Ok(());
        }
        self.cache
            .invalidate_allowance(approval.owner, approval.token, approval.spender);
        // The fresh allowance is already known from the log payload; cache
        // it directly instead of forcing a round-trip on the next read.
        self.cache
            .set_allowance(approval.owner, approval.token, approval.spender, approval.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::cache::DEFAULT_TTL,
        domain::event::{ApprovalEvent, EventIndex, TransferEvent},
        primitive_types::{H160, U256},
        std::collections::HashSet,
    };

    fn index() -> EventIndex {
        EventIndex {
            block_number: 1,
            log_index: 0,
        }
    }

    #[tokio::test]
    async fn transfer_invalidates_both_sides() {
        let cache = Arc::new(AccountCache::new(DEFAULT_TTL, HashSet::new()));
        let from = H160::repeat_byte(1);
        let to = H160::repeat_byte(2);
        let token = H160::repeat_byte(3);
        cache.set_balance(from, token, U256::from(10));
        cache.set_balance(to, token, U256::from(20));

        let handler = TransferInvalidation {
            cache: cache.clone(),
        };
        handler
            .handle(Event::Transfer(TransferEvent {
                index: index(),
                token,
                from,
                to,
                value: U256::from(5),
                tx_hash: Default::default(),
                raw_from: from,
                nonce: 0,
            }))
            .await
            .unwrap();

        assert_eq!(cache.get_balance(from, token), None);
        assert_eq!(cache.get_balance(to, token), None);
    }

    #[tokio::test]
    async fn approval_from_unknown_delegate_is_ignored() {
        let cache = Arc::new(AccountCache::new(DEFAULT_TTL, HashSet::new()));
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        let spender = H160::repeat_byte(3);
        cache.set_allowance(owner, token, spender, U256::from(10));

        let handler = ApprovalInvalidation {
            cache: cache.clone(),
        };
        handler
            .handle(Event::Approve(ApprovalEvent {
                index: index(),
                token,
                owner,
                spender,
                value: U256::from(99),
                tx_hash: Default::default(),
                raw_from: owner,
                nonce: 0,
            }))
            .await
            .unwrap();

        // Unknown delegate: stale entry untouched.
        assert_eq!(cache.get_allowance(owner, token, spender), Some(U256::from(10)));
    }

    #[tokio::test]
    async fn approval_from_known_delegate_refreshes_allowance() {
        let mut delegates = HashSet::new();
        let spender = H160::repeat_byte(3);
        delegates.insert(spender);
        let cache = Arc::new(AccountCache::new(DEFAULT_TTL, delegates));
        let owner = H160::repeat_byte(1);
        let token = H160::repeat_byte(2);
        cache.set_allowance(owner, token, spender, U256::from(10));

        let handler = ApprovalInvalidation {
            cache: cache.clone(),
        };
        handler
            .handle(Event::Approve(ApprovalEvent {
                index: index(),
                token,
                owner,
                spender,
                value: U256::from(99),
                tx_hash: Default::default(),
                raw_from: owner,
                nonce: 0,
            }))
            .await
            .unwrap();

        assert_eq!(cache.get_allowance(owner, token, spender), Some(U256::from(99)));
    }
}
