//! The confirmation-depth block iterator (C4, §4.4): walks blocks one at a
//! time behind the chain tip, dispatches every log and method call through
//! the ABI processor (C3), and hands reorgs off to the fork coordinator
//! (C7) before resuming.

use {
    crate::{local_chain::LocalChain, source::BlockSource, Error},
    abi_processor::{AbiProcessor, BlockContext},
    fork_coordinator::ForkCoordinator,
    std::{sync::Arc, time::Duration},
};

/// Poll backoff while the tip has not advanced far enough past the next
/// block to emit (§4.4 "otherwise poll with a 5-second backoff").
const POLL_BACKOFF: Duration = Duration::from_secs(5);

pub struct Extractor {
    source: Arc<dyn BlockSource>,
    processor: Arc<AbiProcessor>,
    fork_coordinator: Arc<ForkCoordinator>,
    local_chain: LocalChain,
    confirms: u64,
    next_block: u64,
}

impl Extractor {
    pub fn new(
        source: Arc<dyn BlockSource>,
        processor: Arc<AbiProcessor>,
        fork_coordinator: Arc<ForkCoordinator>,
        confirms: u64,
        start_block: u64,
    ) -> Self {
        Self {
            source,
            processor,
            fork_coordinator,
            local_chain: LocalChain::new(),
            confirms,
            next_block: start_block,
        }
    }

    /// Runs forever. Callers spawn this on its own task and stop it by
    /// aborting that task (§5 "Cancellation" is cooperative at the
    /// subscription layer; the extractor's own loop has no finer-grained
    /// suspension point than one block).
    pub async fn run(&mut self) -> Error {
        loop {
            if let Err(err) = self.step().await {
                return err;
            }
        }
    }

    /// Processes at most one block (or sleeps once), returning so tests
    /// and the outer loop share the same unit of work.
    async fn step(&mut self) -> Result<(), Error> {
        let tip = self.source.tip().await?;
        if tip.saturating_sub(self.next_block) < self.confirms {
            tokio::time::sleep(POLL_BACKOFF).await;
            return Ok(());
        }

        let Some(block) = self.source.block(self.next_block).await? else {
            tokio::time::sleep(POLL_BACKOFF).await;
            return Ok(());
        };

        if let Some(expected_parent) = self.next_block.checked_sub(1) {
            if let Some(local_hash) = self.local_chain.hash_of(expected_parent).await {
                if local_hash != block.parent_hash {
                    self.handle_fork(expected_parent).await?;
                    return Ok(());
                }
            }
        }

        self.process_block(&block).await;
        self.local_chain.record(block.number, block.hash).await;
        self.next_block += 1;
        Ok(())
    }

    async fn process_block(&self, block: &crate::source::RawBlock) {
        let ctx = BlockContext {
            block_number: block.number,
            block_time: block.timestamp,
        };
        for (tx, receipt) in &block.transactions {
            self.processor
                .process(tx, Some(receipt), ctx, receipt.status)
                .await;
        }
    }

    /// §4.4 step 5 / §4.5: finds the common ancestor, orchestrates the
    /// rollback and rewinds local bookkeeping so the next `step` resumes
    /// just past the fork point.
    async fn handle_fork(&mut self, detected_block: u64) -> Result<(), Error> {
        let upstream = UpstreamAdapter(self.source.as_ref());
        let fork_block = self
            .fork_coordinator
            .find_fork_block(&self.local_chain, &upstream, detected_block)
            .await?;
        tracing::warn!(fork_block, detected_block, "chain fork detected");

        self.fork_coordinator
            .coordinate_rollback(fork_block, detected_block)
            .await;

        self.local_chain.truncate_after(fork_block).await;
        self.next_block = fork_block + 1;
        Ok(())
    }
}

/// Exposes the same [`BlockSource`] the extractor already holds as the
/// "upstream node" half of [`fork_coordinator::find_fork_block`]'s linear
/// search, without requiring a second RPC client.
struct UpstreamAdapter<'a>(&'a dyn BlockSource);

#[async_trait::async_trait]
impl fork_coordinator::UpstreamBlockHashes for UpstreamAdapter<'_> {
    async fn hash_at(&self, block_number: u64) -> Result<primitive_types::H256, fork_coordinator::Error> {
        self.0
            .block(block_number)
            .await
            .map_err(|err| fork_coordinator::Error::Upstream(err.to_string()))?
            .map(|b| b.hash)
            .ok_or(fork_coordinator::Error::NoCommonAncestor(block_number))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::source::RawBlock,
        abi_processor::{
            decode::{LogKind, MethodKind},
            AbiProcessor, LogDecoder, MethodDecoder, RawLog, Registry,
        },
        primitive_types::H256,
        std::collections::HashMap,
        tokio::sync::Mutex,
    };

    struct NullLogDecoder;
    impl LogDecoder for NullLogDecoder {
        fn classify(&self, _topic0: H256) -> Option<LogKind> {
            None
        }
        fn decode_ring_mined(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedRingMined, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_order_cancelled(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedOrderCancelled, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_cutoff_all(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedCutoffAll, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_cutoff_pair(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedCutoffPair, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_transfer(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedTransfer, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_approval(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedApproval, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_token_registered(
            &self,
            _log: &RawLog,
        ) -> Result<abi_processor::decode::DecodedTokenRegistered, abi_processor::DecodeError> {
            unreachable!()
        }
    }

    struct NullMethodDecoder;
    impl MethodDecoder for NullMethodDecoder {
        fn classify(&self, _selector: [u8; 4]) -> Option<MethodKind> {
            None
        }
        fn decode_cutoff_all_method(
            &self,
            _input: &[u8],
        ) -> Result<abi_processor::decode::DecodedCutoffAllMethod, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_cutoff_pair_method(
            &self,
            _input: &[u8],
        ) -> Result<abi_processor::decode::DecodedCutoffPairMethod, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_approve_method(
            &self,
            _input: &[u8],
        ) -> Result<abi_processor::decode::DecodedApproveMethod, abi_processor::DecodeError> {
            unreachable!()
        }
        fn decode_weth_withdrawal_method(
            &self,
            _input: &[u8],
        ) -> Result<abi_processor::decode::DecodedWethWithdrawalMethod, abi_processor::DecodeError>
        {
            unreachable!()
        }
    }

    fn processor() -> Arc<AbiProcessor> {
        Arc::new(AbiProcessor::new(
            Registry::default(),
            Arc::new(NullLogDecoder),
            Arc::new(NullMethodDecoder),
            Arc::new(event_bus::EventBus::new()),
        ))
    }

    fn empty_block(number: u64, hash: H256, parent_hash: H256) -> RawBlock {
        RawBlock {
            number,
            hash,
            parent_hash,
            timestamp: 1_700_000_000 + number,
            transactions: Vec::new(),
        }
    }

    struct FakeSource {
        tip: u64,
        blocks: Mutex<HashMap<u64, RawBlock>>,
    }

    #[async_trait::async_trait]
    impl BlockSource for FakeSource {
        async fn tip(&self) -> Result<u64, Error> {
            Ok(self.tip)
        }

        async fn block(&self, number: u64) -> Result<Option<RawBlock>, Error> {
            Ok(self.blocks.lock().await.get(&number).cloned())
        }

        async fn pending_transactions(
            &self,
        ) -> Result<Vec<abi_processor::RawTransaction>, Error> {
            Ok(Vec::new())
        }
    }

    fn genesis_chain(tip: u64) -> FakeSource {
        let mut blocks = HashMap::new();
        let mut parent = H256::zero();
        for n in 1..=tip {
            let hash = H256::repeat_byte(n as u8);
            blocks.insert(n, empty_block(n, hash, parent));
            parent = hash;
        }
        FakeSource {
            tip,
            blocks: Mutex::new(blocks),
        }
    }

    #[tokio::test]
    async fn confirms_gate_holds_back_unconfirmed_blocks() {
        let source = Arc::new(genesis_chain(2));
        let bus = Arc::new(event_bus::EventBus::new());
        let fork_coordinator = Arc::new(fork_coordinator::ForkCoordinator::new(bus, Vec::new()));
        let mut extractor = Extractor::new(
            source,
            processor(),
            fork_coordinator,
            /* confirms */ 3,
            /* start_block */ 1,
        );

        let task = tokio::time::timeout(Duration::from_millis(50), extractor.step()).await;
        assert!(task.is_err(), "step should block on the poll backoff");
    }

    #[tokio::test]
    async fn advances_one_block_at_a_time_when_confirmed() {
        let source = Arc::new(genesis_chain(5));
        let bus = Arc::new(event_bus::EventBus::new());
        let fork_coordinator = Arc::new(fork_coordinator::ForkCoordinator::new(bus, Vec::new()));
        let mut extractor = Extractor::new(
            source,
            processor(),
            fork_coordinator,
            /* confirms */ 0,
            /* start_block */ 1,
        );

        extractor.step().await.unwrap();
        assert_eq!(extractor.next_block, 2);
        assert_eq!(
            extractor.local_chain.hash_of(1).await,
            Some(H256::repeat_byte(1))
        );
    }

    #[tokio::test]
    async fn parent_hash_mismatch_triggers_rewind_to_common_ancestor() {
        let source = Arc::new(genesis_chain(5));
        let bus = Arc::new(event_bus::EventBus::new());
        let fork_coordinator = Arc::new(fork_coordinator::ForkCoordinator::new(bus, Vec::new()));
        let mut extractor = Extractor::new(
            source.clone(),
            processor(),
            fork_coordinator,
            0,
            1,
        );

        // Walk to block 3 so the local chain has 1, 2, 3 recorded.
        for _ in 0..3 {
            extractor.step().await.unwrap();
        }
        assert_eq!(extractor.next_block, 4);

        // Replace blocks 3..5 with a competing fork whose chain diverges
        // after block 2.
        let common = H256::repeat_byte(2);
        let mut blocks = source.blocks.lock().await;
        blocks.insert(3, empty_block(3, H256::repeat_byte(30), common));
        blocks.insert(4, empty_block(4, H256::repeat_byte(40), H256::repeat_byte(30)));
        drop(blocks);

        extractor.next_block = 4;
        extractor.step().await.unwrap();

        assert_eq!(extractor.next_block, 3);
        assert_eq!(extractor.local_chain.hash_of(2).await, Some(common));
        assert_eq!(extractor.local_chain.hash_of(3).await, None);
    }
}
