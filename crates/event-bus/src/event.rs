//! The bit-stable topic names and the typed payload carried on each (§6).

use domain::event::{
    ApprovalEvent, CancelEvent, ChainForkDetected as DomainForkDetected, CutoffAllEvent,
    CutoffPairEvent, EthTransferEvent, FillEvent, RingMinedEvent, TokenRegisteredEvent,
    TransferEvent, WethEvent,
};

/// A `submitRing` method call's receipt status, fed back to the miner so it
/// can stop proposing rings that already landed (§4.1 registration table,
/// "miner feedback").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinerSubmitRingResult {
    pub tx_hash: primitive_types::H256,
    pub succeeded: bool,
}

/// A method call observed in the pending-tx pool (§4.4 "Pending pool"), not
/// yet associated with any logs.
#[derive(Debug, Clone)]
pub struct PendingTransactionEvent {
    pub tx_hash: primitive_types::H256,
    pub raw_from: primitive_types::H160,
    pub nonce: u64,
}

#[derive(Debug, Clone)]
pub enum Event {
    NewOrder(Box<domain::Order>),
    RingMined(RingMinedEvent),
    OrderFilled(FillEvent),
    OrderCancelled(CancelEvent),
    CutoffAll(CutoffAllEvent),
    CutoffPair(CutoffPairEvent),
    Approve(ApprovalEvent),
    Transfer(TransferEvent),
    EthTransfer(EthTransferEvent),
    WethDeposit(WethEvent),
    WethWithdrawal(WethEvent),
    TokenRegistered(TokenRegisteredEvent),
    ChainForkDetected(DomainForkDetected),
    ChainForkProcess(DomainForkDetected),
    PendingTransaction(PendingTransactionEvent),
    MinerSubmitRingResult(MinerSubmitRingResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NewOrder,
    RingMined,
    OrderFilledEvent,
    OrderCancelledEvent,
    CutoffAllEvent,
    CutoffPairEvent,
    Approve,
    Transfer,
    EthTransferEvent,
    WethDeposit,
    WethWithdrawal,
    TokenRegistered,
    ChainForkDetected,
    ChainForkProcess,
    PendingTransaction,
    MinerSubmitRingResult,
}

impl Topic {
    pub fn name(self) -> &'static str {
        match self {
            Topic::NewOrder => "NewOrder",
            Topic::RingMined => "RingMined",
            Topic::OrderFilledEvent => "OrderFilledEvent",
            Topic::OrderCancelledEvent => "OrderCancelledEvent",
            Topic::CutoffAllEvent => "CutoffAllEvent",
            Topic::CutoffPairEvent => "CutoffPairEvent",
            Topic::Approve => "Approve",
            Topic::Transfer => "Transfer",
            Topic::EthTransferEvent => "EthTransferEvent",
            Topic::WethDeposit => "WethDeposit",
            Topic::WethWithdrawal => "WethWithdrawal",
            Topic::TokenRegistered => "TokenRegistered",
            Topic::ChainForkDetected => "ChainForkDetected",
            Topic::ChainForkProcess => "ChainForkProcess",
            Topic::PendingTransaction => "PendingTransaction",
            Topic::MinerSubmitRingResult => "MinerSubmitRingResult",
        }
    }
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::NewOrder(_) => Topic::NewOrder,
            Event::RingMined(_) => Topic::RingMined,
            Event::OrderFilled(_) => Topic::OrderFilledEvent,
            Event::OrderCancelled(_) => Topic::OrderCancelledEvent,
            Event::CutoffAll(_) => Topic::CutoffAllEvent,
            Event::CutoffPair(_) => Topic::CutoffPairEvent,
            Event::Approve(_) => Topic::Approve,
            Event::Transfer(_) => Topic::Transfer,
            Event::EthTransfer(_) => Topic::EthTransferEvent,
            Event::WethDeposit(_) => Topic::WethDeposit,
            Event::WethWithdrawal(_) => Topic::WethWithdrawal,
            Event::TokenRegistered(_) => Topic::TokenRegistered,
            Event::ChainForkDetected(_) => Topic::ChainForkDetected,
            Event::ChainForkProcess(_) => Topic::ChainForkProcess,
            Event::PendingTransaction(_) => Topic::PendingTransaction,
            Event::MinerSubmitRingResult(_) => Topic::MinerSubmitRingResult,
        }
    }
}
