//! Wires [`TxManager`] to the event bus (§4.3). As with the order manager,
//! fork rollback is invoked directly by the composition root alongside its
//! peers rather than through a subscription (§4.5).

use {
    crate::manager::TxManager,
    async_trait::async_trait,
    event_bus::{Error, Event, Handler},
    std::sync::Arc,
};

pub struct TransferHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for TransferHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::Transfer(transfer) = event else {
            return Ok(());
        };
        self.manager
            .apply_transfer(&transfer)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct EthTransferHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for EthTransferHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::EthTransfer(transfer) = event else {
            return Ok(());
        };
        self.manager
            .apply_eth_transfer(&transfer)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct WethDepositHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for WethDepositHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::WethDeposit(weth) = event else {
            return Ok(());
        };
        self.manager
            .apply_weth(&weth)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct WethWithdrawalHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for WethWithdrawalHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::WethWithdrawal(weth) = event else {
            return Ok(());
        };
        self.manager
            .apply_weth(&weth)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct TxCancelHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for TxCancelHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::OrderCancelled(cancel) = event else {
            return Ok(());
        };
        self.manager
            .apply_cancel_order(&cancel)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct TxCutoffAllHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for TxCutoffAllHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::CutoffAll(cutoff) = event else {
            return Ok(());
        };
        self.manager
            .apply_cutoff_all(&cutoff)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct TxCutoffPairHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for TxCutoffPairHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::CutoffPair(cutoff) = event else {
            return Ok(());
        };
        self.manager
            .apply_cutoff_pair(&cutoff)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct ApproveHandler {
    pub manager: Arc<TxManager>,
}

#[async_trait]
impl Handler for ApproveHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::Approve(approval) = event else {
            return Ok(());
        };
        self.manager
            .apply_approve(&approval)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}
