//! Wires [`OrderManager`] to the event bus (§4.2). Fork rollback (§4.5) is
//! not handled through a bus subscription: the barrier the fork
//! coordinator hands back from `coordinate_rollback` only exists once the
//! call returns, so the composition root calls [`OrderManager::rollback`]
//! directly alongside its peers and acks the shared barrier itself,
//! rather than threading the barrier through an event payload.

use {
    crate::manager::OrderManager,
    async_trait::async_trait,
    event_bus::{Error, Event, Handler},
    std::sync::Arc,
};

pub struct NewOrderHandler {
    pub manager: Arc<OrderManager>,
}

#[async_trait]
impl Handler for NewOrderHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::NewOrder(order) = event else {
            return Ok(());
        };
        self.manager
            .add_order(&order)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct FillHandler {
    pub manager: Arc<OrderManager>,
}

#[async_trait]
impl Handler for FillHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::OrderFilled(fill) = event else {
            return Ok(());
        };
        self.manager
            .apply_fill(&fill)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct CancelHandler {
    pub manager: Arc<OrderManager>,
}

#[async_trait]
impl Handler for CancelHandler {
    async fn handle(&self, event: Event) -> Result<(), Error> {
        let Event::OrderCancelled(cancel) = event else {
            return Ok(());
        };
        self.manager
            .apply_cancel(&cancel)
            .await
            .map_err(|err| Error::Handler(err.to_string()))
    }
}

pub struct CutoffAllHandler {
    pub manager: Arc<OrderManager>,
}

#[async_trait]
impl Handler for CutoffAllHandler {
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

pub struct CutoffPairHandler {
    pub manager: Arc<OrderManager>,
}

#[async_trait]
impl Handler for CutoffPairHandler {
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
