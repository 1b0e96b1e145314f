//! Composition root (§1 "Configuration, CLI, logging, HTTP API wiring" is
//! out of scope for the core but wired here): parses [`arguments::Arguments`],
//! builds the Postgres pool and JSON-RPC client, wires the event bus
//! subscriptions for C5/C6/C8, and spawns the extractor, pending pool and
//! metrics server until shutdown.

pub mod arguments;
pub mod collaborators;
pub mod fork;
pub mod metrics;
pub mod rpc;

use {
    abi_processor::AbiProcessor,
    account_cache::AccountCache,
    clap::Parser,
    event_bus::{Dispatch, EventBus, Topic},
    extractor::{Extractor, PendingPool},
    fork_coordinator::{ForkCoordinator, RollbackTarget},
    num::{rational::Ratio, BigInt},
    order_manager::OrderManager,
    prometheus::Registry,
    sqlx::postgres::PgPoolOptions,
    std::sync::Arc,
    tx_manager::TxManager,
};

/// Parses arguments, wires every collaborator and runs until `ctrl_c` or a
/// background task exits with an error. Mirrors `autopilot::run::start`'s
/// split from `main.rs`, down to never printing the database URL (§4.7,
/// `Arguments::fmt`).
pub async fn start(args: impl Iterator<Item = String>) {
    let args = arguments::Arguments::parse_from(args);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();
    tracing::info!(%args, "starting relay");

    let registry = Arc::new(Registry::new());
    let metrics = metrics::Metrics::instance(&registry)
        .expect("metric names are unique and registration happens once");

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(args.db_url.as_str())
        .await
        .expect("failed to connect to postgres");

    let bus = Arc::new(EventBus::new());

    let dust_floor = Ratio::new(
        BigInt::from(args.dust_floor_numerator),
        BigInt::from(args.dust_floor_denominator.max(1)),
    );
    let market_cap = Arc::new(collaborators::UnitMarketCap);
    let whitelist = Arc::new(collaborators::AllowAllWhiteList);
    let order_manager = Arc::new(OrderManager::new(
        pool.clone(),
        market_cap,
        whitelist,
        dust_floor,
    ));

    let unlock = Arc::new(collaborators::AlwaysUnlocked);
    let symbols = Arc::new(collaborators::HexFallbackSymbols);
    let tx_manager = Arc::new(TxManager::new(pool.clone(), unlock, symbols));

    let account_cache = Arc::new(AccountCache::new(
        args.account_cache_ttl,
        args.delegates.iter().copied().collect(),
    ));

    subscribe_handlers(&bus, order_manager.clone(), tx_manager.clone(), account_cache.clone()).await;

    let rollback_targets: Vec<Arc<dyn RollbackTarget>> = vec![
        Arc::new(fork::OrderManagerRollback(order_manager.clone())),
        Arc::new(fork::TxManagerRollback(tx_manager.clone())),
        Arc::new(fork::AccountCacheRollback(account_cache.clone())),
        Arc::new(fork::ForkCounter(metrics.forks_detected.clone())),
    ];
    let fork_coordinator = Arc::new(ForkCoordinator::new(bus.clone(), rollback_targets));

    let log_decoder = Arc::new(abi_processor::LoopringSchema::default());
    let method_decoder = log_decoder.clone();
    let abi_registry = abi_processor::Registry::new(
        args.protocols.iter().copied().collect(),
        args.delegates.iter().copied().collect(),
    );
    let processor = Arc::new(AbiProcessor::new(
        abi_registry,
        log_decoder,
        method_decoder,
        bus.clone(),
    ));

    let source = Arc::new(rpc::JsonRpcSource::new(args.rpc_url.clone()));

    let mut extractor = Extractor::new(
        source.clone(),
        processor.clone(),
        fork_coordinator,
        args.confirms,
        args.start_block,
    );
    let pending_pool = PendingPool::new(
        source,
        processor,
        bus.clone(),
        args.pending_poll_interval,
    );

    let extractor_task = tokio::spawn(async move {
        let err = extractor.run().await;
        tracing::error!(%err, "extractor loop exited");
    });
    let pending_task = tokio::spawn(async move {
        pending_pool.run().await;
    });
    let metrics_task = tokio::spawn(metrics::serve(args.metrics_address, registry));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
        _ = extractor_task => {
            tracing::error!("extractor task terminated unexpectedly");
        }
        _ = pending_task => {
            tracing::error!("pending pool task terminated unexpectedly");
        }
        result = metrics_task => {
            match result {
                Ok(Err(err)) => tracing::error!(%err, "metrics server exited"),
                Err(err) => tracing::error!(%err, "metrics server task panicked"),
                Ok(Ok(())) => {}
            }
        }
    }
}

/// §4.1 registration table mapped onto the bus: every handler that
/// mutates persistent state declares `Sequential` (§5 "All stateful
/// handlers in C5 and C6 declare sequential"); the account cache
/// declares `Sequential` per-topic as well, since two overlapping
/// invalidations for the same owner/token must not race.
async fn subscribe_handlers(
    bus: &Arc<EventBus>,
    order_manager: Arc<OrderManager>,
    tx_manager: Arc<TxManager>,
    account_cache: Arc<AccountCache>,
) {
    use order_manager::{CancelHandler, CutoffAllHandler, CutoffPairHandler, FillHandler, NewOrderHandler};
    use tx_manager::{
        ApproveHandler, EthTransferHandler, TransferHandler, TxCancelHandler, TxCutoffAllHandler,
        TxCutoffPairHandler, WethDepositHandler, WethWithdrawalHandler,
    };
    use account_cache::{ApprovalInvalidation, TransferInvalidation};

    bus.subscribe(
        Topic::NewOrder,
        "order-manager:new-order",
        Dispatch::Sequential,
        Arc::new(NewOrderHandler {
            manager: order_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::OrderFilledEvent,
        "order-manager:fill",
        Dispatch::Sequential,
        Arc::new(FillHandler {
            manager: order_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::OrderCancelledEvent,
        "order-manager:cancel",
        Dispatch::Sequential,
        Arc::new(CancelHandler {
            manager: order_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::CutoffAllEvent,
        "order-manager:cutoff-all",
        Dispatch::Sequential,
        Arc::new(CutoffAllHandler {
            manager: order_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::CutoffPairEvent,
        "order-manager:cutoff-pair",
        Dispatch::Sequential,
        Arc::new(CutoffPairHandler {
            manager: order_manager,
        }),
    )
    .await;

    bus.subscribe(
        Topic::Transfer,
        "tx-manager:transfer",
        Dispatch::Sequential,
        Arc::new(TransferHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::EthTransferEvent,
        "tx-manager:eth-transfer",
        Dispatch::Sequential,
        Arc::new(EthTransferHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::WethDeposit,
        "tx-manager:weth-deposit",
        Dispatch::Sequential,
        Arc::new(WethDepositHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::WethWithdrawal,
        "tx-manager:weth-withdrawal",
        Dispatch::Sequential,
        Arc::new(WethWithdrawalHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::OrderCancelledEvent,
        "tx-manager:cancel",
        Dispatch::Sequential,
        Arc::new(TxCancelHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::CutoffAllEvent,
        "tx-manager:cutoff-all",
        Dispatch::Sequential,
        Arc::new(TxCutoffAllHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::CutoffPairEvent,
        "tx-manager:cutoff-pair",
        Dispatch::Sequential,
        Arc::new(TxCutoffPairHandler {
            manager: tx_manager.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::Approve,
        "tx-manager:approve",
        Dispatch::Sequential,
        Arc::new(ApproveHandler { manager: tx_manager }),
    )
    .await;

    bus.subscribe(
        Topic::Transfer,
        "account-cache:transfer",
        Dispatch::Sequential,
        Arc::new(TransferInvalidation {
            cache: account_cache.clone(),
        }),
    )
    .await;
    bus.subscribe(
        Topic::Approve,
        "account-cache:approval",
        Dispatch::Sequential,
        Arc::new(ApprovalInvalidation {
            cache: account_cache,
        }),
    )
    .await;
}
