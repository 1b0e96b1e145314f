//! Fill / ring-mined / cancel event tables (§3 "FillEvent / CancelEvent /
//! RingMinedEvent"), appended-only and marked `forked` rather than deleted
//! on reorg (§6 "Persisted state layout").

use {
    crate::{numeric, Address, Hash32, PgTransaction},
    sqlx::{types::BigDecimal, Executor, PgConnection},
};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FillEvent {
    pub ring_hash: Hash32,
    pub order_hash: Hash32,
    pub amount_s: BigDecimal,
    pub amount_b: BigDecimal,
    pub split_s: BigDecimal,
    pub split_b: BigDecimal,
    pub lrc_fee: BigDecimal,
    pub tx_hash: Hash32,
    pub block_number: i64,
    pub log_index: i64,
    pub forked: bool,
}

impl From<&domain::event::FillEvent> for FillEvent {
    fn from(event: &domain::event::FillEvent) -> Self {
        FillEvent {
            ring_hash: event.ring_hash.into(),
            order_hash: event.order_hash.into(),
            amount_s: numeric::u256_to_big_decimal(event.amount_s),
            amount_b: numeric::u256_to_big_decimal(event.amount_b),
            split_s: numeric::u256_to_big_decimal(event.split_s),
            split_b: numeric::u256_to_big_decimal(event.split_b),
            lrc_fee: numeric::u256_to_big_decimal(event.lrc_fee),
            tx_hash: event.tx_hash.into(),
            block_number: i64::try_from(event.index.block_number).expect("block fits i64"),
            log_index: i64::try_from(event.index.log_index).expect("log index fits i64"),
            forked: false,
        }
    }
}

pub async fn add_fill(ex: &mut PgConnection, event: &FillEvent) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO fill_events (
            ring_hash, order_hash, amount_s, amount_b, split_s, split_b,
            lrc_fee, tx_hash, block_number, log_index, forked
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (ring_hash, order_hash) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(event.ring_hash)
        .bind(event.order_hash)
        .bind(&event.amount_s)
        .bind(&event.amount_b)
        .bind(&event.split_s)
        .bind(&event.split_b)
        .bind(&event.lrc_fee)
        .bind(event.tx_hash)
        .bind(event.block_number)
        .bind(event.log_index)
        .bind(event.forked)
        .execute(ex)
        .await?;
    Ok(())
}

/// Idempotency check: `(ring_hash, order_hash)` already persisted (§4.2.2
/// step 1).
pub async fn find_fill(
    ex: &mut PgConnection,
    ring_hash: Hash32,
    order_hash: Hash32,
) -> sqlx::Result<Option<FillEvent>> {
    const QUERY: &str =
        "SELECT * FROM fill_events WHERE ring_hash = $1 AND order_hash = $2 AND NOT forked;";
    sqlx::query_as(QUERY)
        .bind(ring_hash)
        .bind(order_hash)
        .fetch_optional(ex)
        .await
}

/// Sum of non-forked fill amounts for an order, used by reorg recovery
/// (§4.2.6) to recompute `dealt*`/`split*` from scratch.
pub async fn sum_fills_for_order(
    ex: &mut PgConnection,
    order_hash: Hash32,
) -> sqlx::Result<(BigDecimal, BigDecimal, BigDecimal, BigDecimal)> {
    const QUERY: &str = "\
        SELECT
            COALESCE(SUM(amount_s), 0) AS amount_s,
            COALESCE(SUM(amount_b), 0) AS amount_b,
            COALESCE(SUM(split_s), 0) AS split_s,
            COALESCE(SUM(split_b), 0) AS split_b
        FROM fill_events WHERE order_hash = $1 AND NOT forked;";
    sqlx::query_as(QUERY).bind(order_hash).fetch_one(ex).await
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CancelEvent {
    pub order_hash: Hash32,
    pub amount_cancelled: BigDecimal,
    pub tx_hash: Hash32,
    pub block_number: i64,
    pub log_index: i64,
    pub forked: bool,
}

impl From<&domain::event::CancelEvent> for CancelEvent {
    fn from(event: &domain::event::CancelEvent) -> Self {
        CancelEvent {
            order_hash: event.order_hash.into(),
            amount_cancelled: numeric::u256_to_big_decimal(event.amount_cancelled),
            tx_hash: event.tx_hash.into(),
            block_number: i64::try_from(event.index.block_number).expect("block fits i64"),
            log_index: i64::try_from(event.index.log_index).expect("log index fits i64"),
            forked: false,
        }
    }
}

pub async fn add_cancel(ex: &mut PgConnection, event: &CancelEvent) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO cancel_events (
            order_hash, amount_cancelled, tx_hash, block_number, log_index, forked
        ) VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (order_hash, tx_hash) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(event.order_hash)
        .bind(&event.amount_cancelled)
        .bind(event.tx_hash)
        .bind(event.block_number)
        .bind(event.log_index)
        .bind(event.forked)
        .execute(ex)
        .await?;
    Ok(())
}

/// Idempotency check: `(order_hash, tx_hash)` already persisted (§4.2.3).
pub async fn find_cancel(
    ex: &mut PgConnection,
    order_hash: Hash32,
    tx_hash: Hash32,
) -> sqlx::Result<Option<CancelEvent>> {
    const QUERY: &str =
        "SELECT * FROM cancel_events WHERE order_hash = $1 AND tx_hash = $2 AND NOT forked;";
    sqlx::query_as(QUERY)
        .bind(order_hash)
        .bind(tx_hash)
        .fetch_optional(ex)
        .await
}

pub async fn sum_cancels_for_order(
    ex: &mut PgConnection,
    order_hash: Hash32,
) -> sqlx::Result<BigDecimal> {
    const QUERY: &str =
        "SELECT COALESCE(SUM(amount_cancelled), 0) FROM cancel_events WHERE order_hash = $1 AND NOT forked;";
    sqlx::query_scalar(QUERY).bind(order_hash).fetch_one(ex).await
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RingMinedEvent {
    pub ring_hash: Hash32,
    pub ring_index: BigDecimal,
    pub tx_hash: Hash32,
    pub block_number: i64,
    pub log_index: i64,
    pub forked: bool,
}

impl From<&domain::event::RingMinedEvent> for RingMinedEvent {
    fn from(event: &domain::event::RingMinedEvent) -> Self {
        RingMinedEvent {
            ring_hash: event.ring_hash.into(),
            ring_index: numeric::u256_to_big_decimal(event.ring_index),
            tx_hash: event.tx_hash.into(),
            block_number: i64::try_from(event.index.block_number).expect("block fits i64"),
            log_index: i64::try_from(event.index.log_index).expect("log index fits i64"),
            forked: false,
        }
    }
}

pub async fn add_ring_mined(ex: &mut PgConnection, event: &RingMinedEvent) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO ring_mined_events (
            ring_hash, ring_index, tx_hash, block_number, log_index, forked
        ) VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (ring_index) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(event.ring_hash)
        .bind(&event.ring_index)
        .bind(event.tx_hash)
        .bind(event.block_number)
        .bind(event.log_index)
        .bind(event.forked)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn find_ring_mined_by_index(
    ex: &mut PgConnection,
    ring_index: &BigDecimal,
) -> sqlx::Result<Option<RingMinedEvent>> {
    const QUERY: &str = "SELECT * FROM ring_mined_events WHERE ring_index = $1 AND NOT forked;";
    sqlx::query_as(QUERY)
        .bind(ring_index)
        .fetch_optional(ex)
        .await
}

/// Reorg recovery (§4.2.6 step 1): marks every fill/cancel/ring-mined row
/// in `(fork_block, detected_block]` as `forked`, across all three tables
/// in one transaction.
pub async fn rollback_range(
    ex: &mut PgTransaction<'_>,
    fork_block: i64,
    detected_block: i64,
) -> sqlx::Result<Vec<Hash32>> {
    const AFFECTED_ORDERS: &str = "\
        SELECT DISTINCT order_hash FROM fill_events
            WHERE block_number > $1 AND block_number <= $2
        UNION
        SELECT DISTINCT order_hash FROM cancel_events
            WHERE block_number > $1 AND block_number <= $2;";
    let affected: Vec<Hash32> = sqlx::query_scalar(AFFECTED_ORDERS)
        .bind(fork_block)
        .bind(detected_block)
        .fetch_all(&mut **ex)
        .await?;

    for table in ["fill_events", "cancel_events", "ring_mined_events"] {
        let query = format!(
            "UPDATE {table} SET forked = true WHERE block_number > $1 AND block_number <= $2;"
        );
        ex.execute(sqlx::query(&query).bind(fork_block).bind(detected_block))
            .await?;
    }

    Ok(affected)
}
