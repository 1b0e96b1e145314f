//! Cutoff event tables (§3 "CutoffRecord", §4.2.4).

use {
    crate::{Address, Hash32, PgTransaction},
    sqlx::{Executor, PgConnection},
};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CutoffAllEvent {
    pub protocol: Address,
    pub owner: Address,
    pub cutoff_time: i64,
    pub tx_hash: Hash32,
    pub block_number: i64,
    pub log_index: i64,
    pub forked: bool,
}

impl From<&domain::event::CutoffAllEvent> for CutoffAllEvent {
    fn from(event: &domain::event::CutoffAllEvent) -> Self {
        CutoffAllEvent {
            protocol: event.protocol.into(),
            owner: event.owner.into(),
            cutoff_time: i64::try_from(event.cutoff_time).expect("cutoff_time fits i64"),
            tx_hash: event.tx_hash.into(),
            block_number: i64::try_from(event.index.block_number).expect("block fits i64"),
            log_index: i64::try_from(event.index.log_index).expect("log index fits i64"),
            forked: false,
        }
    }
}

pub async fn add_cutoff_all(ex: &mut PgConnection, event: &CutoffAllEvent) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO cutoff_events (
            protocol, owner, cutoff_time, tx_hash, block_number, log_index, forked
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (tx_hash) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(event.protocol)
        .bind(event.owner)
        .bind(event.cutoff_time)
        .bind(event.tx_hash)
        .bind(event.block_number)
        .bind(event.log_index)
        .bind(event.forked)
        .execute(ex)
        .await?;
    Ok(())
}

/// Idempotency check keyed by `tx_hash` (§3 "CutoffEvent ... idempotent
/// records keyed by ... txHash").
pub async fn find_cutoff_all(
    ex: &mut PgConnection,
    tx_hash: Hash32,
) -> sqlx::Result<Option<CutoffAllEvent>> {
    const QUERY: &str = "SELECT * FROM cutoff_events WHERE tx_hash = $1;";
    sqlx::query_as(QUERY).bind(tx_hash).fetch_optional(ex).await
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CutoffPairEvent {
    pub protocol: Address,
    pub owner: Address,
    pub token1: Address,
    pub token2: Address,
    pub cutoff_time: i64,
    pub tx_hash: Hash32,
    pub block_number: i64,
    pub log_index: i64,
    pub forked: bool,
}

impl From<&domain::event::CutoffPairEvent> for CutoffPairEvent {
    fn from(event: &domain::event::CutoffPairEvent) -> Self {
        CutoffPairEvent {
            protocol: event.protocol.into(),
            owner: event.owner.into(),
            token1: event.token1.into(),
            token2: event.token2.into(),
            cutoff_time: i64::try_from(event.cutoff_time).expect("cutoff_time fits i64"),
            tx_hash: event.tx_hash.into(),
            block_number: i64::try_from(event.index.block_number).expect("block fits i64"),
            log_index: i64::try_from(event.index.log_index).expect("log index fits i64"),
            forked: false,
        }
    }
}

pub async fn add_cutoff_pair(ex: &mut PgConnection, event: &CutoffPairEvent) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO cutoff_pair_events (
            protocol, owner, token1, token2, cutoff_time, tx_hash, block_number,
            log_index, forked
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (tx_hash) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(event.protocol)
        .bind(event.owner)
        .bind(event.token1)
        .bind(event.token2)
        .bind(event.cutoff_time)
        .bind(event.tx_hash)
        .bind(event.block_number)
        .bind(event.log_index)
        .bind(event.forked)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn find_cutoff_pair(
    ex: &mut PgConnection,
    tx_hash: Hash32,
) -> sqlx::Result<Option<CutoffPairEvent>> {
    const QUERY: &str = "SELECT * FROM cutoff_pair_events WHERE tx_hash = $1;";
    sqlx::query_as(QUERY).bind(tx_hash).fetch_optional(ex).await
}

/// Part of §4.2.6 step 1: cutoff rows are marked forked too, alongside
/// fill/cancel/ring-mined rows (see [`crate::ring_events::rollback_range`]).
pub async fn rollback_range(
    ex: &mut PgTransaction<'_>,
    fork_block: i64,
    detected_block: i64,
) -> sqlx::Result<()> {
    for table in ["cutoff_events", "cutoff_pair_events"] {
        let query = format!(
            "UPDATE {table} SET forked = true WHERE block_number > $1 AND block_number <= $2;"
        );
        ex.execute(sqlx::query(&query).bind(fork_block).bind(detected_block))
            .await?;
    }
    Ok(())
}
