//! Order table operations (§6 "Order table").

use {
    crate::{numeric, Address, Hash32, PgTransaction},
    sqlx::{types::BigDecimal, PgConnection},
    std::str::FromStr,
};

/// One row in the `orders` table; the persisted shape of [`domain::Order`].
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Order {
    pub hash: Hash32,
    pub owner: Address,
    pub protocol: Address,
    pub token_s: Address,
    pub token_b: Address,
    pub amount_s: BigDecimal,
    pub amount_b: BigDecimal,
    pub buy_no_more_than_amount_b: bool,
    pub margin_split_percentage: i16,
    pub lrc_fee: BigDecimal,
    pub timestamp: i64,
    pub ttl: i64,
    pub salt: i64,
    pub valid_since: i64,
    pub valid_until: i64,
    pub v: i16,
    pub r: Hash32,
    pub s: Hash32,
    pub dealt_amount_s: BigDecimal,
    pub dealt_amount_b: BigDecimal,
    pub split_amount_s: BigDecimal,
    pub split_amount_b: BigDecimal,
    pub cancelled_amount_s: BigDecimal,
    pub cancelled_amount_b: BigDecimal,
    pub status: String,
    pub updated_block: i64,
    pub miner_block_mark: i64,
    pub broadcast_time: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("amount out of range: {0}")]
    Amount(#[from] numeric::OutOfRangeError),
    #[error("unrecognized order status {0:?}")]
    Status(String),
}

impl TryFrom<Order> for domain::Order {
    type Error = ConversionError;

    fn try_from(row: Order) -> Result<Self, Self::Error> {
        Ok(domain::Order {
            hash: row.hash.into(),
            owner: row.owner.into(),
            protocol: row.protocol.into(),
            token_s: row.token_s.into(),
            token_b: row.token_b.into(),
            amount_s: numeric::big_decimal_to_u256(&row.amount_s)?,
            amount_b: numeric::big_decimal_to_u256(&row.amount_b)?,
            buy_no_more_than_amount_b: row.buy_no_more_than_amount_b,
            margin_split_percentage: row.margin_split_percentage as u8,
            lrc_fee: numeric::big_decimal_to_u256(&row.lrc_fee)?,
            timestamp: row.timestamp as u64,
            ttl: row.ttl as u64,
            salt: row.salt as u64,
            valid_since: row.valid_since as u64,
            valid_until: row.valid_until as u64,
            v: row.v as u8,
            r: row.r.into(),
            s: row.s.into(),
            dealt_amount_s: numeric::big_decimal_to_u256(&row.dealt_amount_s)?,
            dealt_amount_b: numeric::big_decimal_to_u256(&row.dealt_amount_b)?,
            split_amount_s: numeric::big_decimal_to_u256(&row.split_amount_s)?,
            split_amount_b: numeric::big_decimal_to_u256(&row.split_amount_b)?,
            cancelled_amount_s: numeric::big_decimal_to_u256(&row.cancelled_amount_s)?,
            cancelled_amount_b: numeric::big_decimal_to_u256(&row.cancelled_amount_b)?,
            status: domain::OrderStatus::from_str(&row.status)
                .map_err(|_| ConversionError::Status(row.status.clone()))?,
            updated_block: row.updated_block as u64,
            miner_block_mark: row.miner_block_mark as u64,
            broadcast_time: row.broadcast_time as u64,
        })
    }
}

impl From<&domain::Order> for Order {
    fn from(order: &domain::Order) -> Self {
        Order {
            hash: order.hash.into(),
            owner: order.owner.into(),
            protocol: order.protocol.into(),
            token_s: order.token_s.into(),
            token_b: order.token_b.into(),
            amount_s: numeric::u256_to_big_decimal(order.amount_s),
            amount_b: numeric::u256_to_big_decimal(order.amount_b),
            buy_no_more_than_amount_b: order.buy_no_more_than_amount_b,
            margin_split_percentage: i16::from(order.margin_split_percentage),
            lrc_fee: numeric::u256_to_big_decimal(order.lrc_fee),
            timestamp: i64::try_from(order.timestamp).expect("timestamp fits i64"),
            ttl: i64::try_from(order.ttl).expect("ttl fits i64"),
            salt: i64::try_from(order.salt).expect("salt fits i64"),
            valid_since: i64::try_from(order.valid_since).expect("valid_since fits i64"),
            valid_until: i64::try_from(order.valid_until).expect("valid_until fits i64"),
            v: i16::from(order.v),
            r: order.r.into(),
            s: order.s.into(),
            dealt_amount_s: numeric::u256_to_big_decimal(order.dealt_amount_s),
            dealt_amount_b: numeric::u256_to_big_decimal(order.dealt_amount_b),
            split_amount_s: numeric::u256_to_big_decimal(order.split_amount_s),
            split_amount_b: numeric::u256_to_big_decimal(order.split_amount_b),
            cancelled_amount_s: numeric::u256_to_big_decimal(order.cancelled_amount_s),
            cancelled_amount_b: numeric::u256_to_big_decimal(order.cancelled_amount_b),
            status: order.status.to_string(),
            updated_block: i64::try_from(order.updated_block).expect("block fits i64"),
            miner_block_mark: i64::try_from(order.miner_block_mark).expect("block fits i64"),
            broadcast_time: i64::try_from(order.broadcast_time).expect("broadcast_time fits i64"),
        }
    }
}

/// Inserts a brand new order row (gateway `NewOrder`, always status `NEW`).
pub async fn add(ex: &mut PgConnection, order: &Order) -> sqlx::Result<()> {
    const QUERY: &str = "\
        INSERT INTO orders (
            hash, owner, protocol, token_s, token_b, amount_s, amount_b,
            buy_no_more_than_amount_b, margin_split_percentage, lrc_fee,
            timestamp, ttl, salt, valid_since, valid_until, v, r, s,
            dealt_amount_s, dealt_amount_b, split_amount_s, split_amount_b,
            cancelled_amount_s, cancelled_amount_b, status, updated_block,
            miner_block_mark, broadcast_time
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
            $27, $28
        ) ON CONFLICT (hash) DO NOTHING;";
    sqlx::query(QUERY)
        .bind(order.hash)
        .bind(order.owner)
        .bind(order.protocol)
        .bind(order.token_s)
        .bind(order.token_b)
        .bind(&order.amount_s)
        .bind(&order.amount_b)
        .bind(order.buy_no_more_than_amount_b)
        .bind(order.margin_split_percentage)
        .bind(&order.lrc_fee)
        .bind(order.timestamp)
        .bind(order.ttl)
        .bind(order.salt)
        .bind(order.valid_since)
        .bind(order.valid_until)
        .bind(order.v)
        .bind(order.r)
        .bind(order.s)
        .bind(&order.dealt_amount_s)
        .bind(&order.dealt_amount_b)
        .bind(&order.split_amount_s)
        .bind(&order.split_amount_b)
        .bind(&order.cancelled_amount_s)
        .bind(&order.cancelled_amount_b)
        .bind(&order.status)
        .bind(order.updated_block)
        .bind(order.miner_block_mark)
        .bind(order.broadcast_time)
        .execute(ex)
        .await?;
    Ok(())
}

/// Full-row update, used by reorg recovery (§4.2.6) which recomputes every
/// mutable field from the surviving non-forked event rows.
pub async fn update(ex: &mut PgConnection, order: &Order) -> sqlx::Result<()> {
    const QUERY: &str = "\
        UPDATE orders SET
            status = $2, dealt_amount_s = $3, dealt_amount_b = $4,
            split_amount_s = $5, split_amount_b = $6, cancelled_amount_s = $7,
            cancelled_amount_b = $8, updated_block = $9
        WHERE hash = $1;";
    sqlx::query(QUERY)
        .bind(order.hash)
        .bind(&order.status)
        .bind(&order.dealt_amount_s)
        .bind(&order.dealt_amount_b)
        .bind(&order.split_amount_s)
        .bind(&order.split_amount_b)
        .bind(&order.cancelled_amount_s)
        .bind(&order.cancelled_amount_b)
        .bind(order.updated_block)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn get_by_hash(ex: &mut PgConnection, hash: Hash32) -> sqlx::Result<Option<Order>> {
    const QUERY: &str = "SELECT * FROM orders WHERE hash = $1;";
    sqlx::query_as(QUERY).bind(hash).fetch_optional(ex).await
}

pub async fn find_by_hashes(ex: &mut PgConnection, hashes: &[Hash32]) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "SELECT * FROM orders WHERE hash = ANY($1);";
    sqlx::query_as(QUERY)
        .bind(hashes.to_vec())
        .fetch_all(ex)
        .await
}

/// `GetOrderBook`: the `length` most recent non-terminal orders for a pair,
/// irrespective of white-listing (unlike `GetForMiner`).
pub async fn get_order_book(
    ex: &mut PgConnection,
    protocol: Address,
    token_s: Address,
    token_b: Address,
    length: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "\
        SELECT * FROM orders
        WHERE protocol = $1 AND token_s = $2 AND token_b = $3
          AND status NOT IN ('FINISHED', 'CANCEL', 'CUTOFF')
        ORDER BY timestamp DESC
        LIMIT $4;";
    sqlx::query_as(QUERY)
        .bind(protocol)
        .bind(token_s)
        .bind(token_b)
        .bind(length)
        .fetch_all(ex)
        .await
}

/// `GetForMiner` (§4.2.5): non-terminal orders for a pair, excluding any
/// order marked within the soft-lock delay window, ordered ascending by
/// sell-side price (`amount_s / amount_b`); `exclude_status` lets the
/// caller additionally suppress statuses that only make sense server-side
/// (e.g. `UNKNOWN`).
pub async fn get_for_miner(
    ex: &mut PgConnection,
    protocol: Address,
    token_s: Address,
    token_b: Address,
    length: i64,
    exclude_status: &[String],
    current_block: i64,
    delay_window: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "\
        SELECT * FROM orders
        WHERE protocol = $1 AND token_s = $2 AND token_b = $3
          AND status NOT IN ('FINISHED', 'CANCEL', 'CUTOFF')
          AND NOT (status = ANY($4))
          AND miner_block_mark < $5
        ORDER BY amount_s::numeric / NULLIF(amount_b::numeric, 0) ASC
        LIMIT $6;";
    sqlx::query_as(QUERY)
        .bind(protocol)
        .bind(token_s)
        .bind(token_b)
        .bind(exclude_status)
        .bind(current_block - delay_window)
        .bind(length)
        .fetch_all(ex)
        .await
}

pub async fn get_cutoff_orders(
    ex: &mut PgConnection,
    owner: Address,
    cutoff_time: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "\
        SELECT * FROM orders
        WHERE owner = $1 AND valid_since < $2
          AND status NOT IN ('FINISHED', 'CANCEL', 'CUTOFF');";
    sqlx::query_as(QUERY)
        .bind(owner)
        .bind(cutoff_time)
        .fetch_all(ex)
        .await
}

pub async fn get_cutoff_pair_orders(
    ex: &mut PgConnection,
    owner: Address,
    token1: Address,
    token2: Address,
    cutoff_time: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "\
        SELECT * FROM orders
        WHERE owner = $1
          AND ((token_s = $2 AND token_b = $3) OR (token_s = $3 AND token_b = $2))
          AND valid_since < $4
          AND status NOT IN ('FINISHED', 'CANCEL', 'CUTOFF');";
    sqlx::query_as(QUERY)
        .bind(owner)
        .bind(token1)
        .bind(token2)
        .bind(cutoff_time)
        .fetch_all(ex)
        .await
}

/// Reorg recovery (§4.2.6 step 2): orders whose `updated_block` falls
/// inside the rolled-back range, so the caller can re-derive their status
/// from the surviving non-forked event rows (this also catches orders a
/// cutoff pushed straight to `CUTOFF` without going through `settle`).
pub async fn get_by_updated_block_range(
    ex: &mut PgConnection,
    fork_block: i64,
    detected_block: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str =
        "SELECT * FROM orders WHERE updated_block > $1 AND updated_block <= $2;";
    sqlx::query_as(QUERY)
        .bind(fork_block)
        .bind(detected_block)
        .fetch_all(ex)
        .await
}

/// `MarkMinerOrders`: writes a soft-lock delay mark (§4.2.5, "not binding
/// guarantees"). `block_mark` is the block past which the order may be
/// proposed again.
pub async fn mark_miner_orders(
    ex: &mut PgTransaction<'_>,
    hashes: &[Hash32],
    block_mark: i64,
) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE orders SET miner_block_mark = $2 WHERE hash = ANY($1);";
    sqlx::query(QUERY)
        .bind(hashes.to_vec())
        .bind(block_mark)
        .execute(&mut **ex)
        .await?;
    Ok(())
}

/// `SetCutoffOrders`: batch-sets `status = CUTOFF` for the given hashes in
/// one transaction (§4.2.4 "batch-query ... and set their status").
pub async fn set_cutoff_orders(
    ex: &mut PgTransaction<'_>,
    hashes: &[Hash32],
    block_number: i64,
) -> sqlx::Result<()> {
    const QUERY: &str =
        "UPDATE orders SET status = 'CUTOFF', updated_block = $2 WHERE hash = ANY($1);";
    sqlx::query(QUERY)
        .bind(hashes.to_vec())
        .bind(block_number)
        .execute(&mut **ex)
        .await?;
    Ok(())
}

pub async fn update_order_while_fill(
    ex: &mut PgTransaction<'_>,
    hash: Hash32,
    status: &str,
    dealt_amount_s: &BigDecimal,
    dealt_amount_b: &BigDecimal,
    split_amount_s: &BigDecimal,
    split_amount_b: &BigDecimal,
    updated_block: i64,
) -> sqlx::Result<()> {
    const QUERY: &str = "\
        UPDATE orders SET
            status = $2, dealt_amount_s = $3, dealt_amount_b = $4,
            split_amount_s = $5, split_amount_b = $6, updated_block = $7
        WHERE hash = $1;";
    sqlx::query(QUERY)
        .bind(hash)
        .bind(status)
        .bind(dealt_amount_s)
        .bind(dealt_amount_b)
        .bind(split_amount_s)
        .bind(split_amount_b)
        .bind(updated_block)
        .execute(&mut **ex)
        .await?;
    Ok(())
}

pub async fn update_order_while_cancel(
    ex: &mut PgTransaction<'_>,
    hash: Hash32,
    status: &str,
    cancelled_amount_s: &BigDecimal,
    cancelled_amount_b: &BigDecimal,
    updated_block: i64,
) -> sqlx::Result<()> {
    const QUERY: &str = "\
        UPDATE orders SET
            status = $2, cancelled_amount_s = $3, cancelled_amount_b = $4,
            updated_block = $5
        WHERE hash = $1;";
    sqlx::query(QUERY)
        .bind(hash)
        .bind(status)
        .bind(cancelled_amount_s)
        .bind(cancelled_amount_b)
        .bind(updated_block)
        .execute(&mut **ex)
        .await?;
    Ok(())
}

pub async fn update_broadcast_time(
    ex: &mut PgConnection,
    hash: Hash32,
    broadcast_time: i64,
) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE orders SET broadcast_time = $2 WHERE hash = $1;";
    sqlx::query(QUERY)
        .bind(hash)
        .bind(broadcast_time)
        .execute(ex)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub owner: Option<Address>,
    pub status: Vec<String>,
}

pub async fn page_query(
    ex: &mut PgConnection,
    filter: &PageFilter,
    offset: i64,
    limit: i64,
) -> sqlx::Result<Vec<Order>> {
    const QUERY: &str = "\
        SELECT * FROM orders
        WHERE ($1::bytea IS NULL OR owner = $1)
          AND (array_length($2::text[], 1) IS NULL OR status = ANY($2))
        ORDER BY timestamp DESC
        OFFSET $3 LIMIT $4;";
    sqlx::query_as(QUERY)
        .bind(filter.owner)
        .bind(&filter.status)
        .bind(offset)
        .bind(limit)
        .fetch_all(ex)
        .await
}
