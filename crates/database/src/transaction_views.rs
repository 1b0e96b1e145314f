//! Transaction view table (§4.3, §6 "Transaction view table").

use {
    crate::{numeric, Address, Hash32, PgTransaction},
    sqlx::{types::BigDecimal, Executor, PgConnection},
    std::str::FromStr,
};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct TransactionView {
    pub tx_hash: Hash32,
    pub log_index: i64,
    pub tx_type: String,
    pub owner: Address,
    pub protocol: Address,
    pub symbol: String,
    pub from_address: Address,
    pub to_address: Address,
    pub raw_from: Address,
    pub nonce: i64,
    pub value: BigDecimal,
    pub block_number: i64,
    pub block_time: i64,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("amount out of range: {0}")]
    Amount(#[from] numeric::OutOfRangeError),
    #[error("unrecognized field {field}: {value:?}")]
    Field { field: &'static str, value: String },
}

impl TryFrom<TransactionView> for domain::TransactionView {
    type Error = ConversionError;

    fn try_from(row: TransactionView) -> Result<Self, Self::Error> {
        Ok(domain::TransactionView {
            tx_hash: row.tx_hash.into(),
            log_index: row.log_index as u64,
            tx_type: domain::TxType::from_str(&row.tx_type).map_err(|_| ConversionError::Field {
                field: "tx_type",
                value: row.tx_type.clone(),
            })?,
            owner: row.owner.into(),
            protocol: row.protocol.into(),
            symbol: row.symbol,
            from: row.from_address.into(),
            to: row.to_address.into(),
            raw_from: row.raw_from.into(),
            nonce: row.nonce as u64,
            value: numeric::big_decimal_to_u256(&row.value)?,
            block_number: row.block_number as u64,
            block_time: row.block_time as u64,
            status: domain::TxStatus::from_str(&row.status).map_err(|_| ConversionError::Field {
                field: "status",
                value: row.status.clone(),
            })?,
        })
    }
}

impl From<&domain::TransactionView> for TransactionView {
    fn from(view: &domain::TransactionView) -> Self {
        TransactionView {
            tx_hash: view.tx_hash.into(),
            log_index: i64::try_from(view.log_index).expect("log_index fits i64"),
            tx_type: view.tx_type.to_string(),
            owner: view.owner.into(),
            protocol: view.protocol.into(),
            symbol: view.symbol.clone(),
            from_address: view.from.into(),
            to_address: view.to.into(),
            raw_from: view.raw_from.into(),
            nonce: i64::try_from(view.nonce).expect("nonce fits i64"),
            value: numeric::u256_to_big_decimal(view.value),
            block_number: i64::try_from(view.block_number).expect("block fits i64"),
            block_time: i64::try_from(view.block_time).expect("block_time fits i64"),
            status: view.status.to_string(),
        }
    }
}

/// Identity insert (§4.3 "Pending write: if a view with identical identity
/// exists, drop; else insert").
pub async fn insert_if_new(ex: &mut PgConnection, view: &TransactionView) -> sqlx::Result<bool> {
    const QUERY: &str = "\
        INSERT INTO transaction_views (
            tx_hash, log_index, tx_type, owner, protocol, symbol,
            from_address, to_address, raw_from, nonce, value, block_number,
            block_time, status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (tx_hash, log_index, tx_type, owner) DO NOTHING;";
    let result = sqlx::query(QUERY)
        .bind(view.tx_hash)
        .bind(view.log_index)
        .bind(&view.tx_type)
        .bind(view.owner)
        .bind(view.protocol)
        .bind(&view.symbol)
        .bind(view.from_address)
        .bind(view.to_address)
        .bind(view.raw_from)
        .bind(view.nonce)
        .bind(&view.value)
        .bind(view.block_number)
        .bind(view.block_time)
        .bind(&view.status)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_pending(
    ex: &mut PgConnection,
    tx_hash: Hash32,
    raw_from: Address,
    nonce: i64,
) -> sqlx::Result<Vec<TransactionView>> {
    const QUERY: &str = "\
        SELECT * FROM transaction_views
        WHERE tx_hash = $1 AND raw_from = $2 AND nonce = $3 AND status = 'PENDING';";
    sqlx::query_as(QUERY)
        .bind(tx_hash)
        .bind(raw_from)
        .bind(nonce)
        .fetch_all(ex)
        .await
}

pub async fn get_by_sender_nonce(
    ex: &mut PgConnection,
    raw_from: Address,
    nonce: i64,
) -> sqlx::Result<Vec<TransactionView>> {
    const QUERY: &str = "SELECT * FROM transaction_views WHERE raw_from = $1 AND nonce = $2;";
    sqlx::query_as(QUERY)
        .bind(raw_from)
        .bind(nonce)
        .fetch_all(ex)
        .await
}

pub async fn delete_pending(
    ex: &mut PgConnection,
    raw_from: Address,
    nonce: i64,
) -> sqlx::Result<()> {
    const QUERY: &str =
        "DELETE FROM transaction_views WHERE raw_from = $1 AND nonce = $2 AND status = 'PENDING';";
    sqlx::query(QUERY)
        .bind(raw_from)
        .bind(nonce)
        .execute(ex)
        .await?;
    Ok(())
}

/// Reorg recovery for the transaction journal (§4.3 "Fork handling"):
/// unlike the event tables, rows are deleted outright rather than marked
/// `forked`, since the journal has no forked-aware read path to filter
/// them back out.
pub async fn rollback_range(
    ex: &mut PgTransaction<'_>,
    fork_block: i64,
    detected_block: i64,
) -> sqlx::Result<()> {
    const QUERY: &str =
        "DELETE FROM transaction_views WHERE block_number > $1 AND block_number <= $2;";
    ex.execute(sqlx::query(QUERY).bind(fork_block).bind(detected_block))
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub owner: Option<Address>,
    pub symbol: Option<String>,
}

pub async fn page_query(
    ex: &mut PgConnection,
    filter: &PageFilter,
    offset: i64,
    limit: i64,
) -> sqlx::Result<Vec<TransactionView>> {
    const QUERY: &str = "\
        SELECT * FROM transaction_views
        WHERE ($1::bytea IS NULL OR owner = $1)
          AND ($2::text IS NULL OR symbol = $2)
        ORDER BY block_number DESC, log_index DESC
        OFFSET $3 LIMIT $4;";
    sqlx::query_as(QUERY)
        .bind(filter.owner)
        .bind(&filter.symbol)
        .bind(offset)
        .bind(limit)
        .fetch_all(ex)
        .await
}
