use {
    primitive_types::H160,
    std::{net::SocketAddr, time::Duration},
    url::Url,
};

fn duration_from_seconds(s: &str) -> Result<Duration, std::num::ParseIntError> {
    Ok(Duration::from_secs(s.parse()?))
}

#[derive(clap::Parser)]
pub struct Arguments {
    /// JSON-RPC endpoint of the upstream node.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub rpc_url: Url,

    /// Url of the Postgres database.
    #[clap(long, env, default_value = "postgresql://")]
    pub db_url: Url,

    #[clap(long, env, default_value = "0.0.0.0:9588")]
    pub metrics_address: SocketAddr,

    /// Block the extractor resumes at on a cold start.
    #[clap(long, env, default_value = "0")]
    pub start_block: u64,

    /// Number of confirmations the extractor waits for behind the chain tip
    /// before processing a block (§4.4).
    #[clap(long, env, default_value = "12")]
    pub confirms: u64,

    /// How often the pending-transaction pool is polled.
    #[clap(long, env, default_value = "2", value_parser = duration_from_seconds)]
    pub pending_poll_interval: Duration,

    /// Addresses of the protocol contracts the ABI processor gates
    /// `RingMined`/`OrderCancelled`/`CutoffAll`/`CutoffPair` and
    /// `submitRing`/`cancelOrder`/`cancelAllOrders*` against (§4.1).
    #[clap(long, env, use_value_delimiter = true)]
    pub protocols: Vec<H160>,

    /// Addresses authorized to move user tokens on `approve`/`Approval`
    /// (Glossary "Delegate").
    #[clap(long, env, use_value_delimiter = true)]
    pub delegates: Vec<H160>,

    /// Numerator of the dust-order-value threshold, in legal-currency units
    /// (§4.2.1 `settle`).
    #[clap(long, env, default_value = "1")]
    pub dust_floor_numerator: u64,

    /// Denominator of the dust-order-value threshold.
    #[clap(long, env, default_value = "100")]
    pub dust_floor_denominator: u64,

    /// TTL of a cached balance/allowance entry before it is treated as
    /// stale even without an invalidating event (§4.6).
    #[clap(long, env, default_value = "30", value_parser = duration_from_seconds)]
    pub account_cache_ttl: Duration,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "rpc_url: {}", self.rpc_url)?;
        writeln!(f, "db_url: SECRET")?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "start_block: {}", self.start_block)?;
        writeln!(f, "confirms: {}", self.confirms)?;
        writeln!(f, "pending_poll_interval: {:?}", self.pending_poll_interval)?;
        writeln!(f, "protocols: {:?}", self.protocols)?;
        writeln!(f, "delegates: {:?}", self.delegates)?;
        writeln!(
            f,
            "dust_floor: {}/{}",
            self.dust_floor_numerator, self.dust_floor_denominator
        )?;
        writeln!(f, "account_cache_ttl: {:?}", self.account_cache_ttl)?;
        Ok(())
    }
}
