//! Ledgerscope configuration
use std::time::Duration;

use clap::Parser;
use primitives::retries::ScrapeBackoff;
use url::Url;

/// Clickhouse database configuration options
#[derive(Debug, Clone, Parser)]
pub struct ClickhouseOpts {
    /// Clickhouse URL
    #[clap(long = "clickhouse-url", env = "CLICKHOUSE_URL")]
    pub url: Url,
    /// Clickhouse database
    #[clap(long = "clickhouse-db", env = "CLICKHOUSE_DB", default_value = "ledgerscope")]
    pub db: String,
    /// Clickhouse username
    #[clap(long = "clickhouse-username", env = "CLICKHOUSE_USERNAME", default_value = "default")]
    pub username: String,
    /// Clickhouse password
    #[clap(long = "clickhouse-password", env = "CLICKHOUSE_PASSWORD", default_value = "")]
    pub password: String,
}

/// Node RPC configuration options
#[derive(Debug, Clone, Parser)]
pub struct RpcOpts {
    /// Node RPC URL. `ws://` and `wss://` use a websocket transport, anything else HTTP.
    #[clap(long = "rpc-url", env = "RPC_URL")]
    pub rpc_url: Url,
    /// Timeout applied to every RPC call, in seconds
    #[clap(long = "rpc-timeout-secs", env = "RPC_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
    /// Transport-level retries for rate limited or refused requests
    #[clap(long = "rpc-max-retries", env = "RPC_MAX_RETRIES", default_value = "9")]
    pub max_retries: u32,
    /// Initial transport retry backoff in milliseconds
    #[clap(long = "rpc-initial-backoff-ms", env = "RPC_INITIAL_BACKOFF_MS", default_value = "100")]
    pub initial_backoff_ms: u64,
    /// Compute units per second budget of the node provider
    #[clap(
        long = "rpc-compute-units-per-sec",
        env = "RPC_COMPUTE_UNITS_PER_SEC",
        default_value = "330"
    )]
    pub compute_units_per_sec: u64,
}

impl RpcOpts {
    /// Per-call RPC timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Block range and extraction options
#[derive(Debug, Clone, Parser)]
pub struct ScrapeOpts {
    /// First block to scrape (inclusive)
    #[clap(long, env = "START_BLOCK", default_value = "0")]
    pub start_block: u64,
    /// Last block to scrape (inclusive). Defaults to the node's latest block.
    #[clap(long, env = "END_BLOCK")]
    pub end_block: Option<u64>,
    /// Replay transactions and store call traces
    #[clap(long, env = "PARSE_TRACE")]
    pub parse_trace: bool,
    /// Replay transactions and store state diffs
    #[clap(long, env = "PARSE_STATE_DIFF")]
    pub parse_state_diff: bool,
    /// Always issue one replay call per mode instead of a single combined call
    #[clap(long, env = "NO_COMBINED_REPLAY")]
    pub no_combined_replay: bool,
    /// Continue after the last block recorded in the cursor store
    #[clap(long, env = "RESUME")]
    pub resume: bool,
    /// Name under which committed blocks are recorded in the cursor store
    #[clap(long, env = "CURSOR_NAME", default_value = "default")]
    pub cursor_name: String,
    /// Attempts before a transient failure aborts the scrape
    #[clap(long, env = "MAX_SCRAPE_ATTEMPTS", default_value = "5")]
    pub max_scrape_attempts: usize,
    /// Delay before the first resumed attempt, in milliseconds
    #[clap(long, env = "SCRAPE_BACKOFF_MS", default_value = "1000")]
    pub scrape_backoff_ms: u64,
}

impl ScrapeOpts {
    /// Backoff applied between resumed attempts
    pub fn backoff(&self) -> ScrapeBackoff {
        ScrapeBackoff {
            max_attempts: self.max_scrape_attempts.max(1),
            initial_backoff_ms: self.scrape_backoff_ms,
            ..Default::default()
        }
    }
}

/// CLI options for ledgerscope
#[derive(Debug, Clone, Parser)]
#[clap(name = "ledgerscope", about = "Index chain blocks into ClickHouse")]
pub struct Opts {
    /// Clickhouse database configuration
    #[clap(flatten)]
    pub clickhouse: ClickhouseOpts,

    /// Node RPC configuration
    #[clap(flatten)]
    pub rpc: RpcOpts,

    /// Scrape configuration
    #[clap(flatten)]
    pub scrape: ScrapeOpts,

    /// If set, drop & re-create all tables (local/dev only)
    #[clap(long, conflicts_with = "skip_migrations")]
    pub reset_db: bool,

    /// If set, skip database migrations
    #[clap(long, env = "SKIP_MIGRATIONS")]
    pub skip_migrations: bool,
}
