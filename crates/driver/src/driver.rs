//! Ledgerscope Driver - wires the extractor, the `ClickHouse` session and the range scraper

use clickhouse::ClickhouseWriter;
use config::Opts;
use extractor::{ChainClient, Extractor, TransportConfig};
use eyre::{Context, Result};
use primitives::retries::ScrapeBackoff;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    ingestor::ExtractionError,
    scraper::{ScrapeReport, scrape_range},
    session::{ClickhouseSession, ScrapeSettings, Session},
};

/// First block to scrape given the configured start and the cursor store.
///
/// A cursor at or past `start_block` moves the start to the block after it.
pub fn resume_start(start_block: u64, cursor: Option<u64>) -> u64 {
    match cursor {
        Some(committed) if committed >= start_block => committed.saturating_add(1),
        _ => start_block,
    }
}

/// Run [`scrape_range`] and resume it after transient failures.
///
/// Each resumed attempt starts at the failing block and waits for the next delay of `backoff`.
/// The delays restart whenever an attempt committed at least one block. Non-transient failures
/// and exhausted delays return the error.
pub async fn scrape_with_retry<C, S>(
    client: &C,
    session: &mut S,
    start: u64,
    end: u64,
    backoff: &ScrapeBackoff,
) -> Result<ScrapeReport, ExtractionError>
where
    C: ChainClient + ?Sized,
    S: Session + ?Sized,
{
    let mut report = ScrapeReport::default();
    let mut next = start;
    let mut delays = backoff.delays();

    loop {
        let err = match scrape_range(client, session, next, end).await {
            Ok(attempt) => {
                report.extend(attempt);
                return Ok(report);
            }
            Err(err) => err,
        };

        if err.block_number > next {
            report.extend(ScrapeReport {
                last_committed: Some(err.block_number - 1),
                blocks_committed: err.block_number - next,
            });
            delays = backoff.delays();
        }

        if !err.is_transient() {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            return Err(err);
        };

        warn!(
            block_number = err.block_number,
            kind = err.kind(),
            err = %err.cause,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, resuming scrape"
        );
        sleep(delay).await;
        next = err.block_number;
    }
}

/// Driver running one scrape from configuration to completion
#[derive(Debug)]
pub struct Driver {
    extractor: Extractor,
    writer: ClickhouseWriter,
    session: ClickhouseSession,
    start_block: u64,
    end_block: Option<u64>,
    resume: bool,
    cursor_name: String,
    backoff: ScrapeBackoff,
}

impl Driver {
    /// Create a new driver with the given configuration
    pub async fn new(opts: Opts) -> Result<Self> {
        info!("Initializing driver");

        if opts.clickhouse.db.is_empty() {
            return Err(eyre::eyre!("ClickHouse database name is required"));
        }
        if opts.scrape.cursor_name.is_empty() {
            return Err(eyre::eyre!("Cursor name must not be empty"));
        }

        let transport = TransportConfig {
            max_retries: opts.rpc.max_retries,
            initial_backoff_ms: opts.rpc.initial_backoff_ms,
            compute_units_per_sec: opts.rpc.compute_units_per_sec,
        };
        let extractor = Extractor::new(opts.rpc.rpc_url.clone(), opts.rpc.timeout(), transport)
            .await
            .wrap_err("Failed to initialize blockchain extractor")?;

        let writer = ClickhouseWriter::new(
            opts.clickhouse.url.clone(),
            opts.clickhouse.db.clone(),
            opts.clickhouse.username.clone(),
            opts.clickhouse.password.clone(),
        )?;

        if opts.skip_migrations {
            info!("Skipping database migrations");
        } else {
            info!("Running database migrations");
            writer.init_db(opts.reset_db).await.wrap_err("Database migrations failed")?;
            info!("Database migrations completed");
        }

        let settings = ScrapeSettings {
            parse_trace: opts.scrape.parse_trace,
            parse_state_diff: opts.scrape.parse_state_diff,
            combined_replay: !opts.scrape.no_combined_replay,
        };
        let session =
            ClickhouseSession::new(writer.clone(), opts.scrape.cursor_name.clone(), settings);

        Ok(Self {
            extractor,
            writer,
            session,
            start_block: opts.scrape.start_block,
            end_block: opts.scrape.end_block,
            resume: opts.scrape.resume,
            backoff: opts.scrape.backoff(),
            cursor_name: opts.scrape.cursor_name,
        })
    }

    /// Block range to scrape
    async fn resolve_range(&self) -> Result<(u64, u64)> {
        let end = match self.end_block {
            Some(end) => end,
            None => self
                .extractor
                .latest_block_number()
                .await
                .wrap_err("Failed to fetch latest block number")?,
        };

        let start = if self.resume {
            let cursor = self
                .writer
                .last_committed_block(&self.cursor_name)
                .await
                .wrap_err("Failed to read scrape cursor")?;
            let start = resume_start(self.start_block, cursor);
            info!(cursor = ?cursor, start, "Resuming from cursor");
            start
        } else {
            self.start_block
        };

        Ok((start, end))
    }

    /// Scrape the configured range
    pub async fn start(mut self) -> Result<ScrapeReport> {
        let (start, end) = self.resolve_range().await?;
        let settings = self.session.settings();
        info!(
            start,
            end,
            parse_trace = settings.parse_trace,
            parse_state_diff = settings.parse_state_diff,
            cursor = %self.cursor_name,
            "Starting scrape"
        );

        match scrape_with_retry(&self.extractor, &mut self.session, start, end, &self.backoff).await
        {
            Ok(report) => {
                info!(
                    last_committed = ?report.last_committed,
                    blocks = report.blocks_committed,
                    "Scrape completed"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    block_number = err.block_number,
                    kind = err.kind(),
                    err = %err.cause,
                    "Scrape halted"
                );
                Err(err.into())
            }
        }
    }
}
