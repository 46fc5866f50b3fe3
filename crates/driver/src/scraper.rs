//! Sequential scrape of a closed block range, committing once per block.
use extractor::ChainClient;
use primitives::IngestError;
use tracing::{debug, info};

use crate::{
    ingestor::{ExtractionError, ingest_block},
    session::Session,
};

/// Progress of a range scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    /// Highest committed block, `None` when nothing was committed
    pub last_committed: Option<u64>,
    /// Number of committed blocks
    pub blocks_committed: u64,
}

impl ScrapeReport {
    /// Fold the progress of a later scrape into this one.
    pub fn extend(&mut self, later: Self) {
        if later.last_committed.is_some() {
            self.last_committed = later.last_committed;
        }
        self.blocks_committed += later.blocks_committed;
    }
}

/// Ingest and commit every block in `[start, end]`, ascending.
///
/// The first failing block aborts the scrape. Its staged entities are discarded, and every
/// block before it has already been committed, so the caller resumes at
/// [`ExtractionError::block_number`]. `start > end` is an empty range.
pub async fn scrape_range<C, S>(
    client: &C,
    session: &mut S,
    start: u64,
    end: u64,
) -> Result<ScrapeReport, ExtractionError>
where
    C: ChainClient + ?Sized,
    S: Session + ?Sized,
{
    let mut report = ScrapeReport::default();
    if start > end {
        debug!(start, end, "Empty block range");
        return Ok(report);
    }

    for block_number in start..=end {
        let summary = match ingest_block(client, session, block_number).await {
            Ok(summary) => summary,
            Err(err) => {
                session.discard();
                return Err(err);
            }
        };

        let entities = session.staged();
        if let Err(cause) = session.commit().await {
            session.discard();
            return Err(ExtractionError::new(block_number, storage_error(cause)));
        }

        info!(
            block_number,
            entities,
            transactions = summary.transactions,
            replay_calls = summary.replay_calls,
            "Committed block"
        );
        report.last_committed = Some(block_number);
        report.blocks_committed += 1;
    }

    Ok(report)
}

fn storage_error(cause: IngestError) -> IngestError {
    match cause {
        IngestError::Storage(_) => cause,
        other => IngestError::Storage(other.to_string()),
    }
}
