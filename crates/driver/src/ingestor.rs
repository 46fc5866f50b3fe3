//! Per-block extraction: fetch, convert and stage every entity of one block.
use alloy_primitives::B256;
use clickhouse::{
    BlockContext, BlockRow, Entity, LogRow, ReceiptRow, StateDiffRow, TraceRow, TransactionRow,
    TxContext, UncleRow,
};
use extractor::ChainClient;
use primitives::{
    IngestError,
    records::{ReplayMode, ReplayRecord},
};
use tracing::{debug, warn};

use crate::{session::Session, trace_mode::TraceMode};

/// Failure to ingest or commit a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("block {block_number}: {cause}")]
pub struct ExtractionError {
    /// Block that failed
    pub block_number: u64,
    /// What went wrong
    #[source]
    pub cause: IngestError,
}

impl ExtractionError {
    /// Attribute `cause` to `block_number`.
    pub const fn new(block_number: u64, cause: IngestError) -> Self {
        Self { block_number, cause }
    }

    /// Name of the error kind.
    pub const fn kind(&self) -> &'static str {
        self.cause.kind()
    }

    /// Whether resuming at the same block may succeed.
    pub const fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }
}

/// Entities staged and replay calls issued for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Ingested block
    pub block_number: u64,
    /// Transactions staged
    pub transactions: usize,
    /// Receipts staged
    pub receipts: usize,
    /// Logs staged
    pub logs: usize,
    /// Traces staged
    pub traces: usize,
    /// State diffs staged
    pub state_diffs: usize,
    /// Uncles staged
    pub uncles: usize,
    /// Replay RPC calls issued
    pub replay_calls: usize,
}

/// Stage every entity of `block_number` into `session` without committing.
///
/// Any failure aborts the block; entities staged before it are left in the session for the
/// caller to discard.
pub async fn ingest_block<C, S>(
    client: &C,
    session: &mut S,
    block_number: u64,
) -> Result<IngestSummary, ExtractionError>
where
    C: ChainClient + ?Sized,
    S: Session + ?Sized,
{
    ingest(client, session, block_number)
        .await
        .map_err(|cause| ExtractionError::new(block_number, cause))
}

async fn ingest<C, S>(client: &C, session: &mut S, block_number: u64) -> Result<IngestSummary, IngestError>
where
    C: ChainClient + ?Sized,
    S: Session + ?Sized,
{
    let block = client.get_block(block_number).await?;
    let ctx = BlockContext::new(&block)?;
    session.stage(Entity::Block(BlockRow::try_from((&block, &ctx))?));

    let settings = session.settings();
    let mut summary = IngestSummary { block_number, ..Default::default() };

    let mode = TraceMode::from_flags(settings.parse_trace, settings.parse_state_diff);
    let replays = if block.transactions.is_empty() {
        Vec::new()
    } else {
        replay(client, block_number, mode, settings.combined_replay, &mut summary).await?
    };
    if mode != TraceMode::None && replays.len() != block.transactions.len() {
        return Err(IngestError::malformed(
            "replay",
            format!(
                "{} replay results for {} transactions",
                replays.len(),
                block.transactions.len()
            ),
        ));
    }

    for (index, tx) in block.transactions.iter().enumerate() {
        let tx_ctx = TxContext::new(&ctx, tx.hash, index)?;
        session.stage(Entity::Transaction(TransactionRow::try_from((tx, &tx_ctx))?));
        summary.transactions += 1;

        let receipt = client.get_transaction_receipt(tx.hash).await?;
        session.stage(Entity::Receipt(ReceiptRow::try_from((&receipt, &tx_ctx))?));
        summary.receipts += 1;

        for (log_index, log) in receipt.logs.iter().enumerate() {
            session.stage(Entity::Log(LogRow::try_from((log, &tx_ctx, log_index))?));
            summary.logs += 1;
        }

        let Some(replay) = replays.get(index) else { continue };
        if replay.transaction_hash != tx.hash {
            return Err(IngestError::malformed(
                "replay",
                format!("replay {index} belongs to {}, expected {}", replay.transaction_hash, tx.hash),
            ));
        }

        if settings.parse_trace {
            let traces = replay.trace.as_ref().ok_or_else(|| missing_payload(ReplayMode::Trace, tx.hash))?;
            for (trace_index, trace) in traces.iter().enumerate() {
                session.stage(Entity::Trace(TraceRow::try_from((trace, &tx_ctx, trace_index))?));
                summary.traces += 1;
            }
        }

        if settings.parse_state_diff {
            let diffs = replay
                .state_diff
                .as_ref()
                .ok_or_else(|| missing_payload(ReplayMode::StateDiff, tx.hash))?;
            for diff in diffs {
                session.stage(Entity::StateDiff(StateDiffRow::try_from((diff, &tx_ctx))?));
                summary.state_diffs += 1;
            }
        }
    }

    for index in 0..block.uncles.len() as u64 {
        let uncle = client.get_uncle(block_number, index).await?;
        session.stage(Entity::Uncle(UncleRow::try_from((&uncle, &ctx, index))?));
        summary.uncles += 1;
    }

    debug!(
        block_number,
        transactions = summary.transactions,
        logs = summary.logs,
        traces = summary.traces,
        state_diffs = summary.state_diffs,
        uncles = summary.uncles,
        "Block staged"
    );
    Ok(summary)
}

fn missing_payload(mode: ReplayMode, tx_hash: B256) -> IngestError {
    IngestError::malformed("replay", format!("no {mode} payload for transaction {tx_hash}"))
}

/// Issue the replay calls `mode` needs.
///
/// A combined replay rejected with [`IngestError::UnsupportedMode`] is repeated as one call per
/// mode and the results are merged by position.
async fn replay<C>(
    client: &C,
    block_number: u64,
    mode: TraceMode,
    combined_replay: bool,
    summary: &mut IngestSummary,
) -> Result<Vec<ReplayRecord>, IngestError>
where
    C: ChainClient + ?Sized,
{
    match mode {
        TraceMode::None => Ok(Vec::new()),
        TraceMode::TraceOnly | TraceMode::StateDiffOnly => {
            summary.replay_calls += 1;
            client.replay_block_transactions(block_number, mode.modes()).await
        }
        TraceMode::Combined if combined_replay => {
            summary.replay_calls += 1;
            match client.replay_block_transactions(block_number, mode.modes()).await {
                Err(IngestError::UnsupportedMode(modes)) => {
                    warn!(block_number, modes = %modes, "Combined replay rejected, replaying per mode");
                    replay_separately(client, block_number, summary).await
                }
                result => result,
            }
        }
        TraceMode::Combined => replay_separately(client, block_number, summary).await,
    }
}

async fn replay_separately<C>(
    client: &C,
    block_number: u64,
    summary: &mut IngestSummary,
) -> Result<Vec<ReplayRecord>, IngestError>
where
    C: ChainClient + ?Sized,
{
    summary.replay_calls += 2;
    let traces = client.replay_block_transactions(block_number, &[ReplayMode::Trace]).await?;
    let diffs = client.replay_block_transactions(block_number, &[ReplayMode::StateDiff]).await?;

    if traces.len() != diffs.len() {
        return Err(IngestError::malformed(
            "replay",
            format!("{} trace results but {} state diff results", traces.len(), diffs.len()),
        ));
    }

    traces
        .into_iter()
        .zip(diffs)
        .map(|(trace, diff)| {
            if trace.transaction_hash == diff.transaction_hash {
                Ok(trace.merge(diff))
            } else {
                Err(IngestError::malformed(
                    "replay",
                    format!(
                        "trace for {} paired with state diff for {}",
                        trace.transaction_hash, diff.transaction_hash
                    ),
                ))
            }
        })
        .collect()
}
