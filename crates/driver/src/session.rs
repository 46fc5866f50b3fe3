//! Unit of work that buffers one block's entities until commit.
use async_trait::async_trait;
use clickhouse::{
    BlockRow, ClickhouseWriter, Entity, LogRow, ReceiptRow, StateDiffRow, TraceRow,
    TransactionRow, UncleRow,
};
use derive_more::Debug;
use primitives::IngestError;
use tracing::debug;

/// Extraction flags read once per block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Stage call traces
    pub parse_trace: bool,
    /// Stage state diffs
    pub parse_state_diff: bool,
    /// Request both replay modes in one call when both flags are set
    pub combined_replay: bool,
}

/// Pending entities plus the atomic flush that makes them durable.
///
/// Everything staged since the last `commit` or `discard` is one unit: `commit` persists all
/// of it or reports [`IngestError::Storage`].
#[async_trait]
pub trait Session: Send {
    /// Flags consumed by the ingestor.
    fn settings(&self) -> ScrapeSettings;

    /// Append an entity to the pending buffer.
    fn stage(&mut self, entity: Entity);

    /// Number of pending entities.
    fn staged(&self) -> usize;

    /// Flush the pending buffer as one unit and clear it.
    async fn commit(&mut self) -> Result<(), IngestError>;

    /// Drop the pending buffer.
    fn discard(&mut self);
}

/// Staged entities grouped by table.
#[derive(Debug, Default)]
struct TableBatches {
    blocks: Vec<BlockRow>,
    transactions: Vec<TransactionRow>,
    receipts: Vec<ReceiptRow>,
    logs: Vec<LogRow>,
    uncles: Vec<UncleRow>,
    traces: Vec<TraceRow>,
    state_diffs: Vec<StateDiffRow>,
}

impl TableBatches {
    fn push(&mut self, entity: Entity) {
        match entity {
            Entity::Block(row) => self.blocks.push(row),
            Entity::Transaction(row) => self.transactions.push(row),
            Entity::Receipt(row) => self.receipts.push(row),
            Entity::Log(row) => self.logs.push(row),
            Entity::Uncle(row) => self.uncles.push(row),
            Entity::Trace(row) => self.traces.push(row),
            Entity::StateDiff(row) => self.state_diffs.push(row),
        }
    }
}

impl FromIterator<Entity> for TableBatches {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut batches = Self::default();
        for entity in iter {
            batches.push(entity);
        }
        batches
    }
}

/// [`Session`] persisting to `ClickHouse`.
///
/// A commit issues one INSERT per non-empty child table, then the `blocks` INSERT, then records
/// the highest staged block in the cursor table. Tables replace rows by natural key, so a commit that fails partway is
/// repaired by re-ingesting the block; the cursor never points past it.
#[derive(Debug)]
pub struct ClickhouseSession {
    writer: ClickhouseWriter,
    cursor_name: String,
    settings: ScrapeSettings,
    #[debug(skip)]
    pending: Vec<Entity>,
}

impl ClickhouseSession {
    /// Create a session writing through `writer` and recording progress under `cursor_name`.
    pub const fn new(writer: ClickhouseWriter, cursor_name: String, settings: ScrapeSettings) -> Self {
        Self { writer, cursor_name, settings, pending: Vec::new() }
    }

    async fn flush(&self, batches: &TableBatches, block_number: u64) -> eyre::Result<()> {
        self.writer.insert_rows("transactions", &batches.transactions).await?;
        self.writer.insert_rows("receipts", &batches.receipts).await?;
        self.writer.insert_rows("logs", &batches.logs).await?;
        self.writer.insert_rows("uncles", &batches.uncles).await?;
        self.writer.insert_rows("traces", &batches.traces).await?;
        self.writer.insert_rows("state_diffs", &batches.state_diffs).await?;
        // Block rows only become visible once their children are stored.
        self.writer.insert_rows("blocks", &batches.blocks).await?;
        self.writer.record_cursor(&self.cursor_name, block_number).await
    }
}

#[async_trait]
impl Session for ClickhouseSession {
    fn settings(&self) -> ScrapeSettings {
        self.settings
    }

    fn stage(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    fn staged(&self) -> usize {
        self.pending.len()
    }

    async fn commit(&mut self) -> Result<(), IngestError> {
        let pending = std::mem::take(&mut self.pending);
        let Some(block_number) = pending.iter().map(Entity::block_number).max() else {
            return Ok(());
        };

        let entities = pending.len();
        let batches: TableBatches = pending.into_iter().collect();
        self.flush(&batches, block_number)
            .await
            .map_err(|err| IngestError::Storage(format!("{err:#}")))?;

        debug!(block_number, entities, "Session committed");
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clickhouse::CursorRow;
    use clickhouse_rs::test::{self, Mock, handlers};
    use url::Url;

    use crate::test_utils::{block_row, log_row};

    fn session(mock: &Mock) -> ClickhouseSession {
        let url = Url::parse(mock.url()).unwrap();
        let writer =
            ClickhouseWriter::new(url, "db".to_owned(), "user".into(), "pass".into()).unwrap();
        ClickhouseSession::new(writer, "mainnet".to_owned(), ScrapeSettings::default())
    }

    #[tokio::test]
    async fn commit_inserts_children_then_block_then_cursor() {
        let mock = Mock::new();
        let logs = mock.add(handlers::record::<LogRow>());
        let blocks = mock.add(handlers::record::<BlockRow>());
        let cursor = mock.add(handlers::record::<CursorRow>());

        let mut session = session(&mock);
        session.stage(Entity::Block(block_row(7)));
        session.stage(Entity::Log(log_row(7, 0, 0)));
        session.stage(Entity::Log(log_row(7, 0, 1)));
        assert_eq!(session.staged(), 3);

        session.commit().await.unwrap();
        assert_eq!(session.staged(), 0);

        let blocks: Vec<BlockRow> = blocks.collect().await;
        assert_eq!(blocks, vec![block_row(7)]);
        let logs: Vec<LogRow> = logs.collect().await;
        assert_eq!(logs.iter().map(|row| row.log_index).collect::<Vec<_>>(), vec![0, 1]);
        let cursor: Vec<CursorRow> = cursor.collect().await;
        assert_eq!(cursor, vec![CursorRow { name: "mainnet".to_owned(), block_number: 7 }]);
    }

    #[tokio::test]
    async fn failed_insert_is_a_storage_error() {
        let mock = Mock::new();
        mock.add(handlers::failure(test::status::INTERNAL_SERVER_ERROR));

        let mut session = session(&mock);
        session.stage(Entity::Block(block_row(7)));

        let err = session.commit().await.unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(session.staged(), 0);
    }

    #[tokio::test]
    async fn failed_child_insert_writes_no_block_row() {
        let mock = Mock::new();
        mock.add(handlers::failure(test::status::INTERNAL_SERVER_ERROR));
        let blocks = mock.add(handlers::record::<BlockRow>());

        let mut session = session(&mock);
        session.stage(Entity::Block(block_row(7)));
        session.stage(Entity::Log(log_row(7, 0, 0)));

        let err = session.commit().await.unwrap_err();
        let IngestError::Storage(message) = err else { panic!("expected a storage error") };
        assert!(message.contains("logs"));

        // The next request is served by the block recorder, so nothing was written before it.
        session.stage(Entity::Block(block_row(8)));
        let cursor = mock.add(handlers::record::<CursorRow>());
        session.commit().await.unwrap();
        let rows: Vec<BlockRow> = blocks.collect().await;
        assert_eq!(rows, vec![block_row(8)]);
        let cursor: Vec<CursorRow> = cursor.collect().await;
        assert_eq!(cursor, vec![CursorRow { name: "mainnet".to_owned(), block_number: 8 }]);
    }

    #[tokio::test]
    async fn empty_commit_is_a_no_op() {
        let mock = Mock::new();
        let mut session = session(&mock);
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn discard_drops_pending_entities() {
        let mock = Mock::new();
        let mut session = session(&mock);
        session.stage(Entity::Block(block_row(1)));
        session.discard();
        assert_eq!(session.staged(), 0);
    }
}
