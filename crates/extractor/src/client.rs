//! The node capabilities the ingestion pipeline consumes.
use alloy::primitives::B256;
use async_trait::async_trait;
use primitives::{
    IngestError,
    records::{BlockRecord, ReceiptRecord, ReplayMode, ReplayRecord, UncleRecord},
};

/// Read access to a node, returning validated records.
///
/// Implementations apply their own timeouts. Any failure is reported as an [`IngestError`]
/// kind; nothing is retried at the record level.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a block with full transaction bodies.
    async fn get_block(&self, number: u64) -> Result<BlockRecord, IngestError>;

    /// Fetch the receipt of a mined transaction.
    async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptRecord, IngestError>;

    /// Fetch the uncle at `index` of the block `block_number`.
    ///
    /// Uncles are only addressable by position; there is no lookup by uncle hash.
    async fn get_uncle(&self, block_number: u64, index: u64) -> Result<UncleRecord, IngestError>;

    /// Replay all transactions of a block in the given modes.
    ///
    /// Element `i` of the result belongs to transaction `i` of the block.
    async fn replay_block_transactions(
        &self,
        block_number: u64,
        modes: &[ReplayMode],
    ) -> Result<Vec<ReplayRecord>, IngestError>;
}
