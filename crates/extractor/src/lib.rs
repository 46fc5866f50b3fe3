//! Ledgerscope Extractor
use std::{future::IntoFuture, time::Duration};

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    primitives::B256,
    providers::{Provider, RootProvider, ext::TraceApi},
    rpc::types::trace::parity::TraceType,
    transports::TransportResult,
};
use async_trait::async_trait;
use derive_more::Debug;
use eyre::Result;
use primitives::{
    IngestError,
    records::{BlockRecord, ReceiptRecord, ReplayMode, ReplayRecord, UncleRecord},
};
use tracing::debug;
use url::Url;

pub mod client;
mod convert;
mod transport;

pub use client::ChainClient;
pub use transport::TransportConfig;

/// Extractor client backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct Extractor {
    #[debug(skip)]
    provider: RootProvider,
    timeout: Duration,
}

impl Extractor {
    /// Create a new extractor. Every request is bounded by `timeout`.
    pub async fn new(rpc_url: Url, timeout: Duration, transport: TransportConfig) -> Result<Self> {
        let provider = transport::connect(rpc_url, transport).await?;
        Ok(Self { provider, timeout })
    }

    /// Latest block number known to the node.
    pub async fn latest_block_number(&self) -> Result<u64, IngestError> {
        self.timed("eth_blockNumber", self.provider.get_block_number())
            .await?
            .map_err(|err| convert::rpc_error("block number", err))
    }

    /// Run a request under the configured timeout. A timeout surfaces as
    /// [`IngestError::NodeUnavailable`]; transport errors are left to the caller to classify.
    async fn timed<F, T>(&self, method: &'static str, request: F) -> Result<TransportResult<T>, IngestError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        debug!(method, "Sending request");
        tokio::time::timeout(self.timeout, request).await.map_err(|_| {
            IngestError::NodeUnavailable(format!("{method} timed out after {:?}", self.timeout))
        })
    }
}

#[async_trait]
impl ChainClient for Extractor {
    async fn get_block(&self, number: u64) -> Result<BlockRecord, IngestError> {
        let request = self.provider.get_block_by_number(BlockNumberOrTag::Number(number)).full();
        let block = self
            .timed("eth_getBlockByNumber", request)
            .await?
            .map_err(|err| convert::rpc_error("block", err))?
            .ok_or(IngestError::BlockNotFound(number))?;

        convert::block_record(&block)
    }

    async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptRecord, IngestError> {
        let receipt = self
            .timed("eth_getTransactionReceipt", self.provider.get_transaction_receipt(tx_hash))
            .await?
            .map_err(|err| convert::rpc_error("receipt", err))?
            .ok_or(IngestError::TxNotFound(tx_hash))?;

        Ok(convert::receipt_record(&receipt))
    }

    async fn get_uncle(&self, block_number: u64, index: u64) -> Result<UncleRecord, IngestError> {
        let request = self.provider.get_uncle(BlockId::number(block_number), index);
        let uncle = self
            .timed("eth_getUncleByBlockNumberAndIndex", request)
            .await?
            .map_err(|err| convert::rpc_error("uncle", err))?
            .ok_or(IngestError::UncleNotFound { block_number, index })?;

        Ok(convert::uncle_record(&uncle))
    }

    async fn replay_block_transactions(
        &self,
        block_number: u64,
        modes: &[ReplayMode],
    ) -> Result<Vec<ReplayRecord>, IngestError> {
        let trace_types = modes.iter().map(|mode| match mode {
            ReplayMode::Trace => TraceType::Trace,
            ReplayMode::StateDiff => TraceType::StateDiff,
        });
        let request = self
            .provider
            .trace_replay_block_transactions(BlockId::number(block_number))
            .trace_types(trace_types);

        debug!(block_number, modes = %convert::mode_names(modes), "Replaying block transactions");
        let results = self
            .timed("trace_replayBlockTransactions", request)
            .await?
            .map_err(|err| convert::replay_error(modes, err))?;

        results.iter().map(|result| convert::replay_record(result, modes)).collect()
    }
}
