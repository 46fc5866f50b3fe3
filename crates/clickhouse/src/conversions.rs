//! Mappings from validated records to table rows.
//!
//! Every conversion is pure. Contextual keys come from [`BlockContext`] and [`TxContext`], so the
//! block timestamp is formatted once and shared by all rows of the block.
use std::convert::TryFrom;

use alloy_primitives::{Address, B256, Bytes};
use chrono::{DateTime, Utc};
use hex::encode;
use primitives::{
    IngestError,
    records::{
        AccountDiffRecord, BlockRecord, LogRecord, ReceiptRecord, TraceAction, TraceOutcome,
        TraceRecord, TransactionRecord, UncleRecord,
    },
};

use crate::models::{
    BlockRow, LogRow, ReceiptRow, StateDiffRow, TraceRow, TransactionRow, UncleRow,
};

/// Format used for the ISO-8601 timestamp column.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Maximum number of topics a log may carry.
const MAX_TOPICS: usize = 4;

/// Convert a unix timestamp into `YYYY-MM-DDTHH:MM:SS` (UTC).
pub fn iso_timestamp(epoch_secs: u64) -> Result<String, IngestError> {
    let secs = i64::try_from(epoch_secs)
        .map_err(|_| IngestError::malformed("block", format!("timestamp {epoch_secs} overflows")))?;
    let datetime = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
        IngestError::malformed("block", format!("timestamp {epoch_secs} is out of range"))
    })?;
    Ok(datetime.format(ISO_FORMAT).to_string())
}

/// Keys shared by every row of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    /// Block being ingested
    pub block_number: u64,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

impl BlockContext {
    /// Derive the context of `block`, formatting its timestamp.
    pub fn new(block: &BlockRecord) -> Result<Self, IngestError> {
        Ok(Self { block_number: block.number, timestamp: iso_timestamp(block.timestamp)? })
    }
}

/// Keys shared by the rows derived from one transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    /// Owning block
    pub block: &'a BlockContext,
    /// Owning transaction
    pub transaction_hash: B256,
    /// Position of the transaction in the block
    pub transaction_index: u32,
}

impl<'a> TxContext<'a> {
    /// Context for the transaction at `index` of the block.
    pub fn new(
        block: &'a BlockContext,
        transaction_hash: B256,
        index: usize,
    ) -> Result<Self, IngestError> {
        Ok(Self { block, transaction_hash, transaction_index: column_index("transaction", index)? })
    }
}

fn column_index(kind: &'static str, index: usize) -> Result<u32, IngestError> {
    u32::try_from(index)
        .map_err(|_| IngestError::malformed(kind, format!("index {index} overflows UInt32")))
}

fn hex_string(bytes: &Bytes) -> String {
    format!("0x{}", encode(bytes))
}

fn address_bytes(address: Address) -> [u8; 20] {
    address.into_array()
}

impl TryFrom<(&BlockRecord, &BlockContext)> for BlockRow {
    type Error = IngestError;

    fn try_from(input: (&BlockRecord, &BlockContext)) -> Result<Self, Self::Error> {
        let (block, ctx) = input;
        if block.number != ctx.block_number {
            return Err(IngestError::malformed(
                "block",
                format!("node returned block {} for {}", block.number, ctx.block_number),
            ));
        }

        Ok(Self {
            block_number: block.number,
            block_hash: block.hash.0,
            parent_hash: block.parent_hash.0,
            miner: address_bytes(block.miner),
            difficulty: block.difficulty.to_string(),
            gas_limit: block.gas_limit,
            gas_used: block.gas_used,
            base_fee_per_gas: block.base_fee_per_gas,
            extra_data: hex_string(&block.extra_data),
            sha3_uncles: block.sha3_uncles.0,
            transaction_count: column_index("block", block.transactions.len())?,
            uncle_count: column_index("block", block.uncles.len())?,
            block_ts: block.timestamp,
            timestamp: ctx.timestamp.clone(),
        })
    }
}

impl TryFrom<(&TransactionRecord, &TxContext<'_>)> for TransactionRow {
    type Error = IngestError;

    fn try_from(input: (&TransactionRecord, &TxContext<'_>)) -> Result<Self, Self::Error> {
        let (tx, ctx) = input;
        if tx.hash != ctx.transaction_hash {
            return Err(IngestError::malformed(
                "transaction",
                format!("hash {} does not match {}", tx.hash, ctx.transaction_hash),
            ));
        }

        Ok(Self {
            transaction_hash: tx.hash.0,
            block_number: ctx.block.block_number,
            transaction_index: ctx.transaction_index,
            nonce: tx.nonce,
            sender: address_bytes(tx.from),
            receiver: tx.to.map(address_bytes),
            value_wei: tx.value.to_string(),
            start_gas: tx.gas,
            gas_price: tx.gas_price,
            data: hex_string(&tx.input),
            timestamp: ctx.block.timestamp.clone(),
        })
    }
}

impl TryFrom<(&ReceiptRecord, &TxContext<'_>)> for ReceiptRow {
    type Error = IngestError;

    fn try_from(input: (&ReceiptRecord, &TxContext<'_>)) -> Result<Self, Self::Error> {
        let (receipt, ctx) = input;
        if receipt.transaction_hash != ctx.transaction_hash {
            return Err(IngestError::malformed(
                "receipt",
                format!(
                    "receipt for {} returned for transaction {}",
                    receipt.transaction_hash, ctx.transaction_hash
                ),
            ));
        }

        Ok(Self {
            transaction_hash: receipt.transaction_hash.0,
            block_number: ctx.block.block_number,
            transaction_index: ctx.transaction_index,
            status: u8::from(receipt.status),
            gas_used: receipt.gas_used,
            cumulative_gas_used: receipt.cumulative_gas_used,
            effective_gas_price: receipt.effective_gas_price,
            contract_address: receipt.contract_address.map(address_bytes),
            timestamp: ctx.block.timestamp.clone(),
        })
    }
}

impl TryFrom<(&LogRecord, &TxContext<'_>, usize)> for LogRow {
    type Error = IngestError;

    fn try_from(input: (&LogRecord, &TxContext<'_>, usize)) -> Result<Self, Self::Error> {
        let (log, ctx, log_index) = input;
        if log.topics.len() > MAX_TOPICS {
            return Err(IngestError::malformed(
                "log",
                format!("log {log_index} of {} has {} topics", ctx.transaction_hash, log.topics.len()),
            ));
        }

        Ok(Self {
            transaction_hash: ctx.transaction_hash.0,
            block_number: ctx.block.block_number,
            transaction_index: ctx.transaction_index,
            log_index: column_index("log", log_index)?,
            address: address_bytes(log.address),
            topics: log.topics.iter().map(|topic| topic.0).collect(),
            // Bounded by MAX_TOPICS above.
            topics_count: log.topics.len() as u8,
            data: hex_string(&log.data),
            timestamp: ctx.block.timestamp.clone(),
        })
    }
}

impl TryFrom<(&UncleRecord, &BlockContext, u64)> for UncleRow {
    type Error = IngestError;

    fn try_from(input: (&UncleRecord, &BlockContext, u64)) -> Result<Self, Self::Error> {
        let (uncle, ctx, index) = input;
        let uncle_index = u32::try_from(index).map_err(|_| {
            IngestError::malformed("uncle", format!("index {index} overflows UInt32"))
        })?;

        Ok(Self {
            current_block_number: ctx.block_number,
            uncle_index,
            uncle_hash: uncle.hash.0,
            uncle_block_number: uncle.number,
            parent_hash: uncle.parent_hash.0,
            miner: address_bytes(uncle.miner),
            difficulty: uncle.difficulty.to_string(),
            gas_limit: uncle.gas_limit,
            gas_used: uncle.gas_used,
            extra_data: hex_string(&uncle.extra_data),
            sha3_uncles: uncle.sha3_uncles.0,
            block_ts: uncle.timestamp,
            timestamp: ctx.timestamp.clone(),
        })
    }
}

impl TryFrom<(&TraceRecord, &TxContext<'_>, usize)> for TraceRow {
    type Error = IngestError;

    fn try_from(input: (&TraceRecord, &TxContext<'_>, usize)) -> Result<Self, Self::Error> {
        let (trace, ctx, trace_index) = input;

        let mut row = Self {
            transaction_hash: ctx.transaction_hash.0,
            block_number: ctx.block.block_number,
            transaction_index: ctx.transaction_index,
            trace_index: column_index("trace", trace_index)?,
            trace_type: trace.action.kind().to_owned(),
            call_type: None,
            trace_address: trace.trace_address.clone(),
            subtraces: trace.subtraces,
            sender: None,
            receiver: None,
            value_wei: String::new(),
            start_gas: None,
            input_data: None,
            gas_used: None,
            contract_address: None,
            output: None,
            error: trace.error.clone(),
            timestamp: ctx.block.timestamp.clone(),
        };

        match &trace.action {
            TraceAction::Call { call_type, from, to, value, gas, input } => {
                row.call_type = Some(call_type.clone());
                row.sender = Some(address_bytes(*from));
                row.receiver = Some(address_bytes(*to));
                row.value_wei = value.to_string();
                row.start_gas = Some(*gas);
                row.input_data = Some(hex_string(input));
            }
            TraceAction::Create { from, value, gas, init } => {
                row.sender = Some(address_bytes(*from));
                row.value_wei = value.to_string();
                row.start_gas = Some(*gas);
                row.input_data = Some(hex_string(init));
            }
            TraceAction::Selfdestruct { address, refund_address, balance } => {
                row.sender = Some(address_bytes(*address));
                row.receiver = Some(address_bytes(*refund_address));
                row.value_wei = balance.to_string();
            }
            TraceAction::Reward { author, value, reward_type } => {
                row.call_type = Some(reward_type.clone());
                row.receiver = Some(address_bytes(*author));
                row.value_wei = value.to_string();
            }
        }

        match &trace.outcome {
            Some(TraceOutcome::Call { gas_used, output }) => {
                if !matches!(trace.action, TraceAction::Call { .. }) {
                    return Err(IngestError::malformed(
                        "trace",
                        format!("call result on a {} trace", trace.action.kind()),
                    ));
                }
                row.gas_used = Some(*gas_used);
                row.output = Some(hex_string(output));
            }
            Some(TraceOutcome::Create { gas_used, address, code }) => {
                if !matches!(trace.action, TraceAction::Create { .. }) {
                    return Err(IngestError::malformed(
                        "trace",
                        format!("create result on a {} trace", trace.action.kind()),
                    ));
                }
                row.gas_used = Some(*gas_used);
                row.contract_address = Some(address_bytes(*address));
                row.output = Some(hex_string(code));
            }
            None => {}
        }

        Ok(row)
    }
}

impl TryFrom<(&AccountDiffRecord, &TxContext<'_>)> for StateDiffRow {
    type Error = IngestError;

    fn try_from(input: (&AccountDiffRecord, &TxContext<'_>)) -> Result<Self, Self::Error> {
        let (diff, ctx) = input;
        if diff.storage.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(IngestError::malformed(
                "state_diff",
                format!("storage of {} is not strictly ordered by slot", diff.address),
            ));
        }

        let balance = diff.balance.clone().map(|balance| balance.to_string());
        let code = diff.code.clone().map(|code| hex_string(&code));

        Ok(Self {
            transaction_hash: ctx.transaction_hash.0,
            block_number: ctx.block.block_number,
            transaction_index: ctx.transaction_index,
            address: address_bytes(diff.address),
            balance_from: balance.before,
            balance_to: balance.after,
            nonce_from: diff.nonce.before,
            nonce_to: diff.nonce.after,
            code_from: code.before,
            code_to: code.after,
            storage_keys: diff.storage.iter().map(|(slot, _)| slot.0).collect(),
            storage_from: diff.storage.iter().map(|(_, change)| change.before.map(|v| v.0)).collect(),
            storage_to: diff.storage.iter().map(|(_, change)| change.after.map(|v| v.0)).collect(),
            timestamp: ctx.block.timestamp.clone(),
        })
    }
}
