use clickhouse::Row;
use serde::{Deserialize, Serialize};

/// Block row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRow {
    /// Block number
    pub block_number: u64,
    /// Block hash
    pub block_hash: [u8; 32],
    /// Parent hash
    pub parent_hash: [u8; 32],
    /// Miner address
    pub miner: [u8; 20],
    /// Difficulty as a decimal string
    pub difficulty: String,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used
    pub gas_used: u64,
    /// Base fee per gas
    pub base_fee_per_gas: Option<u64>,
    /// Extra data, 0x-prefixed hex
    pub extra_data: String,
    /// Ommers hash
    pub sha3_uncles: [u8; 32],
    /// Number of transactions
    pub transaction_count: u32,
    /// Number of uncles
    pub uncle_count: u32,
    /// Block timestamp
    pub block_ts: u64,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// Transaction row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRow {
    /// Transaction hash
    pub transaction_hash: [u8; 32],
    /// Block number
    pub block_number: u64,
    /// Position in the block
    pub transaction_index: u32,
    /// Sender nonce
    pub nonce: u64,
    /// Sender
    pub sender: [u8; 20],
    /// Recipient, null for contract creations
    pub receiver: Option<[u8; 20]>,
    /// Value in wei as a decimal string
    pub value_wei: String,
    /// Gas limit
    pub start_gas: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Calldata, 0x-prefixed hex
    pub data: String,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// Receipt row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptRow {
    /// Transaction hash
    pub transaction_hash: [u8; 32],
    /// Block number
    pub block_number: u64,
    /// Position in the block
    pub transaction_index: u32,
    /// 1 on success, 0 on failure
    pub status: u8,
    /// Gas used
    pub gas_used: u64,
    /// Cumulative gas used
    pub cumulative_gas_used: u64,
    /// Effective gas price in wei
    pub effective_gas_price: u128,
    /// Created contract
    pub contract_address: Option<[u8; 20]>,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// Log row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRow {
    /// Transaction hash
    pub transaction_hash: [u8; 32],
    /// Block number
    pub block_number: u64,
    /// Position of the transaction in the block
    pub transaction_index: u32,
    /// Position in the receipt
    pub log_index: u32,
    /// Emitting contract
    pub address: [u8; 20],
    /// Ordered topics
    pub topics: Vec<[u8; 32]>,
    /// Number of topics
    pub topics_count: u8,
    /// Data, 0x-prefixed hex
    pub data: String,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// Uncle row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct UncleRow {
    /// Number of the block referencing the uncle
    pub current_block_number: u64,
    /// Position in the referencing block
    pub uncle_index: u32,
    /// Uncle hash
    pub uncle_hash: [u8; 32],
    /// Uncle's own block number
    pub uncle_block_number: u64,
    /// Parent hash
    pub parent_hash: [u8; 32],
    /// Miner address
    pub miner: [u8; 20],
    /// Difficulty as a decimal string
    pub difficulty: String,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used
    pub gas_used: u64,
    /// Extra data, 0x-prefixed hex
    pub extra_data: String,
    /// Ommers hash
    pub sha3_uncles: [u8; 32],
    /// Uncle timestamp
    pub block_ts: u64,
    /// ISO-8601 timestamp of the referencing block
    pub timestamp: String,
}

/// Trace row
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceRow {
    /// Transaction hash
    pub transaction_hash: [u8; 32],
    /// Block number
    pub block_number: u64,
    /// Position of the transaction in the block
    pub transaction_index: u32,
    /// Position in the transaction's trace list
    pub trace_index: u32,
    /// `call`, `create`, `suicide` or `reward`
    pub trace_type: String,
    /// Call type for calls, reward type for rewards
    pub call_type: Option<String>,
    /// Path in the call tree
    pub trace_address: Vec<u64>,
    /// Number of child operations
    pub subtraces: u64,
    /// Caller, creator or destroyed contract
    pub sender: Option<[u8; 20]>,
    /// Callee, refund address or reward author
    pub receiver: Option<[u8; 20]>,
    /// Value moved in wei as a decimal string
    pub value_wei: String,
    /// Gas provided
    pub start_gas: Option<u64>,
    /// Calldata or init code, 0x-prefixed hex
    pub input_data: Option<String>,
    /// Gas used
    pub gas_used: Option<u64>,
    /// Created contract
    pub contract_address: Option<[u8; 20]>,
    /// Return data or deployed code, 0x-prefixed hex
    pub output: Option<String>,
    /// Error message
    pub error: Option<String>,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// State diff row, one per touched account and transaction
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateDiffRow {
    /// Transaction hash
    pub transaction_hash: [u8; 32],
    /// Block number
    pub block_number: u64,
    /// Position of the transaction in the block
    pub transaction_index: u32,
    /// Touched account
    pub address: [u8; 20],
    /// Balance before, decimal string
    pub balance_from: Option<String>,
    /// Balance after, decimal string
    pub balance_to: Option<String>,
    /// Nonce before
    pub nonce_from: Option<u64>,
    /// Nonce after
    pub nonce_to: Option<u64>,
    /// Code before, 0x-prefixed hex
    pub code_from: Option<String>,
    /// Code after, 0x-prefixed hex
    pub code_to: Option<String>,
    /// Changed storage slots, ascending
    pub storage_keys: Vec<[u8; 32]>,
    /// Slot values before, aligned with `storage_keys`
    pub storage_from: Vec<Option<[u8; 32]>>,
    /// Slot values after, aligned with `storage_keys`
    pub storage_to: Vec<Option<[u8; 32]>>,
    /// ISO-8601 block timestamp
    pub timestamp: String,
}

/// Last committed block of a named scrape
#[derive(Debug, Clone, Row, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorRow {
    /// Scrape name
    pub name: String,
    /// Committed block number
    pub block_number: u64,
}

/// A row staged for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Block
    Block(BlockRow),
    /// Transaction
    Transaction(TransactionRow),
    /// Receipt
    Receipt(ReceiptRow),
    /// Log
    Log(LogRow),
    /// Uncle
    Uncle(UncleRow),
    /// Trace
    Trace(TraceRow),
    /// State diff
    StateDiff(StateDiffRow),
}

impl Entity {
    /// Table the entity is persisted to.
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Block(_) => "blocks",
            Self::Transaction(_) => "transactions",
            Self::Receipt(_) => "receipts",
            Self::Log(_) => "logs",
            Self::Uncle(_) => "uncles",
            Self::Trace(_) => "traces",
            Self::StateDiff(_) => "state_diffs",
        }
    }

    /// Block number the entity belongs to.
    pub const fn block_number(&self) -> u64 {
        match self {
            Self::Block(row) => row.block_number,
            Self::Transaction(row) => row.block_number,
            Self::Receipt(row) => row.block_number,
            Self::Log(row) => row.block_number,
            Self::Uncle(row) => row.current_block_number,
            Self::Trace(row) => row.block_number,
            Self::StateDiff(row) => row.block_number,
        }
    }

    /// ISO-8601 timestamp carried by the entity.
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Block(row) => &row.timestamp,
            Self::Transaction(row) => &row.timestamp,
            Self::Receipt(row) => &row.timestamp,
            Self::Log(row) => &row.timestamp,
            Self::Uncle(row) => &row.timestamp,
            Self::Trace(row) => &row.timestamp,
            Self::StateDiff(row) => &row.timestamp,
        }
    }
}
