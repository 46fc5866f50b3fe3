//! Schema definitions for ClickHouse tables
//!
//! Every table is a `ReplacingMergeTree` keyed by the entity's natural key, so re-ingesting a
//! block replaces its rows instead of duplicating them.

/// Table schema definition
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Table name
    pub name: &'static str,
    /// Column definitions
    pub columns: &'static str,
    /// Natural key used as the `ORDER BY` tuple
    pub order_by: &'static str,
}

/// Cursor table
pub const CURSOR_TABLE: &str = "scrape_cursor";

/// Names of all tables
pub const TABLES: &[&str] = &[
    "blocks",
    "transactions",
    "receipts",
    "logs",
    "uncles",
    "traces",
    "state_diffs",
    CURSOR_TABLE,
];

/// Schema definitions for tables
pub const TABLE_SCHEMAS: &[TableSchema] = &[
    TableSchema {
        name: "blocks",
        columns: "block_number UInt64,
                 block_hash FixedString(32),
                 parent_hash FixedString(32),
                 miner FixedString(20),
                 difficulty String,
                 gas_limit UInt64,
                 gas_used UInt64,
                 base_fee_per_gas Nullable(UInt64),
                 extra_data String,
                 sha3_uncles FixedString(32),
                 transaction_count UInt32,
                 uncle_count UInt32,
                 block_ts UInt64,
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number",
    },
    TableSchema {
        name: "transactions",
        columns: "transaction_hash FixedString(32),
                 block_number UInt64,
                 transaction_index UInt32,
                 nonce UInt64,
                 sender FixedString(20),
                 receiver Nullable(FixedString(20)),
                 value_wei String,
                 start_gas UInt64,
                 gas_price UInt128,
                 data String,
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number, transaction_index",
    },
    TableSchema {
        name: "receipts",
        columns: "transaction_hash FixedString(32),
                 block_number UInt64,
                 transaction_index UInt32,
                 status UInt8,
                 gas_used UInt64,
                 cumulative_gas_used UInt64,
                 effective_gas_price UInt128,
                 contract_address Nullable(FixedString(20)),
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number, transaction_index",
    },
    TableSchema {
        name: "logs",
        columns: "transaction_hash FixedString(32),
                 block_number UInt64,
                 transaction_index UInt32,
                 log_index UInt32,
                 address FixedString(20),
                 topics Array(FixedString(32)),
                 topics_count UInt8,
                 data String,
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number, transaction_index, log_index",
    },
    TableSchema {
        name: "uncles",
        columns: "current_block_number UInt64,
                 uncle_index UInt32,
                 uncle_hash FixedString(32),
                 uncle_block_number UInt64,
                 parent_hash FixedString(32),
                 miner FixedString(20),
                 difficulty String,
                 gas_limit UInt64,
                 gas_used UInt64,
                 extra_data String,
                 sha3_uncles FixedString(32),
                 block_ts UInt64,
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "current_block_number, uncle_index",
    },
    TableSchema {
        name: "traces",
        columns: "transaction_hash FixedString(32),
                 block_number UInt64,
                 transaction_index UInt32,
                 trace_index UInt32,
                 trace_type LowCardinality(String),
                 call_type Nullable(String),
                 trace_address Array(UInt64),
                 subtraces UInt64,
                 sender Nullable(FixedString(20)),
                 receiver Nullable(FixedString(20)),
                 value_wei String,
                 start_gas Nullable(UInt64),
                 input_data Nullable(String),
                 gas_used Nullable(UInt64),
                 contract_address Nullable(FixedString(20)),
                 output Nullable(String),
                 error Nullable(String),
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number, transaction_index, trace_index",
    },
    TableSchema {
        name: "state_diffs",
        columns: "transaction_hash FixedString(32),
                 block_number UInt64,
                 transaction_index UInt32,
                 address FixedString(20),
                 balance_from Nullable(String),
                 balance_to Nullable(String),
                 nonce_from Nullable(UInt64),
                 nonce_to Nullable(UInt64),
                 code_from Nullable(String),
                 code_to Nullable(String),
                 storage_keys Array(FixedString(32)),
                 storage_from Array(Nullable(FixedString(32))),
                 storage_to Array(Nullable(FixedString(32))),
                 timestamp String,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "block_number, transaction_index, address",
    },
    TableSchema {
        name: CURSOR_TABLE,
        columns: "name String,
                 block_number UInt64,
                 inserted_at DateTime64(3) DEFAULT now64()",
        order_by: "name, block_number",
    },
];
