//! Ledgerscope `ClickHouse` storage
//!
//! Row models, table schemas, record-to-row conversions and the writer used to persist them.

pub mod conversions;
pub mod models;
pub mod schema;
pub mod writer;

pub use conversions::{BlockContext, TxContext, iso_timestamp};
pub use models::{
    BlockRow, CursorRow, Entity, LogRow, ReceiptRow, StateDiffRow, TraceRow, TransactionRow,
    UncleRow,
};
pub use writer::ClickhouseWriter;
