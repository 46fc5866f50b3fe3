//! Records returned by a chain client after validation at the RPC boundary.
//!
//! Every record carries only what the node reported. Contextual keys (block number, ISO
//! timestamp, owning transaction) are attached later when rows are built.
use std::fmt;

use alloy_primitives::{Address, B256, Bytes, U256};

/// Block fetched with full transaction bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockRecord {
    /// Block number
    pub number: u64,
    /// Block hash
    pub hash: B256,
    /// Parent hash
    pub parent_hash: B256,
    /// Beneficiary of the block reward
    pub miner: Address,
    /// Difficulty
    pub difficulty: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used
    pub gas_used: u64,
    /// Base fee per gas, post London only
    pub base_fee_per_gas: Option<u64>,
    /// Extra data
    pub extra_data: Bytes,
    /// Ommers hash
    pub sha3_uncles: B256,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Transactions in node order
    pub transactions: Vec<TransactionRecord>,
    /// Uncle hashes in node order
    pub uncles: Vec<B256>,
}

/// A transaction body as included in a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Transaction hash
    pub hash: B256,
    /// Sender nonce
    pub nonce: u64,
    /// Recovered sender
    pub from: Address,
    /// Recipient, `None` for contract creations
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Gas limit
    pub gas: u64,
    /// Legacy gas price, or max fee for dynamic fee transactions
    pub gas_price: u128,
    /// Calldata
    pub input: Bytes,
}

/// Execution receipt of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptRecord {
    /// Hash of the transaction this receipt belongs to
    pub transaction_hash: B256,
    /// Whether execution succeeded
    pub status: bool,
    /// Gas used by this transaction
    pub gas_used: u64,
    /// Gas used by this and all preceding transactions in the block
    pub cumulative_gas_used: u64,
    /// Price actually paid per unit of gas
    pub effective_gas_price: u128,
    /// Created contract, if any
    pub contract_address: Option<Address>,
    /// Emitted logs in node order
    pub logs: Vec<LogRecord>,
}

/// A single emitted event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    /// Emitting contract
    pub address: Address,
    /// Ordered topics
    pub topics: Vec<B256>,
    /// Non-indexed data
    pub data: Bytes,
}

/// Uncle header addressed by its position in the including block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncleRecord {
    /// Uncle hash
    pub hash: B256,
    /// Uncle's own block number
    pub number: u64,
    /// Parent hash
    pub parent_hash: B256,
    /// Miner
    pub miner: Address,
    /// Difficulty
    pub difficulty: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used
    pub gas_used: u64,
    /// Extra data
    pub extra_data: Bytes,
    /// Ommers hash
    pub sha3_uncles: B256,
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

/// Replay mode accepted by `trace_replayBlockTransactions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplayMode {
    /// Call traces
    Trace,
    /// Per-account state changes
    StateDiff,
}

impl ReplayMode {
    /// Name of the mode on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::StateDiff => "stateDiff",
        }
    }
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replay output for one transaction. Only the requested payloads are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayRecord {
    /// Replayed transaction
    pub transaction_hash: B256,
    /// Trace payload, present when [`ReplayMode::Trace`] was requested
    pub trace: Option<Vec<TraceRecord>>,
    /// State diff payload, present when [`ReplayMode::StateDiff`] was requested
    pub state_diff: Option<Vec<AccountDiffRecord>>,
}

impl ReplayRecord {
    /// Combine the payloads of two replays of the same transaction.
    ///
    /// Payloads already present on `self` win.
    pub fn merge(mut self, other: Self) -> Self {
        if self.trace.is_none() {
            self.trace = other.trace;
        }
        if self.state_diff.is_none() {
            self.state_diff = other.state_diff;
        }
        self
    }
}

/// The operation a trace element describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceAction {
    /// Message call
    Call {
        /// `call`, `delegatecall`, `staticcall`, ...
        call_type: String,
        /// Caller
        from: Address,
        /// Callee
        to: Address,
        /// Transferred value
        value: U256,
        /// Gas provided
        gas: u64,
        /// Calldata
        input: Bytes,
    },
    /// Contract creation
    Create {
        /// Creator
        from: Address,
        /// Endowment
        value: U256,
        /// Gas provided
        gas: u64,
        /// Init code
        init: Bytes,
    },
    /// Self destruct
    Selfdestruct {
        /// Destroyed contract
        address: Address,
        /// Balance receiver
        refund_address: Address,
        /// Balance moved
        balance: U256,
    },
    /// Block or uncle reward
    Reward {
        /// Rewarded account
        author: Address,
        /// Reward amount
        value: U256,
        /// `block` or `uncle`
        reward_type: String,
    },
}

impl TraceAction {
    /// Name of the action kind as reported by parity-style tracers.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Create { .. } => "create",
            Self::Selfdestruct { .. } => "suicide",
            Self::Reward { .. } => "reward",
        }
    }
}

/// Result of a successful trace element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Call result
    Call {
        /// Gas used
        gas_used: u64,
        /// Return data
        output: Bytes,
    },
    /// Create result
    Create {
        /// Gas used
        gas_used: u64,
        /// Created contract
        address: Address,
        /// Deployed code
        code: Bytes,
    },
}

/// One element of a transaction's call trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// What happened
    pub action: TraceAction,
    /// Result, absent for failed operations and rewards
    pub outcome: Option<TraceOutcome>,
    /// Error message for failed operations
    pub error: Option<String>,
    /// Number of direct child operations
    pub subtraces: u64,
    /// Path of this operation in the call tree
    pub trace_address: Vec<u64>,
}

/// Before/after pair of a single account field.
///
/// `before` is `None` for added values, `after` is `None` for removed values and both are
/// `None` when the field did not change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueChange<T> {
    /// Value before the transaction
    pub before: Option<T>,
    /// Value after the transaction
    pub after: Option<T>,
}

impl<T> ValueChange<T> {
    /// A field that did not change.
    pub const fn unchanged() -> Self {
        Self { before: None, after: None }
    }

    /// Whether either side is known.
    pub const fn is_changed(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }

    /// Convert both sides.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ValueChange<U> {
        ValueChange { before: self.before.map(&mut f), after: self.after.map(f) }
    }
}

/// State delta of one account caused by one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDiffRecord {
    /// Account
    pub address: Address,
    /// Balance change
    pub balance: ValueChange<U256>,
    /// Nonce change
    pub nonce: ValueChange<u64>,
    /// Code change
    pub code: ValueChange<Bytes>,
    /// Storage changes, ascending by slot
    pub storage: Vec<(B256, ValueChange<B256>)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_both_payloads() {
        let hash = B256::repeat_byte(1);
        let traced = ReplayRecord { transaction_hash: hash, trace: Some(vec![]), state_diff: None };
        let diffed = ReplayRecord {
            transaction_hash: hash,
            trace: None,
            state_diff: Some(vec![AccountDiffRecord::default()]),
        };

        let merged = traced.merge(diffed);
        assert_eq!(merged.trace, Some(vec![]));
        assert_eq!(merged.state_diff.map(|d| d.len()), Some(1));
    }

    #[test]
    fn replay_mode_wire_names() {
        assert_eq!(ReplayMode::Trace.to_string(), "trace");
        assert_eq!(ReplayMode::StateDiff.to_string(), "stateDiff");
    }

    #[test]
    fn unchanged_value_is_not_changed() {
        assert!(!ValueChange::<u64>::unchanged().is_changed());
        assert!(ValueChange { before: None, after: Some(1u64) }.is_changed());
    }
}
