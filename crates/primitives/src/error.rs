use alloy_primitives::B256;

/// Failure kinds surfaced while extracting and persisting a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// Transport failure or timeout talking to the node.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),
    /// The node returned no block for the requested number.
    #[error("block {0} not found")]
    BlockNotFound(u64),
    /// The node returned no receipt for the requested transaction.
    #[error("transaction {0} not found")]
    TxNotFound(B256),
    /// The node returned no uncle at the requested position.
    #[error("uncle {index} of block {block_number} not found")]
    UncleNotFound {
        /// Block referencing the uncle
        block_number: u64,
        /// Position in the block's uncle list
        index: u64,
    },
    /// The node rejected the requested replay mode(s).
    #[error("replay mode {0} not supported by node")]
    UnsupportedMode(String),
    /// A raw record failed validation or normalization.
    #[error("malformed {kind} record: {reason}")]
    MalformedRecord {
        /// Record kind, e.g. `block` or `receipt`
        kind: &'static str,
        /// What was wrong with it
        reason: String,
    },
    /// Persisting staged entities failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IngestError {
    /// Shorthand for [`IngestError::MalformedRecord`].
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord { kind, reason: reason.into() }
    }

    /// Whether re-running the same block later may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NodeUnavailable(_) | Self::Storage(_))
    }

    /// Stable name of the error kind, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NodeUnavailable(_) => "NodeUnavailable",
            Self::BlockNotFound(_) => "BlockNotFound",
            Self::TxNotFound(_) => "TxNotFound",
            Self::UncleNotFound { .. } => "UncleNotFound",
            Self::UnsupportedMode(_) => "UnsupportedMode",
            Self::MalformedRecord { .. } => "MalformedRecord",
            Self::Storage(_) => "StorageError",
        }
    }
}
