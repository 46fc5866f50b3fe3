//! Replay strategy selection.
use primitives::records::ReplayMode;

/// Replay strategy for a block, chosen once from the extraction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// No replay
    None,
    /// Replay in `trace` mode
    TraceOnly,
    /// Replay in `stateDiff` mode
    StateDiffOnly,
    /// One replay requesting both modes
    Combined,
}

impl TraceMode {
    /// Select the strategy for the given flags.
    pub const fn from_flags(parse_trace: bool, parse_state_diff: bool) -> Self {
        match (parse_trace, parse_state_diff) {
            (false, false) => Self::None,
            (true, false) => Self::TraceOnly,
            (false, true) => Self::StateDiffOnly,
            (true, true) => Self::Combined,
        }
    }

    /// Modes requested from the node.
    pub const fn modes(self) -> &'static [ReplayMode] {
        match self {
            Self::None => &[],
            Self::TraceOnly => &[ReplayMode::Trace],
            Self::StateDiffOnly => &[ReplayMode::StateDiff],
            Self::Combined => &[ReplayMode::Trace, ReplayMode::StateDiff],
        }
    }
}
