//! In-memory chain client and session used by the driver tests.
#![allow(clippy::redundant_pub_crate)]

use std::{collections::HashMap, sync::Mutex};

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use clickhouse::{BlockRow, Entity, LogRow};
use extractor::ChainClient;
use primitives::{
    IngestError,
    records::{
        AccountDiffRecord, BlockRecord, LogRecord, ReceiptRecord, ReplayMode, ReplayRecord,
        TraceAction, TraceOutcome, TraceRecord, TransactionRecord, UncleRecord, ValueChange,
    },
};

use crate::session::{ScrapeSettings, Session};

/// A request made against [`MockChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Block(u64),
    Receipt(B256),
    Uncle(u64, u64),
    Replay(u64, Vec<ReplayMode>),
}

/// Damage applied to the last transaction of a replay response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplayFault {
    /// Drop the last element.
    Truncate,
    /// Attribute the last element to another transaction.
    WrongHash,
    /// Remove the trace payload of the last element.
    DropTrace,
    /// Remove the state diff payload of the last element.
    DropStateDiff,
}

impl ReplayFault {
    fn apply(self, replays: &mut Vec<ReplayRecord>) {
        if self == Self::Truncate {
            replays.pop();
            return;
        }
        let Some(last) = replays.last_mut() else { return };
        match self {
            Self::WrongHash => last.transaction_hash = B256::repeat_byte(0xee),
            Self::DropTrace => last.trace = None,
            Self::DropStateDiff => last.state_diff = None,
            Self::Truncate => {}
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockChain {
    blocks: HashMap<u64, BlockRecord>,
    receipts: HashMap<B256, ReceiptRecord>,
    uncles: HashMap<(u64, u64), UncleRecord>,
    replays: HashMap<u64, Vec<ReplayRecord>>,
    combined_unsupported: bool,
    faults: Vec<(Call, ReplayFault)>,
    failures: Mutex<Vec<(Call, IngestError)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockChain {
    /// Register a block. `replays` holds full payloads for each transaction, in order.
    pub(crate) fn with_block(
        mut self,
        block: BlockRecord,
        receipts: Vec<ReceiptRecord>,
        replays: Vec<ReplayRecord>,
        uncles: Vec<UncleRecord>,
    ) -> Self {
        for receipt in receipts {
            self.receipts.insert(receipt.transaction_hash, receipt);
        }
        for (index, uncle) in uncles.into_iter().enumerate() {
            self.uncles.insert((block.number, index as u64), uncle);
        }
        self.replays.insert(block.number, replays);
        self.blocks.insert(block.number, block);
        self
    }

    /// Reject replay calls that request more than one mode.
    pub(crate) const fn without_combined_replay(mut self) -> Self {
        self.combined_unsupported = true;
        self
    }

    /// Corrupt every response to the replay request equal to `call` with `fault`.
    pub(crate) fn with_replay_fault(mut self, call: Call, fault: ReplayFault) -> Self {
        self.faults.push((call, fault));
        self
    }

    /// Fail the next request equal to `call` with `err`.
    pub(crate) fn fail_once(&self, call: Call, err: IngestError) {
        self.failures.lock().unwrap().push((call, err));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn replay_calls(&self, block_number: u64) -> Vec<Vec<ReplayMode>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Replay(number, modes) if number == block_number => Some(modes),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), IngestError> {
        self.calls.lock().unwrap().push(call.clone());
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(failing, _)| *failing == call) {
            Some(position) => Err(failures.remove(position).1),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_block(&self, number: u64) -> Result<BlockRecord, IngestError> {
        self.record(Call::Block(number))?;
        self.blocks.get(&number).cloned().ok_or(IngestError::BlockNotFound(number))
    }

    async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptRecord, IngestError> {
        self.record(Call::Receipt(tx_hash))?;
        self.receipts.get(&tx_hash).cloned().ok_or(IngestError::TxNotFound(tx_hash))
    }

    async fn get_uncle(&self, block_number: u64, index: u64) -> Result<UncleRecord, IngestError> {
        self.record(Call::Uncle(block_number, index))?;
        self.uncles
            .get(&(block_number, index))
            .cloned()
            .ok_or(IngestError::UncleNotFound { block_number, index })
    }

    async fn replay_block_transactions(
        &self,
        block_number: u64,
        modes: &[ReplayMode],
    ) -> Result<Vec<ReplayRecord>, IngestError> {
        let call = Call::Replay(block_number, modes.to_vec());
        self.record(call.clone())?;
        if self.combined_unsupported && modes.len() > 1 {
            return Err(IngestError::UnsupportedMode("trace+stateDiff".to_owned()));
        }

        let replays = self.replays.get(&block_number).ok_or(IngestError::BlockNotFound(block_number))?;
        let mut replays: Vec<_> = replays
            .iter()
            .map(|replay| ReplayRecord {
                transaction_hash: replay.transaction_hash,
                trace: modes.contains(&ReplayMode::Trace).then(|| replay.trace.clone().unwrap_or_default()),
                state_diff: modes
                    .contains(&ReplayMode::StateDiff)
                    .then(|| replay.state_diff.clone().unwrap_or_default()),
            })
            .collect();
        for (_, fault) in self.faults.iter().filter(|(faulty, _)| *faulty == call) {
            fault.apply(&mut replays);
        }
        Ok(replays)
    }
}

/// Session keeping committed entities in memory.
#[derive(Debug, Default)]
pub(crate) struct MemorySession {
    pub(crate) settings: ScrapeSettings,
    pub(crate) pending: Vec<Entity>,
    pub(crate) committed: Vec<Entity>,
    pub(crate) commits: usize,
    pub(crate) fail_next_commit: bool,
}

impl MemorySession {
    pub(crate) fn new(parse_trace: bool, parse_state_diff: bool) -> Self {
        Self {
            settings: ScrapeSettings { parse_trace, parse_state_diff, combined_replay: true },
            ..Default::default()
        }
    }

    pub(crate) fn committed_tables(&self) -> HashMap<&'static str, usize> {
        let mut tables = HashMap::new();
        for entity in &self.committed {
            *tables.entry(entity.table()).or_default() += 1;
        }
        tables
    }
}

#[async_trait]
impl Session for MemorySession {
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
        if std::mem::take(&mut self.fail_next_commit) {
            self.pending.clear();
            return Err(IngestError::Storage("connection reset".to_owned()));
        }
        self.committed.append(&mut self.pending);
        self.commits += 1;
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}

pub(crate) const fn tx_hash(block_number: u64, index: u8) -> B256 {
    let mut bytes = [index; 32];
    bytes[0] = (block_number % 256) as u8;
    B256::new(bytes)
}

fn call_trace(trace_address: Vec<u64>, subtraces: u64) -> TraceRecord {
    TraceRecord {
        action: TraceAction::Call {
            call_type: "call".to_owned(),
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            value: U256::from(1_000),
            gas: 50_000,
            input: Bytes::from_static(&[0xde, 0xad]),
        },
        outcome: Some(TraceOutcome::Call { gas_used: 21_000, output: Bytes::new() }),
        error: None,
        subtraces,
        trace_address,
    }
}

fn account_diff(byte: u8) -> AccountDiffRecord {
    AccountDiffRecord {
        address: Address::repeat_byte(byte),
        balance: ValueChange { before: Some(U256::from(10)), after: Some(U256::from(9)) },
        nonce: ValueChange::unchanged(),
        code: ValueChange::unchanged(),
        storage: vec![],
    }
}

/// A block with `transactions` transactions and `uncles` uncles. Transaction 0 carries one log,
/// two traces and two account diffs, the others carry nothing.
pub(crate) fn chain_with_block(
    chain: MockChain,
    block_number: u64,
    transactions: u8,
    uncles: u8,
) -> MockChain {
    let hashes: Vec<_> = (0..transactions).map(|index| tx_hash(block_number, index)).collect();

    let block = BlockRecord {
        number: block_number,
        hash: B256::repeat_byte(0xbb),
        parent_hash: B256::repeat_byte(0xaa),
        miner: Address::repeat_byte(0x33),
        difficulty: U256::from(17_171_480_576u64),
        gas_limit: 5_000,
        gas_used: 42_000,
        timestamp: 1_438_269_988 + block_number,
        transactions: hashes
            .iter()
            .enumerate()
            .map(|(index, hash)| TransactionRecord {
                hash: *hash,
                nonce: index as u64,
                from: Address::repeat_byte(0x11),
                to: Some(Address::repeat_byte(0x22)),
                value: U256::from(1_000),
                gas: 50_000,
                gas_price: 1_000_000_000,
                input: Bytes::new(),
            })
            .collect(),
        uncles: (0..uncles).map(B256::repeat_byte).collect(),
        ..Default::default()
    };

    let receipts = hashes
        .iter()
        .enumerate()
        .map(|(index, hash)| ReceiptRecord {
            transaction_hash: *hash,
            status: true,
            gas_used: 21_000,
            cumulative_gas_used: 21_000 * (index as u64 + 1),
            effective_gas_price: 1_000_000_000,
            contract_address: None,
            logs: if index == 0 {
                vec![LogRecord {
                    address: Address::repeat_byte(0x44),
                    topics: vec![B256::repeat_byte(0x55)],
                    data: Bytes::from_static(&[1, 2, 3]),
                }]
            } else {
                vec![]
            },
        })
        .collect();

    let replays = hashes
        .iter()
        .enumerate()
        .map(|(index, hash)| ReplayRecord {
            transaction_hash: *hash,
            trace: Some(if index == 0 {
                vec![call_trace(vec![], 1), call_trace(vec![0], 0)]
            } else {
                vec![]
            }),
            state_diff: Some(if index == 0 { vec![account_diff(1), account_diff(2)] } else { vec![] }),
        })
        .collect();

    let uncles = (0..uncles)
        .map(|index| UncleRecord {
            hash: B256::repeat_byte(index),
            number: block_number - 1,
            miner: Address::repeat_byte(0x66),
            timestamp: 1_438_269_900,
            ..Default::default()
        })
        .collect();

    chain.with_block(block, receipts, replays, uncles)
}

/// The block 100 scenario: two transactions and one uncle.
pub(crate) fn block_100() -> MockChain {
    chain_with_block(MockChain::default(), 100, 2, 1)
}

pub(crate) fn block_row(block_number: u64) -> BlockRow {
    BlockRow {
        block_number,
        block_hash: [1u8; 32],
        parent_hash: [0u8; 32],
        miner: [2u8; 20],
        difficulty: "0".to_owned(),
        gas_limit: 5_000,
        gas_used: 0,
        base_fee_per_gas: Some(7),
        extra_data: "0x".to_owned(),
        sha3_uncles: [3u8; 32],
        transaction_count: 0,
        uncle_count: 0,
        block_ts: 1_438_269_988,
        timestamp: "2015-07-30T15:26:28".to_owned(),
    }
}

pub(crate) fn log_row(block_number: u64, transaction_index: u32, log_index: u32) -> LogRow {
    LogRow {
        transaction_hash: [9u8; 32],
        block_number,
        transaction_index,
        log_index,
        address: [4u8; 20],
        topics: vec![[5u8; 32]],
        topics_count: 1,
        data: "0x010203".to_owned(),
        timestamp: "2015-07-30T15:26:28".to_owned(),
    }
}
