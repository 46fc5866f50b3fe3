//! Validation of alloy RPC responses into pipeline records.
#![allow(clippy::redundant_pub_crate)]

use alloy::{
    consensus::Transaction as _,
    rpc::types::{
        Block, BlockTransactions, Log, Transaction, TransactionReceipt,
        trace::parity::{
            Action, CallType, ChangedType, Delta, RewardType, StateDiff, TraceOutput,
            TraceResultsWithTransactionHash, TransactionTrace,
        },
    },
    transports::{RpcError, TransportError},
};
use primitives::{
    IngestError,
    records::{
        AccountDiffRecord, BlockRecord, LogRecord, ReceiptRecord, ReplayMode, ReplayRecord,
        TraceAction, TraceOutcome, TraceRecord, TransactionRecord, UncleRecord, ValueChange,
    },
};

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC "invalid params".
const INVALID_PARAMS: i64 = -32602;

pub(crate) fn block_record(block: &Block) -> Result<BlockRecord, IngestError> {
    let transactions = match &block.transactions {
        BlockTransactions::Full(txs) => txs.iter().map(transaction_record).collect(),
        // Empty blocks may deserialize as any variant.
        other if other.is_empty() => Vec::new(),
        _ => {
            return Err(IngestError::malformed(
                "block",
                format!("block {} returned without full transaction bodies", block.header.number),
            ));
        }
    };

    let header = &block.header;
    Ok(BlockRecord {
        number: header.number,
        hash: header.hash,
        parent_hash: header.parent_hash,
        miner: header.beneficiary,
        difficulty: header.difficulty,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        base_fee_per_gas: header.base_fee_per_gas,
        extra_data: header.extra_data.clone(),
        sha3_uncles: header.ommers_hash,
        timestamp: header.timestamp,
        transactions,
        uncles: block.uncles.clone(),
    })
}

fn transaction_record(tx: &Transaction) -> TransactionRecord {
    TransactionRecord {
        hash: *tx.inner.tx_hash(),
        nonce: tx.nonce(),
        from: tx.inner.signer(),
        to: tx.to(),
        value: tx.value(),
        gas: tx.gas_limit(),
        gas_price: tx.gas_price().unwrap_or_else(|| tx.max_fee_per_gas()),
        input: tx.input().clone(),
    }
}

pub(crate) fn receipt_record(receipt: &TransactionReceipt) -> ReceiptRecord {
    ReceiptRecord {
        transaction_hash: receipt.transaction_hash,
        status: receipt.inner.status(),
        gas_used: receipt.gas_used,
        cumulative_gas_used: receipt.inner.cumulative_gas_used(),
        effective_gas_price: receipt.effective_gas_price,
        contract_address: receipt.contract_address,
        logs: receipt.inner.logs().iter().map(log_record).collect(),
    }
}

fn log_record(log: &Log) -> LogRecord {
    LogRecord { address: log.address(), topics: log.topics().to_vec(), data: log.data().data.clone() }
}

pub(crate) fn uncle_record(uncle: &Block) -> UncleRecord {
    let header = &uncle.header;
    UncleRecord {
        hash: header.hash,
        number: header.number,
        parent_hash: header.parent_hash,
        miner: header.beneficiary,
        difficulty: header.difficulty,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        extra_data: header.extra_data.clone(),
        sha3_uncles: header.ommers_hash,
        timestamp: header.timestamp,
    }
}

/// Convert one replay result, keeping only the payloads that were asked for.
pub(crate) fn replay_record(
    result: &TraceResultsWithTransactionHash,
    modes: &[ReplayMode],
) -> Result<ReplayRecord, IngestError> {
    let results = &result.full_trace;

    let trace = modes
        .contains(&ReplayMode::Trace)
        .then(|| results.trace.iter().map(trace_record).collect());

    let state_diff = if modes.contains(&ReplayMode::StateDiff) {
        let diff = results.state_diff.as_ref().ok_or_else(|| {
            IngestError::malformed(
                "replay",
                format!("missing stateDiff for transaction {}", result.transaction_hash),
            )
        })?;
        Some(account_diffs(diff))
    } else {
        None
    };

    Ok(ReplayRecord { transaction_hash: result.transaction_hash, trace, state_diff })
}

fn trace_record(trace: &TransactionTrace) -> TraceRecord {
    let action = match &trace.action {
        Action::Call(call) => TraceAction::Call {
            call_type: call_type_name(&call.call_type).to_owned(),
            from: call.from,
            to: call.to,
            value: call.value,
            gas: call.gas,
            input: call.input.clone(),
        },
        Action::Create(create) => TraceAction::Create {
            from: create.from,
            value: create.value,
            gas: create.gas,
            init: create.init.clone(),
        },
        Action::Selfdestruct(destruct) => TraceAction::Selfdestruct {
            address: destruct.address,
            refund_address: destruct.refund_address,
            balance: destruct.balance,
        },
        Action::Reward(reward) => TraceAction::Reward {
            author: reward.author,
            value: reward.value,
            reward_type: match reward.reward_type {
                RewardType::Block => "block",
                RewardType::Uncle => "uncle",
            }
            .to_owned(),
        },
    };

    let outcome = trace.result.as_ref().map(|output| match output {
        TraceOutput::Call(call) => {
            TraceOutcome::Call { gas_used: call.gas_used, output: call.output.clone() }
        }
        TraceOutput::Create(create) => TraceOutcome::Create {
            gas_used: create.gas_used,
            address: create.address,
            code: create.code.clone(),
        },
    });

    TraceRecord {
        action,
        outcome,
        error: trace.error.clone(),
        subtraces: trace.subtraces as u64,
        trace_address: trace.trace_address.iter().map(|&i| i as u64).collect(),
    }
}

const fn call_type_name(call_type: &CallType) -> &'static str {
    match call_type {
        CallType::None => "none",
        CallType::Call => "call",
        CallType::CallCode => "callcode",
        CallType::DelegateCall => "delegatecall",
        CallType::StaticCall => "staticcall",
        CallType::AuthCall => "authcall",
    }
}

/// Flatten a state diff map into records ordered by address.
pub(crate) fn account_diffs(diff: &StateDiff) -> Vec<AccountDiffRecord> {
    let mut accounts: Vec<AccountDiffRecord> = diff
        .0
        .iter()
        .map(|(address, account)| {
            let mut storage: Vec<_> =
                account.storage.iter().map(|(slot, delta)| (*slot, value_change(delta))).collect();
            storage.sort_by_key(|(slot, _)| *slot);

            AccountDiffRecord {
                address: *address,
                balance: value_change(&account.balance),
                nonce: value_change(&account.nonce).map(|nonce| nonce.to::<u64>()),
                code: value_change(&account.code),
                storage,
            }
        })
        .collect();
    accounts.sort_by_key(|account| account.address);
    accounts
}

pub(crate) fn value_change<T: Clone>(delta: &Delta<T>) -> ValueChange<T> {
    match delta {
        Delta::Unchanged => ValueChange::unchanged(),
        Delta::Added(value) => ValueChange { before: None, after: Some(value.clone()) },
        Delta::Removed(value) => ValueChange { before: Some(value.clone()), after: None },
        Delta::Changed(ChangedType { from, to }) => {
            ValueChange { before: Some(from.clone()), after: Some(to.clone()) }
        }
    }
}

/// Map a transport failure for a plain lookup.
pub(crate) fn rpc_error(kind: &'static str, err: TransportError) -> IngestError {
    match err {
        RpcError::DeserError { err, .. } => IngestError::malformed(kind, err.to_string()),
        other => IngestError::NodeUnavailable(other.to_string()),
    }
}

/// Map a transport failure for a replay call. Nodes without the trace namespace or without
/// support for a mode answer with "method not found" or "invalid params".
pub(crate) fn replay_error(modes: &[ReplayMode], err: TransportError) -> IngestError {
    if let RpcError::ErrorResp(payload) = &err {
        if matches!(payload.code, METHOD_NOT_FOUND | INVALID_PARAMS) {
            return IngestError::UnsupportedMode(mode_names(modes));
        }
    }
    rpc_error("replay", err)
}

pub(crate) fn mode_names(modes: &[ReplayMode]) -> String {
    modes.iter().map(|mode| mode.as_str()).collect::<Vec<_>>().join("+")
}
