//! Append-only ledger and its balance projections.
//!
//! Every value movement in the system lands here as one entry. Wallet,
//! reserve, pool and newcomer-fund balances are projections maintained
//! alongside the stream; "rollback" never exists at this layer — a batch is
//! validated in full before the first entry is appended.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::ledger::{EntryKind, FundPool, LedgerEntry, ReasonCode};
use crate::model::program::{Currency, Program, UserId};
use crate::model::user::CommissionRecord;

const EPS: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient reserve for {user_id} {program} slot {target_slot}: have {have}, need {need}")]
    InsufficientReserve {
        user_id: UserId,
        program: Program,
        target_slot: u8,
        have: f64,
        need: f64,
    },

    #[error("pool {pool:?} {currency} cannot cover {need} (have {have})")]
    InsufficientPool {
        pool: FundPool,
        currency: Currency,
        have: f64,
        need: f64,
    },

    #[error("newcomer fund of {user_id} cannot cover {need} (have {have})")]
    InsufficientNewcomerFund { user_id: UserId, have: f64, need: f64 },

    #[error("reserve entry without a target slot (correlation {correlation_id})")]
    MissingTargetSlot { correlation_id: String },

    #[error("fund entry without a pool (correlation {correlation_id})")]
    MissingPool { correlation_id: String },
}

/// A ledger entry before the sequence number is assigned.
#[derive(Debug, Clone)]
pub struct Write {
    pub ts: u64,
    pub user_id: UserId,
    pub program: Program,
    pub kind: EntryKind,
    pub amount: f64,
    pub currency: Currency,
    pub reason: ReasonCode,
    pub correlation_id: String,
    pub source_event_id: String,
    pub target_slot: Option<u8>,
    pub pool: Option<FundPool>,
    pub from_pool: Option<FundPool>,
    pub level: Option<u8>,
}

impl Write {
    /// A write with every optional field empty; callers fill what applies.
    pub fn new(
        ts: u64,
        user_id: impl Into<UserId>,
        program: Program,
        kind: EntryKind,
        amount: f64,
        currency: Currency,
        reason: ReasonCode,
        correlation_id: impl Into<String>,
        source_event_id: impl Into<String>,
    ) -> Self {
        Write {
            ts,
            user_id: user_id.into(),
            program,
            kind,
            amount,
            currency,
            reason,
            correlation_id: correlation_id.into(),
            source_event_id: source_event_id.into(),
            target_slot: None,
            pool: None,
            from_pool: None,
            level: None,
        }
    }
}

/// Receipt for a committed batch: entries are contiguous from `first_seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    pub first_seq: u64,
    pub count: u32,
}

#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    next_seq: u64,
    wallets: HashMap<(UserId, Currency), f64>,
    reserves: HashMap<(UserId, Program, u8), f64>,
    pools: HashMap<(FundPool, Currency), f64>,
    /// Per-upline deferred newcomer fund (the NGS upline half).
    newcomer_upline: HashMap<UserId, f64>,
    commissions: Vec<CommissionRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Validate and append a batch atomically: either every write lands, in
    /// order, or none does. Reserve debits, pool-funded credits and newcomer
    /// releases are checked against the balances the batch itself produces.
    pub fn append_batch(&mut self, writes: Vec<Write>) -> Result<BatchReceipt, LedgerError> {
        self.validate(&writes)?;

        let first_seq = self.next_seq;
        let count = writes.len() as u32;
        for w in writes {
            self.apply(w);
        }
        Ok(BatchReceipt { first_seq, count })
    }

    fn validate(&self, writes: &[Write]) -> Result<(), LedgerError> {
        // Deltas the batch accumulates before each debit is checked, so a
        // credit-then-debit sequence within one batch validates correctly.
        let mut reserve_delta: HashMap<(UserId, Program, u8), f64> = HashMap::new();
        let mut pool_delta: HashMap<(FundPool, Currency), f64> = HashMap::new();
        let mut newcomer_delta: HashMap<UserId, f64> = HashMap::new();

        for w in writes {
            match w.kind {
                EntryKind::ReserveCredit => {
                    let slot = w.target_slot.ok_or(LedgerError::MissingTargetSlot {
                        correlation_id: w.correlation_id.clone(),
                    })?;
                    *reserve_delta
                        .entry((w.user_id.clone(), w.program, slot))
                        .or_insert(0.0) += w.amount;
                }
                EntryKind::ReserveDebit => {
                    let slot = w.target_slot.ok_or(LedgerError::MissingTargetSlot {
                        correlation_id: w.correlation_id.clone(),
                    })?;
                    let key = (w.user_id.clone(), w.program, slot);
                    let have = self.reserve_balance(&w.user_id, w.program, slot)
                        + reserve_delta.get(&key).copied().unwrap_or(0.0);
                    if have + EPS < w.amount {
                        return Err(LedgerError::InsufficientReserve {
                            user_id: w.user_id.clone(),
                            program: w.program,
                            target_slot: slot,
                            have,
                            need: w.amount,
                        });
                    }
                    *reserve_delta.entry(key).or_insert(0.0) -= w.amount;
                }
                EntryKind::WalletCredit => {
                    if let Some(pool) = w.pool {
                        let key = (pool, w.currency);
                        let have = self.pool_balance(pool, w.currency)
                            + pool_delta.get(&key).copied().unwrap_or(0.0);
                        if have + EPS < w.amount {
                            return Err(LedgerError::InsufficientPool {
                                pool,
                                currency: w.currency,
                                have,
                                need: w.amount,
                            });
                        }
                        *pool_delta.entry(key).or_insert(0.0) -= w.amount;
                    }
                }
                EntryKind::WalletDebit => {
                    // The only guarded wallet-debit form is the newcomer fund
                    // release; plain wallet debits hit the Mother sink, which
                    // is allowed to float.
                    if w.reason == ReasonCode::NewcomerUplineFund {
                        let have = self.newcomer_upline_balance(&w.user_id)
                            + newcomer_delta.get(&w.user_id).copied().unwrap_or(0.0);
                        if have + EPS < w.amount {
                            return Err(LedgerError::InsufficientNewcomerFund {
                                user_id: w.user_id.clone(),
                                have,
                                need: w.amount,
                            });
                        }
                        *newcomer_delta.entry(w.user_id.clone()).or_insert(0.0) -= w.amount;
                    }
                }
                EntryKind::FundCredit => {
                    if w.reason == ReasonCode::NewcomerUplineFund {
                        *newcomer_delta.entry(w.user_id.clone()).or_insert(0.0) += w.amount;
                    } else {
                        let pool = w.pool.ok_or(LedgerError::MissingPool {
                            correlation_id: w.correlation_id.clone(),
                        })?;
                        if let Some(source) = w.from_pool {
                            let key = (source, w.currency);
                            let have = self.pool_balance(source, w.currency)
                                + pool_delta.get(&key).copied().unwrap_or(0.0);
                            if have + EPS < w.amount {
                                return Err(LedgerError::InsufficientPool {
                                    pool: source,
                                    currency: w.currency,
                                    have,
                                    need: w.amount,
                                });
                            }
                            *pool_delta.entry(key).or_insert(0.0) -= w.amount;
                        }
                        *pool_delta.entry((pool, w.currency)).or_insert(0.0) += w.amount;
                    }
                }
                EntryKind::MissedProfit => {
                    *pool_delta
                        .entry((FundPool::LeadershipStipend, w.currency))
                        .or_insert(0.0) += w.amount;
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, w: Write) {
        let seq = self.next_seq;
        self.next_seq += 1;

        match w.kind {
            EntryKind::WalletCredit => {
                *self
                    .wallets
                    .entry((w.user_id.clone(), w.currency))
                    .or_insert(0.0) += w.amount;
                if let Some(pool) = w.pool {
                    *self.pools.entry((pool, w.currency)).or_insert(0.0) -= w.amount;
                }
            }
            EntryKind::WalletDebit => {
                if w.reason == ReasonCode::NewcomerUplineFund {
                    *self.newcomer_upline.entry(w.user_id.clone()).or_insert(0.0) -= w.amount;
                } else {
                    *self
                        .wallets
                        .entry((w.user_id.clone(), w.currency))
                        .or_insert(0.0) -= w.amount;
                }
            }
            EntryKind::ReserveCredit => {
                let slot = w.target_slot.expect("validated");
                *self
                    .reserves
                    .entry((w.user_id.clone(), w.program, slot))
                    .or_insert(0.0) += w.amount;
            }
            EntryKind::ReserveDebit => {
                let slot = w.target_slot.expect("validated");
                *self
                    .reserves
                    .entry((w.user_id.clone(), w.program, slot))
                    .or_insert(0.0) -= w.amount;
            }
            EntryKind::FundCredit => {
                if w.reason == ReasonCode::NewcomerUplineFund {
                    *self.newcomer_upline.entry(w.user_id.clone()).or_insert(0.0) += w.amount;
                } else {
                    let pool = w.pool.expect("validated");
                    if let Some(source) = w.from_pool {
                        *self.pools.entry((source, w.currency)).or_insert(0.0) -= w.amount;
                    }
                    *self.pools.entry((pool, w.currency)).or_insert(0.0) += w.amount;
                }
            }
            EntryKind::MissedProfit => {
                *self
                    .pools
                    .entry((FundPool::LeadershipStipend, w.currency))
                    .or_insert(0.0) += w.amount;
            }
        }

        self.entries.push(LedgerEntry {
            seq,
            ts: w.ts,
            user_id: w.user_id,
            program: w.program,
            kind: w.kind,
            amount: w.amount,
            currency: w.currency,
            reason: w.reason,
            correlation_id: w.correlation_id,
            source_event_id: w.source_event_id,
            target_slot: w.target_slot,
            pool: w.pool,
            from_pool: w.from_pool,
            level: w.level,
        });
    }

    pub fn record_commission(&mut self, record: CommissionRecord) {
        self.commissions.push(record);
    }

    // ── Projections ─────────────────────────────────────────────────

    pub fn wallet_balance(&self, user_id: &str, currency: Currency) -> f64 {
        self.wallets
            .get(&(user_id.to_string(), currency))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn reserve_balance(&self, user_id: &str, program: Program, target_slot: u8) -> f64 {
        self.reserves
            .get(&(user_id.to_string(), program, target_slot))
            .copied()
            .unwrap_or(0.0)
    }

    /// All non-zero reserve balances for a user in a program, sorted by slot.
    pub fn reserve_balances_for(&self, user_id: &str, program: Program) -> Vec<(u8, f64)> {
        let mut out: Vec<(u8, f64)> = self
            .reserves
            .iter()
            .filter(|((u, p, _), amount)| u == user_id && *p == program && **amount > EPS)
            .map(|((_, _, slot), amount)| (*slot, *amount))
            .collect();
        out.sort_by_key(|(slot, _)| *slot);
        out
    }

    pub fn pool_balance(&self, pool: FundPool, currency: Currency) -> f64 {
        self.pools.get(&(pool, currency)).copied().unwrap_or(0.0)
    }

    pub fn newcomer_upline_balance(&self, user_id: &str) -> f64 {
        self.newcomer_upline
            .get(user_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn entries_for(&self, correlation_id: &str) -> Vec<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .collect()
    }

    pub fn commissions(&self) -> &[CommissionRecord] {
        &self.commissions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
