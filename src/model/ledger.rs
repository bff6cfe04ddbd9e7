use std::fmt;

use serde::{Deserialize, Serialize};

use super::program::{Currency, Program, UserId};

/// The value-movement kinds a ledger entry can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    WalletCredit,
    WalletDebit,
    ReserveCredit,
    ReserveDebit,
    FundCredit,
    MissedProfit,
}

/// Closed vocabulary of ledger reason codes. Every write carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    JoiningCommission,
    PartnerIncentive,
    LevelDistribution,
    ReserveRouteToNextSlot,
    ReserveDebitAutoActivation,
    SlotActivationFullUpline,
    SparkFund,
    RoyalCaptainFund,
    PresidentFund,
    LeadershipStipendFund,
    LeadershipStipendMissedProfit,
    JackpotFund,
    NewcomerInstant,
    NewcomerUplineFund,
    Mentorship,
    Shareholders,
    TripleEntryFund,
    MotherFallback,
    AutoUpgradeChain,
    RecycleReentry,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::JoiningCommission => "joining_commission",
            ReasonCode::PartnerIncentive => "partner_incentive",
            ReasonCode::LevelDistribution => "level_distribution",
            ReasonCode::ReserveRouteToNextSlot => "reserve_route_to_next_slot",
            ReasonCode::ReserveDebitAutoActivation => "reserve_debit_auto_activation",
            ReasonCode::SlotActivationFullUpline => "slot_activation_full_upline",
            ReasonCode::SparkFund => "spark_fund",
            ReasonCode::RoyalCaptainFund => "royal_captain_fund",
            ReasonCode::PresidentFund => "president_fund",
            ReasonCode::LeadershipStipendFund => "leadership_stipend_fund",
            ReasonCode::LeadershipStipendMissedProfit => "leadership_stipend_missed_profit",
            ReasonCode::JackpotFund => "jackpot_fund",
            ReasonCode::NewcomerInstant => "newcomer_instant",
            ReasonCode::NewcomerUplineFund => "newcomer_upline_fund",
            ReasonCode::Mentorship => "mentorship",
            ReasonCode::Shareholders => "shareholders",
            ReasonCode::TripleEntryFund => "triple_entry_fund",
            ReasonCode::MotherFallback => "mother_fallback",
            ReasonCode::AutoUpgradeChain => "auto_upgrade_chain",
            ReasonCode::RecycleReentry => "recycle_reentry",
        };
        f.write_str(s)
    }
}

/// Named pool accumulators. Balances are per (pool, currency) projections of
/// fund-credit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundPool {
    Spark,
    RoyalCaptain,
    President,
    LeadershipStipend,
    Jackpot,
    Shareholders,
    TripleEntry,
}

impl FundPool {
    pub fn all() -> [FundPool; 7] {
        [
            FundPool::Spark,
            FundPool::RoyalCaptain,
            FundPool::President,
            FundPool::LeadershipStipend,
            FundPool::Jackpot,
            FundPool::Shareholders,
            FundPool::TripleEntry,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundPool::Spark => "spark",
            FundPool::RoyalCaptain => "royal_captain",
            FundPool::President => "president",
            FundPool::LeadershipStipend => "leadership_stipend",
            FundPool::Jackpot => "jackpot",
            FundPool::Shareholders => "shareholders",
            FundPool::TripleEntry => "triple_entry",
        }
    }
}

/// One append-only ledger record. `seq` is assigned by the ledger and strictly
/// monotonic; entries for one event are contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub seq: u64,
    pub ts: u64,
    /// The account the movement touches: payee for credits, payer for debits,
    /// the intended (ineligible) recipient for missed profit.
    pub user_id: UserId,
    pub program: Program,
    pub kind: EntryKind,
    pub amount: f64,
    pub currency: Currency,
    pub reason: ReasonCode,
    pub correlation_id: String,
    pub source_event_id: String,
    /// For reserve entries: the slot the reserve accumulates toward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_slot: Option<u8>,
    /// For fund credits and pool-funded wallet credits: the pool touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<FundPool>,
    /// For pool-to-pool transfers (spark → triple-entry): the source pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_pool: Option<FundPool>,
    /// Level index for level-distribution and missed-profit entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}
