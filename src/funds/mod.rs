//! Bonus funds: pool-backed awards, eligibility records and the periodic
//! payout operations the scheduler drives.
//!
//! Eligibility evaluation is side-effect-free except for appending an
//! eligibility record; every actual payout is a separate ledger batch, capped
//! by pool solvency.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{
    self, DREAM_MATRIX_BASE_SLOT, DREAM_MATRIX_MIN_DIRECTS, DREAM_MATRIX_TRANCHES,
    PRESIDENT_MIN_DIRECTS, PRESIDENT_TIERS, ROYAL_CAPTAIN_MIN_DIRECTS, ROYAL_CAPTAIN_TIERS,
    SPARK_LEVEL_PERCENTAGES, SPARK_TRIPLE_ENTRY_PCT, STIPEND_DAILY_MULTIPLIER,
};
use crate::ledger::{Ledger, LedgerError, Write};
use crate::model::user::{CommissionCategory, CommissionRecord};
use crate::model::{Currency, EntryKind, FundPool, MOTHER, Program, ReasonCode, UserId};

const EPS: f64 = 1e-9;

/// Achievement snapshot the engine computes before an eligibility pass.
#[derive(Debug, Clone, Copy)]
pub struct AchievementView {
    pub has_matrix: bool,
    pub has_global: bool,
    /// Direct partners holding both Matrix and Global.
    pub directs_with_both: u32,
    pub directs_total: u32,
    /// Full referral-descendant count.
    pub team_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FundName {
    RoyalCaptain,
    President,
    LeadershipStipend,
    DreamMatrix,
}

/// Idempotent achievement record; payouts reference these, never recompute
/// them retroactively.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityRecord {
    pub user_id: UserId,
    pub fund: FundName,
    pub detail: String,
    pub achieved_at: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DreamProgress {
    pub qualified_at: Option<u64>,
    pub tranches_paid: u8,
}

#[derive(Debug, Default)]
pub struct FundsState {
    eligibility: Vec<EligibilityRecord>,
    royal_tiers_paid: HashMap<UserId, usize>,
    president_tiers_paid: HashMap<UserId, usize>,
    dream: HashMap<UserId, DreamProgress>,
    pub stipend_last_run: u64,
    pub newcomer_last_run: u64,
    pub spark_last_run: u64,
    pub triple_entry_last_run: u64,
}

fn program_for(currency: Currency) -> Program {
    match currency {
        Currency::Bnb => Program::Binary,
        Currency::Usdt => Program::Matrix,
        Currency::Usd => Program::Global,
    }
}

impl FundsState {
    pub fn new() -> Self {
        FundsState::default()
    }

    pub fn eligibility_records(&self) -> &[EligibilityRecord] {
        &self.eligibility
    }

    pub fn dream_progress(&self, user: &str) -> DreamProgress {
        self.dream.get(user).copied().unwrap_or_default()
    }

    fn has_record(&self, user: &str, fund: FundName, detail: &str) -> bool {
        self.eligibility
            .iter()
            .any(|r| r.user_id == user && r.fund == fund && r.detail == detail)
    }

    fn note(&mut self, user: &str, fund: FundName, detail: String, ts: u64) {
        if self.has_record(user, fund, &detail) {
            return;
        }
        self.eligibility.push(EligibilityRecord {
            user_id: user.to_string(),
            fund,
            detail,
            achieved_at: ts,
        });
    }

    // ── Royal Captain / President ───────────────────────────────────

    /// Award any Royal Captain tiers the user newly reaches. Requires Matrix
    /// and Global plus five directs holding both; tiers step by team size and
    /// pay from the pool's USD balance, each at most once.
    pub fn evaluate_royal_captain(
        &mut self,
        ledger: &mut Ledger,
        user: &str,
        view: AchievementView,
        ts: u64,
    ) -> Result<(), LedgerError> {
        if !(view.has_matrix && view.has_global)
            || view.directs_with_both < ROYAL_CAPTAIN_MIN_DIRECTS
        {
            return Ok(());
        }
        let paid = self.royal_tiers_paid.get(user).copied().unwrap_or(0);
        for tier in paid..ROYAL_CAPTAIN_TIERS.len() {
            let (team_required, award) = ROYAL_CAPTAIN_TIERS[tier];
            if view.team_size < team_required {
                break;
            }
            if ledger.pool_balance(FundPool::RoyalCaptain, Currency::Usd) + EPS < award {
                break;
            }
            let correlation = format!("royal-captain-{user}-tier{}", tier + 1);
            let mut w = Write::new(
                ts,
                user,
                Program::Global,
                EntryKind::WalletCredit,
                award,
                Currency::Usd,
                ReasonCode::RoyalCaptainFund,
                correlation.clone(),
                correlation,
            );
            w.pool = Some(FundPool::RoyalCaptain);
            ledger.append_batch(vec![w])?;
            self.note(
                user,
                FundName::RoyalCaptain,
                format!("tier{} team{team_required}", tier + 1),
                ts,
            );
            self.royal_tiers_paid.insert(user.to_string(), tier + 1);
        }
        Ok(())
    }

    /// Award any President Reward tiers the user newly reaches (10 directs,
    /// progressive team thresholds from 80).
    pub fn evaluate_president(
        &mut self,
        ledger: &mut Ledger,
        user: &str,
        view: AchievementView,
        ts: u64,
    ) -> Result<(), LedgerError> {
        if view.directs_total < PRESIDENT_MIN_DIRECTS {
            return Ok(());
        }
        let paid = self.president_tiers_paid.get(user).copied().unwrap_or(0);
        for tier in paid..PRESIDENT_TIERS.len() {
            let (team_required, award) = PRESIDENT_TIERS[tier];
            if view.team_size < team_required {
                break;
            }
            if ledger.pool_balance(FundPool::President, Currency::Usd) + EPS < award {
                break;
            }
            let correlation = format!("president-{user}-tier{}", tier + 1);
            let mut w = Write::new(
                ts,
                user,
                Program::Global,
                EntryKind::WalletCredit,
                award,
                Currency::Usd,
                ReasonCode::PresidentFund,
                correlation.clone(),
                correlation,
            );
            w.pool = Some(FundPool::President);
            ledger.append_batch(vec![w])?;
            self.note(
                user,
                FundName::President,
                format!("tier{} team{team_required}", tier + 1),
                ts,
            );
            self.president_tiers_paid.insert(user.to_string(), tier + 1);
        }
        Ok(())
    }

    // ── Leadership stipend ──────────────────────────────────────────

    pub fn note_stipend_eligibility(&mut self, user: &str, program: Program, slot_no: u8, ts: u64) {
        self.note(
            user,
            FundName::LeadershipStipend,
            format!("{program} slot {slot_no}"),
            ts,
        );
    }

    /// Daily stipend run. Each eligible user is owed 2 × the price of their
    /// highest qualifying slot, in that program's currency; obligations are
    /// pro-rated when a pool currency cannot cover the day.
    pub fn payout_stipend(
        &mut self,
        ledger: &mut Ledger,
        eligible: &[(UserId, Program, u8)],
        now: u64,
    ) -> Result<u32, LedgerError> {
        let mut by_currency: HashMap<Currency, Vec<(UserId, Program, f64)>> = HashMap::new();
        for (user, program, slot_no) in eligible {
            let Some(price) = catalog::price(*program, *slot_no) else {
                continue;
            };
            by_currency.entry(program.currency()).or_default().push((
                user.clone(),
                *program,
                STIPEND_DAILY_MULTIPLIER * price,
            ));
        }

        let mut paid = 0;
        for (currency, obligations) in by_currency {
            let total: f64 = obligations.iter().map(|(_, _, amount)| amount).sum();
            let pool = ledger.pool_balance(FundPool::LeadershipStipend, currency);
            if total <= EPS || pool <= EPS {
                continue;
            }
            let scale = (pool / total).min(1.0);
            let correlation = format!("stipend-{now}-{currency}");
            let mut writes = Vec::new();
            for (user, program, amount) in obligations {
                let mut w = Write::new(
                    now,
                    user,
                    program,
                    EntryKind::WalletCredit,
                    amount * scale,
                    currency,
                    ReasonCode::LeadershipStipendFund,
                    correlation.clone(),
                    correlation.clone(),
                );
                w.pool = Some(FundPool::LeadershipStipend);
                writes.push(w);
                paid += 1;
            }
            ledger.append_batch(writes)?;
            if scale < 1.0 {
                println!("[stipend] {currency} pool short, pro-rated to {:.1}%", scale * 100.0);
            }
        }
        self.stipend_last_run = now;
        Ok(paid)
    }

    // ── Newcomer growth support ─────────────────────────────────────

    /// 30-day distribution: each upline's deferred NGS half splits equally
    /// among their current direct referrals. Uplines without directs hold.
    pub fn payout_newcomer(
        &mut self,
        ledger: &mut Ledger,
        uplines: &[(UserId, Vec<UserId>)],
        now: u64,
    ) -> Result<u32, LedgerError> {
        let mut paid = 0;
        for (upline, directs) in uplines {
            let balance = ledger.newcomer_upline_balance(upline);
            if balance <= EPS || directs.is_empty() {
                continue;
            }
            let correlation = format!("newcomer-{now}-{upline}");
            let share = balance / directs.len() as f64;
            let mut writes = vec![Write::new(
                now,
                upline.clone(),
                Program::Matrix,
                EntryKind::WalletDebit,
                balance,
                Currency::Usdt,
                ReasonCode::NewcomerUplineFund,
                correlation.clone(),
                correlation.clone(),
            )];
            for direct in directs {
                writes.push(Write::new(
                    now,
                    direct.clone(),
                    Program::Matrix,
                    EntryKind::WalletCredit,
                    share,
                    Currency::Usdt,
                    ReasonCode::NewcomerUplineFund,
                    correlation.clone(),
                    correlation.clone(),
                ));
                paid += 1;
            }
            ledger.append_batch(writes)?;
        }
        self.newcomer_last_run = now;
        Ok(paid)
    }

    // ── Spark ───────────────────────────────────────────────────────

    /// Periodic spark distribution: 20% of the pool rolls to the triple-entry
    /// sub-pool, the remaining 80% splits across matrix levels 1–14 by the
    /// fixed pattern, shared equally within each level. Levels without a
    /// qualifying user leave their share pooled for the next run.
    pub fn payout_spark(
        &mut self,
        ledger: &mut Ledger,
        users_by_level: &HashMap<u8, Vec<UserId>>,
        now: u64,
    ) -> Result<u32, LedgerError> {
        let mut paid = 0;
        for currency in [Currency::Bnb, Currency::Usdt, Currency::Usd] {
            let pool = ledger.pool_balance(FundPool::Spark, currency);
            if pool <= EPS {
                continue;
            }
            let program = program_for(currency);
            let correlation = format!("spark-{now}-{currency}");

            let triple_share = pool * SPARK_TRIPLE_ENTRY_PCT / 100.0;
            let mut transfer = Write::new(
                now,
                MOTHER,
                program,
                EntryKind::FundCredit,
                triple_share,
                currency,
                ReasonCode::TripleEntryFund,
                correlation.clone(),
                correlation.clone(),
            );
            transfer.pool = Some(FundPool::TripleEntry);
            transfer.from_pool = Some(FundPool::Spark);
            let mut writes = vec![transfer];

            let distributable = pool - triple_share;
            for level in 1..=SPARK_LEVEL_PERCENTAGES.len() as u8 {
                let Some(users) = users_by_level.get(&level).filter(|u| !u.is_empty()) else {
                    continue;
                };
                let level_share =
                    distributable * SPARK_LEVEL_PERCENTAGES[level as usize - 1] / 100.0;
                let per_user = level_share / users.len() as f64;
                for user in users {
                    let mut w = Write::new(
                        now,
                        user.clone(),
                        program,
                        EntryKind::WalletCredit,
                        per_user,
                        currency,
                        ReasonCode::SparkFund,
                        correlation.clone(),
                        correlation.clone(),
                    );
                    w.pool = Some(FundPool::Spark);
                    w.level = Some(level);
                    writes.push(w);
                    paid += 1;
                }
            }
            ledger.append_batch(writes)?;
        }
        self.spark_last_run = now;
        Ok(paid)
    }

    // ── Triple entry ────────────────────────────────────────────────

    /// Periodic triple-entry distribution: the pool splits equally among
    /// users holding all three programs.
    pub fn payout_triple_entry(
        &mut self,
        ledger: &mut Ledger,
        eligible: &[UserId],
        now: u64,
    ) -> Result<u32, LedgerError> {
        if eligible.is_empty() {
            self.triple_entry_last_run = now;
            return Ok(0);
        }
        let mut paid = 0;
        for currency in [Currency::Bnb, Currency::Usdt, Currency::Usd] {
            let pool = ledger.pool_balance(FundPool::TripleEntry, currency);
            if pool <= EPS {
                continue;
            }
            let program = program_for(currency);
            let correlation = format!("triple-entry-{now}-{currency}");
            let per_user = pool / eligible.len() as f64;
            let mut writes = Vec::new();
            for user in eligible {
                let mut w = Write::new(
                    now,
                    user.clone(),
                    program,
                    EntryKind::WalletCredit,
                    per_user,
                    currency,
                    ReasonCode::TripleEntryFund,
                    correlation.clone(),
                    correlation.clone(),
                );
                w.pool = Some(FundPool::TripleEntry);
                writes.push(w);
                paid += 1;
            }
            ledger.append_batch(writes)?;
        }
        self.triple_entry_last_run = now;
        Ok(paid)
    }

    // ── Dream matrix ────────────────────────────────────────────────

    /// Qualify a user once they hold three direct partners; record-only.
    pub fn note_dream_qualification(&mut self, user: &str, directs_total: u32, ts: u64) -> bool {
        let progress = self.dream.entry(user.to_string()).or_default();
        if progress.qualified_at.is_none() && directs_total >= DREAM_MATRIX_MIN_DIRECTS {
            progress.qualified_at = Some(ts);
            self.note(
                user,
                FundName::DreamMatrix,
                format!("{DREAM_MATRIX_MIN_DIRECTS} directs"),
                ts,
            );
            return true;
        }
        false
    }

    /// Pay the next dream-matrix tranche to a qualified user: the progressive
    /// percentages of the slot-5 base value, one tranche per qualifying
    /// event, funded from the Mother sink.
    pub fn pay_dream_tranche(
        &mut self,
        ledger: &mut Ledger,
        user: &str,
        payer: &str,
        ts: u64,
    ) -> Result<bool, LedgerError> {
        let progress = self.dream.entry(user.to_string()).or_default();
        if progress.qualified_at.is_none()
            || progress.tranches_paid as usize >= DREAM_MATRIX_TRANCHES.len()
        {
            return Ok(false);
        }
        let tranche = progress.tranches_paid;
        let base = catalog::price(Program::Matrix, DREAM_MATRIX_BASE_SLOT)
            .expect("slot 5 is in the catalog");
        let amount = base * DREAM_MATRIX_TRANCHES[tranche as usize] / 100.0;
        let correlation = format!("dream-{user}-tranche{}", tranche + 1);

        let debit = Write::new(
            ts,
            MOTHER,
            Program::Matrix,
            EntryKind::WalletDebit,
            amount,
            Currency::Usdt,
            ReasonCode::LevelDistribution,
            correlation.clone(),
            correlation.clone(),
        );
        let credit = Write::new(
            ts,
            user,
            Program::Matrix,
            EntryKind::WalletCredit,
            amount,
            Currency::Usdt,
            ReasonCode::LevelDistribution,
            correlation.clone(),
            correlation.clone(),
        );
        ledger.append_batch(vec![debit, credit])?;
        ledger.record_commission(CommissionRecord {
            event_id: correlation,
            payer_user_id: payer.to_string(),
            payee_user_id: user.to_string(),
            program: Program::Matrix,
            source_slot_no: DREAM_MATRIX_BASE_SLOT,
            level: 0,
            amount,
            category: CommissionCategory::DreamMatrix,
        });
        let progress = self.dream.get_mut(user).expect("entry created above");
        progress.tranches_paid += 1;
        Ok(true)
    }
}
