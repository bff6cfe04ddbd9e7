//! The cascade engine.
//!
//! One activation event is one transaction: validate, plan placement, route
//! to intents, check conservation, then apply tree + ledger writes together.
//! Post-commit reactions (auto-upgrade arming, recycles, phase advances,
//! rank and fund evaluation) run as their own chained events, bounded by the
//! configured chain depth. Replaying a correlation id returns the original
//! outcome without touching any store.

pub mod clock;
pub mod queue;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::catalog;
use crate::funds::{AchievementView, FundsState};
use crate::ledger::{Ledger, LedgerError, Write};
use crate::model::journal::JournalEvent;
use crate::model::queue::{QueueItem, TriggerKind};
use crate::model::user::{CommissionCategory, CommissionRecord, SlotActivation, UserRecord};
use crate::model::{
    ActivationKind, ActivationRequest, Currency, EntryKind, FundPool, Intent, MOTHER, Phase,
    Program, ReasonCode, UserId, correlation_id, intent,
};
use crate::placement::{self, BinaryPlacement};
use crate::rank::RankStore;
use crate::recycle::{self, RecycleLog};
use crate::routing::binary::{BinaryRouteCtx, LevelRecipient, level_eligible};
use crate::routing::global::GlobalRouteCtx;
use crate::routing::matrix::MatrixRouteCtx;
use crate::routing::{self, CommonCtx};
use crate::tree::{BinaryTrees, GlobalPlacement, GlobalTrees, MatrixTrees, PhaseState, TreeNode};
use crate::upgrade::UpgradeManager;

const EPS: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{user_id} already active in {program} slot {slot_no}")]
    AlreadyActive {
        user_id: UserId,
        program: Program,
        slot_no: u8,
    },

    #[error("{user_id} {program}: expected slot {expected} next, got {got}")]
    OutOfSequence {
        user_id: UserId,
        program: Program,
        expected: u8,
        got: u8,
    },

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Stable wire code for the API surface.
    pub fn wire_code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::AlreadyActive { .. } => "CONFLICT_ALREADY_ACTIVE",
            EngineError::OutOfSequence { .. } => "OUT_OF_SEQUENCE",
            EngineError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            EngineError::Transient(_) => "TRANSIENT",
            EngineError::Invariant(_) => "INTERNAL",
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientReserve { .. }
            | LedgerError::InsufficientPool { .. }
            | LedgerError::InsufficientNewcomerFund { .. } => {
                EngineError::InsufficientFunds(err.to_string())
            }
            LedgerError::MissingTargetSlot { .. } | LedgerError::MissingPool { .. } => {
                EngineError::Invariant(err.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    /// Maximum depth of chained activations (auto-upgrades, recycles) rooted
    /// in one external event.
    pub max_chain_depth: u32,
    /// Retry budget for transient auto-upgrade failures.
    pub max_retries: u32,
    pub stipend_interval_secs: u64,
    pub newcomer_interval_secs: u64,
    pub spark_interval_secs: u64,
    pub triple_entry_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_chain_depth: 8,
            max_retries: 3,
            stipend_interval_secs: 86_400,
            newcomer_interval_secs: 30 * 86_400,
            spark_interval_secs: 7 * 86_400,
            triple_entry_interval_secs: 7 * 86_400,
        }
    }
}

/// What one committed event produced.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub correlation_id: String,
    pub first_seq: u64,
    pub entry_count: u32,
    /// Correlation ids of chained activations (auto-upgrades, re-entries).
    pub chained: Vec<String>,
    pub recycled: bool,
    /// True when this call was an idempotent replay of a processed event.
    pub replayed: bool,
}

impl EventOutcome {
    fn as_replay(&self) -> EventOutcome {
        let mut out = self.clone();
        out.replayed = true;
        out
    }
}

/// `GET /status` view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub user_id: UserId,
    pub program: Program,
    pub current_slot: u8,
    pub slot_name: Option<&'static str>,
    pub currency: Currency,
    pub wallet_balance: f64,
    pub reserves: Vec<(u8, f64)>,
    pub pending_upgrades: Vec<QueueItem>,
    pub rank: u8,
    pub phase: Option<PhaseState>,
}

pub struct Engine {
    config: EngineConfig,
    pub ledger: Ledger,
    pub binary_trees: BinaryTrees,
    pub matrix_trees: MatrixTrees,
    pub global_trees: GlobalTrees,
    users: HashMap<UserId, UserRecord>,
    /// Highest contiguous activated slot per (user, program).
    activations: HashMap<(UserId, Program), u8>,
    activation_log: Vec<SlotActivation>,
    directs: HashMap<UserId, Vec<UserId>>,
    directs_by_program: HashMap<(UserId, Program), u32>,
    /// Each user's current placement parent per matrix slot — the cross-tree
    /// continuation of the level chain. Updated on joins and re-entries.
    matrix_parents: HashMap<(UserId, u8), UserId>,
    upgrades: UpgradeManager,
    recycles: RecycleLog,
    funds: FundsState,
    ranks: RankStore,
    processed: HashMap<String, EventOutcome>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut engine = Engine {
            config,
            ledger: Ledger::new(),
            binary_trees: BinaryTrees::new(),
            matrix_trees: MatrixTrees::new(),
            global_trees: GlobalTrees::new(),
            users: HashMap::new(),
            activations: HashMap::new(),
            activation_log: Vec::new(),
            directs: HashMap::new(),
            directs_by_program: HashMap::new(),
            matrix_parents: HashMap::new(),
            upgrades: UpgradeManager::new(),
            recycles: RecycleLog::new(),
            funds: FundsState::new(),
            ranks: RankStore::new(),
            processed: HashMap::new(),
        };
        // The Mother account hosts every slot and absorbs unresolvable
        // payouts; it never joins or upgrades.
        engine.users.insert(
            MOTHER.to_string(),
            UserRecord {
                user_id: MOTHER.to_string(),
                referrer_id: None,
                joined_at: 0,
            },
        );
        for program in Program::all() {
            engine
                .activations
                .insert((MOTHER.to_string(), program), program.max_slot());
        }
        engine.global_trees.ensure_state(MOTHER);
        engine
    }

    // ── External operations ─────────────────────────────────────────

    /// Join a program under a referrer. Binary seeds slots 1–2 from the
    /// single join payment; the other programs activate slot 1.
    pub fn join(
        &mut self,
        user_id: &str,
        referrer_id: &str,
        program: Program,
        amount: f64,
        tx_hash: Option<String>,
        ts: u64,
    ) -> Result<Vec<EventOutcome>, EngineError> {
        // Idempotent replay of the whole join.
        let first_cid = correlation_id(program, user_id, 1, ActivationKind::Initial, ts);
        if self.processed.contains_key(&first_cid) {
            let mut outcomes = vec![self.processed[&first_cid].as_replay()];
            if program == Program::Binary {
                let second = correlation_id(program, user_id, 2, ActivationKind::Initial, ts);
                if let Some(o) = self.processed.get(&second) {
                    outcomes.push(o.as_replay());
                }
            }
            return Ok(outcomes);
        }

        if user_id.is_empty() || user_id == MOTHER {
            return Err(EngineError::Validation(format!("invalid user id {user_id:?}")));
        }
        if !self.users.contains_key(referrer_id) {
            return Err(EngineError::NotFound(format!("referrer {referrer_id}")));
        }
        if let Some(&slot) = self.activations.get(&(user_id.to_string(), program)) {
            return Err(EngineError::AlreadyActive {
                user_id: user_id.to_string(),
                program,
                slot_no: slot,
            });
        }
        let expected = catalog::join_price(program);
        if (amount - expected).abs() > EPS {
            return Err(EngineError::Validation(format!(
                "join amount {amount} != {expected} {}",
                program.currency()
            )));
        }

        // The referral edge is fixed at the first join, across programs.
        match self.users.get(user_id) {
            None => {
                self.users.insert(
                    user_id.to_string(),
                    UserRecord {
                        user_id: user_id.to_string(),
                        referrer_id: Some(referrer_id.to_string()),
                        joined_at: ts,
                    },
                );
                self.directs
                    .entry(referrer_id.to_string())
                    .or_default()
                    .push(user_id.to_string());
            }
            Some(existing) => {
                if existing.referrer_id.as_deref() != Some(referrer_id) {
                    return Err(EngineError::Validation(format!(
                        "{user_id} already joined under {:?}",
                        existing.referrer_id
                    )));
                }
            }
        }
        *self
            .directs_by_program
            .entry((referrer_id.to_string(), program))
            .or_insert(0) += 1;

        let mut outcomes = Vec::new();
        let slots: &[u8] = if program == Program::Binary { &[1, 2] } else { &[1] };
        for &slot_no in slots {
            let req = ActivationRequest {
                user_id: user_id.to_string(),
                program,
                slot_no,
                kind: ActivationKind::Initial,
                amount: catalog::price(program, slot_no).expect("catalog slot"),
                tx_hash: tx_hash.clone(),
                ts,
            };
            outcomes.push(self.process_activation(req, Vec::new(), 0)?);
        }

        // Binary partner trigger: the second counted partner arms the
        // referrer's next-slot upgrade.
        if program == Program::Binary {
            let count = self
                .directs_by_program
                .get(&(referrer_id.to_string(), Program::Binary))
                .copied()
                .unwrap_or(0);
            if count == 2 && referrer_id != MOTHER {
                let current = self.highest_slot(referrer_id, Program::Binary);
                if current < Program::Binary.max_slot() {
                    self.try_arm(referrer_id, Program::Binary, current + 1, TriggerKind::PartnerCount);
                    let chained = self.drain_upgrades(ts, 0)?;
                    if let Some(last) = outcomes.last_mut() {
                        last.chained.extend(chained);
                    }
                }
            }
        }

        // A direct's matrix join is a dream-matrix qualifying event for the
        // referrer.
        if program == Program::Matrix && referrer_id != MOTHER {
            let directs_total = self.directs_count(referrer_id);
            self.funds
                .note_dream_qualification(referrer_id, directs_total, ts);
            self.funds
                .pay_dream_tranche(&mut self.ledger, referrer_id, user_id, ts)?;
        }

        self.evaluate_funds_for(user_id, ts)?;
        self.evaluate_funds_for(referrer_id, ts)?;
        if let Some(r2) = self.referrer_of(referrer_id) {
            self.evaluate_funds_for(&r2, ts)?;
        }

        Ok(outcomes)
    }

    /// Paid upgrade to the next slot.
    pub fn upgrade(
        &mut self,
        user_id: &str,
        program: Program,
        target_slot: u8,
        amount: f64,
        tx_hash: Option<String>,
        ts: u64,
    ) -> Result<EventOutcome, EngineError> {
        let cid = correlation_id(program, user_id, target_slot, ActivationKind::Upgrade, ts);
        if let Some(existing) = self.processed.get(&cid) {
            return Ok(existing.as_replay());
        }
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        if target_slot == 0 || target_slot > program.max_slot() {
            return Err(EngineError::Validation(format!(
                "slot {target_slot} outside {program} catalog"
            )));
        }
        let current = self.highest_slot(user_id, program);
        if current == 0 {
            return Err(EngineError::OutOfSequence {
                user_id: user_id.to_string(),
                program,
                expected: 1,
                got: target_slot,
            });
        }
        if target_slot <= current {
            return Err(EngineError::AlreadyActive {
                user_id: user_id.to_string(),
                program,
                slot_no: target_slot,
            });
        }
        if target_slot != current + 1 {
            return Err(EngineError::OutOfSequence {
                user_id: user_id.to_string(),
                program,
                expected: current + 1,
                got: target_slot,
            });
        }
        let expected = catalog::upgrade_cost(program, target_slot).expect("catalog slot");
        if (amount - expected).abs() > EPS {
            return Err(EngineError::Validation(format!(
                "upgrade amount {amount} != {expected} {}",
                program.currency()
            )));
        }

        let req = ActivationRequest {
            user_id: user_id.to_string(),
            program,
            slot_no: target_slot,
            kind: ActivationKind::Upgrade,
            amount,
            tx_hash,
            ts,
        };
        let outcome = self.process_activation(req, Vec::new(), 0)?;
        self.evaluate_funds_for(user_id, ts)?;
        Ok(outcome)
    }

    /// Idempotent global phase tick: apply any pending phase advance.
    pub fn progress_global(
        &mut self,
        user_id: &str,
        ts: u64,
    ) -> Result<Option<PhaseState>, EngineError> {
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        // A single tick may cross P1 into P2 of a pre-filled tree, so loop
        // until nothing advances.
        for _ in 0..Program::Global.max_slot() as usize * 2 {
            if !self.advance_phase_if_complete(user_id, ts, 0)? {
                break;
            }
        }
        Ok(self.global_trees.state(user_id))
    }

    /// Idempotent re-check of matrix 39-completion.
    pub fn evaluate_matrix_recycle(
        &mut self,
        user_id: &str,
        slot_no: u8,
        ts: u64,
    ) -> Result<bool, EngineError> {
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        if slot_no == 0 || slot_no > Program::Matrix.max_slot() {
            return Err(EngineError::Validation(format!("slot {slot_no} outside matrix catalog")));
        }
        Ok(self.run_recycle(user_id, slot_no, ts, 0)?.is_some())
    }

    /// Apply one journal event (replay path).
    pub fn apply_journal_event(&mut self, event: &JournalEvent) -> Result<(), EngineError> {
        match event {
            JournalEvent::Join {
                user_id,
                referrer_id,
                program,
                amount,
                tx_hash,
                ts,
            } => {
                self.join(user_id, referrer_id, *program, *amount, tx_hash.clone(), *ts)?;
            }
            JournalEvent::Upgrade {
                user_id,
                program,
                target_slot,
                amount,
                tx_hash,
                ts,
            } => {
                self.upgrade(user_id, *program, *target_slot, *amount, tx_hash.clone(), *ts)?;
            }
            JournalEvent::GlobalProgress { user_id, ts } => {
                self.progress_global(user_id, *ts)?;
            }
            JournalEvent::RecycleCheck { user_id, slot_no, ts } => {
                self.evaluate_matrix_recycle(user_id, *slot_no, *ts)?;
            }
        }
        Ok(())
    }

    // ── The event transaction ───────────────────────────────────────

    fn process_activation(
        &mut self,
        req: ActivationRequest,
        prelude: Vec<Write>,
        depth: u32,
    ) -> Result<EventOutcome, EngineError> {
        let cid = req.correlation_id();
        if let Some(existing) = self.processed.get(&cid) {
            return Ok(existing.as_replay());
        }

        if req.slot_no == 0 || req.slot_no > req.program.max_slot() {
            return Err(EngineError::Validation(format!(
                "slot {} outside {} catalog",
                req.slot_no, req.program
            )));
        }
        let current = self.highest_slot(&req.user_id, req.program);
        if req.kind != ActivationKind::RecycleReentry {
            if req.slot_no <= current {
                return Err(EngineError::AlreadyActive {
                    user_id: req.user_id.clone(),
                    program: req.program,
                    slot_no: req.slot_no,
                });
            }
            if req.slot_no != current + 1 {
                return Err(EngineError::OutOfSequence {
                    user_id: req.user_id.clone(),
                    program: req.program,
                    expected: current + 1,
                    got: req.slot_no,
                });
            }
        }

        let referrer = self.referrer_of(&req.user_id);
        let referrer_of_referrer = referrer.as_deref().and_then(|r| self.referrer_of(r));
        let common = CommonCtx {
            referrer: referrer.clone(),
            referrer_of_referrer,
            first_in_program: current == 0,
        };
        let start = referrer.unwrap_or_else(|| MOTHER.to_string());

        // Plan placement and route, without writing.
        let resolved = placement::resolve_upline(
            &self.users,
            &self.activations,
            req.program,
            req.slot_no,
            &start,
        );

        // A full matrix generation must recycle before hosting this member.
        // Normally the 39th placement recycles immediately, so this only
        // fires on replayed snapshots.
        if req.program == Program::Matrix
            && self
                .matrix_trees
                .preview_place(&resolved.root, req.slot_no)
                .is_none()
        {
            self.run_recycle(&resolved.root, req.slot_no, req.ts, depth)?;
        }

        let planned = self.plan_and_route(&req, &common, &resolved)?;
        let PlannedEvent {
            intents,
            binary_plan,
            matrix_owner,
            global_owner,
        } = planned;

        // Conservation (I1): the routed intents must consume the inflow
        // exactly, Mother-funded transfers aside.
        let routed = intent::inflow_total(&intents);
        let tolerance = (req.amount.abs() * 1e-9).max(1e-9);
        if (routed - req.amount).abs() > tolerance {
            return Err(EngineError::Invariant(format!(
                "conservation breach for {cid}: routed {routed} of {}",
                req.amount
            )));
        }

        // ── Commit ──
        let mut matrix_placement = None;
        let mut global_placement: Option<GlobalPlacement> = None;
        match req.program {
            Program::Binary => {
                let plan = binary_plan.as_ref().expect("binary plan");
                self.binary_trees.insert(
                    req.slot_no,
                    &req.user_id,
                    &plan.parent_user,
                    plan.position,
                    req.ts,
                );
            }
            Program::Matrix => {
                let owner = matrix_owner.as_deref().expect("matrix owner");
                let placement = self
                    .matrix_trees
                    .commit_place(owner, req.slot_no, &req.user_id, req.ts)
                    .ok_or_else(|| {
                        EngineError::Invariant(format!("matrix tree of {owner} full at commit"))
                    })?;
                self.matrix_parents.insert(
                    (req.user_id.clone(), req.slot_no),
                    placement.parent_user.clone(),
                );
                matrix_placement = Some(placement);
            }
            Program::Global => {
                let owner = global_owner.as_deref().expect("global owner");
                global_placement = Some(self.global_trees.place(owner, &req.user_id, req.ts));
                if req.kind == ActivationKind::Initial {
                    self.global_trees.ensure_state(&req.user_id);
                }
            }
        }
        if req.program == Program::Matrix {
            // Activating a matrix slot opens the user's own tree for it.
            self.matrix_trees.ensure_tree(&req.user_id, req.slot_no);
        }

        if req.slot_no > current {
            self.activations
                .insert((req.user_id.clone(), req.program), req.slot_no);
        }
        self.activation_log.push(SlotActivation {
            user_id: req.user_id.clone(),
            program: req.program,
            slot_no: req.slot_no,
            kind: req.kind,
            amount_paid: req.amount,
            tx_hash: req.tx_hash.clone(),
            activated_at: req.ts,
            correlation_id: cid.clone(),
        });

        let mut writes = prelude;
        for item in &intents {
            self.push_writes(&req, &cid, item, &mut writes);
        }
        let receipt = self.ledger.append_batch(writes)?;
        self.record_commissions(&req, &cid, &intents);

        let mut outcome = EventOutcome {
            correlation_id: cid.clone(),
            first_seq: receipt.first_seq,
            entry_count: receipt.count,
            chained: Vec::new(),
            recycled: false,
            replayed: false,
        };

        // ── Post-commit reactions ───────────────────────────────────
        let total_slots = self.total_active_slots(&req.user_id);
        if let Some(rank) = self.ranks.observe(&req.user_id, total_slots, req.ts) {
            println!("[rank] {} reached rank {rank}", req.user_id);
        }
        if req.slot_no >= catalog::STIPEND_MIN_SLOT {
            self.funds
                .note_stipend_eligibility(&req.user_id, req.program, req.slot_no, req.ts);
        }

        // Reserve credits arm auto-upgrades.
        let trigger = match req.program {
            Program::Matrix => TriggerKind::MiddleThree,
            Program::Global => TriggerKind::PhaseCompletion,
            Program::Binary => TriggerKind::ReserveThreshold,
        };
        let reserve_targets: Vec<(UserId, u8)> = intents
            .iter()
            .filter_map(|i| match i {
                Intent::Reserve { user, target_slot, .. } => Some((user.clone(), *target_slot)),
                _ => None,
            })
            .collect();
        for (user, target_slot) in reserve_targets {
            self.try_arm(&user, req.program, target_slot, trigger);
        }

        // Matrix: 39th member recycles the generation immediately.
        if let Some(placement) = &matrix_placement {
            if placement.member_count >= catalog::MATRIX_TREE_CAPACITY {
                if let Some(chained_cid) =
                    self.run_recycle(&placement.owner, req.slot_no, req.ts, depth)?
                {
                    outcome.recycled = true;
                    outcome.chained.push(chained_cid);
                }
            }
        }

        // Global: a completed phase tree advances its owner; an activation of
        // slot N completes the user's own pending P2(N−1) progression.
        if let Some(placement) = &global_placement {
            if placement.phase_complete {
                let owner = placement.owner.clone();
                println!(
                    "[global] {owner} completed {} slot {}",
                    placement.phase, placement.slot_no
                );
                self.advance_phase_if_complete(&owner, req.ts, depth)?;
            }
        }
        if req.program == Program::Global && req.slot_no >= 2 {
            if let Some(state) = self.global_trees.state(&req.user_id) {
                if state.phase == Phase::P2
                    && state.slot_no + 1 == req.slot_no
                    && state.members_in_phase >= state.phase.capacity()
                {
                    self.global_trees
                        .advance_to(&req.user_id, Phase::P1, req.slot_no);
                    println!("[global] {} entered P1 slot {}", req.user_id, req.slot_no);
                }
            }
        }

        let chained = self.drain_upgrades(req.ts, depth)?;
        outcome.chained.extend(chained);

        self.processed.insert(cid, outcome.clone());
        Ok(outcome)
    }

    fn plan_and_route(
        &self,
        req: &ActivationRequest,
        common: &CommonCtx,
        resolved: &placement::ResolvedUpline,
    ) -> Result<PlannedEvent, EngineError> {
        let root = resolved.root.as_str();
        match req.program {
            Program::Binary => {
                let plan = placement::plan_binary(&self.binary_trees, resolved, req.slot_no);
                let ancestor_has_next = plan
                    .reserve_ancestor
                    .as_deref()
                    .map(|a| {
                        placement::has_slot_active(
                            &self.activations,
                            a,
                            Program::Binary,
                            req.slot_no + 1,
                        )
                    })
                    .unwrap_or(false);
                let levels: Vec<LevelRecipient> = plan
                    .level_uplines
                    .iter()
                    .take(catalog::BINARY_LEVEL_DEPTH as usize)
                    .map(|u| LevelRecipient {
                        user: u.clone(),
                        eligible: u != MOTHER
                            && level_eligible(
                                placement::has_slot_active(
                                    &self.activations,
                                    u,
                                    Program::Binary,
                                    req.slot_no,
                                ),
                                self.directs_in_program(u, Program::Binary),
                            ),
                    })
                    .collect();
                let ctx = BinaryRouteCtx {
                    placement: plan.clone(),
                    ancestor_has_next,
                    levels,
                };
                Ok(PlannedEvent {
                    intents: routing::binary::route(req, common, &ctx),
                    binary_plan: Some(plan),
                    matrix_owner: None,
                    global_owner: None,
                })
            }
            Program::Matrix => {
                let preview = self
                    .matrix_trees
                    .preview_place(root, req.slot_no)
                    .ok_or_else(|| {
                        EngineError::Invariant(format!("matrix tree of {root} full after recycle"))
                    })?;

                // Extend the in-generation chain past the owner through the
                // owner's own placement parent, up to three levels.
                let mut level_uplines = preview.level_uplines.clone();
                let mut cursor = level_uplines
                    .last()
                    .cloned()
                    .unwrap_or_else(|| preview.owner.clone());
                while level_uplines.len() < catalog::MATRIX_LEVEL_DEPTH as usize
                    && cursor != MOTHER
                {
                    match self.matrix_parents.get(&(cursor.clone(), req.slot_no)) {
                        Some(parent) => {
                            level_uplines.push(parent.clone());
                            cursor = parent.clone();
                        }
                        None => break,
                    }
                }
                level_uplines.truncate(catalog::MATRIX_LEVEL_DEPTH as usize);

                let super_upline = level_uplines.get(1).cloned();
                let super_upline_has_next = super_upline
                    .as_deref()
                    .map(|s| {
                        placement::has_slot_active(
                            &self.activations,
                            s,
                            Program::Matrix,
                            req.slot_no + 1,
                        )
                    })
                    .unwrap_or(false);
                let ctx = MatrixRouteCtx {
                    placement: preview,
                    super_upline,
                    super_upline_has_next,
                    level_uplines,
                };
                Ok(PlannedEvent {
                    intents: routing::matrix::route(req, common, &ctx),
                    binary_plan: None,
                    matrix_owner: Some(root.to_string()),
                    global_owner: None,
                })
            }
            Program::Global => {
                let owner_next_slot = if root == MOTHER {
                    None
                } else {
                    let owner_current = self.highest_slot(root, Program::Global);
                    if owner_current >= Program::Global.max_slot() {
                        None
                    } else {
                        Some(owner_current + 1)
                    }
                };
                let ctx = GlobalRouteCtx {
                    owner: root.to_string(),
                    owner_next_slot,
                };
                Ok(PlannedEvent {
                    intents: routing::global::route(req, common, &ctx),
                    binary_plan: None,
                    matrix_owner: None,
                    global_owner: Some(root.to_string()),
                })
            }
        }
    }

    /// Translate one intent into ledger writes, preserving enumeration order.
    fn push_writes(
        &self,
        req: &ActivationRequest,
        cid: &str,
        item: &Intent,
        writes: &mut Vec<Write>,
    ) {
        let currency = req.program.currency();
        let base = |user: &str, kind: EntryKind, amount: f64, reason: ReasonCode| -> Write {
            Write::new(req.ts, user, req.program, kind, amount, currency, reason, cid, cid)
        };
        match item {
            Intent::Wallet {
                user,
                amount,
                reason,
                level,
            } => {
                let mut w = base(user, EntryKind::WalletCredit, *amount, *reason);
                w.level = *level;
                writes.push(w);
            }
            Intent::Reserve {
                user,
                target_slot,
                amount,
            } => {
                let reason = if req.kind == ActivationKind::Auto {
                    ReasonCode::AutoUpgradeChain
                } else {
                    ReasonCode::ReserveRouteToNextSlot
                };
                let mut w = base(user, EntryKind::ReserveCredit, *amount, reason);
                w.target_slot = Some(*target_slot);
                writes.push(w);
            }
            Intent::Fund {
                pool,
                amount,
                reason,
            } => {
                let mut w = base(&req.user_id, EntryKind::FundCredit, *amount, *reason);
                w.pool = Some(*pool);
                writes.push(w);
            }
            Intent::NewcomerUpline { user, amount } => {
                writes.push(base(
                    user,
                    EntryKind::FundCredit,
                    *amount,
                    ReasonCode::NewcomerUplineFund,
                ));
            }
            Intent::MissedProfit {
                intended,
                level,
                amount,
            } => {
                let user = intended.clone().unwrap_or_else(|| MOTHER.to_string());
                let mut w = base(
                    &user,
                    EntryKind::MissedProfit,
                    *amount,
                    ReasonCode::LeadershipStipendMissedProfit,
                );
                w.pool = Some(FundPool::LeadershipStipend);
                w.level = Some(*level);
                writes.push(w);
            }
            Intent::Mother {
                amount,
                reason,
                level,
            } => {
                let mut w = base(MOTHER, EntryKind::WalletCredit, *amount, *reason);
                w.level = *level;
                writes.push(w);
            }
            Intent::MotherFunded {
                payee,
                amount,
                reason,
            } => {
                writes.push(base(MOTHER, EntryKind::WalletDebit, *amount, *reason));
                writes.push(base(payee, EntryKind::WalletCredit, *amount, *reason));
            }
        }
    }

    fn record_commissions(&mut self, req: &ActivationRequest, cid: &str, intents: &[Intent]) {
        for item in intents {
            let (payee, amount, level, category) = match item {
                Intent::Wallet {
                    user,
                    amount,
                    reason,
                    level,
                } => {
                    let category = match reason {
                        ReasonCode::SlotActivationFullUpline => CommissionCategory::FullUpline,
                        ReasonCode::PartnerIncentive => CommissionCategory::Partner,
                        ReasonCode::LevelDistribution => CommissionCategory::Level,
                        ReasonCode::Mentorship => CommissionCategory::Mentorship,
                        ReasonCode::NewcomerInstant => CommissionCategory::Newcomer,
                        _ => continue,
                    };
                    (user.clone(), *amount, level.unwrap_or(0), category)
                }
                Intent::MotherFunded {
                    payee,
                    amount,
                    reason: ReasonCode::JoiningCommission,
                } => (payee.clone(), *amount, 0, CommissionCategory::Joining),
                _ => continue,
            };
            self.ledger.record_commission(CommissionRecord {
                event_id: cid.to_string(),
                payer_user_id: req.user_id.clone(),
                payee_user_id: payee,
                program: req.program,
                source_slot_no: req.slot_no,
                level,
                amount,
                category,
            });
        }
    }

    // ── Chained reactions ───────────────────────────────────────────

    fn try_arm(&mut self, user: &str, program: Program, target_slot: u8, trigger: TriggerKind) {
        if user == MOTHER || target_slot > program.max_slot() {
            return;
        }
        let current = self.highest_slot(user, program);
        if target_slot != current + 1 {
            return;
        }
        let Some(cost) = catalog::upgrade_cost(program, target_slot) else {
            return;
        };
        let available = self.ledger.reserve_balance(user, program, target_slot);
        if available + EPS >= cost {
            self.upgrades
                .arm(user, program, current, target_slot, cost, available, trigger);
        }
    }

    /// Execute pending auto-upgrades, each as its own transaction. Chains
    /// bottom out at the configured depth; anything left pending survives for
    /// the next event or an operator drain.
    fn drain_upgrades(&mut self, ts: u64, depth: u32) -> Result<Vec<String>, EngineError> {
        let mut chained = Vec::new();
        if depth >= self.config.max_chain_depth {
            return Ok(chained);
        }
        while let Some(item) = self.upgrades.claim_next() {
            let current = self.highest_slot(&item.user_id, item.program);
            if item.target_slot != current + 1 {
                // The arming event was superseded (e.g. a manual upgrade).
                self.upgrades.void(&item.item_id);
                continue;
            }
            let balance =
                self.ledger
                    .reserve_balance(&item.user_id, item.program, item.target_slot);
            if balance + EPS < item.cost {
                self.upgrades.void(&item.item_id);
                continue;
            }

            let mut ts_auto = ts;
            let req = loop {
                let candidate = ActivationRequest {
                    user_id: item.user_id.clone(),
                    program: item.program,
                    slot_no: item.target_slot,
                    kind: ActivationKind::Auto,
                    amount: item.cost,
                    tx_hash: None,
                    ts: ts_auto,
                };
                if !self.processed.contains_key(&candidate.correlation_id()) {
                    break candidate;
                }
                ts_auto += 1;
            };
            let cid = req.correlation_id();
            let mut debit = Write::new(
                req.ts,
                req.user_id.clone(),
                req.program,
                EntryKind::ReserveDebit,
                req.amount,
                req.program.currency(),
                ReasonCode::ReserveDebitAutoActivation,
                cid.clone(),
                cid,
            );
            debit.target_slot = Some(item.target_slot);

            match self.process_activation(req, vec![debit], depth + 1) {
                Ok(outcome) => {
                    println!(
                        "[queue] auto-activated {} {} slot {}",
                        item.user_id, item.program, item.target_slot
                    );
                    self.upgrades.complete(&item.item_id);
                    chained.push(outcome.correlation_id.clone());
                    chained.extend(outcome.chained);
                }
                Err(EngineError::Transient(reason)) => {
                    eprintln!("[queue] transient failure on {}: {reason}", item.item_id);
                    self.upgrades.retry_or_fail(&item.item_id, self.config.max_retries);
                }
                Err(err) => {
                    eprintln!("[queue] item {} rejected: {err}", item.item_id);
                    self.upgrades.retry_or_fail(&item.item_id, 0);
                }
            }
        }
        Ok(chained)
    }

    fn run_recycle(
        &mut self,
        owner: &str,
        slot_no: u8,
        ts: u64,
        depth: u32,
    ) -> Result<Option<String>, EngineError> {
        if recycle::complete_generation(
            &mut self.matrix_trees,
            &mut self.recycles,
            owner,
            slot_no,
            ts,
        )
        .is_none()
        {
            return Ok(None);
        }
        if owner == MOTHER {
            // Mother has no upline to re-enter under.
            return Ok(None);
        }
        let amount = catalog::price(Program::Matrix, slot_no).expect("catalog slot");
        let mut ts_reentry = ts;
        let req = loop {
            let candidate = ActivationRequest {
                user_id: owner.to_string(),
                program: Program::Matrix,
                slot_no,
                kind: ActivationKind::RecycleReentry,
                amount,
                tx_hash: None,
                ts: ts_reentry,
            };
            if !self.processed.contains_key(&candidate.correlation_id()) {
                break candidate;
            }
            ts_reentry += 1;
        };
        let cid = req.correlation_id();
        // The re-entry inflow is drawn from the Mother sink, which absorbed
        // the completed generation's diverted value over its lifetime.
        let debit = Write::new(
            req.ts,
            MOTHER,
            Program::Matrix,
            EntryKind::WalletDebit,
            amount,
            Currency::Usdt,
            ReasonCode::RecycleReentry,
            cid.clone(),
            cid,
        );
        let outcome = self.process_activation(req, vec![debit], depth + 1)?;
        Ok(Some(outcome.correlation_id))
    }

    fn advance_phase_if_complete(
        &mut self,
        owner: &str,
        ts: u64,
        depth: u32,
    ) -> Result<bool, EngineError> {
        let Some(state) = self.global_trees.state(owner) else {
            return Ok(false);
        };
        if state.members_in_phase < state.phase.capacity() {
            return Ok(false);
        }
        match state.phase {
            Phase::P1 => {
                self.global_trees.advance_to(owner, Phase::P2, state.slot_no);
                println!("[global] {owner} entered P2 slot {}", state.slot_no);
                Ok(true)
            }
            Phase::P2 => {
                let next = state.slot_no + 1;
                if next > Program::Global.max_slot() {
                    return Ok(false);
                }
                if self.highest_slot_or_mother(owner, Program::Global) >= next {
                    self.global_trees.advance_to(owner, Phase::P1, next);
                    println!("[global] {owner} entered P1 slot {next}");
                    Ok(true)
                } else {
                    // Next slot not active yet: the progression waits on the
                    // reserve-funded auto upgrade.
                    self.try_arm(owner, Program::Global, next, TriggerKind::PhaseCompletion);
                    let chained = self.drain_upgrades(ts, depth)?;
                    Ok(!chained.is_empty())
                }
            }
        }
    }

    // ── Funds evaluation & payouts ──────────────────────────────────

    fn achievement_view(&self, user: &str) -> AchievementView {
        let directs = self.directs.get(user);
        let directs_total = directs.map(|d| d.len() as u32).unwrap_or(0);
        let directs_with_both = directs
            .map(|d| {
                d.iter()
                    .filter(|u| {
                        self.highest_slot(u, Program::Matrix) > 0
                            && self.highest_slot(u, Program::Global) > 0
                    })
                    .count() as u32
            })
            .unwrap_or(0);
        AchievementView {
            has_matrix: self.highest_slot(user, Program::Matrix) > 0,
            has_global: self.highest_slot(user, Program::Global) > 0,
            directs_with_both,
            directs_total,
            team_size: self.team_size(user),
        }
    }

    fn evaluate_funds_for(&mut self, user: &str, ts: u64) -> Result<(), EngineError> {
        if user == MOTHER || !self.users.contains_key(user) {
            return Ok(());
        }
        let view = self.achievement_view(user);
        self.funds
            .evaluate_royal_captain(&mut self.ledger, user, view, ts)?;
        self.funds
            .evaluate_president(&mut self.ledger, user, view, ts)?;
        Ok(())
    }

    /// Run every periodic payout whose interval elapsed.
    pub fn run_due_payouts(&mut self, now: u64) -> Result<(), EngineError> {
        if now.saturating_sub(self.funds.stipend_last_run) >= self.config.stipend_interval_secs {
            self.payout_leadership_stipend(now)?;
        }
        if now.saturating_sub(self.funds.newcomer_last_run) >= self.config.newcomer_interval_secs {
            self.payout_newcomer(now)?;
        }
        if now.saturating_sub(self.funds.spark_last_run) >= self.config.spark_interval_secs {
            self.payout_spark(now)?;
        }
        if now.saturating_sub(self.funds.triple_entry_last_run)
            >= self.config.triple_entry_interval_secs
        {
            self.payout_triple_entry(now)?;
        }
        Ok(())
    }

    pub fn payout_leadership_stipend(&mut self, now: u64) -> Result<u32, EngineError> {
        let mut eligible: Vec<(UserId, Program, u8)> = Vec::new();
        for user in self.users.keys() {
            if user == MOTHER {
                continue;
            }
            let mut best: Option<(Program, u8)> = None;
            for program in Program::all() {
                let slot = self.highest_slot(user, program);
                if slot >= catalog::STIPEND_MIN_SLOT {
                    let better = match best {
                        Some((bp, bs)) => {
                            slot > bs
                                || (slot == bs
                                    && catalog::price(program, slot)
                                        > catalog::price(bp, bs))
                        }
                        None => true,
                    };
                    if better {
                        best = Some((program, slot));
                    }
                }
            }
            if let Some((program, slot)) = best {
                eligible.push((user.clone(), program, slot));
            }
        }
        eligible.sort();
        Ok(self.funds.payout_stipend(&mut self.ledger, &eligible, now)?)
    }

    pub fn payout_newcomer(&mut self, now: u64) -> Result<u32, EngineError> {
        let mut uplines: Vec<(UserId, Vec<UserId>)> = self
            .users
            .keys()
            .filter(|u| self.ledger.newcomer_upline_balance(u) > EPS)
            .map(|u| (u.clone(), self.directs.get(u).cloned().unwrap_or_default()))
            .collect();
        uplines.sort();
        Ok(self.funds.payout_newcomer(&mut self.ledger, &uplines, now)?)
    }

    pub fn payout_spark(&mut self, now: u64) -> Result<u32, EngineError> {
        let mut by_level: HashMap<u8, Vec<UserId>> = HashMap::new();
        let mut users: Vec<&UserId> = self.users.keys().collect();
        users.sort();
        for user in users {
            if user == MOTHER {
                continue;
            }
            let slot = self.highest_slot(user, Program::Matrix);
            if (1..=catalog::SPARK_LEVEL_PERCENTAGES.len() as u8).contains(&slot) {
                by_level.entry(slot).or_default().push(user.clone());
            }
        }
        Ok(self.funds.payout_spark(&mut self.ledger, &by_level, now)?)
    }

    pub fn payout_triple_entry(&mut self, now: u64) -> Result<u32, EngineError> {
        let mut eligible: Vec<UserId> = self
            .users
            .keys()
            .filter(|u| {
                *u != MOTHER
                    && Program::all()
                        .iter()
                        .all(|p| self.highest_slot(u, *p) > 0)
            })
            .cloned()
            .collect();
        eligible.sort();
        Ok(self
            .funds
            .payout_triple_entry(&mut self.ledger, &eligible, now)?)
    }

    // ── Views & accessors ───────────────────────────────────────────

    pub fn status(&self, program: Program, user_id: &str) -> Result<StatusView, EngineError> {
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        let current_slot = self.highest_slot(user_id, program);
        Ok(StatusView {
            user_id: user_id.to_string(),
            program,
            current_slot,
            slot_name: catalog::slot_name(program, current_slot),
            currency: program.currency(),
            wallet_balance: self.ledger.wallet_balance(user_id, program.currency()),
            reserves: self.ledger.reserve_balances_for(user_id, program),
            pending_upgrades: self.upgrades.pending_for(user_id, program),
            rank: self.ranks.rank_of(user_id),
            phase: if program == Program::Global {
                self.global_trees.state(user_id)
            } else {
                None
            },
        })
    }

    pub fn tree_view(
        &self,
        program: Program,
        user_id: &str,
        slot_no: u8,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TreeNode>, EngineError> {
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        if slot_no == 0 || slot_no > program.max_slot() {
            return Err(EngineError::Validation(format!("slot {slot_no} outside {program} catalog")));
        }
        Ok(match program {
            Program::Binary => self.binary_trees.subtree_page(slot_no, user_id, offset, limit),
            Program::Matrix => self.matrix_trees.subtree_page(user_id, slot_no, offset, limit),
            Program::Global => self.global_trees.subtree_page(user_id, offset, limit),
        })
    }

    /// Total member count behind a tree view, so pagination knows when it is
    /// exhausted.
    pub fn tree_total(
        &self,
        program: Program,
        user_id: &str,
        slot_no: u8,
    ) -> Result<usize, EngineError> {
        if !self.users.contains_key(user_id) {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        if slot_no == 0 || slot_no > program.max_slot() {
            return Err(EngineError::Validation(format!("slot {slot_no} outside {program} catalog")));
        }
        Ok(match program {
            Program::Binary => self.binary_trees.subtree_count(slot_no, user_id),
            Program::Matrix => self.matrix_trees.member_count(user_id, slot_no) as usize,
            Program::Global => self
                .global_trees
                .state(user_id)
                .map(|s| s.members_in_phase as usize)
                .unwrap_or(0),
        })
    }

    pub fn highest_slot(&self, user: &str, program: Program) -> u8 {
        self.activations
            .get(&(user.to_string(), program))
            .copied()
            .unwrap_or(0)
    }

    fn highest_slot_or_mother(&self, user: &str, program: Program) -> u8 {
        if user == MOTHER {
            program.max_slot()
        } else {
            self.highest_slot(user, program)
        }
    }

    pub fn total_active_slots(&self, user: &str) -> u32 {
        Program::all()
            .iter()
            .map(|p| self.highest_slot(user, *p) as u32)
            .sum()
    }

    pub fn referrer_of(&self, user: &str) -> Option<UserId> {
        self.users.get(user)?.referrer_id.clone()
    }

    pub fn directs_of(&self, user: &str) -> &[UserId] {
        self.directs.get(user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn directs_count(&self, user: &str) -> u32 {
        self.directs.get(user).map(|d| d.len() as u32).unwrap_or(0)
    }

    pub fn directs_in_program(&self, user: &str, program: Program) -> u32 {
        self.directs_by_program
            .get(&(user.to_string(), program))
            .copied()
            .unwrap_or(0)
    }

    /// Referral-descendant count (the "team").
    pub fn team_size(&self, user: &str) -> u32 {
        let mut count = 0;
        let mut visited: HashSet<UserId> = HashSet::new();
        let mut frontier = vec![user.to_string()];
        while let Some(current) = frontier.pop() {
            if let Some(kids) = self.directs.get(&current) {
                for k in kids {
                    if visited.insert(k.clone()) {
                        count += 1;
                        frontier.push(k.clone());
                    }
                }
            }
        }
        count
    }

    pub fn rank_of(&self, user: &str) -> u8 {
        self.ranks.rank_of(user)
    }

    pub fn ranks(&self) -> &RankStore {
        &self.ranks
    }

    pub fn funds(&self) -> &FundsState {
        &self.funds
    }

    pub fn upgrades(&self) -> &UpgradeManager {
        &self.upgrades
    }

    pub fn recycle_log(&self) -> &RecycleLog {
        &self.recycles
    }

    pub fn activation_log(&self) -> &[SlotActivation] {
        &self.activation_log
    }

    pub fn is_processed(&self, correlation_id: &str) -> bool {
        self.processed.contains_key(correlation_id)
    }

    pub fn user_exists(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

struct PlannedEvent {
    intents: Vec<Intent>,
    binary_plan: Option<BinaryPlacement>,
    matrix_owner: Option<UserId>,
    global_owner: Option<UserId>,
}
