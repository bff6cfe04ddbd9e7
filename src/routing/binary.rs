use crate::catalog::{self, BINARY_LEVEL_MIN_PARTNERS, LEVEL_PERCENTAGES, binary_split};
use crate::model::{ActivationRequest, FundPool, Intent, MOTHER, ReasonCode, UserId};
use crate::placement::BinaryPlacement;

use super::{CommonCtx, joining_commission, pct};

/// Level recipient as resolved against the slot tree at event time.
#[derive(Debug, Clone)]
pub struct LevelRecipient {
    pub user: UserId,
    /// Holds the event slot and has the required partner count.
    pub eligible: bool,
}

/// Everything the binary decision needs, resolved by the engine beforehand.
#[derive(Debug, Clone)]
pub struct BinaryRouteCtx {
    pub placement: BinaryPlacement,
    /// Whether the depth-N ancestor already activated slot N+1.
    pub ancestor_has_next: bool,
    /// Level recipients 1..16; shorter when the chain tops out.
    pub levels: Vec<LevelRecipient>,
}

/// Binary routing.
///
/// Slot 1 pays the direct upline in full. For slot N ≥ 2, the first two
/// members to arrive under the depth-N ancestor fund that ancestor's
/// next-slot reserve; everyone after that flows through the normal
/// distribution.
pub fn route(req: &ActivationRequest, common: &CommonCtx, ctx: &BinaryRouteCtx) -> Vec<Intent> {
    let mut intents = Vec::new();

    if req.slot_no == 1 {
        match common.referrer.as_deref() {
            Some(upline) if upline != MOTHER => intents.push(Intent::Wallet {
                user: upline.to_string(),
                amount: req.amount,
                reason: ReasonCode::SlotActivationFullUpline,
                level: None,
            }),
            _ => intents.push(Intent::Mother {
                amount: req.amount,
                reason: ReasonCode::MotherFallback,
                level: None,
            }),
        }
        return intents;
    }

    if let Some(ancestor) = reserve_target(req, ctx) {
        intents.push(Intent::Reserve {
            user: ancestor,
            target_slot: req.slot_no + 1,
            amount: req.amount,
        });
        return intents;
    }

    // Normal distribution.
    intents.push(Intent::Fund {
        pool: FundPool::Spark,
        amount: pct(req.amount, binary_split::SPARK),
        reason: ReasonCode::SparkFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::RoyalCaptain,
        amount: pct(req.amount, binary_split::ROYAL_CAPTAIN),
        reason: ReasonCode::RoyalCaptainFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::President,
        amount: pct(req.amount, binary_split::PRESIDENT),
        reason: ReasonCode::PresidentFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::LeadershipStipend,
        amount: pct(req.amount, binary_split::LEADERSHIP_STIPEND),
        reason: ReasonCode::LeadershipStipendFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::Jackpot,
        amount: pct(req.amount, binary_split::JACKPOT),
        reason: ReasonCode::JackpotFund,
    });

    let partner_share = pct(req.amount, binary_split::PARTNER);
    match common.referrer.as_deref() {
        Some(referrer) if referrer != MOTHER => intents.push(Intent::Wallet {
            user: referrer.to_string(),
            amount: partner_share,
            reason: ReasonCode::PartnerIncentive,
            level: None,
        }),
        _ => intents.push(Intent::Mother {
            amount: partner_share,
            reason: ReasonCode::MotherFallback,
            level: None,
        }),
    }

    intents.push(Intent::Fund {
        pool: FundPool::Shareholders,
        amount: pct(req.amount, binary_split::SHAREHOLDERS),
        reason: ReasonCode::Shareholders,
    });

    // Level distribution: 60% across 16 placement levels. An ineligible or
    // missing level diverts to the stipend pool as missed profit.
    let level_pool = pct(req.amount, binary_split::LEVEL);
    for level in 1..=catalog::BINARY_LEVEL_DEPTH {
        let share = pct(level_pool, LEVEL_PERCENTAGES[level as usize - 1]);
        match ctx.levels.get(level as usize - 1) {
            Some(recipient) if recipient.eligible => intents.push(Intent::Wallet {
                user: recipient.user.clone(),
                amount: share,
                reason: ReasonCode::LevelDistribution,
                level: Some(level),
            }),
            Some(recipient) => intents.push(Intent::MissedProfit {
                intended: Some(recipient.user.clone()),
                level,
                amount: share,
            }),
            None => intents.push(Intent::MissedProfit {
                intended: None,
                level,
                amount: share,
            }),
        }
    }

    joining_commission(req, common, &mut intents);
    intents
}

/// The reserve-route test for slot N ≥ 2: the user must be the 1st or 2nd
/// member under the depth-N ancestor, and that ancestor must not have
/// activated slot N+1 yet.
fn reserve_target(req: &ActivationRequest, ctx: &BinaryRouteCtx) -> Option<UserId> {
    if req.slot_no >= crate::model::Program::Binary.max_slot() {
        return None;
    }
    let ancestor = ctx.placement.reserve_ancestor.as_deref()?;
    if ancestor == MOTHER {
        return None;
    }
    if ctx.placement.index_under_ancestor > 1 || ctx.ancestor_has_next {
        return None;
    }
    Some(ancestor.to_string())
}

/// Eligibility for a binary level recipient: holds the event's slot and has
/// at least two direct partners in the program.
pub fn level_eligible(has_slot: bool, partner_count: u32) -> bool {
    has_slot && partner_count >= BINARY_LEVEL_MIN_PARTNERS
}
