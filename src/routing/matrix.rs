use crate::catalog::{LEVEL_PERCENTAGES, MATRIX_LEVEL_DEPTH, matrix_split};
use crate::model::{ActivationRequest, FundPool, Intent, MOTHER, Program, ReasonCode, UserId};
use crate::tree::MatrixPlacement;

use super::{CommonCtx, joining_commission, pct};

/// Matrix decision context, resolved by the engine beforehand. The placement
/// chain continues past the tree owner through the owner's own placement
/// parent, so levels 2–3 and the super-upline resolve across trees.
#[derive(Debug, Clone)]
pub struct MatrixRouteCtx {
    pub placement: MatrixPlacement,
    /// The placement grandparent (level-2 upline), possibly in the owner's
    /// own host tree.
    pub super_upline: Option<UserId>,
    /// Whether the super-upline already activated slot N+1.
    pub super_upline_has_next: bool,
    /// Placement uplines L1..L3, crossing tree boundaries; Mother terminates
    /// the chain.
    pub level_uplines: Vec<UserId>,
}

/// Matrix routing.
///
/// A middle-position member (position 1 under its parent) whose placement
/// grandparent has not activated the next slot routes 100% to that
/// grandparent's next-slot reserve. Everything else flows through the normal
/// distribution with the NGS 50/50 split and the referral-chain mentorship
/// share.
pub fn route(req: &ActivationRequest, common: &CommonCtx, ctx: &MatrixRouteCtx) -> Vec<Intent> {
    let mut intents = Vec::new();

    if let Some(super_upline) = reserve_target(req, ctx) {
        intents.push(Intent::Reserve {
            user: super_upline,
            target_slot: req.slot_no + 1,
            amount: req.amount,
        });
        return intents;
    }

    intents.push(Intent::Fund {
        pool: FundPool::Spark,
        amount: pct(req.amount, matrix_split::SPARK),
        reason: ReasonCode::SparkFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::RoyalCaptain,
        amount: pct(req.amount, matrix_split::ROYAL_CAPTAIN),
        reason: ReasonCode::RoyalCaptainFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::President,
        amount: pct(req.amount, matrix_split::PRESIDENT),
        reason: ReasonCode::PresidentFund,
    });

    // Newcomer growth support: half instant to the joining user, half into
    // the direct upline's deferred newcomer fund.
    let newcomer_half = pct(req.amount, matrix_split::NEWCOMER) / 2.0;
    intents.push(Intent::Wallet {
        user: req.user_id.clone(),
        amount: newcomer_half,
        reason: ReasonCode::NewcomerInstant,
        level: None,
    });
    match common.referrer.as_deref() {
        Some(referrer) if referrer != MOTHER => intents.push(Intent::NewcomerUpline {
            user: referrer.to_string(),
            amount: newcomer_half,
        }),
        _ => intents.push(Intent::Mother {
            amount: newcomer_half,
            reason: ReasonCode::MotherFallback,
            level: None,
        }),
    }

    // Mentorship pays the direct referrer's referrer — referral chain, never
    // placement.
    let mentorship_share = pct(req.amount, matrix_split::MENTORSHIP);
    match common.referrer_of_referrer.as_deref() {
        Some(super_referrer) if super_referrer != MOTHER => intents.push(Intent::Wallet {
            user: super_referrer.to_string(),
            amount: mentorship_share,
            reason: ReasonCode::Mentorship,
            level: None,
        }),
        _ => intents.push(Intent::Mother {
            amount: mentorship_share,
            reason: ReasonCode::MotherFallback,
            level: None,
        }),
    }

    let partner_share = pct(req.amount, matrix_split::PARTNER);
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
        amount: pct(req.amount, matrix_split::SHAREHOLDERS),
        reason: ReasonCode::Shareholders,
    });

    // Level distribution: the 40% pool over placement levels 1–3, weighted by
    // the level table (30/10/10 normalized). Levels past the tree owner fall
    // to Mother.
    let level_pool = pct(req.amount, matrix_split::LEVEL);
    let weight_total: f64 = LEVEL_PERCENTAGES[..MATRIX_LEVEL_DEPTH as usize].iter().sum();
    for level in 1..=MATRIX_LEVEL_DEPTH {
        let weight = LEVEL_PERCENTAGES[level as usize - 1];
        let share = level_pool * weight / weight_total;
        match ctx.level_uplines.get(level as usize - 1) {
            Some(upline) if upline != MOTHER => intents.push(Intent::Wallet {
                user: upline.clone(),
                amount: share,
                reason: ReasonCode::LevelDistribution,
                level: Some(level),
            }),
            _ => intents.push(Intent::Mother {
                amount: share,
                reason: ReasonCode::MotherFallback,
                level: Some(level),
            }),
        }
    }

    joining_commission(req, common, &mut intents);
    intents
}

/// The middle-position reserve test: the member sits at level 2 under its
/// super-upline in middle position, and the super-upline has not activated
/// the next slot.
fn reserve_target(req: &ActivationRequest, ctx: &MatrixRouteCtx) -> Option<UserId> {
    if req.slot_no >= Program::Matrix.max_slot() {
        return None;
    }
    if ctx.placement.position % 3 != 1 {
        return None;
    }
    let super_upline = ctx.super_upline.as_deref()?;
    if super_upline == MOTHER || ctx.super_upline_has_next {
        return None;
    }
    Some(super_upline.to_string())
}
