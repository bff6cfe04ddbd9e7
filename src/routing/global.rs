use crate::catalog::global_split;
use crate::model::{ActivationRequest, FundPool, Intent, MOTHER, ReasonCode, UserId};

use super::{CommonCtx, joining_commission, pct};

/// Global decision context: the phase-tree owner and their progression
/// target, resolved by the engine beforehand.
#[derive(Debug, Clone)]
pub struct GlobalRouteCtx {
    /// Root of the phase tree the member was placed into.
    pub owner: UserId,
    /// The owner's next progression slot; `None` when the owner is Mother or
    /// already at the top slot.
    pub owner_next_slot: Option<u8>,
}

/// Global routing: always the normal distribution. The level share funds the
/// phase-tree owner's progression reserve instead of a wallet; the profit
/// share is the owner's tree income.
pub fn route(req: &ActivationRequest, common: &CommonCtx, ctx: &GlobalRouteCtx) -> Vec<Intent> {
    let mut intents = Vec::new();

    let level_share = pct(req.amount, global_split::LEVEL);
    match ctx.owner_next_slot {
        Some(target) if ctx.owner != MOTHER => intents.push(Intent::Reserve {
            user: ctx.owner.clone(),
            target_slot: target,
            amount: level_share,
        }),
        _ => intents.push(Intent::Mother {
            amount: level_share,
            reason: ReasonCode::MotherFallback,
            level: None,
        }),
    }

    let partner_share = pct(req.amount, global_split::PARTNER);
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

    let profit_share = pct(req.amount, global_split::PROFIT);
    if ctx.owner != MOTHER {
        intents.push(Intent::Wallet {
            user: ctx.owner.clone(),
            amount: profit_share,
            reason: ReasonCode::LevelDistribution,
            level: None,
        });
    } else {
        intents.push(Intent::Mother {
            amount: profit_share,
            reason: ReasonCode::MotherFallback,
            level: None,
        });
    }

    intents.push(Intent::Fund {
        pool: FundPool::RoyalCaptain,
        amount: pct(req.amount, global_split::ROYAL_CAPTAIN),
        reason: ReasonCode::RoyalCaptainFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::President,
        amount: pct(req.amount, global_split::PRESIDENT),
        reason: ReasonCode::PresidentFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::TripleEntry,
        amount: pct(req.amount, global_split::TRIPLE_ENTRY),
        reason: ReasonCode::TripleEntryFund,
    });
    intents.push(Intent::Fund {
        pool: FundPool::Shareholders,
        amount: pct(req.amount, global_split::SHAREHOLDERS),
        reason: ReasonCode::Shareholders,
    });

    joining_commission(req, common, &mut intents);
    intents
}
