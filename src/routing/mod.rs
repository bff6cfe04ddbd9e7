//! The routing engine: the per-event decision tree.
//!
//! Given an activation event and its placement context, routing returns the
//! full list of value-movement intents — reserve route or normal
//! distribution — without touching any store. The engine checks conservation
//! over the returned intents and applies them inside the event's commit
//! boundary, in enumeration order.

pub mod binary;
pub mod global;
pub mod matrix;

use crate::model::{ActivationRequest, Intent, ReasonCode, UserId};

pub use binary::BinaryRouteCtx;
pub use global::GlobalRouteCtx;
pub use matrix::MatrixRouteCtx;

/// Context shared by every program's routing decision.
#[derive(Debug, Clone)]
pub struct CommonCtx {
    /// Direct referrer of the activating user (referral chain, not placement).
    pub referrer: Option<UserId>,
    /// The referrer's referrer (for the mentorship share).
    pub referrer_of_referrer: Option<UserId>,
    /// Whether this is the user's first activation in the program.
    pub first_in_program: bool,
}

pub(crate) fn pct(amount: f64, percent: f64) -> f64 {
    amount * percent / 100.0
}

/// The joining commission: 10% to the direct referrer, funded from the Mother
/// sink, on a user's first normal-distributed activation in a program.
pub(crate) fn joining_commission(
    req: &ActivationRequest,
    common: &CommonCtx,
    intents: &mut Vec<Intent>,
) {
    if !common.first_in_program {
        return;
    }
    if let Some(referrer) = common.referrer.as_deref() {
        if referrer != crate::model::MOTHER {
            intents.push(Intent::MotherFunded {
                payee: referrer.to_string(),
                amount: pct(req.amount, crate::catalog::JOINING_COMMISSION_PCT),
                reason: ReasonCode::JoiningCommission,
            });
        }
    }
}
