//! Read-only catalog: slot prices, distribution percentage tables, fund
//! splits, rank thresholds and reward tiers. Everything here is fixed per
//! deployment; implementations read, never write.

use crate::model::{Currency, Program};

// ── Slot prices ─────────────────────────────────────────────────────

/// Binary slot prices in BNB, slot 1..16. Each slot doubles the previous.
pub const BINARY_PRICES: [f64; 16] = [
    0.0022, 0.0044, 0.0088, 0.0176, 0.0352, 0.0704, 0.1408, 0.2816, 0.5632, 1.1264, 2.2528,
    4.5056, 9.0112, 18.0224, 36.0448, 72.0896,
];

/// Matrix slot prices in USDT, slot 1..15. price(k) = 3 × price(k−1).
pub const MATRIX_PRICES: [f64; 15] = [
    11.0,
    33.0,
    99.0,
    297.0,
    891.0,
    2673.0,
    8019.0,
    24057.0,
    72171.0,
    216513.0,
    649539.0,
    1948617.0,
    5845851.0,
    17537553.0,
    52612659.0,
];

/// Global slot prices in USD, slot 1..16. Doubling ladder from the $33 join.
pub const GLOBAL_PRICES: [f64; 16] = [
    33.0, 66.0, 132.0, 264.0, 528.0, 1056.0, 2112.0, 4224.0, 8448.0, 16896.0, 33792.0, 67584.0,
    135168.0, 270336.0, 540672.0, 1081344.0,
];

const BINARY_SLOT_NAMES: [&str; 16] = [
    "Explorer", "Contributor", "Scholar", "Achiever", "Pioneer", "Ambassador", "Mentor",
    "Champion", "Visionary", "Guardian", "Patron", "Sovereign", "Luminary", "Titan", "Paragon",
    "Apex",
];

const MATRIX_SLOT_NAMES: [&str; 15] = [
    "Starter", "Bronze", "Silver", "Gold", "Platinum", "Ruby", "Emerald", "Sapphire", "Diamond",
    "Blue Diamond", "Black Diamond", "Royal Diamond", "Crown", "Crown Ambassador", "Legend",
];

const GLOBAL_SLOT_NAMES: [&str; 16] = [
    "Orbit-1", "Orbit-2", "Orbit-3", "Orbit-4", "Orbit-5", "Orbit-6", "Orbit-7", "Orbit-8",
    "Orbit-9", "Orbit-10", "Orbit-11", "Orbit-12", "Orbit-13", "Orbit-14", "Orbit-15",
    "Orbit-16",
];

/// Catalog price of a slot. `None` for slot numbers outside the program.
pub fn price(program: Program, slot_no: u8) -> Option<f64> {
    if slot_no == 0 || slot_no > program.max_slot() {
        return None;
    }
    let idx = (slot_no - 1) as usize;
    let p = match program {
        Program::Binary => BINARY_PRICES[idx],
        Program::Matrix => MATRIX_PRICES[idx],
        Program::Global => GLOBAL_PRICES[idx],
    };
    Some(p)
}

pub fn slot_name(program: Program, slot_no: u8) -> Option<&'static str> {
    if slot_no == 0 || slot_no > program.max_slot() {
        return None;
    }
    let idx = (slot_no - 1) as usize;
    let name = match program {
        Program::Binary => BINARY_SLOT_NAMES[idx],
        Program::Matrix => MATRIX_SLOT_NAMES[idx],
        Program::Global => GLOBAL_SLOT_NAMES[idx],
    };
    Some(name)
}

/// What a user pays (and what a reserve must cover) to activate `target_slot`
/// when they already hold the slot below. Matrix charges the price difference;
/// Binary and Global charge the full slot price.
pub fn upgrade_cost(program: Program, target_slot: u8) -> Option<f64> {
    let full = price(program, target_slot)?;
    match program {
        Program::Matrix if target_slot > 1 => {
            let prev = price(program, target_slot - 1)?;
            Some(full - prev)
        }
        _ => Some(full),
    }
}

/// Total paid on joining a program. Binary seeds slots 1–2 in one payment.
pub fn join_price(program: Program) -> f64 {
    match program {
        Program::Binary => BINARY_PRICES[0] + BINARY_PRICES[1],
        Program::Matrix => MATRIX_PRICES[0],
        Program::Global => GLOBAL_PRICES[0],
    }
}

pub fn currency(program: Program) -> Currency {
    program.currency()
}

// ── Distribution tables ─────────────────────────────────────────────

/// Level-distribution percentages, applied within the level pool
/// (60% of the amount for Binary, 40% for Matrix — Matrix uses L1–3 only).
/// The 16 entries sum to 100.
pub const LEVEL_PERCENTAGES: [f64; 16] = [
    30.0, 10.0, 10.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 3.0, 3.0, 3.0, 2.0, 2.0, 2.0,
];

/// Depth of the binary level distribution.
pub const BINARY_LEVEL_DEPTH: u8 = 16;
/// Depth of the matrix level distribution.
pub const MATRIX_LEVEL_DEPTH: u8 = 3;

/// Binary normal-distribution split (slot ≥ 2), percent of the amount.
pub mod binary_split {
    pub const SPARK: f64 = 8.0;
    pub const ROYAL_CAPTAIN: f64 = 4.0;
    pub const PRESIDENT: f64 = 3.0;
    pub const LEADERSHIP_STIPEND: f64 = 5.0;
    pub const JACKPOT: f64 = 5.0;
    pub const PARTNER: f64 = 10.0;
    pub const SHAREHOLDERS: f64 = 5.0;
    pub const LEVEL: f64 = 60.0;
}

/// Matrix normal-distribution split, percent of the amount.
pub mod matrix_split {
    pub const SPARK: f64 = 8.0;
    pub const ROYAL_CAPTAIN: f64 = 4.0;
    pub const PRESIDENT: f64 = 3.0;
    pub const NEWCOMER: f64 = 20.0;
    pub const MENTORSHIP: f64 = 10.0;
    pub const PARTNER: f64 = 10.0;
    pub const SHAREHOLDERS: f64 = 5.0;
    pub const LEVEL: f64 = 40.0;
}

/// Global distribution split, percent of the amount.
pub mod global_split {
    pub const LEVEL: f64 = 30.0;
    pub const PARTNER: f64 = 10.0;
    pub const PROFIT: f64 = 30.0;
    pub const ROYAL_CAPTAIN: f64 = 10.0;
    pub const PRESIDENT: f64 = 10.0;
    pub const TRIPLE_ENTRY: f64 = 5.0;
    pub const SHAREHOLDERS: f64 = 5.0;
}

/// Fund split of a program's normal-distribution branch as (name, percent)
/// pairs. Each table sums to exactly 100.
pub fn fund_percentages(program: Program) -> Vec<(&'static str, f64)> {
    match program {
        Program::Binary => vec![
            ("spark", binary_split::SPARK),
            ("royal_captain", binary_split::ROYAL_CAPTAIN),
            ("president", binary_split::PRESIDENT),
            ("leadership_stipend", binary_split::LEADERSHIP_STIPEND),
            ("jackpot", binary_split::JACKPOT),
            ("partner", binary_split::PARTNER),
            ("shareholders", binary_split::SHAREHOLDERS),
            ("level", binary_split::LEVEL),
        ],
        Program::Matrix => vec![
            ("spark", matrix_split::SPARK),
            ("royal_captain", matrix_split::ROYAL_CAPTAIN),
            ("president", matrix_split::PRESIDENT),
            ("newcomer", matrix_split::NEWCOMER),
            ("mentorship", matrix_split::MENTORSHIP),
            ("partner", matrix_split::PARTNER),
            ("shareholders", matrix_split::SHAREHOLDERS),
            ("level", matrix_split::LEVEL),
        ],
        Program::Global => vec![
            ("level", global_split::LEVEL),
            ("partner", global_split::PARTNER),
            ("profit", global_split::PROFIT),
            ("royal_captain", global_split::ROYAL_CAPTAIN),
            ("president", global_split::PRESIDENT),
            ("triple_entry", global_split::TRIPLE_ENTRY),
            ("shareholders", global_split::SHAREHOLDERS),
        ],
    }
}

/// Joining commission: paid to the direct referrer on a user's first
/// normal-distributed activation in a program.
pub const JOINING_COMMISSION_PCT: f64 = 10.0;

// ── Structural constants ────────────────────────────────────────────

/// Sweepover walks at most this many referral levels before falling back to
/// Mother.
pub const SWEEPOVER_MAX_LEVELS: u32 = 60;

/// A matrix generation tree holds 3 + 9 + 27 members before recycling.
pub const MATRIX_TREE_CAPACITY: u32 = 39;

/// Partners required for a binary level recipient to be eligible.
pub const BINARY_LEVEL_MIN_PARTNERS: u32 = 2;

// ── Funds ───────────────────────────────────────────────────────────

/// Spark distribution across matrix levels 1–14, percent of the distributed
/// 80%. Sums to 100.
pub const SPARK_LEVEL_PERCENTAGES: [f64; 14] = [
    15.0, 10.0, 10.0, 10.0, 10.0, 7.0, 6.0, 6.0, 6.0, 4.0, 4.0, 4.0, 4.0, 4.0,
];

/// Share of the spark pool routed to the triple-entry sub-pool at payout.
pub const SPARK_TRIPLE_ENTRY_PCT: f64 = 20.0;

/// Royal Captain award tiers: (minimum team size, award USD). The first tier
/// pays at qualification (5 directs holding Matrix + Global).
pub const ROYAL_CAPTAIN_TIERS: [(u32, f64); 6] = [
    (0, 200.0),
    (10, 200.0),
    (20, 200.0),
    (30, 200.0),
    (40, 250.0),
    (50, 250.0),
];

/// Direct partners (each holding Matrix + Global) required for Royal Captain.
pub const ROYAL_CAPTAIN_MIN_DIRECTS: u32 = 5;

/// President Reward tiers: (minimum team size, award USD). Qualification
/// requires 10 directs and an 80-member team.
pub const PRESIDENT_TIERS: [(u32, f64); 5] = [
    (80, 500.0),
    (160, 700.0),
    (320, 700.0),
    (640, 800.0),
    (1280, 1500.0),
];

pub const PRESIDENT_MIN_DIRECTS: u32 = 10;

/// Leadership stipend: any slot at or above this number, in any program,
/// qualifies.
pub const STIPEND_MIN_SLOT: u8 = 10;
/// Daily stipend obligation = multiplier × price of the highest qualifying
/// slot, capped by pool solvency.
pub const STIPEND_DAILY_MULTIPLIER: f64 = 2.0;

/// Dream matrix: direct partners required to qualify.
pub const DREAM_MATRIX_MIN_DIRECTS: u32 = 3;
/// Dream matrix tranche percentages of the slot-5 base value.
pub const DREAM_MATRIX_TRANCHES: [f64; 5] = [10.0, 10.0, 15.0, 25.0, 40.0];
/// Slot whose price anchors the dream matrix tranche value.
pub const DREAM_MATRIX_BASE_SLOT: u8 = 5;

// ── Ranks ───────────────────────────────────────────────────────────

/// Rank thresholds: (total active slots across programs, rank).
pub const RANK_THRESHOLDS: [(u32, u8); 15] = [
    (1, 1),
    (2, 2),
    (3, 3),
    (4, 4),
    (5, 5),
    (6, 6),
    (8, 7),
    (10, 8),
    (12, 9),
    (14, 10),
    (16, 11),
    (18, 12),
    (20, 13),
    (25, 14),
    (30, 15),
];

/// Rank for a total active-slot count; 0 means unranked.
pub fn rank_for_total_slots(total: u32) -> u8 {
    let mut rank = 0;
    for (threshold, r) in RANK_THRESHOLDS {
        if total >= threshold {
            rank = r;
        }
    }
    rank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_tables_sum_to_100() {
        for program in Program::all() {
            let total: f64 = fund_percentages(program).iter().map(|(_, p)| p).sum();
            assert!((total - 100.0).abs() < 1e-9, "{program} sums to {total}");
        }
    }

    #[test]
    fn level_table_sums_to_100() {
        let total: f64 = LEVEL_PERCENTAGES.iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn spark_levels_sum_to_100() {
        let total: f64 = SPARK_LEVEL_PERCENTAGES.iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn matrix_prices_triple() {
        for i in 1..MATRIX_PRICES.len() {
            assert!((MATRIX_PRICES[i] - 3.0 * MATRIX_PRICES[i - 1]).abs() < 1e-6);
        }
    }

    #[test]
    fn binary_upgrade_cost_is_full_price_and_matrix_is_difference() {
        assert_eq!(upgrade_cost(Program::Binary, 3), Some(0.0088));
        assert_eq!(upgrade_cost(Program::Matrix, 2), Some(22.0));
        assert_eq!(upgrade_cost(Program::Matrix, 1), Some(11.0));
        assert_eq!(upgrade_cost(Program::Global, 2), Some(66.0));
    }

    #[test]
    fn two_binary_members_fund_the_next_slot() {
        // The first two slot-N members route 100% to the ancestor's reserve
        // for slot N+1; two slot-N prices must cover it exactly.
        for n in 1..16 {
            let reserve = 2.0 * BINARY_PRICES[n - 1];
            assert!((reserve - BINARY_PRICES[n]).abs() < 1e-9);
        }
    }
}
