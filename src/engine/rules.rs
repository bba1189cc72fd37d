// Fixed rule tables: entry fees, answer rewards, the type-advantage cycle,
// evolution thresholds, revive costs, and the species lookup used when a
// team's creature evolves.

/// Maximum views/attempts per question.
pub const MAX_ATTEMPTS: u8 = 3;

/// Base reward for a correct answer before the advantage adjustment.
pub const BASE_REWARD: i64 = 500;

/// Bonus (or penalty, negated) applied when the team's creature type is
/// strong (or weak) against the question's creature type.
pub const ADVANTAGE_BONUS: i64 = 100;

pub const ENTRY_FEE_LEVEL_1: i64 = 100;
pub const ENTRY_FEE_LEVEL_2: i64 = 200;

pub const XP_STAGE_2: i64 = 4000;
pub const XP_STAGE_3: i64 = 8000;

/// Revive cost indexed by evolution stage (stage 1 first). Higher stages
/// pay less.
pub const REVIVE_COST: [i64; 3] = [300, 200, 100];

/// Species name per (type, stage). Row index is `poke_type - 1`, column
/// index is `stage - 1`.
pub const SPECIES: [[&str; 3]; 4] = [
    ["Charmander", "Charmeleon", "Charizard"],
    ["Squirtle", "Wartortle", "Blastoise"],
    ["Bulbasaur", "Ivysaur", "Venusaur"],
    ["Pichu", "Pikachu", "Raichu"],
];

/// Entry fee charged when a question is served.
pub fn entry_fee(difficulty_level: i64) -> i64 {
    if difficulty_level == 1 {
        ENTRY_FEE_LEVEL_1
    } else {
        ENTRY_FEE_LEVEL_2
    }
}

/// Advantage of the team's type over the opponent's type: +100, -100 or 0.
///
/// The cycle: 1 beats 2, 2 beats 4, 4 beats 3, 3 beats 1. Each type is
/// neutral against itself and the remaining type.
pub fn type_advantage(own: u8, opponent: u8) -> i64 {
    match (own, opponent) {
        (1, 2) | (2, 4) | (3, 1) | (4, 3) => ADVANTAGE_BONUS,
        (1, 3) | (2, 1) | (3, 4) | (4, 2) => -ADVANTAGE_BONUS,
        _ => 0,
    }
}

/// Reward for a correct answer: base plus advantage, doubled at level 2.
pub fn answer_reward(difficulty_level: i64, advantage: i64) -> i64 {
    let base = BASE_REWARD + advantage;
    if difficulty_level == 2 {
        2 * base
    } else {
        base
    }
}

/// Evolution stage a team's xp entitles it to.
pub fn evolution_stage(xp: i64) -> u8 {
    if xp >= XP_STAGE_3 {
        3
    } else if xp >= XP_STAGE_2 {
        2
    } else {
        1
    }
}

/// Pokecenter revive cost for the given evolution stage.
pub fn revive_cost(stage: u8) -> i64 {
    REVIVE_COST[(stage.clamp(1, 3) - 1) as usize]
}

/// Species name for a creature of `poke_type` at `stage`, if both are in
/// range.
pub fn species_for(poke_type: u8, stage: u8) -> Option<&'static str> {
    if !(1..=4).contains(&poke_type) || !(1..=3).contains(&stage) {
        return None;
    }
    Some(SPECIES[(poke_type - 1) as usize][(stage - 1) as usize])
}
