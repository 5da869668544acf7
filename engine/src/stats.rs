use serde::{Deserialize, Serialize};

/// Stat increment granted by one bonus point.
pub const BONUS_STEP: u32 = 100;

/// Hit points, attack and defence in one bundle. Used both for card base stats and
/// for the effective stats a fighter carries into battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    pub hp: u32,
    pub attack: u32,
    pub defence: u32,
}

impl StatBlock {
    pub fn new(hp: u32, attack: u32, defence: u32) -> Self {
        Self { hp, attack, defence }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusBlock {
    pub hp_bonus: u32,
    pub attack_bonus: u32,
    pub defence_bonus: u32,
}

/// `stat = floor((base + bonus * 100) * level)` for each of hp/attack/defence.
///
/// Bases below 1 are lifted to 1 and `level` 0 is treated as 1. Arithmetic
/// saturates instead of wrapping.
pub fn compute_effective_stats(base: StatBlock, bonus: BonusBlock, level: u32) -> StatBlock {
    let level = level.max(1);
    StatBlock {
        hp: scale(base.hp, bonus.hp_bonus, level),
        attack: scale(base.attack, bonus.attack_bonus, level),
        defence: scale(base.defence, bonus.defence_bonus, level),
    }
}

fn scale(base: u32, bonus: u32, level: u32) -> u32 {
    base.max(1)
        .saturating_add(bonus.saturating_mul(BONUS_STEP))
        .saturating_mul(level)
}
