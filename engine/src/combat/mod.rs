//! Strike resolution and the rule variants that drive it.
//!
//! The rule set is chosen once, when a session is created. Turn order comes
//! from the roulette for [`CombatRuleset::FlatMultiplier`] and
//! [`CombatRuleset::DefenceMitigation`], and from relative speed for
//! [`CombatRuleset::SpeedInitiative`].

pub mod damage;
pub mod initiative;

use serde::{Deserialize, Serialize};

use crate::fighter::FighterId;

pub use damage::{base_damage, blocked_damage, resolve_strike, roll_block};
pub use initiative::{initiative_chance, roll_initiative};

pub const DEFAULT_BLOCK_CHANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatRuleset {
    /// `attack * multiplier`; a block halves it (minimum 1). Defence is not applied.
    #[default]
    FlatMultiplier,
    /// Speed decides who strikes, the multiplier is a free 1..=5 roll, a block stops the hit.
    /// Blocks always land at [`DEFAULT_BLOCK_CHANCE`]; the configured chance is ignored.
    SpeedInitiative,
    /// Defence mitigates as a percentage: `max(5, floor(attack * 100 / (defence + 100)) * m)`.
    DefenceMitigation,
}

impl CombatRuleset {
    pub fn uses_roulette(self) -> bool {
        !matches!(self, CombatRuleset::SpeedInitiative)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub ruleset: CombatRuleset,
    pub block_chance: f64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            ruleset: CombatRuleset::default(),
            block_chance: DEFAULT_BLOCK_CHANCE,
        }
    }
}

impl CombatRules {
    pub fn new(ruleset: CombatRuleset) -> Self {
        Self {
            ruleset,
            ..Self::default()
        }
    }

    /// Chance the defender blocks under the active rule set.
    pub fn effective_block_chance(&self) -> f64 {
        match self.ruleset {
            CombatRuleset::SpeedInitiative => DEFAULT_BLOCK_CHANCE,
            CombatRuleset::FlatMultiplier | CombatRuleset::DefenceMitigation => self.block_chance,
        }
    }
}

/// Everything that happened in one strike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub attacker: FighterId,
    pub target: FighterId,
    pub attacker_name: String,
    pub target_name: String,
    pub damage: u32,
    pub blocked: bool,
    pub attack: u32,
    pub defence: u32,
    pub multiplier: u32,
    pub target_hp_after: u32,
    pub knocked_out: bool,
}
