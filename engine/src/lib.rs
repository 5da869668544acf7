use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod api;
pub mod arena;
pub mod battle;
pub mod combat;
pub mod config;
pub mod content;
pub mod fighter;
pub mod progression;
pub mod record;
pub mod roulette;
pub mod scan;
pub mod settlement;
pub mod stats;

pub use arena::Arena;
pub use battle::{BattleEvent, BattleSession, Phase};
pub use combat::{CombatRules, CombatRuleset, TurnResult};
pub use config::ArenaConfig;
pub use fighter::{Fighter, FighterId, Team, TeamId};
pub use progression::{ProgressionRecord, ProgressionStore, StatKind};
pub use record::{CharacterRecord, RawCard};
pub use settlement::{Award, AwardRule};
pub use stats::{compute_effective_stats, BonusBlock, StatBlock};

/// Lowest and highest value a roulette slot (and therefore a turn multiplier) can hold.
pub const MULTIPLIER_MIN: u32 = 1;
pub const MULTIPLIER_MAX: u32 = 5;

/// Seeded random source shared by the roulette, block rolls and legacy initiative.
pub struct Dice { rng: ChaCha8Rng }

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Uniform roll in `[MULTIPLIER_MIN, MULTIPLIER_MAX]`.
    pub fn multiplier(&mut self) -> u32 {
        self.rng.gen_range(MULTIPLIER_MIN..=MULTIPLIER_MAX)
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.rng.gen_bool(p)
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform roll in `lo..=hi`.
    pub fn between(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }
}
