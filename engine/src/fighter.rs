use std::fmt;

use serde::{Deserialize, Serialize};

use crate::progression::ProgressionRecord;
use crate::record::CharacterRecord;
use crate::stats::{compute_effective_stats, StatBlock};

/// Roster positions per side.
pub const SLOTS_PER_TEAM: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamId {
    One,
    Two,
}

impl TeamId {
    pub const BOTH: [TeamId; 2] = [TeamId::One, TeamId::Two];

    pub fn opponent(self) -> TeamId {
        match self {
            TeamId::One => TeamId::Two,
            TeamId::Two => TeamId::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TeamId::One => 0,
            TeamId::Two => 1,
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamId::One => write!(f, "P1"),
            TeamId::Two => write!(f, "P2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FighterId {
    pub team: TeamId,
    pub slot: usize,
}

impl FighterId {
    pub fn new(team: TeamId, slot: usize) -> Self {
        Self { team, slot }
    }
}

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.team, self.slot + 1)
    }
}

/// A card brought to life for one battle. Only `current_hp` changes while fighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub id: FighterId,
    pub record: CharacterRecord,
    pub level: u32,
    pub stats: StatBlock,
    pub current_hp: u32,
}

impl Fighter {
    pub fn derive(id: FighterId, record: CharacterRecord, progress: &ProgressionRecord) -> Self {
        let level = progress.level.max(1);
        let stats = compute_effective_stats(record.base_stats(), progress.bonuses(), level);
        Self {
            id,
            record,
            level,
            stats,
            current_hp: stats.hp,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn max_hp(&self) -> u32 {
        self.stats.hp
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    pub fn at_full_health(&self) -> bool {
        self.current_hp == self.stats.hp
    }

    /// Remove `dmg` hit points, flooring at 0. Returns true if this call knocked the fighter out.
    pub fn apply_damage(&mut self, dmg: u32, mut log: impl FnMut(String)) -> bool {
        if !self.is_alive() {
            return false;
        }
        let before = self.current_hp;
        self.current_hp = self.current_hp.saturating_sub(dmg);
        log(format!(
            "[HP][{}] {} → {} / {} (−{})",
            self.record.name, before, self.current_hp, self.stats.hp, dmg
        ));
        if self.current_hp == 0 {
            log(format!("[STATE][{}] is knocked out", self.record.name));
            return true;
        }
        false
    }
}

/// One side of the battle: fixed slots, each empty or holding a fighter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub slots: [Option<Fighter>; SLOTS_PER_TEAM],
}

impl Team {
    pub fn fighters(&self) -> impl Iterator<Item = &Fighter> {
        self.slots.iter().flatten()
    }

    pub fn living(&self) -> impl Iterator<Item = &Fighter> {
        self.fighters().filter(|f| f.is_alive())
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters().next().is_none()
    }

    /// Alive iff any member still has hit points.
    pub fn is_alive(&self) -> bool {
        self.living().next().is_some()
    }

    /// Every assigned member is at 0 hp. An empty team counts as defeated.
    pub fn is_defeated(&self) -> bool {
        !self.is_alive()
    }

    pub fn get(&self, slot: usize) -> Option<&Fighter> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Fighter> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Mean speed of living members, used by the speed-initiative ruleset.
    pub fn mean_speed(&self) -> f64 {
        let (sum, n) = self
            .living()
            .fold((0u64, 0u64), |(s, n), f| (s + u64::from(f.record.speed), n + 1));
        if n == 0 { 0.0 } else { sum as f64 / n as f64 }
    }
}
