use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battle::BattleOutcome;
use crate::fighter::{FighterId, TeamId};
use crate::progression::ProgressionStore;
use crate::stats::{compute_effective_stats, StatBlock};

pub const WIN_EXP: u32 = 50;
pub const WIN_POINTS: u32 = 10;
pub const LOSS_POINTS: u32 = 5;
/// Winner's experience under [`AwardRule::PerfectWin`] when it took damage.
pub const IMPERFECT_WIN_EXP: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardRule {
    /// Every winner gets 50 exp / 10 points, every loser half the exp and 5 points.
    #[default]
    Flat,
    /// 1v1 only: the winner earns 50 exp at full health and 25 otherwise; the loser
    /// half of 25. Team battles settle as [`AwardRule::Flat`].
    PerfectWin,
}

/// What one fighter earned, and where its card stands afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub fighter: FighterId,
    pub uuid: String,
    pub name: String,
    pub won: bool,
    pub exp: u32,
    pub points: u32,
    pub levels_gained: u32,
    pub level: u32,
    pub exp_after: u32,
    pub points_after: u32,
    /// Stats re-derived with the new level and current bonuses.
    pub stats: StatBlock,
}

/// `(exp, points)` for one fighter.
pub fn award_for(rule: AwardRule, won: bool, perfect: bool, duel: bool) -> (u32, u32) {
    let win_exp = match rule {
        AwardRule::PerfectWin if duel && !(won && perfect) => IMPERFECT_WIN_EXP,
        _ => WIN_EXP,
    };
    if won {
        (win_exp, WIN_POINTS)
    } else {
        (win_exp / 2, LOSS_POINTS)
    }
}

/// Pay out the battle to every fighter on both rosters, level up and persist once.
pub fn settle(store: &mut ProgressionStore, outcome: &BattleOutcome, rule: AwardRule) -> Vec<Award> {
    let duel = outcome.teams.iter().all(|t| t.fighters().count() == 1);
    let mut awards = Vec::new();

    for team_id in TeamId::BOTH {
        let won = team_id == outcome.winner;
        for fighter in outcome.teams[team_id.index()].fighters() {
            let (exp, points) = award_for(rule, won, fighter.at_full_health(), duel);
            let record = store.get_or_create(&fighter.record.uuid);
            record.points = record.points.saturating_add(points);
            let levels_gained = record.gain_exp(exp);
            let stats = compute_effective_stats(
                fighter.record.base_stats(),
                record.bonuses(),
                record.level,
            );
            if levels_gained > 0 {
                info!(
                    uuid = %fighter.record.uuid,
                    level = record.level,
                    levels_gained,
                    "card levelled up"
                );
            }
            awards.push(Award {
                fighter: fighter.id,
                uuid: fighter.record.uuid.clone(),
                name: fighter.record.name.clone(),
                won,
                exp,
                points,
                levels_gained,
                level: record.level,
                exp_after: record.exp,
                points_after: record.points,
                stats,
            });
        }
    }

    store.save();
    awards
}
