use crate::fighter::{Team, TeamId};
use crate::Dice;

const SPEED_WEIGHT: f64 = 0.02;

/// Probability that team one strikes this turn under the speed-initiative rules:
/// `0.5 ± |Δspeed| * 0.02`, faster side favoured, clamped to `[0, 1]`.
pub fn initiative_chance(speed_one: f64, speed_two: f64) -> f64 {
    let diff = speed_one - speed_two;
    (0.5 + diff * SPEED_WEIGHT).clamp(0.0, 1.0)
}

/// Acting side and multiplier for a speed-initiative turn.
pub fn roll_initiative(dice: &mut Dice, teams: &[Team; 2]) -> (TeamId, u32) {
    let p = initiative_chance(teams[0].mean_speed(), teams[1].mean_speed());
    let side = if dice.chance(p) { TeamId::One } else { TeamId::Two };
    (side, dice.multiplier())
}
