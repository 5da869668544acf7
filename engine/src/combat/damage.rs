use crate::fighter::Fighter;
use crate::Dice;

use super::{CombatRules, CombatRuleset, TurnResult};

const MITIGATION_FLOOR: u32 = 5;

/// Defender's block roll.
pub fn roll_block(dice: &mut Dice, rules: &CombatRules) -> bool {
    dice.chance(rules.effective_block_chance())
}

/// Damage before any block.
pub fn base_damage(ruleset: CombatRuleset, attack: u32, defence: u32, multiplier: u32) -> u32 {
    match ruleset {
        CombatRuleset::FlatMultiplier | CombatRuleset::SpeedInitiative => {
            attack.saturating_mul(multiplier)
        }
        CombatRuleset::DefenceMitigation => {
            // floor(attack * (1 - d / (d + 100))) == floor(attack * 100 / (d + 100))
            let mitigated = u64::from(attack) * 100 / (u64::from(defence) + 100);
            let scaled = mitigated.saturating_mul(u64::from(multiplier));
            u32::try_from(scaled).unwrap_or(u32::MAX).max(MITIGATION_FLOOR)
        }
    }
}

/// Damage that gets through a successful block.
pub fn blocked_damage(ruleset: CombatRuleset, damage: u32) -> u32 {
    match ruleset {
        CombatRuleset::SpeedInitiative => 0,
        CombatRuleset::FlatMultiplier | CombatRuleset::DefenceMitigation => (damage / 2).max(1),
    }
}

/// Resolve one strike and apply it to `target`. Runs to completion; `blocked` is the
/// outcome of the defender's block roll.
pub fn resolve_strike(
    rules: &CombatRules,
    attacker: &Fighter,
    target: &mut Fighter,
    multiplier: u32,
    blocked: bool,
    mut log: impl FnMut(String),
) -> TurnResult {
    let attack = attacker.stats.attack;
    let defence = target.stats.defence;
    let raw = base_damage(rules.ruleset, attack, defence, multiplier);
    let damage = if blocked {
        blocked_damage(rules.ruleset, raw)
    } else {
        raw
    };

    log(format!(
        "[ATTACK][{}] ATK {} ×{} vs {} (DEF {}) → {}{}",
        attacker.name(),
        attack,
        multiplier,
        target.name(),
        defence,
        damage,
        if blocked { " (BLOCKED)" } else { "" }
    ));

    let knocked_out = if damage > 0 {
        target.apply_damage(damage, &mut log)
    } else {
        log(format!("[BLOCK][{}] stops the attack", target.name()));
        false
    };

    TurnResult {
        attacker: attacker.id,
        target: target.id,
        attacker_name: attacker.name().to_string(),
        target_name: target.name().to_string(),
        damage,
        blocked,
        attack,
        defence,
        multiplier,
        target_hp_after: target.current_hp,
        knocked_out,
    }
}
