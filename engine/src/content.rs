use crate::record::RawCard;
use crate::Dice;

/// Progression document shipped with the game, used when nothing has been saved yet.
pub const BUNDLED_PROGRESSION: &str = include_str!("../content/character_upgrades.json");

const BUILTIN_CHARACTERS: &str = include_str!("../content/characters.json");

pub fn builtin_characters() -> Vec<RawCard> {
    // The roster is compiled in; a broken file is caught by the content tests.
    serde_json::from_str(BUILTIN_CHARACTERS).unwrap_or_default()
}

pub fn find_builtin(name: &str) -> Option<RawCard> {
    builtin_characters().into_iter().find(|c| {
        c.name
            .as_ref()
            .and_then(|n| n.as_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(name.trim()))
    })
}

/// Default character for a tag that carried no character data, chosen by summing
/// the hex octets of its serial number (`"04:a2:1f"` → 0x04 + 0xa2 + 0x1f).
pub fn fallback_for_serial(serial: &str) -> Option<RawCard> {
    let roster = builtin_characters();
    if roster.is_empty() {
        return None;
    }
    let hash: u64 = serial
        .split(':')
        .filter_map(|octet| u64::from_str_radix(octet.trim(), 16).ok())
        .sum();
    let index = (hash % roster.len() as u64) as usize;
    roster.into_iter().nth(index)
}

pub fn random_fallback(dice: &mut Dice) -> Option<RawCard> {
    let roster = builtin_characters();
    if roster.is_empty() {
        return None;
    }
    let index = dice.index(roster.len());
    roster.into_iter().nth(index)
}
