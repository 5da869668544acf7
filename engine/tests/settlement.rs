use engine::battle::BattleOutcome;
use engine::progression::{required_exp, MemoryBackend, ProgressionRecord, ProgressionStore};
use engine::settlement::{award_for, settle, AwardRule};
use engine::{CharacterRecord, Fighter, FighterId, RawCard, Team, TeamId};
use proptest::prelude::*;

fn fighter(team: TeamId, slot: usize, uuid: &str, hp_left: u32) -> Fighter {
    let raw = RawCard::new(uuid, uuid, 100, 10, 10);
    let record = CharacterRecord::from_raw(&raw, "beyonder").unwrap();
    let mut f = Fighter::derive(FighterId::new(team, slot), record, &ProgressionRecord::default());
    f.current_hp = hp_left;
    f
}

fn outcome(winner: TeamId, one: Vec<Fighter>, two: Vec<Fighter>) -> BattleOutcome {
    let team = |fighters: Vec<Fighter>| {
        let mut t = Team::default();
        for f in fighters {
            let slot = f.id.slot;
            t.slots[slot] = Some(f);
        }
        t
    };
    BattleOutcome {
        winner,
        turns: 3,
        teams: [team(one), team(two)],
    }
}

fn duel(winner_hp: u32) -> BattleOutcome {
    outcome(
        TeamId::One,
        vec![fighter(TeamId::One, 0, "beyonder-w", winner_hp)],
        vec![fighter(TeamId::Two, 0, "beyonder-l", 0)],
    )
}

#[test]
fn fifty_exp_twice_reaches_level_two() {
    let mut rec = ProgressionRecord::default();
    assert_eq!(rec.gain_exp(50), 0);
    assert_eq!((rec.level, rec.exp), (1, 50));
    assert_eq!(rec.gain_exp(50), 1);
    assert_eq!((rec.level, rec.exp), (2, 0));
}

#[test]
fn a_large_grant_crosses_several_levels() {
    let mut rec = ProgressionRecord::default();
    // 100 for level 1, 200 for level 2, 30 left over at level 3
    assert_eq!(rec.gain_exp(330), 2);
    assert_eq!((rec.level, rec.exp), (3, 30));
}

#[test]
fn flat_awards_ignore_health() {
    assert_eq!(award_for(AwardRule::Flat, true, false, true), (50, 10));
    assert_eq!(award_for(AwardRule::Flat, true, true, true), (50, 10));
    assert_eq!(award_for(AwardRule::Flat, false, false, false), (25, 5));
}

#[test]
fn perfect_win_rewards_an_untouched_duelist() {
    assert_eq!(award_for(AwardRule::PerfectWin, true, true, true), (50, 10));
    assert_eq!(award_for(AwardRule::PerfectWin, true, false, true), (25, 10));
    assert_eq!(award_for(AwardRule::PerfectWin, false, false, true), (12, 5));
    // team battles settle flat
    assert_eq!(award_for(AwardRule::PerfectWin, true, false, false), (50, 10));
    assert_eq!(award_for(AwardRule::PerfectWin, false, false, false), (25, 5));
}

#[test]
fn settle_pays_both_sides_and_persists() {
    let backend = MemoryBackend::with_document("{}");
    let mut store = ProgressionStore::load(backend.clone());
    assert!(store.records().is_empty());

    let awards = settle(&mut store, &duel(40), AwardRule::Flat);
    assert_eq!(awards.len(), 2);

    let winner = &awards[0];
    assert!(winner.won);
    assert_eq!((winner.exp, winner.points), (50, 10));
    assert_eq!((winner.level, winner.exp_after, winner.points_after), (1, 50, 10));

    let loser = &awards[1];
    assert!(!loser.won);
    assert_eq!((loser.exp, loser.points), (25, 5));

    let saved = backend.document().expect("saved");
    let doc: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(doc["beyonder-w"]["exp"], 50);
    assert_eq!(doc["beyonder-w"]["points"], 10);
    assert_eq!(doc["beyonder-l"]["exp"], 25);
}

#[test]
fn levelling_up_reports_rederived_stats() {
    let mut store = ProgressionStore::in_memory();
    store.get_or_create("beyonder-w").exp = 60;
    store.get_or_create("beyonder-w").attack_bonus = 1;

    let awards = settle(&mut store, &duel(100), AwardRule::Flat);
    let winner = &awards[0];
    assert_eq!(winner.levels_gained, 1);
    assert_eq!(winner.level, 2);
    assert_eq!(winner.exp_after, 10);
    assert_eq!(winner.stats.hp, 200);
    assert_eq!(winner.stats.attack, (10 + 100) * 2);
    assert_eq!(winner.stats.defence, 20);
}

#[test]
fn knocked_out_teammates_of_the_winner_still_win() {
    let result = outcome(
        TeamId::Two,
        vec![
            fighter(TeamId::One, 0, "beyonder-a", 0),
            fighter(TeamId::One, 1, "beyonder-b", 0),
        ],
        vec![
            fighter(TeamId::Two, 0, "beyonder-c", 0),
            fighter(TeamId::Two, 1, "beyonder-d", 100),
        ],
    );
    let mut store = ProgressionStore::in_memory();
    let awards = settle(&mut store, &result, AwardRule::PerfectWin);
    let won: Vec<_> = awards.iter().map(|a| (a.uuid.as_str(), a.won, a.exp)).collect();
    assert_eq!(
        won,
        vec![
            ("beyonder-a", false, 25),
            ("beyonder-b", false, 25),
            ("beyonder-c", true, 50),
            ("beyonder-d", true, 50),
        ]
    );
}

proptest! {
    #[test]
    fn exp_always_stays_below_the_threshold(start_level in 1u32..20, start_exp in 0u32..100, grant in 0u32..5_000) {
        let mut rec = ProgressionRecord { level: start_level, exp: start_exp, ..ProgressionRecord::default() };
        let before = rec.level;
        let gained = rec.gain_exp(grant);
        prop_assert_eq!(rec.level, before + gained);
        prop_assert!(rec.exp < required_exp(rec.level));
    }
}
