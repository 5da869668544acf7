use engine::battle::{victor, BattleEvent, BattleSession, CommandError, Phase};
use engine::{
    CharacterRecord, CombatRules, CombatRuleset, Fighter, FighterId, ProgressionRecord, RawCard,
    Team, TeamId,
};

fn fighter(team: TeamId, slot: usize, name: &str, hp: u32, attack: u32) -> Fighter {
    let raw = RawCard::new(name, &format!("beyonder-{name}"), hp, attack, 10);
    let record = CharacterRecord::from_raw(&raw, "beyonder").unwrap();
    Fighter::derive(FighterId::new(team, slot), record, &ProgressionRecord::default())
}

fn duel(seed: u64) -> BattleSession {
    let mut s = BattleSession::new(CombatRules::default(), seed);
    s.admit(fighter(TeamId::One, 0, "hero", 100, 10)).unwrap();
    s.admit(fighter(TeamId::Two, 0, "foe", 100, 10)).unwrap();
    s
}

fn step(session: &mut BattleSession) -> bool {
    match session.phase() {
        Phase::RouletteInFlight => {
            session.stop_roulette(TeamId::One).unwrap();
            session.stop_roulette(TeamId::Two).unwrap();
        }
        Phase::Intermission => session.next_turn().unwrap(),
        Phase::ActionSelection {
            side,
            attacker: None,
            ..
        } => {
            let id = session.team(side).living().next().unwrap().id;
            session.select_attacker(id).unwrap();
        }
        Phase::ActionSelection {
            side,
            attacker: Some(_),
            ..
        } => {
            let id = session.team(side.opponent()).living().next().unwrap().id;
            session.select_target(id).unwrap();
        }
        Phase::Terminal { .. } => return false,
        Phase::Setup => panic!("battle not started"),
    }
    true
}

fn run_to_end(session: &mut BattleSession) {
    for _ in 0..1000 {
        if !step(session) {
            return;
        }
    }
    panic!("battle did not finish");
}

#[test]
fn side_with_all_members_down_is_defeated() {
    let mut down = fighter(TeamId::One, 0, "a1", 100, 10);
    down.current_hp = 0;
    let mut hurt = fighter(TeamId::One, 1, "a2", 100, 10);
    hurt.current_hp = 50;
    let mut lone = fighter(TeamId::Two, 0, "b1", 100, 10);
    lone.current_hp = 0;

    let team_a = Team {
        slots: [Some(down), Some(hurt)],
    };
    let team_b = Team {
        slots: [Some(lone), None],
    };
    assert!(team_a.is_alive());
    assert!(team_b.is_defeated());
    assert_eq!(victor(&[team_a, team_b]), Some(TeamId::One));
}

#[test]
fn begin_needs_a_living_fighter_on_both_sides() {
    let mut s = BattleSession::new(CombatRules::default(), 1);
    s.admit(fighter(TeamId::One, 0, "hero", 100, 10)).unwrap();
    assert_eq!(s.begin(), Err(CommandError::RosterIncomplete));

    let mut ghost = fighter(TeamId::Two, 0, "ghost", 100, 10);
    ghost.current_hp = 0;
    s.admit(ghost).unwrap();
    assert_eq!(s.begin(), Err(CommandError::RosterIncomplete));
    assert_eq!(s.phase(), Phase::Setup);
}

#[test]
fn slots_beyond_two_are_refused() {
    let mut s = BattleSession::new(CombatRules::default(), 1);
    let err = s.admit(fighter(TeamId::One, 2, "third", 100, 10)).unwrap_err();
    assert_eq!(err, CommandError::SlotOutOfRange(2));
}

#[test]
fn roster_changes_are_announced() {
    let mut s = duel(5);
    s.remove(TeamId::Two, 0).unwrap();
    let events = s.drain_events();
    let updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::RosterUpdated { team, fighters } => Some((*team, fighters.len())),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![(TeamId::One, 1), (TeamId::Two, 1), (TeamId::Two, 0)]
    );
}

#[test]
fn commands_out_of_phase_are_rejected() {
    let mut s = duel(11);
    assert!(matches!(
        s.stop_roulette(TeamId::One),
        Err(CommandError::WrongPhase { .. })
    ));
    s.begin().unwrap();
    assert_eq!(s.phase(), Phase::RouletteInFlight);
    assert!(matches!(
        s.admit(fighter(TeamId::One, 1, "late", 100, 10)),
        Err(CommandError::WrongPhase { .. })
    ));
    assert!(matches!(s.next_turn(), Err(CommandError::WrongPhase { .. })));
}

#[test]
fn duel_runs_to_a_single_winner() {
    let mut s = duel(2025);
    s.begin().unwrap();
    run_to_end(&mut s);

    let winner = s.winner().expect("winner");
    assert!(s.team(winner).is_alive());
    assert!(s.team(winner.opponent()).is_defeated());
    assert!(s.log().last().unwrap().starts_with("[END]"));

    // absorbing
    assert!(matches!(s.next_turn(), Err(CommandError::WrongPhase { .. })));
    assert!(matches!(
        s.stop_roulette(TeamId::One),
        Err(CommandError::WrongPhase { .. })
    ));
}

#[test]
fn every_decided_roulette_produces_one_strike_and_ties_none() {
    for seed in 0..20 {
        let mut s = duel(seed);
        s.begin().unwrap();
        run_to_end(&mut s);
        let events = s.drain_events();

        let mut pending: Option<Option<TeamId>> = None;
        let mut strikes = 0;
        let mut decided = 0;
        for event in &events {
            match event {
                BattleEvent::RouletteResolved { winner, .. } => {
                    assert!(pending.is_none(), "resolved twice in one turn");
                    pending = Some(*winner);
                    if winner.is_some() {
                        decided += 1;
                    }
                }
                BattleEvent::TurnResolved(result) => {
                    let Some(Some(side)) = pending.take() else {
                        panic!("strike without a decided roulette");
                    };
                    assert_eq!(result.attacker.team, side);
                    let raw = result.attack * result.multiplier;
                    let expected = if result.blocked { (raw / 2).max(1) } else { raw };
                    assert_eq!(result.damage, expected);
                    strikes += 1;
                }
                BattleEvent::TurnStarted { .. } => {
                    if let Some(winner) = pending.take() {
                        assert!(winner.is_none(), "decided roulette without a strike");
                    }
                }
                _ => {}
            }
        }
        assert_eq!(strikes, decided);
    }
}

#[test]
fn outcome_is_handed_out_once() {
    let mut s = duel(77);
    assert!(s.take_outcome().is_none());
    s.begin().unwrap();
    run_to_end(&mut s);
    let outcome = s.take_outcome().expect("first take");
    assert_eq!(Some(outcome.winner), s.winner());
    assert_eq!(outcome.turns, s.turn());
    assert!(s.take_outcome().is_none());
}

#[test]
fn team_turns_wait_for_attacker_and_target_choices() {
    let mut s = BattleSession::new(CombatRules::default(), 404);
    s.admit(fighter(TeamId::One, 0, "a1", 100, 10)).unwrap();
    s.admit(fighter(TeamId::One, 1, "a2", 100, 10)).unwrap();
    s.admit(fighter(TeamId::Two, 0, "b1", 300, 10)).unwrap();
    s.begin().unwrap();

    for _ in 0..100 {
        if matches!(s.phase(), Phase::ActionSelection { .. }) {
            break;
        }
        step(&mut s);
    }

    match s.phase() {
        Phase::ActionSelection {
            side: TeamId::One,
            attacker: None,
            ..
        } => {
            assert!(matches!(
                s.select_target(FighterId::new(TeamId::Two, 0)),
                Err(CommandError::WrongPhase { .. })
            ));
            assert_eq!(
                s.select_attacker(FighterId::new(TeamId::Two, 0)),
                Err(CommandError::NotActingSide(FighterId::new(TeamId::Two, 0)))
            );
            assert_eq!(
                s.select_attacker(FighterId::new(TeamId::One, 5)),
                Err(CommandError::UnknownFighter(FighterId::new(TeamId::One, 5)))
            );
            s.select_attacker(FighterId::new(TeamId::One, 1)).unwrap();
        }
        Phase::ActionSelection {
            side: TeamId::Two,
            attacker: Some(attacker),
            ..
        } => {
            assert_eq!(attacker, FighterId::new(TeamId::Two, 0));
            assert_eq!(
                s.select_attacker(attacker),
                Err(CommandError::AttackerAlreadyChosen)
            );
            assert_eq!(
                s.select_target(attacker),
                Err(CommandError::NotOpponent(attacker))
            );
            s.select_target(FighterId::new(TeamId::One, 1)).unwrap();
        }
        other => panic!("unexpected phase {other:?}"),
    }

    let strikes: Vec<_> = s
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            BattleEvent::TurnResolved(r) => Some(r),
            _ => None,
        })
        .collect();
    let last = strikes.last().expect("a strike happened");
    assert!(last.attacker == FighterId::new(TeamId::One, 1) || last.target == FighterId::new(TeamId::One, 1));
}

#[test]
fn speed_rules_skip_the_roulette() {
    let mut s = BattleSession::new(CombatRules::new(CombatRuleset::SpeedInitiative), 9);
    s.admit(fighter(TeamId::One, 0, "hero", 100, 10)).unwrap();
    s.admit(fighter(TeamId::Two, 0, "foe", 100, 10)).unwrap();
    s.begin().unwrap();
    assert_ne!(s.phase(), Phase::RouletteInFlight);
    assert!(s.spin_handle().is_none());
    assert!(
        s.drain_events()
            .iter()
            .any(|e| matches!(e, BattleEvent::InitiativeRolled { .. }))
    );
    run_to_end(&mut s);
    assert!(s.winner().is_some());
}
