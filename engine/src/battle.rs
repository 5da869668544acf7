use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::combat::{resolve_strike, roll_block, roll_initiative, CombatRules, TurnResult};
use crate::fighter::{Fighter, FighterId, Team, TeamId, SLOTS_PER_TEAM};
use crate::record::RecordError;
use crate::roulette::{Roulette, RouletteError, RouletteOutcome, SpinHandle};
use crate::settlement::Award;
use crate::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    Setup,
    RouletteInFlight,
    ActionSelection {
        side: TeamId,
        multiplier: u32,
        attacker: Option<FighterId>,
    },
    Intermission,
    Terminal {
        winner: TeamId,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::RouletteInFlight => "roulette",
            Phase::ActionSelection { .. } => "action-selection",
            Phase::Intermission => "intermission",
            Phase::Terminal { .. } => "terminal",
        }
    }

    pub fn in_progress(&self) -> bool {
        !matches!(self, Phase::Setup | Phase::Terminal { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("cannot {action} during {phase}")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },
    #[error("slot {0} does not exist")]
    SlotOutOfRange(usize),
    #[error("both sides need a living fighter before the battle can begin")]
    RosterIncomplete,
    #[error("no fighter at {0}")]
    UnknownFighter(FighterId),
    #[error("{0} is knocked out")]
    FighterDown(FighterId),
    #[error("{0} is not on the acting side")]
    NotActingSide(FighterId),
    #[error("{0} is not on the opposing side")]
    NotOpponent(FighterId),
    #[error("the attacker for this turn is already chosen")]
    AttackerAlreadyChosen,
    #[error(transparent)]
    Roulette(#[from] RouletteError),
    #[error(transparent)]
    InvalidCard(#[from] RecordError),
}

/// What a UI shows for a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterSummary {
    pub id: FighterId,
    pub name: String,
    pub sprite: String,
    pub image_url: Option<String>,
    pub uuid: String,
    pub level: u32,
    pub max_hp: u32,
    pub current_hp: u32,
    pub attack: u32,
    pub defence: u32,
}

impl From<&Fighter> for FighterSummary {
    fn from(f: &Fighter) -> Self {
        Self {
            id: f.id,
            name: f.record.name.clone(),
            sprite: f.record.sprite.clone(),
            image_url: f.record.image_url.clone(),
            uuid: f.record.uuid.clone(),
            level: f.level,
            max_hp: f.stats.hp,
            current_hp: f.current_hp,
            attack: f.stats.attack,
            defence: f.stats.defence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum BattleEvent {
    RosterUpdated {
        team: TeamId,
        fighters: Vec<FighterSummary>,
    },
    SlotRejected {
        team: TeamId,
        slot: usize,
        reason: String,
    },
    ScanTimedOut {
        team: TeamId,
        slot: usize,
    },
    BattleStarted,
    TurnStarted {
        turn: u32,
    },
    RouletteTick {
        side: TeamId,
        value: u32,
    },
    /// `winner` is `None` on a tie.
    RouletteResolved {
        winner: Option<TeamId>,
        value: u32,
        values: [u32; 2],
    },
    InitiativeRolled {
        side: TeamId,
        multiplier: u32,
    },
    AwaitingAttacker {
        side: TeamId,
        candidates: Vec<FighterId>,
    },
    AwaitingTarget {
        attacker: FighterId,
        candidates: Vec<FighterId>,
    },
    TurnResolved(TurnResult),
    FighterDown {
        fighter: FighterId,
    },
    BattleEnded {
        winning_team: TeamId,
        awards: Vec<Award>,
    },
}

/// The finished battle, handed out once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleOutcome {
    pub winner: TeamId,
    pub turns: u32,
    pub teams: [Team; 2],
}

/// `Some(side)` when exactly one side has been wiped out and `side` is the other one.
pub fn victor(teams: &[Team; 2]) -> Option<TeamId> {
    match (teams[0].is_defeated(), teams[1].is_defeated()) {
        (false, true) => Some(TeamId::One),
        (true, false) => Some(TeamId::Two),
        _ => None,
    }
}

/// One battle from roster setup to the final blow.
pub struct BattleSession {
    rules: CombatRules,
    dice: Dice,
    teams: [Team; 2],
    phase: Phase,
    turn: u32,
    roulette: Roulette,
    spin: Option<SpinHandle>,
    events: Vec<BattleEvent>,
    log: Vec<String>,
    outcome_taken: bool,
}

impl BattleSession {
    pub fn new(rules: CombatRules, seed: u64) -> Self {
        Self {
            rules,
            dice: Dice::from_seed(seed),
            teams: [Team::default(), Team::default()],
            phase: Phase::Setup,
            turn: 0,
            roulette: Roulette::new(),
            spin: None,
            events: Vec::new(),
            log: Vec::new(),
            outcome_taken: false,
        }
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn teams(&self) -> &[Team; 2] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id.index()]
    }

    pub fn fighter(&self, id: FighterId) -> Option<&Fighter> {
        self.team(id.team).get(id.slot)
    }

    pub fn roulette(&self) -> &Roulette {
        &self.roulette
    }

    /// Handle for the spin in flight, for the timer that drives `tick`.
    pub fn spin_handle(&self) -> Option<SpinHandle> {
        self.spin.filter(|h| self.roulette.is_current(*h))
    }

    pub fn winner(&self) -> Option<TeamId> {
        match self.phase {
            Phase::Terminal { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    fn require_setup(&self, action: &'static str) -> Result<(), CommandError> {
        if self.phase == Phase::Setup {
            Ok(())
        } else {
            Err(CommandError::WrongPhase {
                action,
                phase: self.phase.name(),
            })
        }
    }

    fn roster_updated(&mut self, team: TeamId) {
        let fighters = self.team(team).fighters().map(FighterSummary::from).collect();
        self.events.push(BattleEvent::RosterUpdated { team, fighters });
    }

    /// Place a fighter in its slot, replacing whoever was there.
    pub fn admit(&mut self, fighter: Fighter) -> Result<(), CommandError> {
        self.require_setup("assign a slot")?;
        let id = fighter.id;
        if id.slot >= SLOTS_PER_TEAM {
            return Err(CommandError::SlotOutOfRange(id.slot));
        }
        debug!(fighter = %id, name = %fighter.name(), "fighter admitted");
        self.teams[id.team.index()].slots[id.slot] = Some(fighter);
        self.roster_updated(id.team);
        Ok(())
    }

    pub fn remove(&mut self, team: TeamId, slot: usize) -> Result<Option<Fighter>, CommandError> {
        self.require_setup("clear a slot")?;
        if slot >= SLOTS_PER_TEAM {
            return Err(CommandError::SlotOutOfRange(slot));
        }
        let removed = self.teams[team.index()].slots[slot].take();
        if removed.is_some() {
            self.roster_updated(team);
        }
        Ok(removed)
    }

    pub fn begin(&mut self) -> Result<(), CommandError> {
        self.require_setup("begin the battle")?;
        if !self.teams.iter().all(Team::is_alive) {
            return Err(CommandError::RosterIncomplete);
        }
        info!(
            ruleset = ?self.rules.ruleset,
            team_one = self.teams[0].living_count(),
            team_two = self.teams[1].living_count(),
            "battle started"
        );
        for team in &self.teams {
            for f in team.fighters() {
                self.log.push(format!(
                    "[START][{}] {} Lv{} (HP {}, ATK {}, DEF {})",
                    f.id,
                    f.name(),
                    f.level,
                    f.stats.hp,
                    f.stats.attack,
                    f.stats.defence
                ));
            }
        }
        self.events.push(BattleEvent::BattleStarted);
        self.start_turn();
        Ok(())
    }

    /// Leave the intermission after a tie or a non-final strike.
    pub fn next_turn(&mut self) -> Result<(), CommandError> {
        if self.phase != Phase::Intermission {
            return Err(CommandError::WrongPhase {
                action: "start the next turn",
                phase: self.phase.name(),
            });
        }
        self.start_turn();
        Ok(())
    }

    fn start_turn(&mut self) {
        self.turn += 1;
        self.events.push(BattleEvent::TurnStarted { turn: self.turn });

        if self.rules.ruleset.uses_roulette() {
            self.log.push(format!("[TURN] {} → roulette", self.turn));
            self.spin = Some(self.roulette.spin(&mut self.dice));
            self.phase = Phase::RouletteInFlight;
        } else {
            let (side, multiplier) = roll_initiative(&mut self.dice, &self.teams);
            self.log.push(format!(
                "[TURN] {} → {} by speed (×{})",
                self.turn, side, multiplier
            ));
            self.events.push(BattleEvent::InitiativeRolled { side, multiplier });
            self.act(side, multiplier);
        }
    }

    /// Re-roll the unstopped roulette slots. Ticks from a stale handle do nothing.
    pub fn tick(&mut self, handle: SpinHandle) -> Vec<(TeamId, u32)> {
        if self.phase != Phase::RouletteInFlight {
            return Vec::new();
        }
        let rolled = self.roulette.tick(handle, &mut self.dice);
        for &(side, value) in &rolled {
            self.events.push(BattleEvent::RouletteTick { side, value });
        }
        rolled
    }

    /// Freeze `side`'s roulette. The turn resolves on the second stop.
    pub fn stop_roulette(&mut self, side: TeamId) -> Result<Option<RouletteOutcome>, CommandError> {
        if self.phase != Phase::RouletteInFlight {
            return Err(CommandError::WrongPhase {
                action: "stop the roulette",
                phase: self.phase.name(),
            });
        }
        let Some(outcome) = self.roulette.stop(side)? else {
            debug!(%side, value = self.roulette.value(side), "roulette stopped");
            return Ok(None);
        };
        self.spin = None;

        match outcome {
            RouletteOutcome::Winner {
                side: winner,
                multiplier,
                values,
            } => {
                self.log.push(format!(
                    "[ROULETTE] P1 {} vs P2 {} → {} acts (×{})",
                    values[0], values[1], winner, multiplier
                ));
                self.events.push(BattleEvent::RouletteResolved {
                    winner: Some(winner),
                    value: multiplier,
                    values,
                });
                self.act(winner, multiplier);
            }
            RouletteOutcome::Tie { value } => {
                self.log
                    .push(format!("[ROULETTE] tie at {} → no one acts", value));
                self.events.push(BattleEvent::RouletteResolved {
                    winner: None,
                    value,
                    values: [value, value],
                });
                self.phase = Phase::Intermission;
            }
        }
        Ok(Some(outcome))
    }

    fn living_ids(&self, team: TeamId) -> Vec<FighterId> {
        self.team(team).living().map(|f| f.id).collect()
    }

    /// The acting side picks attacker and target, implicitly where there is only one choice.
    fn act(&mut self, side: TeamId, multiplier: u32) {
        let attackers = self.living_ids(side);
        let targets = self.living_ids(side.opponent());
        match (attackers.as_slice(), targets.as_slice()) {
            ([attacker], [target]) => self.strike(*attacker, *target, multiplier),
            ([attacker], _) => {
                self.phase = Phase::ActionSelection {
                    side,
                    multiplier,
                    attacker: Some(*attacker),
                };
                self.events.push(BattleEvent::AwaitingTarget {
                    attacker: *attacker,
                    candidates: targets,
                });
            }
            _ => {
                self.phase = Phase::ActionSelection {
                    side,
                    multiplier,
                    attacker: None,
                };
                self.events.push(BattleEvent::AwaitingAttacker {
                    side,
                    candidates: attackers,
                });
            }
        }
    }

    fn living_fighter(&self, id: FighterId) -> Result<&Fighter, CommandError> {
        let fighter = self.fighter(id).ok_or(CommandError::UnknownFighter(id))?;
        if fighter.is_alive() {
            Ok(fighter)
        } else {
            Err(CommandError::FighterDown(id))
        }
    }

    pub fn select_attacker(&mut self, id: FighterId) -> Result<(), CommandError> {
        let Phase::ActionSelection {
            side,
            multiplier,
            attacker,
        } = self.phase
        else {
            return Err(CommandError::WrongPhase {
                action: "select an attacker",
                phase: self.phase.name(),
            });
        };
        if attacker.is_some() {
            return Err(CommandError::AttackerAlreadyChosen);
        }
        if id.team != side {
            return Err(CommandError::NotActingSide(id));
        }
        self.living_fighter(id)?;

        let targets = self.living_ids(side.opponent());
        if let [target] = targets.as_slice() {
            self.strike(id, *target, multiplier);
        } else {
            self.phase = Phase::ActionSelection {
                side,
                multiplier,
                attacker: Some(id),
            };
            self.events.push(BattleEvent::AwaitingTarget {
                attacker: id,
                candidates: targets,
            });
        }
        Ok(())
    }

    pub fn select_target(&mut self, id: FighterId) -> Result<(), CommandError> {
        let Phase::ActionSelection {
            side,
            multiplier,
            attacker: Some(attacker),
        } = self.phase
        else {
            return Err(CommandError::WrongPhase {
                action: "select a target",
                phase: self.phase.name(),
            });
        };
        if id.team != side.opponent() {
            return Err(CommandError::NotOpponent(id));
        }
        self.living_fighter(id)?;
        self.strike(attacker, id, multiplier);
        Ok(())
    }

    fn strike(&mut self, attacker: FighterId, target: FighterId, multiplier: u32) {
        let blocked = roll_block(&mut self.dice, &self.rules);
        let rules = self.rules;
        let log = &mut self.log;
        let Some((a, t)) = pair_mut(&mut self.teams, attacker, target) else {
            return;
        };
        let result = resolve_strike(&rules, a, t, multiplier, blocked, |line| log.push(line));
        debug!(
            turn = self.turn,
            attacker = %attacker,
            target = %target,
            damage = result.damage,
            blocked,
            "turn resolved"
        );

        let knocked_out = result.knocked_out;
        self.events.push(BattleEvent::TurnResolved(result));
        if knocked_out {
            self.events.push(BattleEvent::FighterDown { fighter: target });
        }

        if self.team(target.team).is_defeated() {
            let winner = attacker.team;
            self.phase = Phase::Terminal { winner };
            self.log.push(format!(
                "[END] winner={} turns={}",
                winner, self.turn
            ));
            info!(%winner, turns = self.turn, "battle over");
        } else {
            self.phase = Phase::Intermission;
        }
    }

    /// The finished battle, the first time it is asked for after the final blow.
    pub fn take_outcome(&mut self) -> Option<BattleOutcome> {
        let winner = self.winner()?;
        if self.outcome_taken {
            return None;
        }
        self.outcome_taken = true;
        Some(BattleOutcome {
            winner,
            turns: self.turn,
            teams: self.teams.clone(),
        })
    }
}

fn pair_mut(
    teams: &mut [Team; 2],
    attacker: FighterId,
    target: FighterId,
) -> Option<(&Fighter, &mut Fighter)> {
    if attacker.team == target.team {
        return None;
    }
    let (first, second) = teams.split_at_mut(1);
    let (own, other) = match attacker.team {
        TeamId::One => (&first[0], &mut second[0]),
        TeamId::Two => (&second[0], &mut first[0]),
    };
    Some((own.get(attacker.slot)?, other.get_mut(target.slot)?))
}
